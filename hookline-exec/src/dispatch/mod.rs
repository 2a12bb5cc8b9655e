//! Invocation of resolved targets.

mod dispatcher;
pub mod http;
mod payload;
pub mod signing;

pub use dispatcher::{DispatchInterrupted, DispatchOutcome, Dispatcher, TargetFailure};
pub use http::{HttpClient, HttpError, HttpRequestParts, HttpResponseParts, ReqwestHttpClient};
pub use payload::ContextInfo;
