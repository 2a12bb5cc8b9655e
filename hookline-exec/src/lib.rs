#![forbid(unsafe_code)]

//! The hookline execution engine.
//!
//! [`Engine`] bundles the write façade ([`Commands`]), the read façade ([`Queries`]),
//! and the [`Dispatcher`]; pure domain logic lives in `hookline-core`.

pub mod access;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod query;

pub use crate::access::{AccessGuard, AllowAll, CallContext, FeatureFlags, Permission, StaticFeatures, StaticGuard};
pub use crate::command::Commands;
pub use crate::config::EngineConfig;
pub use crate::dispatch::{
    ContextInfo, DispatchInterrupted, DispatchOutcome, Dispatcher, HttpClient, ReqwestHttpClient,
    TargetFailure,
};
pub use crate::engine::{Engine, EngineBuilder};
pub use crate::error::HandleError;
pub use crate::query::{Queries, ResolvedTargets};
