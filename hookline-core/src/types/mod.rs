mod details;
mod execution;
mod signing_key;
mod target;

pub use details::{ListDetails, ObjectDetails};
pub use execution::{Execution, ExecutionTarget};
pub use signing_key::SigningKey;
pub use target::{DispatchType, Target};
