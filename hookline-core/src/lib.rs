#![forbid(unsafe_code)]

pub mod catalog;
pub mod condition;
pub mod error;
pub mod graph;
pub mod types;
pub mod validate;

pub use crate::catalog::{Catalog, StaticCatalog};
pub use crate::condition::{Condition, DecodeError, ExecutionType};
pub use crate::error::{ActionError, ValidationError, Violation};
pub use crate::graph::{BestMatch, CycleError, ExecutionGraph, ExecutionLookup, GraphError};
pub use crate::types::{DispatchType, Execution, ExecutionTarget, SigningKey, Target};
pub use crate::validate::{change_target, create_target, NewTarget, TargetPatch};
