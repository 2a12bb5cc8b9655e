//! Include-graph expansion.
//!
//! Every execution is a node keyed by its condition ID; every `Include` entry is an
//! edge to the included condition. The graph is kept acyclic by checking each write
//! against a prospective [`ExecutionGraph`] before it is committed.

mod model;
mod resolver;

pub use model::ExecutionGraph;
pub use resolver::{resolve, resolve_best_match, BestMatch, CycleError, ExecutionLookup, GraphError};
