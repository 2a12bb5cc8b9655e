use std::collections::BTreeSet;

use hookline_core::types::{ListDetails, ObjectDetails};
use hookline_core::{Execution, Target};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRecord {
    pub target: Target,
    pub details: ObjectDetails,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRecord {
    pub execution: Execution,
    pub details: ObjectDetails,
}

/// Consistent view of one instance's include graph, taken before a graph write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub executions: Vec<Execution>,
    pub target_ids: BTreeSet<String>,
    /// Instance sequence the snapshot was read at; graph writes expect it unchanged.
    pub sequence: i64,
}

/// Result of deleting a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDeletion {
    pub details: ObjectDetails,
    /// Condition IDs whose executions referenced the target.
    pub affected_executions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult<T> {
    pub details: ListDetails,
    pub items: Vec<T>,
}
