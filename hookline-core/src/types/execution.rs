use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// One entry in an execution's ordered target list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionTarget {
    /// A direct reference to a target by ID.
    Target(String),
    /// Splice in the resolved target list of another condition.
    Include(Condition),
}

/// The association between one condition and an ordered target list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub condition: Condition,
    pub targets: Vec<ExecutionTarget>,
}

impl Execution {
    pub fn new(condition: Condition, targets: Vec<ExecutionTarget>) -> Self {
        Self { condition, targets }
    }

    pub fn id(&self) -> String {
        self.condition.id()
    }

    pub fn target_ids(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().filter_map(|t| match t {
            ExecutionTarget::Target(id) => Some(id.as_str()),
            ExecutionTarget::Include(_) => None,
        })
    }

    pub fn includes(&self) -> impl Iterator<Item = &Condition> {
        self.targets.iter().filter_map(|t| match t {
            ExecutionTarget::Include(c) => Some(c),
            ExecutionTarget::Target(_) => None,
        })
    }

    /// An execution without targets is the same as no execution.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
