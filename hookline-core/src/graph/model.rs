use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::condition::Condition;
use crate::graph::resolver::{resolve, resolve_best_match, BestMatch, ExecutionLookup, GraphError};
use crate::types::{Execution, ExecutionTarget};

/// In-memory adjacency view over a consistent snapshot of executions.
///
/// Writes are checked by applying them to a copy with [`ExecutionGraph::with_execution`]
/// or [`ExecutionGraph::without`] and calling [`ExecutionGraph::check_write`] on the copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionGraph {
    nodes: BTreeMap<String, Vec<ExecutionTarget>>,
}

impl ExecutionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_executions(executions: impl IntoIterator<Item = Execution>) -> Self {
        let mut graph = Self::new();
        for execution in executions {
            graph.insert(execution);
        }
        graph
    }

    /// Replaces the target list of the execution's condition. An empty list removes it.
    pub fn insert(&mut self, execution: Execution) {
        let id = execution.id();
        if execution.is_empty() {
            self.nodes.remove(&id);
        } else {
            self.nodes.insert(id, execution.targets);
        }
    }

    pub fn remove(&mut self, condition_id: &str) -> Option<Vec<ExecutionTarget>> {
        self.nodes.remove(condition_id)
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.insert(execution);
        self
    }

    pub fn without(mut self, condition_id: &str) -> Self {
        self.nodes.remove(condition_id);
        self
    }

    pub fn contains(&self, condition_id: &str) -> bool {
        self.nodes.contains_key(condition_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn condition_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn resolve(&self, root: &Condition, max_depth: usize) -> Result<Vec<String>, GraphError> {
        resolve(root, self, max_depth)
    }

    pub fn best_match(
        &self,
        runtime: &Condition,
        max_depth: usize,
    ) -> Result<Option<BestMatch>, GraphError> {
        resolve_best_match(runtime, self, max_depth)
    }

    /// Condition IDs whose resolution passes through `condition_id`, excluding itself.
    pub fn ancestors(&self, condition_id: &str) -> BTreeSet<String> {
        let mut parents: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
        for (id, targets) in &self.nodes {
            for target in targets {
                if let ExecutionTarget::Include(child) = target {
                    parents.entry(child.id()).or_default().insert(id.as_str());
                }
            }
        }

        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([condition_id.to_string()]);
        while let Some(id) = queue.pop_front() {
            let Some(ps) = parents.get(&id) else {
                continue;
            };
            for p in ps {
                if *p != condition_id && seen.insert(p.to_string()) {
                    queue.push_back(p.to_string());
                }
            }
        }
        seen
    }

    /// Validates the graph after `written` changed: no cycle through it and no path
    /// through it, from it or from any condition that includes it, longer than
    /// `max_depth`.
    pub fn check_write(&self, written: &Condition, max_depth: usize) -> Result<(), GraphError> {
        resolve(written, self, max_depth)?;
        for ancestor in self.ancestors(&written.id()) {
            let Some(targets) = self.nodes.get(&ancestor) else {
                continue;
            };
            if targets.is_empty() {
                continue;
            }
            let condition = crate::condition::decode(&ancestor)
                .map_err(|source| GraphError::InvalidId { id: ancestor.clone(), source })?;
            resolve(&condition, self, max_depth)?;
        }
        Ok(())
    }
}

impl ExecutionLookup for ExecutionGraph {
    fn targets(&self, condition_id: &str) -> Option<&[ExecutionTarget]> {
        self.nodes.get(condition_id).map(Vec::as_slice)
    }
}

impl FromIterator<Execution> for ExecutionGraph {
    fn from_iter<I: IntoIterator<Item = Execution>>(iter: I) -> Self {
        Self::from_executions(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CycleError;

    fn svc(name: &str) -> Condition {
        Condition::request_service(name).unwrap()
    }

    fn exec(name: &str, targets: Vec<ExecutionTarget>) -> Execution {
        Execution::new(svc(name), targets)
    }

    fn inc(name: &str) -> ExecutionTarget {
        ExecutionTarget::Include(svc(name))
    }

    fn t(id: &str) -> ExecutionTarget {
        ExecutionTarget::Target(id.to_string())
    }

    #[test]
    fn closing_edge_is_rejected_on_the_prospective_copy() {
        let graph: ExecutionGraph = vec![exec("a", vec![inc("b")]), exec("b", vec![t("T")])]
            .into_iter()
            .collect();
        let before = graph.clone();

        let prospective = graph.clone().with_execution(exec("b", vec![inc("a")]));
        let err = prospective.check_write(&svc("b"), 10).unwrap_err();
        assert_eq!(
            err,
            GraphError::Cycle(CycleError {
                path: vec![
                    "request/b".to_string(),
                    "request/a".to_string(),
                    "request/b".to_string(),
                ]
            })
        );
        assert_eq!(graph, before);
    }

    #[test]
    fn ancestors_are_transitive() {
        let graph: ExecutionGraph = vec![
            exec("a", vec![inc("b")]),
            exec("b", vec![inc("c")]),
            exec("c", vec![t("T")]),
            exec("x", vec![t("T")]),
        ]
        .into_iter()
        .collect();
        let ancestors: Vec<String> = graph.ancestors("request/c").into_iter().collect();
        assert_eq!(ancestors, vec!["request/a", "request/b"]);
        assert!(graph.ancestors("request/x").is_empty());
    }

    #[test]
    fn depth_is_checked_from_every_includer() {
        let graph: ExecutionGraph = vec![
            exec("id1", vec![inc("id2")]),
            exec("id2", vec![inc("id3")]),
            exec("id3", vec![t("T")]),
        ]
        .into_iter()
        .collect();
        assert!(graph.check_write(&svc("id3"), 3).is_ok());

        let prospective = graph
            .with_execution(exec("id3", vec![inc("id4")]))
            .with_execution(exec("id4", vec![t("T")]));
        // id3 alone is two deep, but id1 -> id2 -> id3 -> id4 is four.
        assert!(matches!(
            prospective.check_write(&svc("id3"), 3),
            Err(GraphError::TooDeep { max_depth: 3, .. })
        ));
    }

    #[test]
    fn undecodable_includer_fails_the_check() {
        let mut graph: ExecutionGraph = vec![exec("b", vec![t("T")])].into_iter().collect();
        graph.nodes.insert("request/".to_string(), vec![inc("b")]);
        assert!(matches!(
            graph.check_write(&svc("b"), 10),
            Err(GraphError::InvalidId { ref id, .. }) if id == "request/"
        ));
    }

    #[test]
    fn empty_execution_is_removed() {
        let graph = ExecutionGraph::new()
            .with_execution(exec("a", vec![t("T")]))
            .with_execution(exec("a", vec![]));
        assert!(graph.is_empty());
    }
}
