use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::condition::{Condition, DecodeError};
use crate::types::ExecutionTarget;

/// Read access to configured target lists by condition ID.
pub trait ExecutionLookup {
    /// `None` when no execution is configured for `condition_id`.
    fn targets(&self, condition_id: &str) -> Option<&[ExecutionTarget]>;
}

impl ExecutionLookup for BTreeMap<String, Vec<ExecutionTarget>> {
    fn targets(&self, condition_id: &str) -> Option<&[ExecutionTarget]> {
        self.get(condition_id).map(Vec::as_slice)
    }
}

impl ExecutionLookup for HashMap<String, Vec<ExecutionTarget>> {
    fn targets(&self, condition_id: &str) -> Option<&[ExecutionTarget]> {
        self.get(condition_id).map(Vec::as_slice)
    }
}

/// The include path that closes on itself; first and last entries are equal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", path.join(" -> "))]
pub struct CycleError {
    pub path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("circular include: {0}")]
    Cycle(CycleError),

    #[error("include chain {} exceeds the maximum depth of {max_depth}", path.join(" -> "))]
    TooDeep { max_depth: usize, path: Vec<String> },

    #[error("stored execution {id:?} has an invalid condition id: {source}")]
    InvalidId { id: String, source: DecodeError },
}

/// The condition that matched a runtime instance and its flattened target IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestMatch {
    pub condition: Condition,
    pub targets: Vec<String>,
}

/// Flattens the target list of `root`, splicing included lists in place.
///
/// `max_depth` bounds the number of conditions on one include path, the root included.
/// Conditions without an execution contribute no targets.
pub fn resolve<L: ExecutionLookup + ?Sized>(
    root: &Condition,
    lookup: &L,
    max_depth: usize,
) -> Result<Vec<String>, GraphError> {
    let mut path = Vec::new();
    let mut out = Vec::new();
    expand(&root.id(), lookup, max_depth, &mut path, &mut out)?;
    Ok(out)
}

fn expand<L: ExecutionLookup + ?Sized>(
    id: &str,
    lookup: &L,
    max_depth: usize,
    path: &mut Vec<String>,
    out: &mut Vec<String>,
) -> Result<(), GraphError> {
    path.push(id.to_string());
    if path.len() > max_depth {
        return Err(GraphError::TooDeep {
            max_depth,
            path: path.clone(),
        });
    }

    if let Some(targets) = lookup.targets(id) {
        for target in targets {
            match target {
                ExecutionTarget::Target(target_id) => out.push(target_id.clone()),
                ExecutionTarget::Include(child) => {
                    let child_id = child.id();
                    if let Some(pos) = path.iter().position(|p| *p == child_id) {
                        let mut cycle = path[pos..].to_vec();
                        cycle.push(child_id);
                        return Err(GraphError::Cycle(CycleError { path: cycle }));
                    }
                    expand(&child_id, lookup, max_depth, path, out)?;
                }
            }
        }
    }

    path.pop();
    Ok(())
}

/// Resolves the most specific candidate of `runtime` that has a configured execution.
///
/// Candidates run from method/event over service/group to the catch-all; there is no
/// fallback beyond the catch-all.
pub fn resolve_best_match<L: ExecutionLookup + ?Sized>(
    runtime: &Condition,
    lookup: &L,
    max_depth: usize,
) -> Result<Option<BestMatch>, GraphError> {
    for candidate in runtime.candidates() {
        let configured = lookup
            .targets(&candidate.id())
            .is_some_and(|targets| !targets.is_empty());
        if !configured {
            continue;
        }
        let targets = resolve(&candidate, lookup, max_depth)?;
        return Ok(Some(BestMatch {
            condition: candidate,
            targets,
        }));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svc(name: &str) -> Condition {
        Condition::request_service(name).unwrap()
    }

    fn t(id: &str) -> ExecutionTarget {
        ExecutionTarget::Target(id.to_string())
    }

    fn inc(name: &str) -> ExecutionTarget {
        ExecutionTarget::Include(svc(name))
    }

    fn graph(entries: Vec<(&str, Vec<ExecutionTarget>)>) -> BTreeMap<String, Vec<ExecutionTarget>> {
        entries
            .into_iter()
            .map(|(name, targets)| (svc(name).id(), targets))
            .collect()
    }

    #[test]
    fn include_is_spliced_in_place() {
        let g = graph(vec![
            ("a", vec![t("T1"), inc("b"), t("T2")]),
            ("b", vec![t("T3"), t("T4")]),
        ]);
        assert_eq!(resolve(&svc("a"), &g, 10).unwrap(), vec!["T1", "T3", "T4", "T2"]);
    }

    #[test]
    fn missing_include_contributes_nothing() {
        let g = graph(vec![("a", vec![t("T1"), inc("gone"), t("T2")])]);
        assert_eq!(resolve(&svc("a"), &g, 10).unwrap(), vec!["T1", "T2"]);
        assert_eq!(resolve(&svc("gone"), &g, 10).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn shared_subcondition_is_not_a_cycle() {
        let g = graph(vec![
            ("a", vec![inc("b"), inc("c")]),
            ("b", vec![inc("d")]),
            ("c", vec![inc("d")]),
            ("d", vec![t("T")]),
        ]);
        assert_eq!(resolve(&svc("a"), &g, 10).unwrap(), vec!["T", "T"]);
    }

    #[test]
    fn reports_cycle_path() {
        let g = graph(vec![
            ("a", vec![inc("b")]),
            ("b", vec![inc("c")]),
            ("c", vec![inc("a")]),
        ]);
        let err = resolve(&svc("a"), &g, 10).unwrap_err();
        assert_eq!(
            err,
            GraphError::Cycle(CycleError {
                path: vec![
                    "request/a".to_string(),
                    "request/b".to_string(),
                    "request/c".to_string(),
                    "request/a".to_string(),
                ]
            })
        );
    }

    #[test]
    fn self_include_is_a_cycle() {
        let g = graph(vec![("a", vec![t("T"), inc("a")])]);
        assert!(matches!(resolve(&svc("a"), &g, 10), Err(GraphError::Cycle(_))));
    }

    #[test]
    fn depth_counts_conditions_on_the_path() {
        let g = graph(vec![
            ("id1", vec![inc("id2")]),
            ("id2", vec![inc("id3")]),
            ("id3", vec![inc("id4")]),
            ("id4", vec![]),
        ]);
        assert!(resolve(&svc("id2"), &g, 3).is_ok());
        assert!(matches!(resolve(&svc("id1"), &g, 3), Err(GraphError::TooDeep { max_depth: 3, .. })));
    }

    #[test]
    fn best_match_prefers_method_over_service_over_all() {
        let method = Condition::request_method("/pkg.Svc/Method").unwrap();
        let mut g: BTreeMap<String, Vec<ExecutionTarget>> = BTreeMap::new();
        g.insert(method.id(), vec![t("method")]);
        g.insert(svc("pkg.Svc").id(), vec![t("service")]);
        g.insert(Condition::request_all().id(), vec![t("all")]);

        let m = resolve_best_match(&method, &g, 10).unwrap().unwrap();
        assert_eq!(m.condition, method);
        assert_eq!(m.targets, vec!["method"]);

        let other = Condition::request_method("/pkg.Svc/Other").unwrap();
        let m = resolve_best_match(&other, &g, 10).unwrap().unwrap();
        assert_eq!(m.targets, vec!["service"]);

        let unrelated = Condition::request_method("/other.Svc/Other").unwrap();
        let m = resolve_best_match(&unrelated, &g, 10).unwrap().unwrap();
        assert_eq!(m.targets, vec!["all"]);
    }

    #[test]
    fn best_match_without_fallback_is_none() {
        let method = Condition::request_method("/pkg.Svc/Method").unwrap();
        let mut g: BTreeMap<String, Vec<ExecutionTarget>> = BTreeMap::new();
        g.insert(method.id(), vec![t("t1")]);
        let other = Condition::request_method("/pkg.Svc/Other").unwrap();
        assert_eq!(resolve_best_match(&other, &g, 10).unwrap(), None);
    }
}
