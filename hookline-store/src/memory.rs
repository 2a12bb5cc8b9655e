//! In-process [`ActionStore`], used by tests and single-process embeddings.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hookline_core::types::{ListDetails, ObjectDetails};
use hookline_core::{Execution, ExecutionTarget, Target};
use tokio::sync::RwLock;

use crate::store::{
    ActionStore, ExecutionRecord, ExecutionSearch, SearchResult, Snapshot, StoreError,
    TargetDeletion, TargetRecord, TargetSearch,
};

#[derive(Debug, Default)]
struct Instance {
    sequence: i64,
    targets: BTreeMap<String, TargetRecord>,
    executions: BTreeMap<String, ExecutionRecord>,
}

impl Instance {
    fn expect_sequence(&self, expected: i64) -> Result<(), StoreError> {
        if self.sequence == expected {
            Ok(())
        } else {
            Err(StoreError::Conflict(format!(
                "expected instance sequence {expected}, found {}",
                self.sequence
            )))
        }
    }

    fn next_sequence(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    instances: RwLock<HashMap<String, Instance>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn details(id: &str, instance_id: &str, sequence: i64, created: DateTime<Utc>, now: DateTime<Utc>) -> ObjectDetails {
    ObjectDetails {
        id: id.to_string(),
        resource_owner: instance_id.to_string(),
        sequence,
        creation_date: created,
        change_date: now,
    }
}

fn list_details(total: usize, sequence: i64) -> ListDetails {
    ListDetails {
        total_result: total as u64,
        processed_sequence: sequence,
        timestamp: Utc::now(),
    }
}

#[async_trait]
impl ActionStore for MemoryStore {
    async fn current_sequence(&self, instance_id: &str) -> Result<i64, StoreError> {
        let instances = self.instances.read().await;
        Ok(instances.get(instance_id).map(|i| i.sequence).unwrap_or(0))
    }

    async fn create_target(&self, target: &Target) -> Result<ObjectDetails, StoreError> {
        let mut instances = self.instances.write().await;
        let instance = instances.entry(target.instance_id.clone()).or_default();
        if instance.targets.contains_key(&target.id) {
            return Err(StoreError::AlreadyExists(format!("target {}", target.id)));
        }
        if instance.targets.values().any(|r| r.target.name == target.name) {
            return Err(StoreError::AlreadyExists(format!("target name {:?}", target.name)));
        }
        let now = Utc::now();
        let sequence = instance.next_sequence();
        let d = details(&target.id, &target.instance_id, sequence, now, now);
        instance.targets.insert(
            target.id.clone(),
            TargetRecord {
                target: target.clone(),
                details: d.clone(),
            },
        );
        Ok(d)
    }

    async fn get_target(&self, instance_id: &str, id: &str) -> Result<Option<TargetRecord>, StoreError> {
        let instances = self.instances.read().await;
        Ok(instances
            .get(instance_id)
            .and_then(|i| i.targets.get(id))
            .cloned())
    }

    async fn get_targets(&self, instance_id: &str, ids: &[String]) -> Result<Vec<TargetRecord>, StoreError> {
        let instances = self.instances.read().await;
        let Some(instance) = instances.get(instance_id) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| instance.targets.get(id))
            .cloned()
            .collect())
    }

    async fn update_target(&self, target: &Target, expected_sequence: i64) -> Result<ObjectDetails, StoreError> {
        let mut instances = self.instances.write().await;
        let instance = instances
            .get_mut(&target.instance_id)
            .ok_or_else(|| StoreError::NotFound(format!("target {}", target.id)))?;
        let (current_seq, created) = match instance.targets.get(&target.id) {
            Some(r) => (r.details.sequence, r.details.creation_date),
            None => return Err(StoreError::NotFound(format!("target {}", target.id))),
        };
        if current_seq != expected_sequence {
            return Err(StoreError::Conflict(format!(
                "target {} is at sequence {current_seq}, expected {expected_sequence}",
                target.id
            )));
        }
        if instance
            .targets
            .values()
            .any(|r| r.target.id != target.id && r.target.name == target.name)
        {
            return Err(StoreError::AlreadyExists(format!("target name {:?}", target.name)));
        }
        let sequence = instance.next_sequence();
        let d = details(&target.id, &target.instance_id, sequence, created, Utc::now());
        instance.targets.insert(
            target.id.clone(),
            TargetRecord {
                target: target.clone(),
                details: d.clone(),
            },
        );
        Ok(d)
    }

    async fn delete_target(
        &self,
        instance_id: &str,
        id: &str,
        expected_sequence: i64,
    ) -> Result<TargetDeletion, StoreError> {
        let mut instances = self.instances.write().await;
        let instance = instances
            .get_mut(instance_id)
            .ok_or_else(|| StoreError::NotFound(format!("target {id}")))?;
        instance.expect_sequence(expected_sequence)?;
        let removed = instance
            .targets
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(format!("target {id}")))?;

        let sequence = instance.next_sequence();
        let now = Utc::now();
        let mut affected = Vec::new();
        let mut emptied = Vec::new();
        for (condition_id, record) in instance.executions.iter_mut() {
            let before = record.execution.targets.len();
            record
                .execution
                .targets
                .retain(|t| !matches!(t, ExecutionTarget::Target(target_id) if target_id == id));
            if record.execution.targets.len() != before {
                affected.push(condition_id.clone());
                record.details.sequence = sequence;
                record.details.change_date = now;
                if record.execution.is_empty() {
                    emptied.push(condition_id.clone());
                }
            }
        }
        for condition_id in emptied {
            instance.executions.remove(&condition_id);
        }

        Ok(TargetDeletion {
            details: details(id, instance_id, sequence, removed.details.creation_date, now),
            affected_executions: affected,
        })
    }

    async fn search_targets(
        &self,
        instance_id: &str,
        search: &TargetSearch,
    ) -> Result<SearchResult<TargetRecord>, StoreError> {
        let instances = self.instances.read().await;
        let (mut items, sequence): (Vec<TargetRecord>, i64) = match instances.get(instance_id) {
            Some(i) => (
                i.targets.values().filter(|r| search.matches(r)).cloned().collect(),
                i.sequence,
            ),
            None => (Vec::new(), 0),
        };
        items.sort_by(|a, b| search.sort.compare(a, b));
        if !search.page.asc {
            items.reverse();
        }
        let total = items.len();
        Ok(SearchResult {
            details: list_details(total, sequence),
            items: search.page.page(items),
        })
    }

    async fn get_execution(
        &self,
        instance_id: &str,
        condition_id: &str,
    ) -> Result<Option<ExecutionRecord>, StoreError> {
        let instances = self.instances.read().await;
        Ok(instances
            .get(instance_id)
            .and_then(|i| i.executions.get(condition_id))
            .cloned())
    }

    async fn snapshot(&self, instance_id: &str) -> Result<Snapshot, StoreError> {
        let instances = self.instances.read().await;
        let Some(instance) = instances.get(instance_id) else {
            return Ok(Snapshot::default());
        };
        Ok(Snapshot {
            executions: instance
                .executions
                .values()
                .map(|r| r.execution.clone())
                .collect(),
            target_ids: instance.targets.keys().cloned().collect(),
            sequence: instance.sequence,
        })
    }

    async fn put_execution(
        &self,
        instance_id: &str,
        execution: &Execution,
        expected_sequence: i64,
    ) -> Result<ObjectDetails, StoreError> {
        let mut instances = self.instances.write().await;
        let instance = instances.entry(instance_id.to_string()).or_default();
        instance.expect_sequence(expected_sequence)?;
        let id = execution.id();
        let now = Utc::now();
        let created = instance
            .executions
            .get(&id)
            .map(|r| r.details.creation_date)
            .unwrap_or(now);
        let sequence = instance.next_sequence();
        let d = details(&id, instance_id, sequence, created, now);
        instance.executions.insert(
            id,
            ExecutionRecord {
                execution: execution.clone(),
                details: d.clone(),
            },
        );
        Ok(d)
    }

    async fn delete_execution(
        &self,
        instance_id: &str,
        condition_id: &str,
        expected_sequence: i64,
    ) -> Result<ObjectDetails, StoreError> {
        let mut instances = self.instances.write().await;
        let instance = instances
            .get_mut(instance_id)
            .ok_or_else(|| StoreError::NotFound(format!("execution {condition_id}")))?;
        instance.expect_sequence(expected_sequence)?;
        let removed = instance
            .executions
            .remove(condition_id)
            .ok_or_else(|| StoreError::NotFound(format!("execution {condition_id}")))?;
        let sequence = instance.next_sequence();
        Ok(details(
            condition_id,
            instance_id,
            sequence,
            removed.details.creation_date,
            Utc::now(),
        ))
    }

    async fn search_executions(
        &self,
        instance_id: &str,
        search: &ExecutionSearch,
    ) -> Result<SearchResult<ExecutionRecord>, StoreError> {
        let instances = self.instances.read().await;
        let (mut items, sequence): (Vec<ExecutionRecord>, i64) = match instances.get(instance_id) {
            Some(i) => (
                i.executions.values().filter(|r| search.matches(r)).cloned().collect(),
                i.sequence,
            ),
            None => (Vec::new(), 0),
        };
        items.sort_by(|a, b| search.sort.compare(a, b));
        if !search.page.asc {
            items.reverse();
        }
        let total = items.len();
        Ok(SearchResult {
            details: list_details(total, sequence),
            items: search.page.page(items),
        })
    }
}
