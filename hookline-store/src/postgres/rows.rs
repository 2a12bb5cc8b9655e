use std::time::Duration;

use chrono::{DateTime, Utc};
use hookline_core::condition::decode;
use hookline_core::types::ObjectDetails;
use hookline_core::{DispatchType, Execution, ExecutionTarget, SigningKey, Target};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use url::Url;

use crate::store::{ExecutionRecord, StoreError, TargetRecord};

pub(crate) const TARGET_COLUMNS: &str = "instance_id, id, name, endpoint, timeout_ms, dispatch_type, \
     interrupt_on_error, signing_key, sequence, created_at, changed_at";

pub(crate) const EXECUTION_COLUMNS: &str =
    "instance_id, id, targets, sequence, created_at, changed_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TargetRow {
    pub instance_id: String,
    pub id: String,
    pub name: String,
    pub endpoint: String,
    pub timeout_ms: i64,
    pub dispatch_type: String,
    pub interrupt_on_error: bool,
    pub signing_key: Vec<u8>,
    pub sequence: i64,
    pub created_at: DateTime<Utc>,
    pub changed_at: DateTime<Utc>,
}

impl TryFrom<TargetRow> for TargetRecord {
    type Error = StoreError;

    fn try_from(row: TargetRow) -> Result<Self, Self::Error> {
        let endpoint = Url::parse(&row.endpoint)
            .map_err(|e| StoreError::Other(format!("target {}: stored endpoint: {e}", row.id)))?;
        let dispatch_type: DispatchType = row
            .dispatch_type
            .parse()
            .map_err(|e| StoreError::Other(format!("target {}: {e}", row.id)))?;
        let details = ObjectDetails {
            id: row.id.clone(),
            resource_owner: row.instance_id.clone(),
            sequence: row.sequence,
            creation_date: row.created_at,
            change_date: row.changed_at,
        };
        Ok(TargetRecord {
            target: Target {
                id: row.id,
                instance_id: row.instance_id,
                name: row.name,
                endpoint,
                timeout: Duration::from_millis(u64::try_from(row.timeout_ms).unwrap_or(0)),
                dispatch_type,
                interrupt_on_error: row.interrupt_on_error,
                signing_key: SigningKey::from_bytes(row.signing_key),
            },
            details,
        })
    }
}

pub(crate) fn timeout_millis(timeout: Duration) -> i64 {
    i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX)
}

/// Storage shape of one execution target entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "target", rename_all = "snake_case")]
pub(crate) enum StoredTarget {
    Target(String),
    /// Condition ID of the included execution.
    Include(String),
}

impl From<&ExecutionTarget> for StoredTarget {
    fn from(t: &ExecutionTarget) -> Self {
        match t {
            ExecutionTarget::Target(id) => StoredTarget::Target(id.clone()),
            ExecutionTarget::Include(c) => StoredTarget::Include(c.id()),
        }
    }
}

pub(crate) fn stored_targets(execution: &Execution) -> Json<Vec<StoredTarget>> {
    Json(execution.targets.iter().map(StoredTarget::from).collect())
}

/// JSONB containment argument matching executions that hold `entry`.
pub(crate) fn containment(entry: StoredTarget) -> serde_json::Value {
    serde_json::json!([entry])
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ExecutionRow {
    pub instance_id: String,
    pub id: String,
    pub targets: Json<Vec<StoredTarget>>,
    pub sequence: i64,
    pub created_at: DateTime<Utc>,
    pub changed_at: DateTime<Utc>,
}

impl TryFrom<ExecutionRow> for ExecutionRecord {
    type Error = StoreError;

    fn try_from(row: ExecutionRow) -> Result<Self, Self::Error> {
        let corrupt = |e: hookline_core::DecodeError| {
            StoreError::Other(format!("execution {}: stored condition: {e}", row.id))
        };
        let condition = decode(&row.id).map_err(corrupt)?;
        let targets = row
            .targets
            .0
            .iter()
            .map(|t| match t {
                StoredTarget::Target(id) => Ok(ExecutionTarget::Target(id.clone())),
                StoredTarget::Include(id) => decode(id).map(ExecutionTarget::Include).map_err(corrupt),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ExecutionRecord {
            execution: Execution::new(condition, targets),
            details: ObjectDetails {
                id: row.id.clone(),
                resource_owner: row.instance_id.clone(),
                sequence: row.sequence,
                creation_date: row.created_at,
                change_date: row.changed_at,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookline_core::Condition;

    #[test]
    fn stored_target_shape() {
        let execution = Execution::new(
            Condition::request_all(),
            vec![
                ExecutionTarget::Target("t1".to_string()),
                ExecutionTarget::Include(Condition::event_group("user").unwrap()),
            ],
        );
        assert_eq!(
            serde_json::to_value(stored_targets(&execution).0).unwrap(),
            serde_json::json!([
                {"type": "target", "target": "t1"},
                {"type": "include", "target": "event/user.*"}
            ])
        );
    }
}
