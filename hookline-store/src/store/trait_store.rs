use async_trait::async_trait;
use hookline_core::types::ObjectDetails;
use hookline_core::{Execution, Target};

use crate::store::query::{ExecutionSearch, TargetSearch};
use crate::store::types::*;

/// Persistence of targets and executions, partitioned by instance.
///
/// Every write increments the instance sequence and stamps the written row with it.
/// Writes that take an `expected_sequence` fail with [`StoreError::Conflict`] when the
/// stored value moved on since it was read.
#[async_trait]
pub trait ActionStore: Send + Sync {
    async fn current_sequence(&self, instance_id: &str) -> Result<i64, StoreError>;

    /// Fails [`StoreError::AlreadyExists`] on a duplicate ID or name.
    async fn create_target(&self, target: &Target) -> Result<ObjectDetails, StoreError>;

    async fn get_target(
        &self,
        instance_id: &str,
        id: &str,
    ) -> Result<Option<TargetRecord>, StoreError>;

    /// Unknown IDs are skipped.
    async fn get_targets(
        &self,
        instance_id: &str,
        ids: &[String],
    ) -> Result<Vec<TargetRecord>, StoreError>;

    /// `expected_sequence` is the row sequence the update was computed from.
    async fn update_target(
        &self,
        target: &Target,
        expected_sequence: i64,
    ) -> Result<ObjectDetails, StoreError>;

    /// Removes the target and every direct reference to it, dropping executions left
    /// empty. `expected_sequence` is the instance sequence.
    async fn delete_target(
        &self,
        instance_id: &str,
        id: &str,
        expected_sequence: i64,
    ) -> Result<TargetDeletion, StoreError>;

    async fn search_targets(
        &self,
        instance_id: &str,
        search: &TargetSearch,
    ) -> Result<SearchResult<TargetRecord>, StoreError>;

    async fn get_execution(
        &self,
        instance_id: &str,
        condition_id: &str,
    ) -> Result<Option<ExecutionRecord>, StoreError>;

    async fn snapshot(&self, instance_id: &str) -> Result<Snapshot, StoreError>;

    /// Creates or replaces the execution. `expected_sequence` is the instance sequence.
    async fn put_execution(
        &self,
        instance_id: &str,
        execution: &Execution,
        expected_sequence: i64,
    ) -> Result<ObjectDetails, StoreError>;

    /// Fails [`StoreError::NotFound`] when there is nothing to delete.
    async fn delete_execution(
        &self,
        instance_id: &str,
        condition_id: &str,
        expected_sequence: i64,
    ) -> Result<ObjectDetails, StoreError>;

    async fn search_executions(
        &self,
        instance_id: &str,
        search: &ExecutionSearch,
    ) -> Result<SearchResult<ExecutionRecord>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("concurrent modification: {0}")]
    Conflict(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Other(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e.as_database_error() {
            Some(db) if db.is_unique_violation() => StoreError::AlreadyExists(db.message().to_string()),
            _ => StoreError::Other(e.to_string()),
        }
    }
}
