use async_trait::async_trait;
use hookline_core::types::ObjectDetails;
use hookline_core::{Execution, Target};
use sqlx::PgPool;

use crate::store::{
    ActionStore, ExecutionRecord, ExecutionSearch, SearchResult, Snapshot, StoreError,
    TargetDeletion, TargetRecord, TargetSearch,
};

use super::executions;
use super::sequence;
use super::targets;

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ActionStore for PostgresStore {
    async fn current_sequence(&self, instance_id: &str) -> Result<i64, StoreError> {
        sequence::current_sequence(&self.pool, instance_id).await
    }

    async fn create_target(&self, target: &Target) -> Result<ObjectDetails, StoreError> {
        targets::create_target(&self.pool, target).await
    }

    async fn get_target(&self, instance_id: &str, id: &str) -> Result<Option<TargetRecord>, StoreError> {
        targets::get_target(&self.pool, instance_id, id).await
    }

    async fn get_targets(&self, instance_id: &str, ids: &[String]) -> Result<Vec<TargetRecord>, StoreError> {
        targets::get_targets(&self.pool, instance_id, ids).await
    }

    async fn update_target(&self, target: &Target, expected_sequence: i64) -> Result<ObjectDetails, StoreError> {
        targets::update_target(&self.pool, target, expected_sequence).await
    }

    async fn delete_target(
        &self,
        instance_id: &str,
        id: &str,
        expected_sequence: i64,
    ) -> Result<TargetDeletion, StoreError> {
        targets::delete_target(&self.pool, instance_id, id, expected_sequence).await
    }

    async fn search_targets(
        &self,
        instance_id: &str,
        search: &TargetSearch,
    ) -> Result<SearchResult<TargetRecord>, StoreError> {
        targets::search_targets(&self.pool, instance_id, search).await
    }

    async fn get_execution(
        &self,
        instance_id: &str,
        condition_id: &str,
    ) -> Result<Option<ExecutionRecord>, StoreError> {
        executions::get_execution(&self.pool, instance_id, condition_id).await
    }

    async fn snapshot(&self, instance_id: &str) -> Result<Snapshot, StoreError> {
        executions::snapshot(&self.pool, instance_id).await
    }

    async fn put_execution(
        &self,
        instance_id: &str,
        execution: &Execution,
        expected_sequence: i64,
    ) -> Result<ObjectDetails, StoreError> {
        executions::put_execution(&self.pool, instance_id, execution, expected_sequence).await
    }

    async fn delete_execution(
        &self,
        instance_id: &str,
        condition_id: &str,
        expected_sequence: i64,
    ) -> Result<ObjectDetails, StoreError> {
        executions::delete_execution(&self.pool, instance_id, condition_id, expected_sequence).await
    }

    async fn search_executions(
        &self,
        instance_id: &str,
        search: &ExecutionSearch,
    ) -> Result<SearchResult<ExecutionRecord>, StoreError> {
        executions::search_executions(&self.pool, instance_id, search).await
    }
}
