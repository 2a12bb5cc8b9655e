//! Read side: point lookups, searches, catalogs, and resolution.

use std::collections::HashMap;
use std::sync::Arc;

use hookline_core::{ActionError, BestMatch, Catalog, Condition, ExecutionGraph, Target};
use hookline_store::{
    ActionStore, ExecutionRecord, ExecutionSearch, SearchResult, TargetRecord, TargetSearch,
};
use tracing::warn;

use crate::access::CallContext;
use crate::config::EngineConfig;
use crate::error::store_error;

/// Targets resolved for one runtime condition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTargets {
    /// The configured condition that matched, if any.
    pub matched: Option<Condition>,
    /// In dispatch order; a target included twice appears twice.
    pub targets: Vec<Target>,
}

pub struct Queries {
    store: Arc<dyn ActionStore>,
    catalog: Arc<dyn Catalog>,
    config: EngineConfig,
}

impl Queries {
    pub fn new(store: Arc<dyn ActionStore>, catalog: Arc<dyn Catalog>, config: EngineConfig) -> Self {
        Self {
            store,
            catalog,
            config,
        }
    }

    pub async fn get_target(&self, ctx: &CallContext, id: &str) -> Result<TargetRecord, ActionError> {
        self.store
            .get_target(&ctx.instance_id, id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| ActionError::not_found(format!("target {id}")))
    }

    pub async fn search_targets(
        &self,
        ctx: &CallContext,
        search: &TargetSearch,
    ) -> Result<SearchResult<TargetRecord>, ActionError> {
        self.store
            .search_targets(&ctx.instance_id, search)
            .await
            .map_err(store_error)
    }

    pub async fn get_execution(
        &self,
        ctx: &CallContext,
        condition: &Condition,
    ) -> Result<ExecutionRecord, ActionError> {
        self.store
            .get_execution(&ctx.instance_id, &condition.id())
            .await
            .map_err(store_error)?
            .ok_or_else(|| ActionError::not_found(format!("execution {condition}")))
    }

    pub async fn search_executions(
        &self,
        ctx: &CallContext,
        search: &ExecutionSearch,
    ) -> Result<SearchResult<ExecutionRecord>, ActionError> {
        self.store
            .search_executions(&ctx.instance_id, search)
            .await
            .map_err(store_error)
    }

    pub fn list_functions(&self) -> Vec<String> {
        self.catalog.functions()
    }

    pub fn list_methods(&self) -> Vec<String> {
        self.catalog.methods()
    }

    pub fn list_services(&self) -> Vec<String> {
        self.catalog.services()
    }

    async fn graph(&self, ctx: &CallContext) -> Result<ExecutionGraph, ActionError> {
        let snapshot = self
            .store
            .snapshot(&ctx.instance_id)
            .await
            .map_err(store_error)?;
        Ok(ExecutionGraph::from_executions(snapshot.executions))
    }

    /// Flattened target IDs configured for exactly `condition`.
    pub async fn resolve(&self, ctx: &CallContext, condition: &Condition) -> Result<Vec<String>, ActionError> {
        let graph = self.graph(ctx).await?;
        Ok(graph.resolve(condition, self.config.max_include_depth)?)
    }

    /// The most specific configured candidate of a runtime condition.
    pub async fn best_match(
        &self,
        ctx: &CallContext,
        runtime: &Condition,
    ) -> Result<Option<BestMatch>, ActionError> {
        let graph = self.graph(ctx).await?;
        Ok(graph.best_match(runtime, self.config.max_include_depth)?)
    }

    /// Loads the targets of the best match for `runtime`, in dispatch order.
    pub async fn execution_targets(
        &self,
        ctx: &CallContext,
        runtime: &Condition,
    ) -> Result<ResolvedTargets, ActionError> {
        let Some(matched) = self.best_match(ctx, runtime).await? else {
            return Ok(ResolvedTargets::default());
        };

        let mut unique: Vec<String> = matched.targets.clone();
        unique.sort();
        unique.dedup();
        let records = self
            .store
            .get_targets(&ctx.instance_id, &unique)
            .await
            .map_err(store_error)?;
        let by_id: HashMap<String, Target> = records
            .into_iter()
            .map(|r| (r.target.id.clone(), r.target))
            .collect();

        let mut targets = Vec::with_capacity(matched.targets.len());
        for id in &matched.targets {
            match by_id.get(id) {
                Some(t) => targets.push(t.clone()),
                // Deleted between reading the graph and the targets.
                None => warn!(target_id = %id, condition = %matched.condition, "resolved target no longer exists"),
            }
        }
        Ok(ResolvedTargets {
            matched: Some(matched.condition),
            targets,
        })
    }
}
