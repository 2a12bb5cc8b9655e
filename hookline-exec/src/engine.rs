use std::sync::Arc;

use hookline_core::types::ObjectDetails;
use hookline_core::{ActionError, BestMatch, Catalog, Condition, ExecutionTarget, NewTarget, TargetPatch};
use hookline_store::{
    ActionStore, ExecutionRecord, ExecutionSearch, SearchResult, TargetDeletion, TargetRecord,
    TargetSearch,
};
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::access::{AccessGuard, AllowAll, CallContext, FeatureFlags, Permission, StaticFeatures};
use crate::command::Commands;
use crate::config::EngineConfig;
use crate::dispatch::{ContextInfo, DispatchOutcome, Dispatcher, HttpClient};
use crate::error::HandleError;
use crate::query::{Queries, ResolvedTargets};

/// Entry point of the engine, built once at startup and shared by reference.
///
/// Administrative operations check the caller's permission and the instance's
/// feature switch before anything else.
pub struct Engine {
    commands: Commands,
    queries: Queries,
    dispatcher: Dispatcher,
    guard: Arc<dyn AccessGuard>,
    features: Arc<dyn FeatureFlags>,
}

pub struct EngineBuilder {
    store: Arc<dyn ActionStore>,
    catalog: Arc<dyn Catalog>,
    http: Arc<dyn HttpClient>,
    guard: Arc<dyn AccessGuard>,
    features: Arc<dyn FeatureFlags>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn guard(mut self, guard: Arc<dyn AccessGuard>) -> Self {
        self.guard = guard;
        self
    }

    pub fn features(mut self, features: Arc<dyn FeatureFlags>) -> Self {
        self.features = features;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            commands: Commands::new(self.store.clone(), self.catalog.clone(), self.config.clone()),
            queries: Queries::new(self.store, self.catalog, self.config.clone()),
            dispatcher: Dispatcher::new(self.http, self.config),
            guard: self.guard,
            features: self.features,
        }
    }
}

impl Engine {
    /// Starts a builder that grants every permission and enables executions everywhere.
    pub fn builder(
        store: Arc<dyn ActionStore>,
        catalog: Arc<dyn Catalog>,
        http: Arc<dyn HttpClient>,
    ) -> EngineBuilder {
        EngineBuilder {
            store,
            catalog,
            http,
            guard: Arc::new(AllowAll),
            features: Arc::new(StaticFeatures::enabled()),
            config: EngineConfig::default(),
        }
    }

    pub fn commands(&self) -> &Commands {
        &self.commands
    }

    pub fn queries(&self) -> &Queries {
        &self.queries
    }

    async fn authorize(&self, ctx: &CallContext, permission: Permission) -> Result<(), ActionError> {
        self.guard.check(ctx, permission).await?;
        if !self.features.executions_enabled(&ctx.instance_id).await? {
            return Err(ActionError::precondition(format!(
                "executions are not enabled on instance {}",
                ctx.instance_id
            )));
        }
        Ok(())
    }

    pub async fn create_target(&self, ctx: &CallContext, input: NewTarget) -> Result<ObjectDetails, ActionError> {
        self.authorize(ctx, Permission::TargetWrite).await?;
        self.commands.create_target(ctx, input).await
    }

    pub async fn patch_target(
        &self,
        ctx: &CallContext,
        id: &str,
        patch: TargetPatch,
    ) -> Result<ObjectDetails, ActionError> {
        self.authorize(ctx, Permission::TargetWrite).await?;
        self.commands.patch_target(ctx, id, patch).await
    }

    pub async fn delete_target(&self, ctx: &CallContext, id: &str) -> Result<TargetDeletion, ActionError> {
        self.authorize(ctx, Permission::TargetDelete).await?;
        self.commands.delete_target(ctx, id).await
    }

    pub async fn get_target(&self, ctx: &CallContext, id: &str) -> Result<TargetRecord, ActionError> {
        self.authorize(ctx, Permission::TargetRead).await?;
        self.queries.get_target(ctx, id).await
    }

    pub async fn search_targets(
        &self,
        ctx: &CallContext,
        search: &TargetSearch,
    ) -> Result<SearchResult<TargetRecord>, ActionError> {
        self.authorize(ctx, Permission::TargetRead).await?;
        self.queries.search_targets(ctx, search).await
    }

    pub async fn set_execution(
        &self,
        ctx: &CallContext,
        condition: Condition,
        targets: Vec<ExecutionTarget>,
    ) -> Result<ObjectDetails, ActionError> {
        self.authorize(ctx, Permission::ExecutionWrite).await?;
        self.commands.set_execution(ctx, condition, targets).await
    }

    pub async fn delete_execution(
        &self,
        ctx: &CallContext,
        condition: &Condition,
    ) -> Result<ObjectDetails, ActionError> {
        self.authorize(ctx, Permission::ExecutionDelete).await?;
        self.commands.delete_execution(ctx, condition).await
    }

    pub async fn get_execution(
        &self,
        ctx: &CallContext,
        condition: &Condition,
    ) -> Result<ExecutionRecord, ActionError> {
        self.authorize(ctx, Permission::ExecutionRead).await?;
        self.queries.get_execution(ctx, condition).await
    }

    pub async fn search_executions(
        &self,
        ctx: &CallContext,
        search: &ExecutionSearch,
    ) -> Result<SearchResult<ExecutionRecord>, ActionError> {
        self.authorize(ctx, Permission::ExecutionRead).await?;
        self.queries.search_executions(ctx, search).await
    }

    pub async fn list_execution_functions(&self, ctx: &CallContext) -> Result<Vec<String>, ActionError> {
        self.authorize(ctx, Permission::ExecutionRead).await?;
        Ok(self.queries.list_functions())
    }

    pub async fn list_execution_methods(&self, ctx: &CallContext) -> Result<Vec<String>, ActionError> {
        self.authorize(ctx, Permission::ExecutionRead).await?;
        Ok(self.queries.list_methods())
    }

    pub async fn list_execution_services(&self, ctx: &CallContext) -> Result<Vec<String>, ActionError> {
        self.authorize(ctx, Permission::ExecutionRead).await?;
        Ok(self.queries.list_services())
    }

    /// Flattened target IDs configured for exactly `condition`.
    pub async fn resolve(&self, ctx: &CallContext, condition: &Condition) -> Result<Vec<String>, ActionError> {
        self.authorize(ctx, Permission::ExecutionRead).await?;
        self.queries.resolve(ctx, condition).await
    }

    /// The configured condition a runtime condition falls back to, with its targets.
    pub async fn best_match(
        &self,
        ctx: &CallContext,
        runtime: &Condition,
    ) -> Result<Option<BestMatch>, ActionError> {
        self.authorize(ctx, Permission::ExecutionRead).await?;
        self.queries.best_match(ctx, runtime).await
    }

    /// Runs the executions matching a runtime call, response, event, or function.
    ///
    /// `request` is the in-flight request body; `response` is set for response
    /// conditions. Returns the payload after all call targets applied their answers.
    /// Instances without the feature get their payload back untouched.
    pub async fn handle(
        &self,
        ctx: &CallContext,
        runtime: &Condition,
        request: JsonValue,
        response: Option<JsonValue>,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, HandleError> {
        let mut payload = ContextInfo::new(runtime, ctx, request);
        if let Some(response) = response {
            payload = payload.with_response(response);
        }

        if !self.features.executions_enabled(&ctx.instance_id).await? {
            return Ok(DispatchOutcome {
                payload,
                failures: Vec::new(),
                spawned: 0,
            });
        }

        let ResolvedTargets { matched, targets } = self.queries.execution_targets(ctx, runtime).await?;
        debug!(
            condition = %runtime,
            matched = ?matched.as_ref().map(Condition::id),
            targets = targets.len(),
            "resolved executions"
        );
        Ok(self.dispatcher.dispatch(&targets, payload, cancel).await?)
    }

    /// Waits for in-flight async targets; call before shutting down.
    pub async fn drain(&self) {
        self.dispatcher.drain().await;
    }
}
