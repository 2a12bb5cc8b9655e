use chrono::{DateTime, Utc};
use hookline_core::types::ObjectDetails;
use hookline_core::{ActionError, Condition, Execution, ExecutionGraph, ExecutionLookup, ExecutionTarget};
use hookline_store::{Snapshot, StoreError};
use tracing::{debug, info};

use crate::access::CallContext;
use crate::command::Commands;
use crate::error::store_error;

enum Plan {
    /// Nothing to write; answer with these details.
    Unchanged(ObjectDetails),
    Put(Execution),
    Delete,
}

impl Commands {
    /// Creates or replaces the execution of `condition`.
    ///
    /// An empty `targets` list removes the execution. Writing the stored list again
    /// returns the stored details without writing.
    pub async fn set_execution(
        &self,
        ctx: &CallContext,
        condition: Condition,
        targets: Vec<ExecutionTarget>,
    ) -> Result<ObjectDetails, ActionError> {
        self.catalog.check(&condition)?;
        let id = condition.id();

        let mut last = None;
        for attempt in 0..self.attempts() {
            let snapshot = self
                .store
                .snapshot(&ctx.instance_id)
                .await
                .map_err(store_error)?;

            let written = match self.plan(ctx, &snapshot, &condition, &targets).await? {
                Plan::Unchanged(details) => return Ok(details),
                Plan::Put(execution) => {
                    self.store
                        .put_execution(&ctx.instance_id, &execution, snapshot.sequence)
                        .await
                }
                Plan::Delete => {
                    self.store
                        .delete_execution(&ctx.instance_id, &id, snapshot.sequence)
                        .await
                }
            };

            match written {
                Ok(details) => {
                    info!(
                        instance_id = %ctx.instance_id,
                        condition = %id,
                        targets = targets.len(),
                        sequence = details.sequence,
                        "execution set"
                    );
                    return Ok(details);
                }
                Err(StoreError::Conflict(reason)) => {
                    debug!(condition = %id, attempt, %reason, "instance changed concurrently, retrying");
                    last = Some(reason);
                }
                Err(e) => return Err(store_error(e)),
            }
        }
        Err(ActionError::Internal(format!(
            "instance {} kept changing concurrently: {}",
            ctx.instance_id,
            last.unwrap_or_default()
        )))
    }

    /// Removes the execution of `condition`; removing a missing execution succeeds.
    pub async fn delete_execution(
        &self,
        ctx: &CallContext,
        condition: &Condition,
    ) -> Result<ObjectDetails, ActionError> {
        self.set_execution(ctx, condition.clone(), Vec::new()).await
    }

    /// Validates the write against `snapshot` and decides what to persist.
    async fn plan(
        &self,
        ctx: &CallContext,
        snapshot: &Snapshot,
        condition: &Condition,
        targets: &[ExecutionTarget],
    ) -> Result<Plan, ActionError> {
        let id = condition.id();
        let graph = ExecutionGraph::from_executions(snapshot.executions.iter().cloned());

        if targets.is_empty() {
            if !graph.contains(&id) {
                return Ok(Plan::Unchanged(unchanged_details(ctx, &id, snapshot.sequence)));
            }
            return Ok(Plan::Delete);
        }

        for target in targets {
            match target {
                ExecutionTarget::Target(target_id) => {
                    if !snapshot.target_ids.contains(target_id) {
                        return Err(ActionError::invalid(format!("target {target_id} does not exist")));
                    }
                }
                ExecutionTarget::Include(included) => {
                    if !graph.contains(&included.id()) {
                        return Err(ActionError::not_found(format!(
                            "included execution {} does not exist",
                            included.id()
                        )));
                    }
                }
            }
        }

        if graph.targets(&id) == Some(targets) {
            let stored = self
                .store
                .get_execution(&ctx.instance_id, &id)
                .await
                .map_err(store_error)?;
            if let Some(record) = stored {
                return Ok(Plan::Unchanged(record.details));
            }
        }

        let execution = Execution::new(condition.clone(), targets.to_vec());
        graph
            .with_execution(execution.clone())
            .check_write(condition, self.config.max_include_depth)?;
        Ok(Plan::Put(execution))
    }
}

/// Details for removing an execution that does not exist. Nothing was written, so
/// the answer carries the sequence the instance was read at and no timestamps.
fn unchanged_details(ctx: &CallContext, id: &str, sequence: i64) -> ObjectDetails {
    ObjectDetails {
        id: id.to_string(),
        resource_owner: ctx.instance_id.clone(),
        sequence,
        creation_date: DateTime::<Utc>::UNIX_EPOCH,
        change_date: DateTime::<Utc>::UNIX_EPOCH,
    }
}
