use hookline_core::types::ObjectDetails;
use hookline_core::{create_target, change_target, ActionError, NewTarget, SigningKey, TargetPatch};
use hookline_store::{StoreError, TargetDeletion};
use rand::RngCore;
use tracing::{debug, info};
use uuid::Uuid;

use crate::access::CallContext;
use crate::command::Commands;
use crate::error::store_error;

const SIGNING_KEY_LEN: usize = 32;

/// Fresh random key material for a target.
pub fn generate_signing_key() -> SigningKey {
    let mut bytes = vec![0u8; SIGNING_KEY_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    SigningKey::from_bytes(bytes)
}

fn duplicate_name(e: StoreError) -> ActionError {
    match e {
        StoreError::AlreadyExists(what) => {
            ActionError::precondition(format!("target with the same name already exists ({what})"))
        }
        other => store_error(other),
    }
}

impl Commands {
    pub async fn create_target(
        &self,
        ctx: &CallContext,
        input: NewTarget,
    ) -> Result<ObjectDetails, ActionError> {
        let id = Uuid::new_v4().to_string();
        let target = create_target(id, ctx.instance_id.as_str(), input, generate_signing_key())?;
        let details = self.store.create_target(&target).await.map_err(duplicate_name)?;
        info!(
            instance_id = %ctx.instance_id,
            target_id = %target.id,
            name = %target.name,
            dispatch_type = %target.dispatch_type,
            "target created"
        );
        Ok(details)
    }

    /// Applies `patch`; an empty or no-op patch returns the stored details without writing.
    pub async fn patch_target(
        &self,
        ctx: &CallContext,
        id: &str,
        patch: TargetPatch,
    ) -> Result<ObjectDetails, ActionError> {
        let mut last = None;
        for attempt in 0..self.attempts() {
            let record = self
                .store
                .get_target(&ctx.instance_id, id)
                .await
                .map_err(store_error)?
                .ok_or_else(|| ActionError::not_found(format!("target {id}")))?;

            let next = change_target(&record.target, patch.clone())?;
            if next == record.target {
                return Ok(record.details);
            }

            match self.store.update_target(&next, record.details.sequence).await {
                Ok(details) => {
                    info!(instance_id = %ctx.instance_id, target_id = %id, "target changed");
                    return Ok(details);
                }
                Err(StoreError::Conflict(reason)) => {
                    debug!(target_id = %id, attempt, %reason, "target changed concurrently, retrying");
                    last = Some(reason);
                }
                Err(e) => return Err(duplicate_name(e)),
            }
        }
        Err(ActionError::Internal(format!(
            "target {id} kept changing concurrently: {}",
            last.unwrap_or_default()
        )))
    }

    /// Removes the target and every direct reference to it.
    pub async fn delete_target(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> Result<TargetDeletion, ActionError> {
        let mut last = None;
        for attempt in 0..self.attempts() {
            let snapshot = self
                .store
                .snapshot(&ctx.instance_id)
                .await
                .map_err(store_error)?;
            if !snapshot.target_ids.contains(id) {
                return Err(ActionError::not_found(format!("target {id}")));
            }

            match self
                .store
                .delete_target(&ctx.instance_id, id, snapshot.sequence)
                .await
            {
                Ok(deletion) => {
                    info!(
                        instance_id = %ctx.instance_id,
                        target_id = %id,
                        affected_executions = ?deletion.affected_executions,
                        "target deleted"
                    );
                    return Ok(deletion);
                }
                Err(StoreError::Conflict(reason)) => {
                    debug!(target_id = %id, attempt, %reason, "instance changed concurrently, retrying");
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
}
