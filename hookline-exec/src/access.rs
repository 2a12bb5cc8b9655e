//! Caller identity, permission checks, and the per-instance feature switch.
//!
//! Both checks are supplied by the host; the engine only asks.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use async_trait::async_trait;
use hookline_core::ActionError;

/// Who is calling and on behalf of which instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    pub instance_id: String,
    pub org_id: String,
    pub user_id: String,
}

impl CallContext {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            ..Default::default()
        }
    }

    pub fn with_org(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = org_id.into();
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permission {
    TargetRead,
    TargetWrite,
    TargetDelete,
    ExecutionRead,
    ExecutionWrite,
    ExecutionDelete,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::TargetRead => "action.target.read",
            Permission::TargetWrite => "action.target.write",
            Permission::TargetDelete => "action.target.delete",
            Permission::ExecutionRead => "action.execution.read",
            Permission::ExecutionWrite => "action.execution.write",
            Permission::ExecutionDelete => "action.execution.delete",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait AccessGuard: Send + Sync {
    /// Fails `PermissionDenied` when the caller lacks `permission`.
    async fn check(&self, ctx: &CallContext, permission: Permission) -> Result<(), ActionError>;
}

#[async_trait]
pub trait FeatureFlags: Send + Sync {
    async fn executions_enabled(&self, instance_id: &str) -> Result<bool, ActionError>;
}

/// Grants everything; for hosts that authorize before calling in.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl AccessGuard for AllowAll {
    async fn check(&self, _ctx: &CallContext, _permission: Permission) -> Result<(), ActionError> {
        Ok(())
    }
}

/// Grants a fixed set of permissions to every caller.
#[derive(Debug, Clone, Default)]
pub struct StaticGuard {
    granted: BTreeSet<Permission>,
}

impl StaticGuard {
    pub fn new(granted: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            granted: granted.into_iter().collect(),
        }
    }
}

#[async_trait]
impl AccessGuard for StaticGuard {
    async fn check(&self, ctx: &CallContext, permission: Permission) -> Result<(), ActionError> {
        if self.granted.contains(&permission) {
            Ok(())
        } else {
            Err(ActionError::PermissionDenied(format!(
                "{permission} required on instance {}",
                ctx.instance_id
            )))
        }
    }
}

/// Feature switch backed by a fixed answer or a fixed set of instances.
#[derive(Debug, Clone)]
pub enum StaticFeatures {
    All(bool),
    Instances(HashSet<String>),
}

impl StaticFeatures {
    pub fn enabled() -> Self {
        StaticFeatures::All(true)
    }

    pub fn disabled() -> Self {
        StaticFeatures::All(false)
    }

    pub fn for_instances<I, S>(instances: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StaticFeatures::Instances(instances.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl FeatureFlags for StaticFeatures {
    async fn executions_enabled(&self, instance_id: &str) -> Result<bool, ActionError> {
        Ok(match self {
            StaticFeatures::All(enabled) => *enabled,
            StaticFeatures::Instances(set) => set.contains(instance_id),
        })
    }
}
