use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};
use url::Url;

use crate::error::ActionError;
use crate::types::SigningKey;

/// How a target is invoked and what its response means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchType {
    /// Awaited; the response is informational only.
    Webhook,
    /// Awaited; the response replaces the in-flight payload.
    Call,
    /// Fire-and-forget.
    Async,
}

impl DispatchType {
    pub const ALL: [DispatchType; 3] = [DispatchType::Webhook, DispatchType::Call, DispatchType::Async];

    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchType::Webhook => "webhook",
            DispatchType::Call => "call",
            DispatchType::Async => "async",
        }
    }

    /// Whether `interrupt_on_error` has any effect for this type.
    pub fn can_interrupt(&self) -> bool {
        !matches!(self, DispatchType::Async)
    }
}

impl fmt::Display for DispatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchType {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DispatchType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ActionError::invalid(format!("unknown dispatch type: {s}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub id: String,
    pub instance_id: String,
    pub name: String,
    pub endpoint: Url,
    #[serde(rename = "timeout_ms", serialize_with = "serialize_millis")]
    pub timeout: Duration,
    pub dispatch_type: DispatchType,
    /// Always false for [`DispatchType::Async`].
    pub interrupt_on_error: bool,
    #[serde(skip)]
    pub signing_key: SigningKey,
}

impl Target {
    /// Whether a failed invocation of this target stops the remaining dispatch.
    pub fn interrupts(&self) -> bool {
        self.dispatch_type.can_interrupt() && self.interrupt_on_error
    }
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
