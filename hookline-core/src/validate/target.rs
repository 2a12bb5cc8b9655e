use std::time::Duration;

use url::Url;

use crate::error::{ValidationError, Violation};
use crate::types::{DispatchType, SigningKey, Target};
use crate::validate::Validator;

const MIN_TIMEOUT: Duration = Duration::from_millis(1);

/// Input of the create-target operation.
#[derive(Debug, Clone)]
pub struct NewTarget {
    pub name: String,
    pub endpoint: String,
    pub timeout: Duration,
    pub dispatch_type: DispatchType,
    pub interrupt_on_error: bool,
}

/// Partial update of a target; `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct TargetPatch {
    pub name: Option<String>,
    pub endpoint: Option<String>,
    pub timeout: Option<Duration>,
    pub dispatch_type: Option<DispatchType>,
    pub interrupt_on_error: Option<bool>,
    /// Replaces the signing key.
    pub signing_key: Option<SigningKey>,
}

impl TargetPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.endpoint.is_none()
            && self.timeout.is_none()
            && self.dispatch_type.is_none()
            && self.interrupt_on_error.is_none()
            && self.signing_key.is_none()
    }
}

pub fn create_target(
    id: impl Into<String>,
    instance_id: impl Into<String>,
    input: NewTarget,
    signing_key: SigningKey,
) -> Result<Target, ValidationError> {
    let mut v = Validator::new();
    let id = id.into();
    let instance_id = instance_id.into();
    v.require_non_empty("id", &id);
    v.require_non_empty("instance_id", &instance_id);
    v.require_non_empty("name", &input.name);
    let endpoint = validate_endpoint(&mut v, &input.endpoint);
    validate_timeout(&mut v, input.timeout);
    v.finish()?;

    let Some(endpoint) = endpoint else {
        return Err(ValidationError::new(vec![Violation::new("endpoint", "invalid")]));
    };
    Ok(Target {
        id,
        instance_id,
        name: input.name.trim().to_string(),
        endpoint,
        timeout: input.timeout,
        dispatch_type: input.dispatch_type,
        interrupt_on_error: input.dispatch_type.can_interrupt() && input.interrupt_on_error,
        signing_key,
    })
}

/// Merges `patch` into a copy of `existing`. Either every supplied field applies or none does.
pub fn change_target(existing: &Target, patch: TargetPatch) -> Result<Target, ValidationError> {
    let mut v = Validator::new();
    let mut next = existing.clone();

    if let Some(name) = patch.name {
        v.require_non_empty("name", &name);
        next.name = name.trim().to_string();
    }
    if let Some(endpoint) = patch.endpoint {
        if let Some(url) = validate_endpoint(&mut v, &endpoint) {
            next.endpoint = url;
        }
    }
    if let Some(timeout) = patch.timeout {
        validate_timeout(&mut v, timeout);
        next.timeout = timeout;
    }
    if let Some(dispatch_type) = patch.dispatch_type {
        next.dispatch_type = dispatch_type;
    }
    if let Some(interrupt) = patch.interrupt_on_error {
        next.interrupt_on_error = interrupt;
    }
    if let Some(key) = patch.signing_key {
        if key.is_empty() {
            v.push("signing_key", "must not be empty");
        }
        next.signing_key = key;
    }
    v.finish()?;

    next.interrupt_on_error = next.dispatch_type.can_interrupt() && next.interrupt_on_error;
    Ok(next)
}

fn validate_endpoint(v: &mut Validator, endpoint: &str) -> Option<Url> {
    if endpoint.trim().is_empty() {
        v.push("endpoint", "must not be empty");
        return None;
    }
    match Url::parse(endpoint.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Some(url),
        Ok(_) => {
            v.push("endpoint", "must be an absolute http(s) URL");
            None
        }
        Err(e) => {
            v.push("endpoint", format!("invalid URL: {e}"));
            None
        }
    }
}

/// Timeouts are stored in whole milliseconds.
fn validate_timeout(v: &mut Validator, timeout: Duration) {
    if timeout < MIN_TIMEOUT {
        v.push("timeout", "must be at least one millisecond");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> NewTarget {
        NewTarget {
            name: "audit".to_string(),
            endpoint: "https://example.com/hook".to_string(),
            timeout: Duration::from_secs(10),
            dispatch_type: DispatchType::Webhook,
            interrupt_on_error: true,
        }
    }

    fn key() -> SigningKey {
        SigningKey::from_bytes(vec![7; 32])
    }

    #[test]
    fn creates_valid_target() {
        let t = create_target("t1", "inst", input(), key()).unwrap();
        assert_eq!(t.endpoint.as_str(), "https://example.com/hook");
        assert!(t.interrupts());
    }

    #[test]
    fn collects_all_violations() {
        let err = create_target(
            "t1",
            "inst",
            NewTarget {
                name: " ".to_string(),
                endpoint: String::new(),
                timeout: Duration::ZERO,
                ..input()
            },
            key(),
        )
        .unwrap_err();
        let paths: Vec<&str> = err.violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "endpoint", "timeout"]);
    }

    #[test]
    fn rejects_sub_millisecond_timeouts() {
        let res = create_target(
            "t1",
            "inst",
            NewTarget {
                timeout: Duration::from_micros(500),
                ..input()
            },
            key(),
        );
        assert!(res.is_err());

        let t = create_target(
            "t1",
            "inst",
            NewTarget {
                timeout: Duration::from_millis(1),
                ..input()
            },
            key(),
        )
        .unwrap();
        let patched = change_target(
            &t,
            TargetPatch {
                timeout: Some(Duration::from_nanos(999_999)),
                ..Default::default()
            },
        );
        assert!(patched.is_err());
    }

    #[test]
    fn rejects_relative_and_non_http_endpoints() {
        for endpoint in ["/hook", "ftp://example.com/hook", "not a url"] {
            let res = create_target(
                "t1",
                "inst",
                NewTarget {
                    endpoint: endpoint.to_string(),
                    ..input()
                },
                key(),
            );
            assert!(res.is_err(), "{endpoint} should be rejected");
        }
    }

    #[test]
    fn async_never_interrupts() {
        let t = create_target(
            "t1",
            "inst",
            NewTarget {
                dispatch_type: DispatchType::Async,
                ..input()
            },
            key(),
        )
        .unwrap();
        assert!(!t.interrupt_on_error);
        assert!(!t.interrupts());
    }

    #[test]
    fn patch_keeps_absent_fields() {
        let t = create_target("t1", "inst", input(), key()).unwrap();
        let next = change_target(
            &t,
            TargetPatch {
                timeout: Some(Duration::from_secs(3)),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(next.timeout, Duration::from_secs(3));
        assert_eq!(next.name, t.name);
        assert_eq!(next.endpoint, t.endpoint);
        assert_eq!(next.signing_key, t.signing_key);
    }

    #[test]
    fn failed_patch_applies_nothing() {
        let t = create_target("t1", "inst", input(), key()).unwrap();
        let res = change_target(
            &t,
            TargetPatch {
                name: Some("renamed".to_string()),
                timeout: Some(Duration::ZERO),
                ..Default::default()
            },
        );
        assert!(res.is_err());
        assert_eq!(t.name, "audit");
    }

    #[test]
    fn switching_to_async_clears_interrupt() {
        let t = create_target("t1", "inst", input(), key()).unwrap();
        let next = change_target(
            &t,
            TargetPatch {
                dispatch_type: Some(DispatchType::Async),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!next.interrupt_on_error);
    }
}
