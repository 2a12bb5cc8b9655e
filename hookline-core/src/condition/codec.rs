use thiserror::Error;

use crate::condition::{
    check_method, check_segment, CallScope, Condition, EventScope, ExecutionType,
};

pub const REQUEST_PREFIX: &str = "request";
pub const RESPONSE_PREFIX: &str = "response";
pub const EVENT_PREFIX: &str = "event";
pub const FUNCTION_PREFIX: &str = "function";
pub const SEPARATOR: char = '/';
/// Appended to event groups so they never collide with event names.
pub const GROUP_MARKER: &str = ".*";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("condition id is empty")]
    Empty,

    #[error("unknown condition type in {0:?}")]
    UnknownPrefix(String),

    #[error("condition id {id:?} has {separators} path separators, not valid for {execution_type} conditions")]
    SeparatorCount {
        id: String,
        execution_type: ExecutionType,
        separators: usize,
    },

    #[error("condition id {id:?}: {reason}")]
    InvalidName { id: String, reason: String },
}

pub fn encode(condition: &Condition) -> String {
    match condition {
        Condition::Request(scope) => encode_call(REQUEST_PREFIX, scope),
        Condition::Response(scope) => encode_call(RESPONSE_PREFIX, scope),
        Condition::Event(EventScope::All) => EVENT_PREFIX.to_string(),
        Condition::Event(EventScope::Group(group)) => {
            format!("{EVENT_PREFIX}{SEPARATOR}{group}{GROUP_MARKER}")
        }
        Condition::Event(EventScope::Event(event)) => format!("{EVENT_PREFIX}{SEPARATOR}{event}"),
        Condition::Function(name) => format!("{FUNCTION_PREFIX}{SEPARATOR}{name}"),
    }
}

fn encode_call(prefix: &str, scope: &CallScope) -> String {
    match scope {
        CallScope::All => prefix.to_string(),
        CallScope::Service(service) => format!("{prefix}{SEPARATOR}{service}"),
        // The method already carries its leading separator.
        CallScope::Method(method) => format!("{prefix}{method}"),
    }
}

pub fn decode(id: &str) -> Result<Condition, DecodeError> {
    if id.is_empty() {
        return Err(DecodeError::Empty);
    }
    let (execution_type, rest) = split_prefix(id)?;
    let separators = rest.matches(SEPARATOR).count();
    let invalid = |e: crate::error::ActionError| DecodeError::InvalidName {
        id: id.to_string(),
        reason: e.to_string(),
    };
    let wrong_count = || DecodeError::SeparatorCount {
        id: id.to_string(),
        execution_type,
        separators,
    };

    match execution_type {
        ExecutionType::Request | ExecutionType::Response => {
            let scope = match separators {
                0 => CallScope::All,
                1 => CallScope::Service(check_segment("service", rest[1..].to_string()).map_err(invalid)?),
                2 => CallScope::Method(check_method(rest.to_string()).map_err(invalid)?),
                _ => return Err(wrong_count()),
            };
            Ok(if execution_type == ExecutionType::Request {
                Condition::Request(scope)
            } else {
                Condition::Response(scope)
            })
        }
        ExecutionType::Event => match separators {
            0 => Ok(Condition::Event(EventScope::All)),
            1 => {
                let name = &rest[1..];
                match name.strip_suffix(GROUP_MARKER) {
                    Some(group) if group.ends_with(GROUP_MARKER) => Err(DecodeError::InvalidName {
                        id: id.to_string(),
                        reason: format!("event group {group:?} carries the group marker twice"),
                    }),
                    Some(group) => {
                        let group = check_segment("event group", group.to_string()).map_err(invalid)?;
                        Ok(Condition::Event(EventScope::Group(group)))
                    }
                    None => Condition::event(name).map_err(invalid),
                }
            }
            _ => Err(wrong_count()),
        },
        ExecutionType::Function => match separators {
            1 => Condition::function(&rest[1..]).map_err(invalid),
            _ => Err(wrong_count()),
        },
    }
}

/// Splits the type prefix off `id`; the remainder is empty or starts with a separator.
fn split_prefix(id: &str) -> Result<(ExecutionType, &str), DecodeError> {
    for execution_type in ExecutionType::ALL {
        if let Some(rest) = id.strip_prefix(execution_type.as_str()) {
            if rest.is_empty() || rest.starts_with(SEPARATOR) {
                return Ok((execution_type, rest));
            }
        }
    }
    Err(DecodeError::UnknownPrefix(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_every_level() {
        assert_eq!(encode(&Condition::request_all()), "request");
        assert_eq!(encode(&Condition::request_service("pkg.Svc").unwrap()), "request/pkg.Svc");
        assert_eq!(
            encode(&Condition::response_method("/pkg.Svc/Method").unwrap()),
            "response/pkg.Svc/Method"
        );
        assert_eq!(encode(&Condition::event_all()), "event");
        assert_eq!(encode(&Condition::event_group("user").unwrap()), "event/user.*");
        assert_eq!(encode(&Condition::event("user.added").unwrap()), "event/user.added");
        assert_eq!(encode(&Condition::function("preuserinfo").unwrap()), "function/preuserinfo");
    }

    #[test]
    fn rejects_unknown_prefix() {
        assert_eq!(
            decode("requests/pkg.Svc"),
            Err(DecodeError::UnknownPrefix("requests/pkg.Svc".to_string()))
        );
        assert!(matches!(decode("webhook"), Err(DecodeError::UnknownPrefix(_))));
        assert_eq!(decode(""), Err(DecodeError::Empty));
    }

    #[test]
    fn rejects_inconsistent_separator_counts() {
        assert!(matches!(decode("request/a/b/c"), Err(DecodeError::SeparatorCount { separators: 3, .. })));
        assert!(matches!(decode("event/a/b"), Err(DecodeError::SeparatorCount { .. })));
        assert!(matches!(decode("function"), Err(DecodeError::SeparatorCount { separators: 0, .. })));
    }

    #[test]
    fn rejects_empty_segments() {
        assert!(matches!(decode("request/"), Err(DecodeError::InvalidName { .. })));
        assert!(matches!(decode("response//Method"), Err(DecodeError::InvalidName { .. })));
        assert!(matches!(decode("event/.*"), Err(DecodeError::InvalidName { .. })));
    }

    #[test]
    fn rejects_doubled_group_marker() {
        assert!(matches!(decode("event/user.*.*"), Err(DecodeError::InvalidName { .. })));
        assert_eq!(
            decode("event/user.*"),
            Ok(Condition::Event(EventScope::Group("user".to_string())))
        );
    }
}
