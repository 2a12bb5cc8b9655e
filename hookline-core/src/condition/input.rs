use serde::{Deserialize, Serialize};

use crate::condition::{check_method, check_segment, CallScope, Condition, EventScope};
use crate::error::ActionError;

/// Wire shape of a condition: exactly one of the four kinds, each with exactly one level set.
///
/// ```json
/// {"request": {"method": "/pkg.Svc/Method"}}
/// {"event": {"group": "user"}}
/// {"function": {"name": "preuserinfo"}}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<CallConditionInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<CallConditionInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<EventConditionInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionConditionInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallConditionInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub all: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventConditionInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub all: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionConditionInput {
    pub name: String,
}

impl TryFrom<ConditionInput> for Condition {
    type Error = ActionError;

    fn try_from(input: ConditionInput) -> Result<Self, Self::Error> {
        let set = [
            input.request.is_some(),
            input.response.is_some(),
            input.event.is_some(),
            input.function.is_some(),
        ]
        .into_iter()
        .filter(|s| *s)
        .count();
        if set != 1 {
            return Err(ActionError::invalid(
                "condition must set exactly one of request, response, event, function",
            ));
        }

        if let Some(call) = input.request {
            return Ok(Condition::Request(call_scope("request", call)?));
        }
        if let Some(call) = input.response {
            return Ok(Condition::Response(call_scope("response", call)?));
        }
        if let Some(event) = input.event {
            return match one_of("event", &event.event, &event.group, event.all)? {
                Level::Exact(name) => Condition::event(name),
                Level::Scoped(group) => Condition::event_group(group),
                Level::All => Ok(Condition::event_all()),
            };
        }
        match input.function {
            Some(f) => Condition::function(f.name),
            None => Err(ActionError::Unimplemented("condition kind".to_string())),
        }
    }
}

impl From<Condition> for ConditionInput {
    fn from(condition: Condition) -> Self {
        match condition {
            Condition::Request(scope) => ConditionInput {
                request: Some(call_input(scope)),
                ..Default::default()
            },
            Condition::Response(scope) => ConditionInput {
                response: Some(call_input(scope)),
                ..Default::default()
            },
            Condition::Event(scope) => {
                let mut event = EventConditionInput::default();
                match scope {
                    EventScope::All => event.all = true,
                    EventScope::Group(g) => event.group = Some(g),
                    EventScope::Event(e) => event.event = Some(e),
                }
                ConditionInput {
                    event: Some(event),
                    ..Default::default()
                }
            }
            Condition::Function(name) => ConditionInput {
                function: Some(FunctionConditionInput { name }),
                ..Default::default()
            },
        }
    }
}

enum Level {
    Exact(String),
    Scoped(String),
    All,
}

/// Empty strings count as unset.
fn one_of(
    kind: &str,
    exact: &Option<String>,
    scoped: &Option<String>,
    all: bool,
) -> Result<Level, ActionError> {
    let exact = exact.as_deref().filter(|s| !s.is_empty());
    let scoped = scoped.as_deref().filter(|s| !s.is_empty());
    match (exact, scoped, all) {
        (Some(e), None, false) => Ok(Level::Exact(e.to_string())),
        (None, Some(s), false) => Ok(Level::Scoped(s.to_string())),
        (None, None, true) => Ok(Level::All),
        (None, None, false) => Err(ActionError::invalid(format!(
            "{kind} condition must set one of its levels"
        ))),
        _ => Err(ActionError::invalid(format!(
            "{kind} condition must set only one of its levels"
        ))),
    }
}

fn call_scope(kind: &str, call: CallConditionInput) -> Result<CallScope, ActionError> {
    Ok(match one_of(kind, &call.method, &call.service, call.all)? {
        Level::Exact(method) => CallScope::Method(check_method(method)?),
        Level::Scoped(service) => CallScope::Service(check_segment("service", service)?),
        Level::All => CallScope::All,
    })
}

fn call_input(scope: CallScope) -> CallConditionInput {
    let mut call = CallConditionInput::default();
    match scope {
        CallScope::All => call.all = true,
        CallScope::Service(s) => call.service = Some(s),
        CallScope::Method(m) => call.method = Some(m),
    }
    call
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_api_shape() {
        let c: Condition = serde_json::from_str(r#"{"request":{"method":"/pkg.Svc/Method"}}"#).unwrap();
        assert_eq!(c, Condition::request_method("/pkg.Svc/Method").unwrap());

        let c: Condition = serde_json::from_str(r#"{"event":{"group":"user"}}"#).unwrap();
        assert_eq!(c.id(), "event/user.*");

        let c: Condition = serde_json::from_str(r#"{"response":{"all":true}}"#).unwrap();
        assert_eq!(c, Condition::response_all());
    }

    #[test]
    fn serializes_back_to_api_shape() {
        let c = Condition::function("preaccesstoken").unwrap();
        assert_eq!(
            serde_json::to_value(&c).unwrap(),
            serde_json::json!({"function": {"name": "preaccesstoken"}})
        );
    }

    #[test]
    fn rejects_empty_and_ambiguous_conditions() {
        assert!(serde_json::from_str::<Condition>(r#"{}"#).is_err());
        assert!(serde_json::from_str::<Condition>(r#"{"request":{}}"#).is_err());
        assert!(serde_json::from_str::<Condition>(r#"{"request":{"method":"","service":""}}"#).is_err());
        assert!(serde_json::from_str::<Condition>(
            r#"{"request":{"method":"/a.B/C","service":"a.B"}}"#
        )
        .is_err());
        assert!(serde_json::from_str::<Condition>(
            r#"{"request":{"all":true},"event":{"all":true}}"#
        )
        .is_err());
    }
}
