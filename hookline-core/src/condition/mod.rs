//! Conditions select which inbound calls, responses, domain events, or extension
//! points an execution applies to.
//!
//! A [`Condition`] is always valid once constructed: the constructors and the
//! codec reject names that would make the canonical ID ambiguous.

mod codec;
mod input;

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ActionError;

pub use codec::{
    decode, encode, DecodeError, EVENT_PREFIX, FUNCTION_PREFIX, GROUP_MARKER, REQUEST_PREFIX,
    RESPONSE_PREFIX, SEPARATOR,
};
pub use input::{CallConditionInput, ConditionInput, EventConditionInput, FunctionConditionInput};

static METHOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/[^/\s]+/[^/\s]+$").expect("valid"));
static SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^/\s]+$").expect("valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionType {
    Request,
    Response,
    Event,
    Function,
}

impl ExecutionType {
    pub const ALL: [ExecutionType; 4] = [
        ExecutionType::Request,
        ExecutionType::Response,
        ExecutionType::Event,
        ExecutionType::Function,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionType::Request => REQUEST_PREFIX,
            ExecutionType::Response => RESPONSE_PREFIX,
            ExecutionType::Event => EVENT_PREFIX,
            ExecutionType::Function => FUNCTION_PREFIX,
        }
    }
}

impl fmt::Display for ExecutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionType {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExecutionType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ActionError::invalid(format!("unknown execution type: {s}")))
    }
}

/// Scope of a request or response condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallScope {
    All,
    /// Fully-qualified service name, e.g. `pkg.Service`.
    Service(String),
    /// Full call path, e.g. `/pkg.Service/Method`.
    Method(String),
}

/// Scope of an event condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventScope {
    All,
    /// Event type prefix, stored without the group marker.
    Group(String),
    Event(String),
}

/// How narrowly a condition matches. Ordered from least to most specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Specificity {
    All,
    Scoped,
    Exact,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ConditionInput", into = "ConditionInput")]
pub enum Condition {
    Request(CallScope),
    Response(CallScope),
    Event(EventScope),
    Function(String),
}

impl Condition {
    pub fn request_all() -> Self {
        Condition::Request(CallScope::All)
    }

    pub fn request_service(service: impl Into<String>) -> Result<Self, ActionError> {
        Ok(Condition::Request(CallScope::Service(check_segment("service", service.into())?)))
    }

    pub fn request_method(method: impl Into<String>) -> Result<Self, ActionError> {
        Ok(Condition::Request(CallScope::Method(check_method(method.into())?)))
    }

    pub fn response_all() -> Self {
        Condition::Response(CallScope::All)
    }

    pub fn response_service(service: impl Into<String>) -> Result<Self, ActionError> {
        Ok(Condition::Response(CallScope::Service(check_segment("service", service.into())?)))
    }

    pub fn response_method(method: impl Into<String>) -> Result<Self, ActionError> {
        Ok(Condition::Response(CallScope::Method(check_method(method.into())?)))
    }

    pub fn event_all() -> Self {
        Condition::Event(EventScope::All)
    }

    /// A trailing group marker on `group` is accepted and stripped.
    pub fn event_group(group: impl Into<String>) -> Result<Self, ActionError> {
        let group = group.into();
        let group = group
            .strip_suffix(GROUP_MARKER)
            .map(str::to_string)
            .unwrap_or(group);
        if group.ends_with(GROUP_MARKER) {
            return Err(ActionError::invalid(format!(
                "event group {group:?} carries the group marker twice"
            )));
        }
        Ok(Condition::Event(EventScope::Group(check_segment("event group", group)?)))
    }

    pub fn event(event: impl Into<String>) -> Result<Self, ActionError> {
        let event = check_segment("event", event.into())?;
        if event.ends_with(GROUP_MARKER) {
            return Err(ActionError::invalid(format!(
                "event {event:?} must not end with the group marker {GROUP_MARKER:?}"
            )));
        }
        Ok(Condition::Event(EventScope::Event(event)))
    }

    pub fn function(name: impl Into<String>) -> Result<Self, ActionError> {
        Ok(Condition::Function(check_segment("function", name.into())?))
    }

    pub fn execution_type(&self) -> ExecutionType {
        match self {
            Condition::Request(_) => ExecutionType::Request,
            Condition::Response(_) => ExecutionType::Response,
            Condition::Event(_) => ExecutionType::Event,
            Condition::Function(_) => ExecutionType::Function,
        }
    }

    pub fn specificity(&self) -> Specificity {
        match self {
            Condition::Request(scope) | Condition::Response(scope) => match scope {
                CallScope::All => Specificity::All,
                CallScope::Service(_) => Specificity::Scoped,
                CallScope::Method(_) => Specificity::Exact,
            },
            Condition::Event(scope) => match scope {
                EventScope::All => Specificity::All,
                EventScope::Group(_) => Specificity::Scoped,
                EventScope::Event(_) => Specificity::Exact,
            },
            Condition::Function(_) => Specificity::Exact,
        }
    }

    /// Canonical condition ID, the storage and lookup key.
    pub fn id(&self) -> String {
        encode(self)
    }

    /// Conditions that match a runtime instance of `self`, most specific first.
    ///
    /// `/pkg.Svc/Method` yields the method, then `pkg.Svc`, then the catch-all.
    /// Event `a.b.c` yields the event, then groups `a.b` and `a`, then the catch-all.
    /// Functions have no broader levels.
    pub fn candidates(&self) -> Vec<Condition> {
        match self {
            Condition::Request(scope) => call_candidates(scope)
                .into_iter()
                .map(Condition::Request)
                .collect(),
            Condition::Response(scope) => call_candidates(scope)
                .into_iter()
                .map(Condition::Response)
                .collect(),
            Condition::Event(scope) => event_candidates(scope)
                .into_iter()
                .map(Condition::Event)
                .collect(),
            Condition::Function(_) => vec![self.clone()],
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(self))
    }
}

impl FromStr for Condition {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

/// Service part of a full call path: `/pkg.Svc/Method` -> `pkg.Svc`.
pub fn service_of_method(method: &str) -> Option<&str> {
    method
        .strip_prefix(SEPARATOR)
        .and_then(|rest| rest.split_once(SEPARATOR))
        .map(|(service, _)| service)
        .filter(|s| !s.is_empty())
}

fn call_candidates(scope: &CallScope) -> Vec<CallScope> {
    let mut out = vec![scope.clone()];
    if let CallScope::Method(m) = scope {
        if let Some(service) = service_of_method(m) {
            out.push(CallScope::Service(service.to_string()));
        }
    }
    if *scope != CallScope::All {
        out.push(CallScope::All);
    }
    out
}

fn event_candidates(scope: &EventScope) -> Vec<EventScope> {
    let mut out = vec![scope.clone()];
    let name = match scope {
        EventScope::All => return out,
        EventScope::Group(name) | EventScope::Event(name) => name.as_str(),
    };
    let mut rest = name;
    while let Some((prefix, _)) = rest.rsplit_once('.') {
        if !prefix.is_empty() {
            out.push(EventScope::Group(prefix.to_string()));
        }
        rest = prefix;
    }
    out.push(EventScope::All);
    out
}

pub(crate) fn check_method(method: String) -> Result<String, ActionError> {
    if method.is_empty() {
        return Err(ActionError::invalid("method must not be empty"));
    }
    if !METHOD_RE.is_match(&method) {
        return Err(ActionError::invalid(format!(
            "method {method:?} must have the form /package.Service/Method"
        )));
    }
    Ok(method)
}

pub(crate) fn check_segment(what: &str, value: String) -> Result<String, ActionError> {
    if value.is_empty() {
        return Err(ActionError::invalid(format!("{what} must not be empty")));
    }
    if !SEGMENT_RE.is_match(&value) {
        return Err(ActionError::invalid(format!(
            "{what} {value:?} must not contain whitespace or {SEPARATOR:?}"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_candidates_fall_back_to_service_then_all() {
        let c = Condition::request_method("/pkg.Svc/Method").unwrap();
        let ids: Vec<String> = c.candidates().iter().map(Condition::id).collect();
        assert_eq!(ids, vec!["request/pkg.Svc/Method", "request/pkg.Svc", "request"]);
    }

    #[test]
    fn event_candidates_walk_group_prefixes() {
        let c = Condition::event("user.human.added").unwrap();
        let ids: Vec<String> = c.candidates().iter().map(Condition::id).collect();
        assert_eq!(
            ids,
            vec!["event/user.human.added", "event/user.human.*", "event/user.*", "event"]
        );
    }

    #[test]
    fn group_candidates_start_at_group() {
        let c = Condition::event_group("user.human").unwrap();
        let ids: Vec<String> = c.candidates().iter().map(Condition::id).collect();
        assert_eq!(ids, vec!["event/user.human.*", "event/user.*", "event"]);
    }

    #[test]
    fn all_has_no_fallback() {
        assert_eq!(Condition::response_all().candidates(), vec![Condition::response_all()]);
        let f = Condition::function("preuserinfo").unwrap();
        assert_eq!(f.candidates(), vec![f.clone()]);
    }

    #[test]
    fn specificity_orders_exact_above_scoped_above_all() {
        let m = Condition::request_method("/a.B/C").unwrap();
        let s = Condition::request_service("a.B").unwrap();
        assert!(m.specificity() > s.specificity());
        assert!(s.specificity() > Condition::request_all().specificity());
    }

    #[test]
    fn constructors_reject_bad_names() {
        assert!(Condition::request_method("pkg.Svc/Method").is_err());
        assert!(Condition::request_method("/pkg.Svc/Method/extra").is_err());
        assert!(Condition::request_service("a/b").is_err());
        assert!(Condition::event("user.*").is_err());
        assert!(Condition::function("").is_err());
    }

    #[test]
    fn group_marker_is_normalised() {
        assert_eq!(
            Condition::event_group("user.*").unwrap(),
            Condition::event_group("user").unwrap()
        );
    }
}
