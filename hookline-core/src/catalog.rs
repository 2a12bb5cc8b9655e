//! The host's registry of callable methods, emitted events, and extension points.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::condition::{service_of_method, CallScope, Condition, EventScope};
use crate::error::ActionError;

/// Extension points every host exposes.
pub const DEFAULT_FUNCTIONS: [&str; 3] = ["preuserinfo", "preaccesstoken", "presamlresponse"];

pub trait Catalog: Send + Sync {
    fn functions(&self) -> Vec<String>;

    /// Full call paths, e.g. `/pkg.Service/Method`.
    fn methods(&self) -> Vec<String>;

    fn services(&self) -> Vec<String>;

    /// Event type names, e.g. `user.human.added`.
    fn events(&self) -> Vec<String>;

    fn method_exists(&self, method: &str) -> bool {
        self.methods().iter().any(|m| m == method)
    }

    fn service_exists(&self, service: &str) -> bool {
        self.services().iter().any(|s| s == service)
    }

    fn event_exists(&self, event: &str) -> bool {
        self.events().iter().any(|e| e == event)
    }

    /// A group exists when at least one event lies below it.
    fn group_exists(&self, group: &str) -> bool {
        self.events().iter().any(|e| {
            e.strip_prefix(group)
                .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    fn function_exists(&self, function: &str) -> bool {
        self.functions().iter().any(|f| f == function)
    }

    /// Fails `NotFound` when the condition names anything the host does not know.
    fn check(&self, condition: &Condition) -> Result<(), ActionError> {
        let (known, what, name) = match condition {
            Condition::Request(scope) | Condition::Response(scope) => match scope {
                CallScope::All => return Ok(()),
                CallScope::Service(s) => (self.service_exists(s), "service", s),
                CallScope::Method(m) => (self.method_exists(m), "method", m),
            },
            Condition::Event(scope) => match scope {
                EventScope::All => return Ok(()),
                EventScope::Group(g) => (self.group_exists(g), "event group", g),
                EventScope::Event(e) => (self.event_exists(e), "event", e),
            },
            Condition::Function(f) => (self.function_exists(f), "function", f),
        };
        if known {
            Ok(())
        } else {
            Err(ActionError::not_found(format!("{what} {name:?} does not exist")))
        }
    }
}

/// A fixed catalog, typically loaded from a JSON or YAML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticCatalog {
    #[serde(default = "default_functions")]
    pub functions: BTreeSet<String>,
    #[serde(default)]
    pub methods: BTreeSet<String>,
    #[serde(default)]
    pub events: BTreeSet<String>,
}

fn default_functions() -> BTreeSet<String> {
    DEFAULT_FUNCTIONS.iter().map(|f| f.to_string()).collect()
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self {
            functions: default_functions(),
            methods: BTreeSet::new(),
            events: BTreeSet::new(),
        }
    }
}

impl StaticCatalog {
    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods.extend(methods.into_iter().map(Into::into));
        self
    }

    pub fn with_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events.extend(events.into_iter().map(Into::into));
        self
    }

    pub fn with_functions<I, S>(mut self, functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.functions.extend(functions.into_iter().map(Into::into));
        self
    }
}

impl Catalog for StaticCatalog {
    fn functions(&self) -> Vec<String> {
        self.functions.iter().cloned().collect()
    }

    fn methods(&self) -> Vec<String> {
        self.methods.iter().cloned().collect()
    }

    fn services(&self) -> Vec<String> {
        self.methods
            .iter()
            .filter_map(|m| service_of_method(m))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn events(&self) -> Vec<String> {
        self.events.iter().cloned().collect()
    }

    fn method_exists(&self, method: &str) -> bool {
        self.methods.contains(method)
    }

    fn event_exists(&self, event: &str) -> bool {
        self.events.contains(event)
    }

    fn function_exists(&self, function: &str) -> bool {
        self.functions.contains(function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> StaticCatalog {
        StaticCatalog::default()
            .with_methods(["/pkg.Svc/Method", "/pkg.Svc/Other", "/admin.Svc/Get"])
            .with_events(["user.human.added", "user.machine.added", "org.added"])
    }

    #[test]
    fn services_are_derived_from_methods() {
        assert_eq!(catalog().services(), vec!["admin.Svc", "pkg.Svc"]);
    }

    #[test]
    fn checks_each_condition_level() {
        let c = catalog();
        assert!(c.check(&Condition::request_all()).is_ok());
        assert!(c.check(&Condition::request_method("/pkg.Svc/Method").unwrap()).is_ok());
        assert!(c.check(&Condition::response_service("admin.Svc").unwrap()).is_ok());
        assert!(c.check(&Condition::event_group("user.human").unwrap()).is_ok());
        assert!(c.check(&Condition::event("org.added").unwrap()).is_ok());
        assert!(c.check(&Condition::function("preuserinfo").unwrap()).is_ok());

        for missing in [
            Condition::request_method("/pkg.Svc/Missing").unwrap(),
            Condition::request_service("missing.Svc").unwrap(),
            Condition::event("user.deleted").unwrap(),
            Condition::event_group("use").unwrap(),
            Condition::function("postlogin").unwrap(),
        ] {
            assert!(
                matches!(c.check(&missing), Err(ActionError::NotFound(_))),
                "{missing} should be unknown"
            );
        }
    }

    #[test]
    fn loads_from_yaml_with_default_functions() {
        let c: StaticCatalog = serde_yaml::from_str("methods:\n  - /pkg.Svc/Method\n").unwrap();
        assert!(c.function_exists("preaccesstoken"));
        assert!(c.method_exists("/pkg.Svc/Method"));
    }
}
