use hookline_core::Condition;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::access::CallContext;

/// Body sent to every target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextInfo {
    /// Canonical ID of the runtime condition.
    pub condition: String,
    pub instance_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub org_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    pub request: JsonValue,
    /// Set for response conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<JsonValue>,
}

impl ContextInfo {
    pub fn new(condition: &Condition, ctx: &CallContext, request: JsonValue) -> Self {
        Self {
            condition: condition.id(),
            instance_id: ctx.instance_id.clone(),
            org_id: ctx.org_id.clone(),
            user_id: ctx.user_id.clone(),
            request,
            response: None,
        }
    }

    pub fn with_response(mut self, response: JsonValue) -> Self {
        self.response = Some(response);
        self
    }

    /// A call target's answer replaces the response when there is one, else the request.
    pub fn apply_call_response(&mut self, body: JsonValue) {
        match &mut self.response {
            Some(response) => *response = body,
            None => self.request = body,
        }
    }

    /// The body handed back to the host.
    pub fn current(&self) -> &JsonValue {
        self.response.as_ref().unwrap_or(&self.request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_response_replaces_response_when_present() {
        let c = Condition::response_all();
        let ctx = CallContext::new("inst");
        let mut info = ContextInfo::new(&c, &ctx, json!({"q": 1})).with_response(json!({"a": 1}));
        info.apply_call_response(json!({"a": 2}));
        assert_eq!(info.request, json!({"q": 1}));
        assert_eq!(info.current(), &json!({"a": 2}));
    }

    #[test]
    fn call_response_replaces_request_otherwise() {
        let c = Condition::request_all();
        let ctx = CallContext::new("inst").with_user("u1");
        let mut info = ContextInfo::new(&c, &ctx, json!({"q": 1}));
        info.apply_call_response(json!({"q": 2}));
        assert_eq!(info.current(), &json!({"q": 2}));
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({"condition": "request", "instanceId": "inst", "userId": "u1", "request": {"q": 2}})
        );
    }
}
