use std::collections::BTreeMap;
use std::sync::Arc;

use hookline_core::{ActionError, DispatchType, Target};
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::dispatch::http::{HttpClient, HttpError, HttpRequestParts, HttpResponseParts};
use crate::dispatch::payload::ContextInfo;
use crate::dispatch::signing;

/// A target invocation that failed without stopping the dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFailure {
    pub target_id: String,
    pub reason: String,
}

impl From<TargetFailure> for ActionError {
    fn from(f: TargetFailure) -> Self {
        ActionError::DispatchFailure {
            target_id: f.target_id,
            reason: f.reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    /// The payload after every call target applied its response.
    pub payload: ContextInfo,
    pub failures: Vec<TargetFailure>,
    /// Async targets handed to the runtime.
    pub spawned: usize,
}

/// An interrupting target failed; later targets were not invoked.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("dispatch interrupted by target {}: {}", failure.target_id, failure.reason)]
pub struct DispatchInterrupted {
    /// The payload as of the last successful call target.
    pub payload: ContextInfo,
    pub failure: TargetFailure,
}

impl From<DispatchInterrupted> for ActionError {
    fn from(i: DispatchInterrupted) -> Self {
        i.failure.into()
    }
}

#[derive(Debug, thiserror::Error)]
enum InvokeError {
    #[error("timed out")]
    Timeout,
    #[error("canceled by caller")]
    Canceled,
    #[error("{0}")]
    Http(HttpError),
    #[error("endpoint answered with status {0}")]
    Status(u16),
    #[error("response is not JSON: {0}")]
    Body(String),
    #[error("payload encoding failed: {0}")]
    Encode(String),
}

pub struct Dispatcher {
    http: Arc<dyn HttpClient>,
    config: EngineConfig,
    /// Async target invocations still in flight.
    tasks: TaskTracker,
}

impl Dispatcher {
    pub fn new(http: Arc<dyn HttpClient>, config: EngineConfig) -> Self {
        Self {
            http,
            config,
            tasks: TaskTracker::new(),
        }
    }

    /// Waits for every async target spawned so far.
    pub async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Invokes `targets` strictly in order.
    ///
    /// Webhook and call targets are awaited and bounded by their timeout and by `cancel`;
    /// async targets are spawned and never block, fail, or change the payload.
    pub async fn dispatch(
        &self,
        targets: &[Target],
        mut payload: ContextInfo,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, DispatchInterrupted> {
        let mut failures = Vec::new();
        let mut spawned = 0;

        for target in targets {
            if target.dispatch_type == DispatchType::Async {
                match self.request(target, &payload) {
                    Ok(req) => {
                        self.spawn(target, req, payload.condition.clone());
                        spawned += 1;
                    }
                    Err(e) => warn!(
                        target_id = %target.id,
                        condition = %payload.condition,
                        error = %e,
                        "async target skipped"
                    ),
                }
                continue;
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(InvokeError::Canceled),
                r = self.invoke(target, &payload) => r,
            };
            let result = result.and_then(|resp| {
                if target.dispatch_type == DispatchType::Call {
                    let body: JsonValue = serde_json::from_slice(&resp.body)
                        .map_err(|e| InvokeError::Body(e.to_string()))?;
                    payload.apply_call_response(body);
                }
                Ok(())
            });

            match result {
                Ok(()) => debug!(target_id = %target.id, dispatch_type = %target.dispatch_type, "target invoked"),
                Err(e) => {
                    let failure = TargetFailure {
                        target_id: target.id.clone(),
                        reason: e.to_string(),
                    };
                    if target.interrupts() {
                        warn!(
                            target_id = %target.id,
                            condition = %payload.condition,
                            error = %e,
                            "target failed, interrupting dispatch"
                        );
                        return Err(DispatchInterrupted { payload, failure });
                    }
                    warn!(
                        target_id = %target.id,
                        condition = %payload.condition,
                        error = %e,
                        "target failed"
                    );
                    failures.push(failure);
                }
            }
        }

        Ok(DispatchOutcome {
            payload,
            failures,
            spawned,
        })
    }

    fn request(&self, target: &Target, payload: &ContextInfo) -> Result<HttpRequestParts, InvokeError> {
        let body = serde_json::to_vec(payload).map_err(|e| InvokeError::Encode(e.to_string()))?;
        let mut headers = BTreeMap::from([(
            "Content-Type".to_string(),
            "application/json".to_string(),
        )]);
        if let Some(signature) = signing::sign(&target.signing_key, chrono::Utc::now().timestamp(), &body) {
            headers.insert(self.config.signature_header.clone(), signature);
        }
        Ok(HttpRequestParts {
            method: "POST".to_string(),
            url: target.endpoint.clone(),
            headers,
            body,
        })
    }

    async fn invoke(&self, target: &Target, payload: &ContextInfo) -> Result<HttpResponseParts, InvokeError> {
        let req = self.request(target, payload)?;
        send(self.http.as_ref(), req, target, self.config.max_response_bytes).await
    }

    fn spawn(&self, target: &Target, req: HttpRequestParts, condition: String) {
        let http = self.http.clone();
        let target = target.clone();
        let max_response_bytes = self.config.max_response_bytes;
        self.tasks.spawn(async move {
            match send(http.as_ref(), req, &target, max_response_bytes).await {
                Ok(_) => debug!(target_id = %target.id, "async target invoked"),
                Err(e) => warn!(
                    target_id = %target.id,
                    condition = %condition,
                    error = %e,
                    "async target failed"
                ),
            }
        });
    }
}

async fn send(
    http: &dyn HttpClient,
    req: HttpRequestParts,
    target: &Target,
    max_response_bytes: usize,
) -> Result<HttpResponseParts, InvokeError> {
    let resp = tokio::time::timeout(target.timeout, http.send(req, target.timeout, max_response_bytes))
        .await
        .map_err(|_| InvokeError::Timeout)?
        .map_err(|e| match e {
            HttpError::Timeout => InvokeError::Timeout,
            other => InvokeError::Http(other),
        })?;
    if !resp.is_success() {
        return Err(InvokeError::Status(resp.status));
    }
    Ok(resp)
}
