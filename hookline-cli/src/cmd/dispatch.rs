use std::path::Path;

use hookline_exec::{ContextInfo, HandleError, TargetFailure};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::utils::{fail, open_session, parse_condition, Session};
use crate::{EngineArgs, OutputArgs, StoreArgs};

#[derive(Serialize)]
struct FailureView<'a> {
    target_id: &'a str,
    reason: &'a str,
}

impl<'a> From<&'a TargetFailure> for FailureView<'a> {
    fn from(f: &'a TargetFailure) -> Self {
        Self {
            target_id: &f.target_id,
            reason: &f.reason,
        }
    }
}

#[derive(Serialize)]
struct DispatchResult<'a> {
    interrupted: bool,
    payload: &'a ContextInfo,
    failures: Vec<FailureView<'a>>,
    spawned: usize,
}

fn read_json(path: &Path) -> Result<JsonValue, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| format!("{} is not valid JSON: {e}", path.display()))
}

#[allow(clippy::too_many_arguments)]
pub async fn dispatch_cmd(
    condition: &str,
    request: &Path,
    response: Option<&Path>,
    org: Option<String>,
    user: Option<String>,
    store: StoreArgs,
    engine: EngineArgs,
    output: OutputArgs,
) -> i32 {
    let condition = match parse_condition(condition) {
        Ok(c) => c,
        Err(e) => return fail(&output, &e),
    };
    let bodies = read_json(request).and_then(|req| match response {
        Some(path) => read_json(path).map(|resp| (req, Some(resp))),
        None => Ok((req, None)),
    });
    let (request, response) = match bodies {
        Ok(b) => b,
        Err(e) => {
            print_error(output.format, output.quiet, &e);
            return exit_codes::INVALID_INPUT;
        }
    };

    let Session { engine, mut ctx } = match open_session(&store, &engine, &output, None).await {
        Ok(s) => s,
        Err(code) => return code,
    };
    if let Some(org) = org {
        ctx = ctx.with_org(org);
    }
    if let Some(user) = user {
        ctx = ctx.with_user(user);
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let result = engine.handle(&ctx, &condition, request, response, &cancel).await;
    engine.drain().await;

    match result {
        Ok(outcome) => {
            if output.format == OutputFormat::Text && !output.quiet {
                for failure in &outcome.failures {
                    eprintln!("warning: target {} failed: {}", failure.target_id, failure.reason);
                }
                print_result(output.format, output.quiet, &outcome.payload);
            } else {
                print_result(
                    output.format,
                    output.quiet,
                    &DispatchResult {
                        interrupted: false,
                        payload: &outcome.payload,
                        failures: outcome.failures.iter().map(FailureView::from).collect(),
                        spawned: outcome.spawned,
                    },
                );
            }
            exit_codes::SUCCESS
        }
        Err(HandleError::Interrupted(interrupted)) => {
            print_error(output.format, output.quiet, &interrupted.to_string());
            if output.format == OutputFormat::Json {
                print_result(
                    output.format,
                    output.quiet,
                    &DispatchResult {
                        interrupted: true,
                        payload: &interrupted.payload,
                        failures: vec![FailureView::from(&interrupted.failure)],
                        spawned: 0,
                    },
                );
            }
            exit_codes::DISPATCH_INTERRUPTED
        }
        Err(HandleError::Action(e)) => fail(&output, &e),
    }
}
