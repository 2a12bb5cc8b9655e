use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_result, OutputFormat};
use crate::utils::{fail, open_session, parse_condition};
use crate::{EngineArgs, OutputArgs, StoreArgs};

#[derive(Serialize)]
struct ResolveResult {
    condition: String,
    /// Set when falling back; `None` if no condition matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    matched: Option<String>,
    targets: Vec<String>,
}

pub async fn resolve_cmd(
    condition: &str,
    best_match: bool,
    store: StoreArgs,
    engine: EngineArgs,
    output: OutputArgs,
) -> i32 {
    let condition = match parse_condition(condition) {
        Ok(c) => c,
        Err(e) => return fail(&output, &e),
    };
    let session = match open_session(&store, &engine, &output, None).await {
        Ok(s) => s,
        Err(code) => return code,
    };

    let result = if best_match {
        match session.engine.best_match(&session.ctx, &condition).await {
            Ok(hit) => ResolveResult {
                condition: condition.id(),
                matched: hit.as_ref().map(|m| m.condition.id()),
                targets: hit.map(|m| m.targets).unwrap_or_default(),
            },
            Err(e) => return fail(&output, &e),
        }
    } else {
        match session.engine.resolve(&session.ctx, &condition).await {
            Ok(targets) => ResolveResult {
                condition: condition.id(),
                matched: None,
                targets,
            },
            Err(e) => return fail(&output, &e),
        }
    };

    if output.format == OutputFormat::Text && !output.quiet {
        if let Some(matched) = &result.matched {
            println!("matched: {matched}");
        }
        for target in &result.targets {
            println!("{target}");
        }
    } else {
        print_result(output.format, output.quiet, &result);
    }
    exit_codes::SUCCESS
}
