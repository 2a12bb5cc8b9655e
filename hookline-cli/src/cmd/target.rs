use std::time::Duration;

use hookline_core::types::ObjectDetails;
use hookline_core::{NewTarget, TargetPatch};
use hookline_exec::command::generate_signing_key;
use hookline_store::{Pagination, TargetQuery, TargetSearch, TargetSortColumn, TextMatch};
use serde::Serialize;

use crate::commands::TargetCommand;
use crate::exit_codes;
use crate::output::{print_result, ListView, OutputFormat, TargetView};
use crate::utils::{fail, open_session, Session};
use crate::{EngineArgs, OutputArgs, PageArgs, StoreArgs};

#[derive(Serialize)]
struct DeleteResult<'a> {
    details: &'a ObjectDetails,
    affected_executions: &'a [String],
}

pub async fn target_cmd(
    command: TargetCommand,
    store: StoreArgs,
    engine: EngineArgs,
    output: OutputArgs,
) -> i32 {
    // Flag parsing errors surface before any connection attempt.
    let search = match &command {
        TargetCommand::List {
            name,
            name_match,
            ids,
            sort,
            page,
        } => match target_search(name.as_deref(), name_match, ids, sort, page) {
            Ok(search) => Some(search),
            Err(e) => return fail(&output, &e),
        },
        _ => None,
    };

    let Session { engine, ctx } = match open_session(&store, &engine, &output, None).await {
        Ok(s) => s,
        Err(code) => return code,
    };

    match command {
        TargetCommand::Create {
            name,
            endpoint,
            timeout_ms,
            dispatch_type,
            interrupt_on_error,
        } => {
            let input = NewTarget {
                name,
                endpoint,
                timeout: Duration::from_millis(timeout_ms),
                dispatch_type: dispatch_type.into(),
                interrupt_on_error,
            };
            match engine.create_target(&ctx, input).await {
                Ok(details) => print_details(&output, &details, "created target"),
                Err(e) => fail(&output, &e),
            }
        }
        TargetCommand::Patch {
            id,
            name,
            endpoint,
            timeout_ms,
            dispatch_type,
            interrupt_on_error,
            rotate_key,
        } => {
            let patch = TargetPatch {
                name,
                endpoint,
                timeout: timeout_ms.map(Duration::from_millis),
                dispatch_type: dispatch_type.map(Into::into),
                interrupt_on_error,
                signing_key: rotate_key.then(generate_signing_key),
            };
            match engine.patch_target(&ctx, &id, patch).await {
                Ok(details) => print_details(&output, &details, "patched target"),
                Err(e) => fail(&output, &e),
            }
        }
        TargetCommand::Delete { id } => match engine.delete_target(&ctx, &id).await {
            Ok(deletion) => {
                if output.format == OutputFormat::Text && !output.quiet {
                    println!("deleted target {id} (sequence {})", deletion.details.sequence);
                    for condition in &deletion.affected_executions {
                        println!("  removed from {condition}");
                    }
                } else {
                    print_result(
                        output.format,
                        output.quiet,
                        &DeleteResult {
                            details: &deletion.details,
                            affected_executions: &deletion.affected_executions,
                        },
                    );
                }
                exit_codes::SUCCESS
            }
            Err(e) => fail(&output, &e),
        },
        TargetCommand::Get { id } => match engine.get_target(&ctx, &id).await {
            Ok(record) => {
                print_result(output.format, output.quiet, &TargetView::from(&record));
                exit_codes::SUCCESS
            }
            Err(e) => fail(&output, &e),
        },
        TargetCommand::List { .. } => {
            let search = search.unwrap_or_default();
            match engine.search_targets(&ctx, &search).await {
                Ok(result) => {
                    if output.format == OutputFormat::Text && !output.quiet {
                        for record in &result.items {
                            let t = &record.target;
                            println!(
                                "{}\t{}\t{}\t{}\t{}ms",
                                t.id,
                                t.name,
                                t.dispatch_type,
                                t.endpoint,
                                t.timeout.as_millis()
                            );
                        }
                        println!("({} of {})", result.items.len(), result.details.total_result);
                    } else {
                        let view = ListView {
                            details: result.details.clone(),
                            items: result.items.iter().map(TargetView::from).collect(),
                        };
                        print_result(output.format, output.quiet, &view);
                    }
                    exit_codes::SUCCESS
                }
                Err(e) => fail(&output, &e),
            }
        }
    }
}

fn target_search(
    name: Option<&str>,
    name_match: &str,
    ids: &[String],
    sort: &str,
    page: &PageArgs,
) -> Result<TargetSearch, hookline_core::ActionError> {
    let mut queries = Vec::new();
    if let Some(name) = name {
        queries.push(TargetQuery::Name {
            value: name.to_string(),
            method: name_match.parse::<TextMatch>()?,
        });
    }
    if !ids.is_empty() {
        queries.push(TargetQuery::InIds(ids.to_vec()));
    }
    Ok(TargetSearch {
        queries,
        sort: sort.parse::<TargetSortColumn>()?,
        page: Pagination {
            offset: page.offset,
            limit: page.limit,
            asc: !page.desc,
        },
    })
}

pub(crate) fn print_details(output: &OutputArgs, details: &ObjectDetails, what: &str) -> i32 {
    if output.format == OutputFormat::Text && !output.quiet {
        println!("{what} {} (sequence {})", details.id, details.sequence);
    } else {
        print_result(output.format, output.quiet, details);
    }
    exit_codes::SUCCESS
}
