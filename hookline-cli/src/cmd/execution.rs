use hookline_core::{ActionError, Condition, ExecutionTarget, ExecutionType};
use hookline_store::{ExecutionQuery, ExecutionSearch, ExecutionSortColumn, Pagination};

use crate::cmd::target::print_details;
use crate::commands::ExecutionCommand;
use crate::exit_codes;
use crate::output::{print_result, ExecutionView, ListView, OutputFormat};
use crate::utils::{fail, open_session, parse_condition, parse_target_ref, Session};
use crate::{EngineArgs, OutputArgs, StoreArgs};

enum Parsed {
    Set(Condition, Vec<ExecutionTarget>),
    Delete(Condition),
    Get(Condition),
    List(ExecutionSearch),
}

pub async fn execution_cmd(
    command: ExecutionCommand,
    store: StoreArgs,
    engine: EngineArgs,
    output: OutputArgs,
) -> i32 {
    let parsed = match parse(command) {
        Ok(p) => p,
        Err(e) => return fail(&output, &e),
    };

    let Session { engine, ctx } = match open_session(&store, &engine, &output, None).await {
        Ok(s) => s,
        Err(code) => return code,
    };

    match parsed {
        Parsed::Set(condition, targets) => {
            let what = if targets.is_empty() {
                "removed execution"
            } else {
                "set execution"
            };
            match engine.set_execution(&ctx, condition, targets).await {
                Ok(details) => print_details(&output, &details, what),
                Err(e) => fail(&output, &e),
            }
        }
        Parsed::Delete(condition) => match engine.delete_execution(&ctx, &condition).await {
            Ok(details) => print_details(&output, &details, "removed execution"),
            Err(e) => fail(&output, &e),
        },
        Parsed::Get(condition) => match engine.get_execution(&ctx, &condition).await {
            Ok(record) => {
                print_result(output.format, output.quiet, &ExecutionView::from(&record));
                exit_codes::SUCCESS
            }
            Err(e) => fail(&output, &e),
        },
        Parsed::List(search) => match engine.search_executions(&ctx, &search).await {
            Ok(result) => {
                if output.format == OutputFormat::Text && !output.quiet {
                    for record in &result.items {
                        let refs: Vec<String> = record
                            .execution
                            .targets
                            .iter()
                            .map(|t| match t {
                                ExecutionTarget::Target(id) => id.clone(),
                                ExecutionTarget::Include(c) => format!("include:{c}"),
                            })
                            .collect();
                        println!("{}\t{}", record.execution.id(), refs.join(" "));
                    }
                    println!("({} of {})", result.items.len(), result.details.total_result);
                } else {
                    let view = ListView {
                        details: result.details.clone(),
                        items: result.items.iter().map(ExecutionView::from).collect(),
                    };
                    print_result(output.format, output.quiet, &view);
                }
                exit_codes::SUCCESS
            }
            Err(e) => fail(&output, &e),
        },
    }
}

fn parse(command: ExecutionCommand) -> Result<Parsed, ActionError> {
    Ok(match command {
        ExecutionCommand::Set { condition, refs } => Parsed::Set(
            parse_condition(&condition)?,
            refs.iter()
                .map(|r| parse_target_ref(r))
                .collect::<Result<_, _>>()?,
        ),
        ExecutionCommand::Delete { condition } => Parsed::Delete(parse_condition(&condition)?),
        ExecutionCommand::Get { condition } => Parsed::Get(parse_condition(&condition)?),
        ExecutionCommand::List {
            conditions,
            execution_type,
            target,
            include,
            sort,
            page,
        } => {
            let mut queries = Vec::new();
            if !conditions.is_empty() {
                let ids = conditions
                    .iter()
                    .map(|c| parse_condition(c).map(|c| c.id()))
                    .collect::<Result<_, _>>()?;
                queries.push(ExecutionQuery::InConditions(ids));
            }
            if let Some(t) = execution_type {
                queries.push(ExecutionQuery::ExecutionType(t.parse::<ExecutionType>()?));
            }
            if let Some(target) = target {
                queries.push(ExecutionQuery::Target(target));
            }
            if let Some(include) = include {
                queries.push(ExecutionQuery::Include(parse_condition(&include)?.id()));
            }
            Parsed::List(ExecutionSearch {
                queries,
                sort: sort.parse::<ExecutionSortColumn>()?,
                page: Pagination {
                    offset: page.offset,
                    limit: page.limit,
                    asc: !page.desc,
                },
            })
        }
    })
}
