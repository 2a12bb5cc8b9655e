use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod output;
mod utils;

pub use args::*;
use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "hookline", version, about = "Manage hookline targets and executions")]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,
    #[command(flatten)]
    store: StoreArgs,
    #[command(flatten)]
    engine: EngineArgs,
    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.output.quiet);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli));
    std::process::exit(exit_code);
}

/// Logs go to stderr; stdout carries command output only.
fn init_tracing(quiet: bool) {
    let default = if quiet { "error" } else { "hookline=info,warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run_command(cli: Cli) -> i32 {
    let Cli {
        output,
        store,
        engine,
        command,
    } = cli;
    match command {
        Command::Migrate => cmd::migrate::migrate_cmd(store, output).await,
        Command::Target(command) => cmd::target::target_cmd(command, store, engine, output).await,
        Command::Execution(command) => {
            cmd::execution::execution_cmd(command, store, engine, output).await
        }
        Command::Resolve {
            condition,
            best_match,
        } => cmd::resolve::resolve_cmd(&condition, best_match, store, engine, output).await,
        Command::Dispatch {
            condition,
            request,
            response,
            org,
            user,
        } => {
            cmd::dispatch::dispatch_cmd(
                &condition,
                &request,
                response.as_deref(),
                org,
                user,
                store,
                engine,
                output,
            )
            .await
        }
        Command::Catalog(command) => cmd::catalog::catalog_cmd(command, engine, output).await,
    }
}
