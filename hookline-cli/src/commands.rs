use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply database migrations.
    Migrate,
    #[command(subcommand)]
    Target(TargetCommand),
    #[command(subcommand)]
    Execution(ExecutionCommand),
    /// Print the flattened target IDs of a condition.
    Resolve {
        /// Condition as JSON or canonical ID, e.g. `request/pkg.Svc/Method`.
        condition: String,
        /// Fall back to broader conditions like a runtime call would.
        #[arg(long)]
        best_match: bool,
    },
    /// Run the executions matching a runtime condition against a request body.
    Dispatch {
        condition: String,
        /// JSON request body.
        #[arg(long)]
        request: PathBuf,
        /// JSON response body, for response conditions.
        #[arg(long)]
        response: Option<PathBuf>,
        #[arg(long)]
        org: Option<String>,
        #[arg(long)]
        user: Option<String>,
    },
    #[command(subcommand)]
    Catalog(CatalogCommand),
}

#[derive(Debug, Subcommand)]
pub enum TargetCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        endpoint: String,
        #[arg(long, default_value_t = 10_000)]
        timeout_ms: u64,
        #[arg(long = "type", value_enum, default_value_t = DispatchTypeArg::Webhook)]
        dispatch_type: DispatchTypeArg,
        #[arg(long)]
        interrupt_on_error: bool,
    },
    Patch {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long)]
        timeout_ms: Option<u64>,
        #[arg(long = "type", value_enum)]
        dispatch_type: Option<DispatchTypeArg>,
        #[arg(long)]
        interrupt_on_error: Option<bool>,
        /// Replace the signing key with a fresh random one.
        #[arg(long)]
        rotate_key: bool,
    },
    Delete {
        id: String,
    },
    Get {
        id: String,
    },
    List {
        #[arg(long)]
        name: Option<String>,
        /// equals, contains, starts-with, with an optional -ignore-case suffix.
        #[arg(long, default_value = "equals")]
        name_match: String,
        #[arg(long = "id")]
        ids: Vec<String>,
        #[arg(long, default_value = "creation_date")]
        sort: String,
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Debug, Subcommand)]
pub enum ExecutionCommand {
    /// Replace the target list of a condition; no references removes it.
    Set {
        condition: String,
        /// Target IDs, or `include:<condition>` to splice in another execution.
        refs: Vec<String>,
    },
    Delete {
        condition: String,
    },
    Get {
        condition: String,
    },
    List {
        #[arg(long = "condition")]
        conditions: Vec<String>,
        #[arg(long = "type")]
        execution_type: Option<String>,
        #[arg(long)]
        target: Option<String>,
        #[arg(long)]
        include: Option<String>,
        #[arg(long, default_value = "creation_date")]
        sort: String,
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    Functions,
    Methods,
    Services,
}
