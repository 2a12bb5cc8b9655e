use std::path::PathBuf;

use clap::Args;
use hookline_core::DispatchType;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct StoreArgs {
    /// Postgres URL; falls back to HOOKLINE_DATABASE_URL, then DATABASE_URL.
    #[arg(long, global = true)]
    pub store: Option<String>,
    #[arg(long, default_value_t = 5, global = true)]
    pub max_connections: u32,
}

#[derive(Debug, Args, Clone)]
pub struct EngineArgs {
    /// Instance to operate on; falls back to HOOKLINE_INSTANCE_ID.
    #[arg(long, global = true)]
    pub instance: Option<String>,
    /// Host catalog of functions, methods, and events (JSON or YAML).
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,
    /// Falls back to HOOKLINE_EXECUTIONS_ENABLED; enabled when neither is set.
    #[arg(long, global = true)]
    pub executions_enabled: Option<bool>,
    #[arg(long, global = true)]
    pub max_include_depth: Option<usize>,
}

#[derive(Debug, Args, Clone)]
pub struct PageArgs {
    #[arg(long, default_value_t = 0)]
    pub offset: u64,
    /// Zero uses the store default.
    #[arg(long, default_value_t = 0)]
    pub limit: u64,
    #[arg(long)]
    pub desc: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DispatchTypeArg {
    Webhook,
    Call,
    Async,
}

impl From<DispatchTypeArg> for DispatchType {
    fn from(arg: DispatchTypeArg) -> Self {
        match arg {
            DispatchTypeArg::Webhook => DispatchType::Webhook,
            DispatchTypeArg::Call => DispatchType::Call,
            DispatchTypeArg::Async => DispatchType::Async,
        }
    }
}
