use hookline_core::types::{ListDetails, ObjectDetails};
use hookline_core::{Condition, ExecutionTarget, Target};
use hookline_store::{ExecutionRecord, TargetRecord};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn print_result<T: Serialize>(format: OutputFormat, quiet: bool, result: &T) {
    if quiet {
        return;
    }
    match format {
        OutputFormat::Text => {
            if let Ok(json) = serde_json::to_string_pretty(result) {
                println!("{json}");
            }
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string(result) {
                println!("{json}");
            }
        }
    }
}

pub fn print_error(format: OutputFormat, quiet: bool, message: &str) {
    if quiet {
        return;
    }
    match format {
        OutputFormat::Text => eprintln!("error: {message}"),
        OutputFormat::Json => {
            let err = serde_json::json!({"error": message});
            eprintln!("{}", serde_json::to_string(&err).unwrap_or_default());
        }
    }
}

#[derive(Serialize)]
pub struct TargetView<'a> {
    #[serde(flatten)]
    pub target: &'a Target,
    pub details: &'a ObjectDetails,
}

impl<'a> From<&'a TargetRecord> for TargetView<'a> {
    fn from(record: &'a TargetRecord) -> Self {
        Self {
            target: &record.target,
            details: &record.details,
        }
    }
}

#[derive(Serialize)]
pub struct ExecutionView<'a> {
    pub condition_id: String,
    pub condition: &'a Condition,
    pub targets: &'a [ExecutionTarget],
    pub details: &'a ObjectDetails,
}

impl<'a> From<&'a ExecutionRecord> for ExecutionView<'a> {
    fn from(record: &'a ExecutionRecord) -> Self {
        Self {
            condition_id: record.execution.id(),
            condition: &record.execution.condition,
            targets: &record.execution.targets,
            details: &record.details,
        }
    }
}

#[derive(Serialize)]
pub struct ListView<T> {
    pub details: ListDetails,
    pub items: Vec<T>,
}
