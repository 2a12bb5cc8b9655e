use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use hookline_core::types::ObjectDetails;
use hookline_core::{ActionError, ExecutionTarget, ExecutionType};

use crate::store::types::{ExecutionRecord, TargetRecord};

pub const DEFAULT_LIMIT: u64 = 100;
pub const MAX_LIMIT: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatch {
    Equals,
    EqualsIgnoreCase,
    StartsWith,
    StartsWithIgnoreCase,
    Contains,
    ContainsIgnoreCase,
}

impl TextMatch {
    pub fn ignores_case(&self) -> bool {
        matches!(
            self,
            TextMatch::EqualsIgnoreCase | TextMatch::StartsWithIgnoreCase | TextMatch::ContainsIgnoreCase
        )
    }

    pub fn matches(&self, value: &str, pattern: &str) -> bool {
        let (value, pattern) = if self.ignores_case() {
            (value.to_lowercase(), pattern.to_lowercase())
        } else {
            (value.to_string(), pattern.to_string())
        };
        match self {
            TextMatch::Equals | TextMatch::EqualsIgnoreCase => value == pattern,
            TextMatch::StartsWith | TextMatch::StartsWithIgnoreCase => value.starts_with(&pattern),
            TextMatch::Contains | TextMatch::ContainsIgnoreCase => value.contains(&pattern),
        }
    }

    /// SQL `LIKE` pattern for `value`, with wildcards in `value` escaped.
    pub fn like_pattern(&self, value: &str) -> String {
        let escaped = value
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        match self {
            TextMatch::Equals | TextMatch::EqualsIgnoreCase => escaped,
            TextMatch::StartsWith | TextMatch::StartsWithIgnoreCase => format!("{escaped}%"),
            TextMatch::Contains | TextMatch::ContainsIgnoreCase => format!("%{escaped}%"),
        }
    }
}

impl FromStr for TextMatch {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "equals" => Ok(TextMatch::Equals),
            "equalsignorecase" => Ok(TextMatch::EqualsIgnoreCase),
            "startswith" => Ok(TextMatch::StartsWith),
            "startswithignorecase" => Ok(TextMatch::StartsWithIgnoreCase),
            "contains" => Ok(TextMatch::Contains),
            "containsignorecase" => Ok(TextMatch::ContainsIgnoreCase),
            _ => Err(ActionError::invalid(format!("unknown text match method: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: u64,
    /// Zero means [`DEFAULT_LIMIT`]; larger values are clamped to [`MAX_LIMIT`].
    pub limit: u64,
    pub asc: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 0,
            asc: true,
        }
    }
}

impl Pagination {
    pub fn effective_limit(&self) -> u64 {
        match self.limit {
            0 => DEFAULT_LIMIT,
            n => n.min(MAX_LIMIT),
        }
    }

    /// Applies offset and limit to already sorted items.
    pub fn page<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.effective_limit()).unwrap_or(usize::MAX);
        items.into_iter().skip(offset).take(limit).collect()
    }
}

/// Target filters; all given filters must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetQuery {
    Name { value: String, method: TextMatch },
    InIds(Vec<String>),
}

impl TargetQuery {
    pub fn matches(&self, record: &TargetRecord) -> bool {
        match self {
            TargetQuery::Name { value, method } => method.matches(&record.target.name, value),
            TargetQuery::InIds(ids) => ids.iter().any(|id| *id == record.target.id),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TargetSortColumn {
    Id,
    #[default]
    CreationDate,
    ChangeDate,
    Name,
    DispatchType,
    Endpoint,
    Timeout,
    InterruptOnError,
}

impl TargetSortColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetSortColumn::Id => "id",
            TargetSortColumn::CreationDate => "creation_date",
            TargetSortColumn::ChangeDate => "change_date",
            TargetSortColumn::Name => "name",
            TargetSortColumn::DispatchType => "dispatch_type",
            TargetSortColumn::Endpoint => "endpoint",
            TargetSortColumn::Timeout => "timeout",
            TargetSortColumn::InterruptOnError => "interrupt_on_error",
        }
    }

    pub fn compare(&self, a: &TargetRecord, b: &TargetRecord) -> Ordering {
        let (ta, tb) = (&a.target, &b.target);
        let primary = match self {
            TargetSortColumn::Id => Ordering::Equal,
            TargetSortColumn::CreationDate => a.details.creation_date.cmp(&b.details.creation_date),
            TargetSortColumn::ChangeDate => a.details.change_date.cmp(&b.details.change_date),
            TargetSortColumn::Name => ta.name.cmp(&tb.name),
            TargetSortColumn::DispatchType => ta.dispatch_type.as_str().cmp(tb.dispatch_type.as_str()),
            TargetSortColumn::Endpoint => ta.endpoint.as_str().cmp(tb.endpoint.as_str()),
            TargetSortColumn::Timeout => ta.timeout.cmp(&tb.timeout),
            TargetSortColumn::InterruptOnError => ta.interrupt_on_error.cmp(&tb.interrupt_on_error),
        };
        primary.then_with(|| ta.id.cmp(&tb.id))
    }
}

impl fmt::Display for TargetSortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetSortColumn {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            TargetSortColumn::Id,
            TargetSortColumn::CreationDate,
            TargetSortColumn::ChangeDate,
            TargetSortColumn::Name,
            TargetSortColumn::DispatchType,
            TargetSortColumn::Endpoint,
            TargetSortColumn::Timeout,
            TargetSortColumn::InterruptOnError,
        ]
        .into_iter()
        .find(|c| c.as_str() == s.replace('-', "_"))
        .ok_or_else(|| ActionError::invalid(format!("unknown target sort column: {s}")))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSearch {
    pub queries: Vec<TargetQuery>,
    pub sort: TargetSortColumn,
    pub page: Pagination,
}

impl TargetSearch {
    pub fn matches(&self, record: &TargetRecord) -> bool {
        self.queries.iter().all(|q| q.matches(record))
    }
}

/// Execution filters; all given filters must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionQuery {
    /// Condition IDs.
    InConditions(Vec<String>),
    ExecutionType(ExecutionType),
    /// Executions that directly reference this target ID.
    Target(String),
    /// Executions that include this condition ID.
    Include(String),
}

impl ExecutionQuery {
    pub fn matches(&self, record: &ExecutionRecord) -> bool {
        let execution = &record.execution;
        match self {
            ExecutionQuery::InConditions(ids) => {
                let id = execution.id();
                ids.iter().any(|c| *c == id)
            }
            ExecutionQuery::ExecutionType(t) => execution.condition.execution_type() == *t,
            ExecutionQuery::Target(target_id) => execution.target_ids().any(|id| id == target_id),
            ExecutionQuery::Include(condition_id) => execution
                .targets
                .iter()
                .any(|t| matches!(t, ExecutionTarget::Include(c) if c.id() == *condition_id)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionSortColumn {
    Id,
    #[default]
    CreationDate,
    ChangeDate,
}

impl ExecutionSortColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionSortColumn::Id => "id",
            ExecutionSortColumn::CreationDate => "creation_date",
            ExecutionSortColumn::ChangeDate => "change_date",
        }
    }

    pub fn compare(&self, a: &ExecutionRecord, b: &ExecutionRecord) -> Ordering {
        compare_details(*self, &a.details, &b.details)
    }
}

fn compare_details(column: ExecutionSortColumn, a: &ObjectDetails, b: &ObjectDetails) -> Ordering {
    let primary = match column {
        ExecutionSortColumn::Id => Ordering::Equal,
        ExecutionSortColumn::CreationDate => a.creation_date.cmp(&b.creation_date),
        ExecutionSortColumn::ChangeDate => a.change_date.cmp(&b.change_date),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

impl FromStr for ExecutionSortColumn {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "id" => Ok(ExecutionSortColumn::Id),
            "creation_date" => Ok(ExecutionSortColumn::CreationDate),
            "change_date" => Ok(ExecutionSortColumn::ChangeDate),
            _ => Err(ActionError::invalid(format!("unknown execution sort column: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionSearch {
    pub queries: Vec<ExecutionQuery>,
    pub sort: ExecutionSortColumn,
    pub page: Pagination,
}

impl ExecutionSearch {
    pub fn matches(&self, record: &ExecutionRecord) -> bool {
        self.queries.iter().all(|q| q.matches(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_match_methods() {
        assert!(TextMatch::Equals.matches("audit", "audit"));
        assert!(!TextMatch::Equals.matches("Audit", "audit"));
        assert!(TextMatch::EqualsIgnoreCase.matches("Audit", "audit"));
        assert!(TextMatch::StartsWith.matches("audit-log", "audit"));
        assert!(TextMatch::ContainsIgnoreCase.matches("my-AUDIT-log", "audit"));
        assert!(!TextMatch::Contains.matches("my-AUDIT-log", "audit"));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(TextMatch::Contains.like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(TextMatch::StartsWith.like_pattern("a"), "a%");
    }

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(Pagination::default().effective_limit(), DEFAULT_LIMIT);
        let p = Pagination {
            limit: 5000,
            ..Default::default()
        };
        assert_eq!(p.effective_limit(), MAX_LIMIT);
    }

    #[test]
    fn parses_sort_columns() {
        assert_eq!("change-date".parse::<TargetSortColumn>().unwrap(), TargetSortColumn::ChangeDate);
        assert_eq!("id".parse::<ExecutionSortColumn>().unwrap(), ExecutionSortColumn::Id);
        assert!("nope".parse::<TargetSortColumn>().is_err());
    }
}
