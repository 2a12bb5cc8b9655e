use chrono::{DateTime, Utc};
use serde::Serialize;

/// Bookkeeping returned by every write and attached to every stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectDetails {
    pub id: String,
    /// Owning instance.
    pub resource_owner: String,
    pub sequence: i64,
    pub creation_date: DateTime<Utc>,
    pub change_date: DateTime<Utc>,
}

/// Consistency marker attached to paginated read results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListDetails {
    pub total_result: u64,
    pub processed_sequence: i64,
    pub timestamp: DateTime<Utc>,
}
