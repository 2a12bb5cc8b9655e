mod query;
mod trait_store;
mod types;

pub use query::{
    ExecutionQuery, ExecutionSearch, ExecutionSortColumn, Pagination, TargetQuery, TargetSearch,
    TargetSortColumn, TextMatch, DEFAULT_LIMIT, MAX_LIMIT,
};
pub use trait_store::{ActionStore, StoreError};
pub use types::{ExecutionRecord, SearchResult, Snapshot, TargetDeletion, TargetRecord};
