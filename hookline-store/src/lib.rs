#![forbid(unsafe_code)]

pub mod memory;
pub mod postgres;
pub mod store;

pub use crate::memory::MemoryStore;
pub use crate::postgres::run_migrations;
pub use crate::postgres::PostgresStore;
pub use crate::store::{
    ActionStore, ExecutionQuery, ExecutionRecord, ExecutionSearch, ExecutionSortColumn,
    Pagination, SearchResult, Snapshot, StoreError, TargetDeletion, TargetQuery, TargetRecord,
    TargetSearch, TargetSortColumn, TextMatch,
};
