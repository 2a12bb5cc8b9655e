mod executions;
mod migrate;
mod rows;
mod sequence;
mod store;
mod targets;

pub use migrate::run_migrations;
pub use store::PostgresStore;
