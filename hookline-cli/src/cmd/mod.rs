pub mod catalog;
pub mod dispatch;
pub mod execution;
pub mod migrate;
pub mod resolve;
pub mod target;
