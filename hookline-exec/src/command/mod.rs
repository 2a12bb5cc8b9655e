//! Write side: target lifecycle and execution graph writes.

mod executions;
mod targets;

pub use targets::generate_signing_key;

use std::sync::Arc;

use hookline_core::Catalog;
use hookline_store::ActionStore;

use crate::config::EngineConfig;

pub struct Commands {
    store: Arc<dyn ActionStore>,
    catalog: Arc<dyn Catalog>,
    config: EngineConfig,
}

impl Commands {
    pub fn new(store: Arc<dyn ActionStore>, catalog: Arc<dyn Catalog>, config: EngineConfig) -> Self {
        Self {
            store,
            catalog,
            config,
        }
    }

    fn attempts(&self) -> usize {
        self.config.write_retries + 1
    }
}
