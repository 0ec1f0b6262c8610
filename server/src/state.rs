use std::sync::Arc;
use std::time::Instant;

use semstore_core::{EntryService, EntryStore};

use crate::config::AppConfig;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) started_at: Instant,
    pub(crate) config: Arc<AppConfig>,
    pub(crate) service: EntryService,
}

impl AppState {
    pub(crate) fn new(config: AppConfig, store: Arc<dyn EntryStore>) -> Self {
        let service = EntryService::new(store).with_max_search_limit(config.max_search_limit);
        Self {
            started_at: Instant::now(),
            config: Arc::new(config),
            service,
        }
    }
}
