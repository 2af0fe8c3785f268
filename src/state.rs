use std::sync::Arc;

use crate::config::Config;
use crate::posters::PosterRegistry;
use crate::processor::QueueProcessor;
use crate::store::QueueStore;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub store: Arc<dyn QueueStore>,
    pub registry: Arc<PosterRegistry>,
    pub processor: QueueProcessor,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn QueueStore>, registry: Arc<PosterRegistry>, config: Config) -> Self {
        let processor = QueueProcessor::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            config.processor_options(),
        );
        Self {
            store,
            registry,
            processor,
            config,
        }
    }
}
