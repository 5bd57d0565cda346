pub mod aggregate;
pub mod codec;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ids;
pub mod ingest;
pub mod interning;
pub mod models;
pub mod normalize;
pub mod opamp;
pub mod store;

use std::sync::Arc;
use std::time::Instant;

use config::Config;
use interning::Interner;
use store::Store;

/// Shared state handed to the OTLP ingestion and Query API routers. The
/// control plane (`opamp`) keeps its own `AgentRegistry` rather than sharing
/// this struct, since it has no need for the store or interner.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub interner: Interner,
    pub config: Arc<Config>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store = Arc::new(Store::new(config.retention_seconds, config.store_max_bytes));
        Self { store, interner: Interner::new(), config: Arc::new(config), started_at: Instant::now() }
    }
}
