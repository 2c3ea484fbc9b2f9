pub mod bills;
pub mod config;
pub mod error;
pub mod guard;
pub mod ingest;
pub mod locks;
pub mod routes;

pub use bills::{BillService, PaidBill};
pub use config::{Config, ConfigError, ReconcileConfig};
pub use error::ServiceError;
pub use ingest::{IngestOutcome, IngestService};
pub use locks::UserLocks;
pub use routes::{router, AppState};

use std::sync::Arc;
use tally_extract::{DisabledBackend, ExtractionBackend, ExtractionPipeline, OpenAiBackend};
use tally_storage::DbPool;

/// Wire the services from configuration over an open pool.
pub fn build_state(config: &Config, pool: DbPool) -> anyhow::Result<AppState> {
    let backend: Arc<dyn ExtractionBackend> = if config.ai.is_configured() {
        Arc::new(OpenAiBackend::new(&config.ai)?)
    } else {
        tracing::warn!("No AI host configured; extraction runs in regex-only mode");
        Arc::new(DisabledBackend)
    };
    let pipeline = ExtractionPipeline::new(backend, config.categorizer()?);
    Ok(state_with_pipeline(config, pool, pipeline))
}

pub fn state_with_pipeline(config: &Config, pool: DbPool, pipeline: ExtractionPipeline) -> AppState {
    let locks = Arc::new(UserLocks::new());
    AppState {
        ingest: Arc::new(IngestService::new(
            pool.clone(),
            pipeline,
            config.reconcile.matcher(),
            locks.clone(),
        )),
        bills: Arc::new(BillService::new(pool, locks)),
    }
}
