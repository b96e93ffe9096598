use std::sync::Arc;

use tokio::sync::Mutex;

use crate::composer::Composer;
use crate::config::Config;
use crate::export::DocumentExporter;
use crate::llm_client::TextImprover;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The one composer. Holding this lock is what serializes user actions.
    pub composer: Arc<Mutex<Composer>>,
    /// Remote "help me improve" service; `DisabledImprover` without an API key.
    pub improver: Arc<dyn TextImprover>,
    pub exporter: Arc<dyn DocumentExporter>,
    pub config: Config,
}
