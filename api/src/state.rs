use std::sync::Arc;

use hotmap_core::{Store, VoteEngine};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub engine: VoteEngine<dyn Store>,
    pub admin_token: Option<Arc<str>>,
    pub metrics: PrometheusHandle,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        admin_token: Option<String>,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            engine: VoteEngine::new(store),
            admin_token: admin_token
                .filter(|t| !t.is_empty())
                .map(|t| Arc::from(t.as_str())),
            metrics,
        }
    }
}
