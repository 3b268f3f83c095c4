use std::sync::Arc;

use metrio_storage::MetricStore;

/// Shared request-handler state: the backend chosen at startup and the
/// optional body-signing key.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MetricStore>,
    pub key: Option<String>,
}
