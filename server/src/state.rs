// server/src/state.rs

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::session::SessionStore;
use crate::store::Store;
use flow::Flows;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub flows: Arc<Flows<AppError>>,
  pub sessions: Arc<SessionStore>,
  pub config: Arc<AppConfig>,
}

impl AppState {
  /// Wires the shared pieces together. Pipelines still have to be registered
  /// on `flows` before the first request.
  pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Self {
    Self {
      store,
      flows: Arc::new(Flows::new()),
      sessions: Arc::new(SessionStore::new(config.session_ttl)),
      config: Arc::new(config),
    }
  }
}
