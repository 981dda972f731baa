// server/src/lib.rs

//! MediaHub Rwanda backend: accounts, bookings, reviews, simulated payments
//! and admin management over MySQL.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod store;
pub mod web;

use actix_web::web as actix_data;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::state::AppState;
use crate::store::Store;

/// Builds the shared state over `store` and registers every pipeline.
pub fn build_app_state(store: Arc<dyn Store>, config: AppConfig) -> AppState {
  let app_state = AppState::new(store, config);
  pipelines::register_all_pipelines(&app_state.flows);
  app_state
}

/// Opens the configured backend and builds the state on top of it.
pub async fn bootstrap(config: AppConfig) -> Result<AppState> {
  let store = store::connect(&config).await?;
  Ok(build_app_state(store, config))
}

/// Malformed JSON bodies answer with the same `{"error": ...}` shape as
/// every other client error.
pub fn json_config() -> actix_data::JsonConfig {
  actix_data::JsonConfig::default()
    .error_handler(|err, _req| AppError::Validation(format!("Invalid request body: {}", err)).into())
}

pub fn query_config() -> actix_data::QueryConfig {
  actix_data::QueryConfig::default()
    .error_handler(|err, _req| AppError::Validation(format!("Invalid query string: {}", err)).into())
}

/// Turns a malformed path segment (a non-numeric id, say) into a JSON 400.
pub fn path_config() -> actix_data::PathConfig {
  actix_data::PathConfig::default()
    .error_handler(|err, _req| AppError::Validation(format!("Invalid path parameter: {}", err)).into())
}
