// server/src/pipelines/mod.rs

//! Defines and registers every workflow pipeline of the backend.

use crate::errors::AppError;
use flow::Flows;

pub mod common_steps;
pub mod contexts;

pub mod booking_pipeline;
pub mod login_pipeline;
pub mod payment_pipeline;
pub mod register_pipeline;
pub mod review_pipeline;
pub mod settings_pipeline;

/// Registers all pipelines with `flows`. Called once at startup, before the
/// server accepts requests.
pub fn register_all_pipelines(flows: &Flows<AppError>) {
  tracing::info!("Registering pipelines...");

  register_pipeline::register_register_pipeline(flows);
  login_pipeline::register_login_pipeline(flows);
  booking_pipeline::register_create_booking_pipeline(flows);
  booking_pipeline::register_booking_status_pipeline(flows);
  review_pipeline::register_review_pipeline(flows);
  payment_pipeline::register_payment_pipeline(flows);
  settings_pipeline::register_settings_pipeline(flows);

  tracing::info!("All application pipelines registered.");
}
