// server/src/web/handlers/catalog_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

#[instrument(name = "handler::list_services", skip(app_state))]
pub async fn list_services_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let services = app_state.store.list_services().await?;
  info!("Fetched {} services.", services.len());
  Ok(HttpResponse::Ok().json(services))
}

#[instrument(name = "handler::get_service", skip(app_state, path), fields(service_id = %path.as_ref()))]
pub async fn get_service_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let service_id = path.into_inner();
  let service = app_state
    .store
    .get_service(service_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Service {} not found", service_id)))?;
  Ok(HttpResponse::Ok().json(service))
}
