// server/src/web/handlers/admin_handlers.rs

//! Admin-only routes: dashboard, giver verification, service catalogue and
//! system settings.

use actix_web::{web, HttpResponse};
use flow::{ContextData, PipelineResult};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::ServiceInput;
use crate::pipelines::contexts::SettingsCtxData;
use crate::state::AppState;
use crate::web::extractors::AdminUser;

#[derive(Deserialize, Debug)]
pub struct GiverStatusPayload {
  #[serde(rename = "isVerified", alias = "is_verified")]
  pub is_verified: bool,
}

#[instrument(name = "handler::dashboard", skip_all)]
pub async fn dashboard_handler(app_state: web::Data<AppState>, _admin: AdminUser) -> Result<HttpResponse, AppError> {
  let overview = app_state.store.dashboard_overview().await?;
  Ok(HttpResponse::Ok().json(overview))
}

#[instrument(name = "handler::list_givers", skip_all)]
pub async fn list_givers_handler(app_state: web::Data<AppState>, _admin: AdminUser) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(app_state.store.list_givers().await?))
}

#[instrument(name = "handler::update_giver_status", skip(app_state, _admin, req_payload), fields(is_verified = req_payload.is_verified))]
pub async fn update_giver_status_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<i64>,
  req_payload: web::Json<GiverStatusPayload>,
) -> Result<HttpResponse, AppError> {
  let giver_id = path.into_inner();
  let is_verified = req_payload.is_verified;
  if !app_state.store.update_giver_status(giver_id, is_verified).await? {
    return Err(AppError::NotFound(format!("Service giver {} not found", giver_id)));
  }
  info!(giver_id, is_verified, "Giver verification updated.");
  Ok(HttpResponse::Ok().json(json!({
    "giverId": giver_id,
    "isVerified": is_verified,
  })))
}

// --- Service catalogue ---

#[instrument(name = "handler::admin_list_services", skip_all)]
pub async fn list_services_handler(app_state: web::Data<AppState>, _admin: AdminUser) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(app_state.store.list_services().await?))
}

#[instrument(name = "handler::create_service", skip_all)]
pub async fn create_service_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  req_payload: web::Json<ServiceInput>,
) -> Result<HttpResponse, AppError> {
  let input = req_payload.into_inner().validated()?;
  let service = app_state.store.create_service(input).await?;
  info!(service_id = service.service_id, "Service created.");
  Ok(HttpResponse::Created().json(service))
}

#[instrument(name = "handler::update_service", skip(app_state, _admin, req_payload))]
pub async fn update_service_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<i64>,
  req_payload: web::Json<ServiceInput>,
) -> Result<HttpResponse, AppError> {
  let service_id = path.into_inner();
  let input = req_payload.into_inner().validated()?;
  let service = app_state
    .store
    .update_service(service_id, input)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Service {} not found", service_id)))?;
  Ok(HttpResponse::Ok().json(service))
}

#[instrument(name = "handler::delete_service", skip(app_state, _admin))]
pub async fn delete_service_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let service_id = path.into_inner();
  if !app_state.store.delete_service(service_id).await? {
    return Err(AppError::NotFound(format!("Service {} not found", service_id)));
  }
  info!(service_id, "Service deleted.");
  Ok(HttpResponse::NoContent().finish())
}

// --- Settings ---

#[instrument(name = "handler::get_settings", skip_all)]
pub async fn get_settings_handler(app_state: web::Data<AppState>, _admin: AdminUser) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(app_state.store.list_settings().await?))
}

#[instrument(name = "handler::update_settings", skip_all, fields(keys = req_payload.len()))]
pub async fn update_settings_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  req_payload: web::Json<Map<String, Value>>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(SettingsCtxData::new(app_state.get_ref().clone(), req_payload.into_inner()));
  match app_state.flows.run(ctx.clone()).await? {
    PipelineResult::Completed => {
      let saved = ctx.read().saved_settings.clone().unwrap_or_default();
      Ok(HttpResponse::Ok().json(json!({
        "message": "Settings saved.",
        "settings": saved,
      })))
    }
    PipelineResult::Stopped => Err(AppError::Internal("Settings update was halted.".to_string())),
  }
}
