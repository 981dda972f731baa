// server/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use flow::{ContextData, PipelineResult};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::Role;
use crate::pipelines::contexts::{LoginCtxData, RegisterCtxData};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

// --- Request DTOs ---

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequestPayload {
  #[serde(alias = "full_name")]
  pub full_name: String,
  pub email: String,
  pub password: String,
  pub role: String,
  #[serde(default, alias = "hourly_rate_rwf")]
  pub hourly_rate_rwf: Option<i64>,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequestPayload {
  pub email: String,
  pub password: String,
  pub role: String,
}

fn parse_role(raw: &str) -> Result<Role, AppError> {
  raw.parse::<Role>().map_err(AppError::Validation)
}

// --- Handlers ---

#[instrument(name = "handler::register", skip(app_state, req_payload), fields(role = %req_payload.role))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<RegisterRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let role = parse_role(&payload.role)?;
  let ctx = ContextData::new(RegisterCtxData::new(
    app_state.get_ref().clone(),
    role,
    payload.full_name,
    payload.email,
    payload.password,
    payload.hourly_rate_rwf,
  ));

  match app_state.flows.run(ctx.clone()).await? {
    PipelineResult::Completed => {
      let account = ctx
        .read()
        .created_account
        .clone()
        .ok_or_else(|| AppError::Internal("Registration completed without an account.".to_string()))?;
      info!(account_id = account.id, "Registration successful.");
      Ok(HttpResponse::Created().json(json!({
        "message": "Account created successfully.",
        "account": account,
      })))
    }
    PipelineResult::Stopped => {
      warn!("Registration pipeline stopped unexpectedly.");
      Err(AppError::Internal("Registration was halted by an internal step.".to_string()))
    }
  }
}

#[instrument(name = "handler::login", skip(app_state, req_payload), fields(role = %req_payload.role))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<LoginRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let role = parse_role(&payload.role)?;
  let ctx = ContextData::new(LoginCtxData::new(
    app_state.get_ref().clone(),
    role,
    payload.email,
    payload.password,
  ));

  let outcome = app_state.flows.run(ctx.clone()).await?;
  let (account, token) = {
    let guard = ctx.read();
    (guard.account.clone(), guard.session_token.clone())
  };

  match (outcome, account, token) {
    (PipelineResult::Completed, Some(account), Some(token)) => {
      info!(account_id = account.id, "Login successful.");
      Ok(HttpResponse::Ok().json(json!({
        "id": account.id,
        "role": account.role,
        "fullName": account.full_name,
        "email": account.email,
        "token": token,
      })))
    }
    _ => Err(AppError::Auth("Invalid email or password.".to_string())),
  }
}

#[instrument(name = "handler::logout", skip(app_state, auth_user), fields(account_id = auth_user.account_id))]
pub async fn logout_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  app_state.sessions.revoke(&auth_user.token);
  info!("Session closed.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Logged out." })))
}

#[instrument(name = "handler::me", skip(app_state, auth_user), fields(account_id = auth_user.account_id))]
pub async fn me_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let account = app_state
    .store
    .find_account(auth_user.role, auth_user.account_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Account no longer exists.".to_string()))?;
  Ok(HttpResponse::Ok().json(account))
}
