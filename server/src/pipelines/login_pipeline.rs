// server/src/pipelines/login_pipeline.rs

use crate::errors::AppError;
use crate::models::Account;
use crate::pipelines::contexts::LoginCtxData;
use crate::services::auth_service;
use flow::{ContextData, Flows, Pipeline, PipelineControl};
use tracing::{event, info, warn, Level};

/// Registers the login pipeline.
///
/// An unknown email or a wrong password stops the run without an error and
/// leaves `account` empty. The caller turns that into a 401; only storage or
/// hashing failures come back as `Err`.
pub fn register_login_pipeline(flows: &Flows<AppError>) {
  let mut p = Pipeline::<LoginCtxData, AppError>::new(&[
    ("validate_login_input", false, None),
    ("fetch_credentials", false, None),
    ("verify_login_password", false, None),
    ("issue_session_token", false, None),
  ]);

  p.on_root("validate_login_input", |ctx_data: ContextData<LoginCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      guard.email = guard.email.trim().to_ascii_lowercase();
      if guard.email.is_empty() {
        return Err(AppError::Validation("Email is required.".to_string()));
      }
      if guard.password.is_empty() {
        return Err(AppError::Validation("Password is required.".to_string()));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("fetch_credentials", |ctx_data: ContextData<LoginCtxData>| {
    Box::pin(async move {
      let (store, role, email) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.role, guard.email.clone())
      };

      event!(Level::DEBUG, %role, "Looking up credentials.");
      match store.find_credentials(role, &email).await? {
        Some(credentials) => {
          ctx_data.write().credentials = Some(credentials);
          Ok::<_, AppError>(PipelineControl::Continue)
        }
        None => {
          warn!(%role, "No account for this email and role.");
          Ok(PipelineControl::Stop)
        }
      }
    })
  });

  p.on_root("verify_login_password", |ctx_data: ContextData<LoginCtxData>| {
    Box::pin(async move {
      let (credentials, password, role) = {
        let mut guard = ctx_data.write();
        let password = std::mem::take(&mut guard.password);
        (guard.credentials.take(), password, guard.role)
      };
      let credentials =
        credentials.ok_or_else(|| AppError::Internal("Credentials missing before password check.".to_string()))?;

      if !auth_service::verify_password(&credentials.password_hash, &password)? {
        warn!(account_id = credentials.id, %role, "Password mismatch.");
        return Ok(PipelineControl::Stop);
      }

      ctx_data.write().account = Some(Account {
        id: credentials.id,
        role,
        full_name: credentials.full_name,
        email: credentials.email,
      });
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("issue_session_token", |ctx_data: ContextData<LoginCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let (account_id, role) = match guard.account.as_ref() {
        Some(account) => (account.id, account.role),
        None => return Err(AppError::Internal("Account missing before session issue.".to_string())),
      };
      let token = guard.app_state.sessions.issue(account_id, role);
      guard.session_token = Some(token);
      info!(account_id, %role, "Login succeeded; session issued.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
  tracing::info!("Login pipeline registered.");
}
