// server/src/pipelines/register_pipeline.rs

use crate::errors::AppError;
use crate::models::{NewAccount, Role};
use crate::pipelines::contexts::RegisterCtxData;
use crate::services::auth_service::{self, MIN_PASSWORD_LEN};
use chrono::Utc;
use flow::{ContextData, Flows, Pipeline, PipelineControl};
use tracing::{event, info, warn, Level};

/// Registers the client/giver self-registration pipeline.
pub fn register_register_pipeline(flows: &Flows<AppError>) {
  let mut p = Pipeline::<RegisterCtxData, AppError>::new(&[
    ("validate_registration_input", false, None),
    ("hash_registration_password", false, None),
    ("create_account_record", false, None),
  ]);

  p.on_root("validate_registration_input", |ctx_data: ContextData<RegisterCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      guard.full_name = guard.full_name.trim().to_string();
      guard.email = guard.email.trim().to_ascii_lowercase();
      event!(Level::DEBUG, email = %guard.email, role = %guard.role, "Validating registration input.");

      if !guard.role.can_self_register() {
        warn!("Attempt to self-register an admin account.");
        return Err(AppError::Forbidden("Admin accounts cannot be self-registered.".to_string()));
      }
      if guard.full_name.is_empty() {
        return Err(AppError::Validation("Full name is required.".to_string()));
      }
      if guard.email.is_empty() || !guard.email.contains('@') {
        return Err(AppError::Validation("Valid email is required.".to_string()));
      }
      if guard.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
          "Password must be at least {} characters long.",
          MIN_PASSWORD_LEN
        )));
      }
      let hourly_rate = guard.hourly_rate_rwf;
      match hourly_rate {
        Some(rate) if rate < 0 => {
          return Err(AppError::Validation("Hourly rate cannot be negative.".to_string()));
        }
        Some(_) if guard.role != Role::Giver => {
          // Only the giver table has the column.
          guard.hourly_rate_rwf = None;
        }
        _ => {}
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("hash_registration_password", |ctx_data: ContextData<RegisterCtxData>| {
    Box::pin(async move {
      let password = ctx_data.read().password.clone();
      let hash = auth_service::hash_password(&password)?;
      {
        let mut guard = ctx_data.write();
        guard.password_hash = Some(hash);
        guard.password.clear();
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("create_account_record", |ctx_data: ContextData<RegisterCtxData>| {
    Box::pin(async move {
      let (store, new_account) = {
        let guard = ctx_data.read();
        let password_hash = guard
          .password_hash
          .clone()
          .ok_or_else(|| AppError::Internal("Password hash missing before account creation.".to_string()))?;
        let new_account = NewAccount {
          role: guard.role,
          full_name: guard.full_name.clone(),
          email: guard.email.clone(),
          password_hash,
          hourly_rate_rwf: guard.hourly_rate_rwf,
          created_at: Utc::now(),
        };
        (guard.app_state.store.clone(), new_account)
      };

      let account = store.create_account(new_account).await?;
      info!(account_id = account.id, role = %account.role, "Account registered.");
      ctx_data.write().created_account = Some(account);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
  tracing::info!("Registration pipeline registered.");
}
