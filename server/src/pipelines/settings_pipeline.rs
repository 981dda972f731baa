// server/src/pipelines/settings_pipeline.rs

use crate::errors::AppError;
use crate::models::settings::{validate_setting_key, SETTING_KEY_MAX_LEN, SETTING_VALUE_MAX_LEN};
use crate::models::SettingsBatch;
use crate::pipelines::contexts::SettingsCtxData;
use flow::{ContextData, Flows, Pipeline, PipelineControl};
use tracing::{event, info, Level};

/// Registers the admin settings pipeline. The whole batch is written in one
/// transaction; a failure on any key leaves every key as it was.
pub fn register_settings_pipeline(flows: &Flows<AppError>) {
  let mut p = Pipeline::<SettingsCtxData, AppError>::new(&[
    ("build_settings_batch", false, None),
    ("persist_settings_batch", false, None),
    ("reload_settings", false, None),
  ]);

  p.on_root("build_settings_batch", |ctx_data: ContextData<SettingsCtxData>| {
    Box::pin(async move {
      let raw = std::mem::take(&mut ctx_data.write().raw_settings);
      let batch = SettingsBatch::from_json(raw)?;
      if batch.is_empty() {
        return Err(AppError::Validation("No settings supplied.".to_string()));
      }
      for (key, value) in batch.iter() {
        validate_setting_key(key)?;
        if key.chars().count() > SETTING_KEY_MAX_LEN {
          return Err(AppError::Validation(format!(
            "Setting key '{}' exceeds {} characters.",
            key, SETTING_KEY_MAX_LEN
          )));
        }
        if value.chars().count() > SETTING_VALUE_MAX_LEN {
          return Err(AppError::Validation(format!(
            "Value of '{}' exceeds {} characters.",
            key, SETTING_VALUE_MAX_LEN
          )));
        }
      }
      event!(Level::DEBUG, keys = ?batch.keys().collect::<Vec<_>>(), "Settings batch built.");
      ctx_data.write().batch = Some(batch);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("persist_settings_batch", |ctx_data: ContextData<SettingsCtxData>| {
    Box::pin(async move {
      let (store, batch) = {
        let guard = ctx_data.read();
        let batch = guard
          .batch
          .clone()
          .ok_or_else(|| AppError::Internal("Settings batch missing before persist.".to_string()))?;
        (guard.app_state.store.clone(), batch)
      };
      store.upsert_settings(&batch).await?;
      info!(keys = batch.len(), "System settings updated.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("reload_settings", |ctx_data: ContextData<SettingsCtxData>| {
    Box::pin(async move {
      let store = ctx_data.read().app_state.store.clone();
      let saved = store.list_settings().await?;
      ctx_data.write().saved_settings = Some(saved);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
  tracing::info!("Settings pipeline registered.");
}
