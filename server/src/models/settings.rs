// server/src/models/settings.rs

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::errors::AppError;

/// Width of `System_Setting.setting_key`.
pub const SETTING_KEY_MAX_LEN: usize = 64;
/// Width of `System_Setting.setting_value`.
pub const SETTING_VALUE_MAX_LEN: usize = 255;

/// Key/value pairs written together in one transaction, in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsBatch {
  entries: BTreeMap<String, String>,
}

impl SettingsBatch {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
    self.entries.insert(key.into(), value.into());
    self
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  /// Builds a batch from a JSON object of scalar values. Numbers and booleans
  /// are stored in their JSON text form.
  pub fn from_json(object: Map<String, Value>) -> Result<Self, AppError> {
    let mut batch = SettingsBatch::new();
    for (key, value) in object {
      let text = match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => {
          return Err(AppError::Validation(format!(
            "Setting '{}' must be a string, number or boolean.",
            key
          )))
        }
      };
      batch.insert(key, text);
    }
    Ok(batch)
  }
}

/// Setting keys are identifiers such as `commissionRate` or `support.email`.
pub fn validate_setting_key(key: &str) -> Result<(), AppError> {
  let well_formed = !key.is_empty()
    && key
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
  if well_formed {
    Ok(())
  } else {
    Err(AppError::Validation(format!("Invalid setting key '{}'", key)))
  }
}
