// server/src/models/catalog.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// A bookable kind of service (photography, videography, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceType {
  pub service_id: i64,
  pub name: String,
  pub description: Option<String>,
  pub base_price_rwf: i64,
  pub created_at: DateTime<Utc>,
}

/// Body of the admin create/update service calls.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInput {
  pub name: String,
  pub description: Option<String>,
  #[serde(alias = "basePriceRwf", alias = "base_price")]
  pub base_price_rwf: i64,
}

impl ServiceInput {
  pub fn validated(mut self) -> Result<Self, AppError> {
    self.name = self.name.trim().to_string();
    if self.name.is_empty() {
      return Err(AppError::Validation("Service name is required.".to_string()));
    }
    if self.name.chars().count() > 100 {
      return Err(AppError::Validation("Service name is limited to 100 characters.".to_string()));
    }
    if self.base_price_rwf < 0 {
      return Err(AppError::Validation("Base price cannot be negative.".to_string()));
    }
    Ok(self)
  }
}

/// Row of the admin "manage givers" table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GiverSummary {
  pub giver_id: i64,
  pub full_name: String,
  pub email: String,
  pub hourly_rate_rwf: Option<i64>,
  pub is_verified: bool,
  pub created_at: DateTime<Utc>,
}
