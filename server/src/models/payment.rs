// server/src/models/payment.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payment {
  pub payment_id: i64,
  pub booking_id: i64,
  pub amount_rwf: i64,
  pub method: String,
  /// Reference handed back by the (simulated) gateway.
  pub reference: String,
  pub status: String,
  pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
  pub booking_id: i64,
  pub amount_rwf: i64,
  pub method: String,
  pub reference: String,
}
