// server/src/services/payment_mock.rs

//! Stand-in for a mobile-money gateway. It only waits and hands back a
//! reference; nothing leaves the process.

use crate::errors::{AppError, Result as AppResult};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

pub const MOCK_PAYMENT_METHOD: &str = "mock_mobile_money";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCharge {
  pub reference: String,
  pub amount_rwf: i64,
  pub method: String,
}

#[instrument(skip(delay), fields(delay_ms = delay.as_millis() as u64))]
pub async fn charge(booking_id: i64, amount_rwf: i64, delay: Duration) -> AppResult<MockCharge> {
  if amount_rwf <= 0 {
    return Err(AppError::Validation("Amount must be greater than zero".to_string()));
  }
  if !delay.is_zero() {
    tokio::time::sleep(delay).await;
  }

  let reference = format!("MH-{}-{}", booking_id, Uuid::new_v4().simple());
  info!(%reference, "Mock charge succeeded.");
  Ok(MockCharge {
    reference,
    amount_rwf,
    method: MOCK_PAYMENT_METHOD.to_string(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn charge_returns_a_booking_scoped_reference() {
    let charge = charge(12, 20_000, Duration::ZERO).await.unwrap();
    assert!(charge.reference.starts_with("MH-12-"));
    assert_eq!(charge.amount_rwf, 20_000);
  }

  #[tokio::test]
  async fn zero_amount_is_refused() {
    assert!(matches!(charge(1, 0, Duration::ZERO).await, Err(AppError::Validation(_))));
  }
}
