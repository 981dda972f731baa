// server/src/pipelines/common_steps.rs

//! Checks shared by several booking workflows.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{Actor, Booking, Role};
use crate::store::Store;
use tracing::{instrument, warn};

pub const MAX_NOTE_LEN: usize = 1000;

/// Loads a booking or fails with `NotFound`.
#[instrument(name = "common_step::load_booking", skip(store))]
pub async fn load_booking(store: &dyn Store, booking_id: i64) -> AppResult<Booking> {
  store.get_booking(booking_id).await?.ok_or_else(|| {
    warn!("Booking not found.");
    AppError::NotFound(format!("Booking {} not found", booking_id))
  })
}

/// The actor must be the booking's client.
pub fn ensure_booking_client(actor: &Actor, booking: &Booking, action: &str) -> AppResult<()> {
  if actor.role == Role::Client && booking.client_id == actor.account_id {
    Ok(())
  } else {
    warn!(
      account_id = actor.account_id,
      role = %actor.role,
      booking_id = booking.booking_id,
      "Actor is not the booking's client."
    );
    Err(AppError::Forbidden(format!("Only the client of this booking may {}.", action)))
  }
}

/// Trims free text, turns blank into `None` and enforces a length cap.
pub fn normalize_text(field: &str, text: Option<String>, max_len: usize) -> AppResult<Option<String>> {
  let text = text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
  match text {
    Some(t) if t.chars().count() > max_len => Err(AppError::Validation(format!(
      "{} is limited to {} characters.",
      field, max_len
    ))),
    other => Ok(other),
  }
}
