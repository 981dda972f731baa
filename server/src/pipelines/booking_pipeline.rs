// server/src/pipelines/booking_pipeline.rs

//! Booking creation and the status state machine.

use crate::errors::AppError;
use crate::models::{BookingStatus, NewBooking, Role};
use crate::pipelines::common_steps::{self, MAX_NOTE_LEN};
use crate::pipelines::contexts::{BookingStatusCtxData, CreateBookingCtxData};
use flow::{ContextData, Flows, Pipeline, PipelineControl};
use tracing::{event, info, warn, Level};

pub fn register_create_booking_pipeline(flows: &Flows<AppError>) {
  let mut p = Pipeline::<CreateBookingCtxData, AppError>::new(&[
    ("require_client_session", false, None),
    ("validate_booking_request", false, None),
    ("check_booking_references", false, None),
    ("insert_booking", false, None),
  ]);

  p.on_root("require_client_session", |ctx_data: ContextData<CreateBookingCtxData>| {
    Box::pin(async move {
      let actor = ctx_data.read().actor;
      match actor {
        None => {
          warn!("Booking attempt without a session.");
          Err(AppError::Auth("Please log in to book.".to_string()))
        }
        Some(actor) if actor.role != Role::Client => {
          warn!(role = %actor.role, "Non-client tried to create a booking.");
          Err(AppError::Forbidden("Only clients can create bookings.".to_string()))
        }
        Some(_) => Ok(PipelineControl::Continue),
      }
    })
  });

  p.on_root("validate_booking_request", |ctx_data: ContextData<CreateBookingCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let client_id = guard.actor.map(|a| a.account_id);
      if guard.claimed_client_id.is_some() && guard.claimed_client_id != client_id {
        return Err(AppError::Forbidden("Bookings can only be made for your own account.".to_string()));
      }
      if guard.end_date < guard.start_date {
        return Err(AppError::Validation("End date cannot be before start date.".to_string()));
      }
      if guard.total_price_rwf <= 0 {
        return Err(AppError::Validation("Total price must be greater than zero.".to_string()));
      }
      let notes = guard.notes.take();
      guard.notes = common_steps::normalize_text("Notes", notes, MAX_NOTE_LEN)?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("check_booking_references", |ctx_data: ContextData<CreateBookingCtxData>| {
    Box::pin(async move {
      let (store, giver_id, service_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.giver_id, guard.service_id)
      };

      if store.find_account(Role::Giver, giver_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Service giver {} not found", giver_id)));
      }
      if store.get_service(service_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Service {} not found", service_id)));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("insert_booking", |ctx_data: ContextData<CreateBookingCtxData>| {
    Box::pin(async move {
      let (store, new_booking) = {
        let guard = ctx_data.read();
        let client_id = guard
          .actor
          .map(|a| a.account_id)
          .ok_or_else(|| AppError::Internal("Actor missing before booking insert.".to_string()))?;
        let new_booking = NewBooking {
          client_id,
          giver_id: guard.giver_id,
          service_id: guard.service_id,
          start_date: guard.start_date,
          end_date: guard.end_date,
          total_price_rwf: guard.total_price_rwf,
          notes: guard.notes.clone(),
        };
        (guard.app_state.store.clone(), new_booking)
      };

      let booking = store.create_booking(new_booking).await?;
      info!(
        booking_id = booking.booking_id,
        client_id = booking.client_id,
        giver_id = booking.giver_id,
        "Booking created."
      );
      ctx_data.write().created_booking = Some(booking);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
  tracing::info!("Create-booking pipeline registered.");
}

/// Registers the status-change pipeline. The write is a compare-and-set on
/// the status read in `load_booking_for_status`, so of two racing requests
/// only one lands.
pub fn register_booking_status_pipeline(flows: &Flows<AppError>) {
  let mut p = Pipeline::<BookingStatusCtxData, AppError>::new(&[
    ("parse_requested_status", false, None),
    ("load_booking_for_status", false, None),
    ("authorize_status_change", false, None),
    ("check_transition", false, None),
    ("write_status", false, None),
  ]);

  p.on_root("parse_requested_status", |ctx_data: ContextData<BookingStatusCtxData>| {
    Box::pin(async move {
      let raw = ctx_data.read().requested_status.clone();
      let next = raw.parse::<BookingStatus>()?;
      ctx_data.write().next_status = Some(next);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("load_booking_for_status", |ctx_data: ContextData<BookingStatusCtxData>| {
    Box::pin(async move {
      let (store, booking_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.booking_id)
      };
      let booking = common_steps::load_booking(store.as_ref(), booking_id).await?;
      ctx_data.write().booking = Some(booking);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("authorize_status_change", |ctx_data: ContextData<BookingStatusCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let (booking, next) = match (guard.booking.as_ref(), guard.next_status) {
        (Some(booking), Some(next)) => (booking, next),
        _ => return Err(AppError::Internal("Status context incomplete.".to_string())),
      };
      let actor = guard.actor;

      let is_party = actor.role != Role::Admin && booking.involves(actor.role, actor.account_id);
      if !is_party || !next.may_be_set_by(actor.role) {
        warn!(
          account_id = actor.account_id,
          role = %actor.role,
          booking_id = booking.booking_id,
          next = %next,
          "Status change refused."
        );
        return Err(AppError::Forbidden(format!(
          "A {} cannot set this booking to {}.",
          actor.role, next
        )));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("check_transition", |ctx_data: ContextData<BookingStatusCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let (current, next) = match (guard.booking.as_ref(), guard.next_status) {
        (Some(booking), Some(next)) => (booking.status, next),
        _ => return Err(AppError::Internal("Status context incomplete.".to_string())),
      };
      current.transition(next)?;
      event!(Level::DEBUG, from = %current, to = %next, "Transition allowed.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("write_status", |ctx_data: ContextData<BookingStatusCtxData>| {
    Box::pin(async move {
      let (store, booking_id, current, next) = {
        let guard = ctx_data.read();
        match (guard.booking.as_ref(), guard.next_status) {
          (Some(booking), Some(next)) => (guard.app_state.store.clone(), booking.booking_id, booking.status, next),
          _ => return Err(AppError::Internal("Status context incomplete.".to_string())),
        }
      };

      if !store.update_booking_status(booking_id, current, next).await? {
        let now = common_steps::load_booking(store.as_ref(), booking_id).await?;
        warn!(booking_id, expected = %current, found = %now.status, "Lost a concurrent status update.");
        return Err(AppError::Conflict(format!(
          "Booking {} changed to {} while this request was processed.",
          booking_id, now.status
        )));
      }

      let updated = common_steps::load_booking(store.as_ref(), booking_id).await?;
      info!(booking_id, from = %current, to = %next, "Booking status updated.");
      ctx_data.write().updated_booking = Some(updated);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
  tracing::info!("Booking status pipeline registered.");
}
