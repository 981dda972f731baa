// server/src/pipelines/review_pipeline.rs

use crate::errors::AppError;
use crate::models::{BookingStatus, NewReview, Rating};
use crate::pipelines::common_steps::{self, MAX_NOTE_LEN};
use crate::pipelines::contexts::ReviewCtxData;
use flow::{ContextData, Flows, Pipeline, PipelineControl};
use tracing::{info, warn};

/// Registers the review pipeline used for both create and edit. The last
/// step is one storage-level upsert keyed by `booking_id`, so concurrent
/// submissions for a booking still leave a single row.
pub fn register_review_pipeline(flows: &Flows<AppError>) {
  let mut p = Pipeline::<ReviewCtxData, AppError>::new(&[
    ("validate_review_input", false, None),
    ("load_reviewed_booking", false, None),
    ("check_review_eligibility", false, None),
    ("upsert_review", false, None),
  ]);

  p.on_root("validate_review_input", |ctx_data: ContextData<ReviewCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let rating = Rating::try_from(guard.raw_rating)?;
      let comment = guard.comment.take();
      guard.comment = common_steps::normalize_text("Comment", comment, MAX_NOTE_LEN)?;
      guard.rating = Some(rating);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("load_reviewed_booking", |ctx_data: ContextData<ReviewCtxData>| {
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

  p.on_root("check_review_eligibility", |ctx_data: ContextData<ReviewCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let booking = guard
        .booking
        .as_ref()
        .ok_or_else(|| AppError::Internal("Booking missing before review checks.".to_string()))?;

      common_steps::ensure_booking_client(&guard.actor, booking, "review it")?;
      if booking.status != BookingStatus::Completed {
        warn!(booking_id = booking.booking_id, status = %booking.status, "Review before completion refused.");
        return Err(AppError::Conflict(format!(
          "Booking {} is {}; only completed bookings can be reviewed.",
          booking.booking_id, booking.status
        )));
      }
      if let Some(claimed) = guard.claimed_giver_id {
        if claimed != booking.giver_id {
          return Err(AppError::Validation(format!(
            "Booking {} was not served by giver {}.",
            booking.booking_id, claimed
          )));
        }
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("upsert_review", |ctx_data: ContextData<ReviewCtxData>| {
    Box::pin(async move {
      let (store, review) = {
        let guard = ctx_data.read();
        match (guard.booking.as_ref(), guard.rating) {
          (Some(booking), Some(rating)) => (
            guard.app_state.store.clone(),
            NewReview {
              booking_id: booking.booking_id,
              client_id: booking.client_id,
              giver_id: booking.giver_id,
              rating,
              comment: guard.comment.clone(),
            },
          ),
          _ => return Err(AppError::Internal("Review context incomplete.".to_string())),
        }
      };

      let saved = store.upsert_review(review).await?;
      info!(
        review_id = saved.review_id,
        booking_id = saved.booking_id,
        rating = saved.rating.value(),
        "Review saved."
      );
      ctx_data.write().saved_review = Some(saved);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
  tracing::info!("Review pipeline registered.");
}
