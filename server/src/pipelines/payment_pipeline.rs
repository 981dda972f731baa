// server/src/pipelines/payment_pipeline.rs

use crate::errors::AppError;
use crate::models::NewPayment;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::PaymentCtxData;
use crate::services::payment_mock;
use flow::{ContextData, Flows, Pipeline, PipelineControl};
use tracing::{info, warn};

/// Registers the simulated payment pipeline.
///
/// A booking that is already paid short-circuits in `check_already_paid`
/// (run stops, `already_paid` set), so a retried request never reaches the
/// gateway twice. `record_payment` writes the payment row and the
/// `is_paid` flag together.
pub fn register_payment_pipeline(flows: &Flows<AppError>) {
  let mut p = Pipeline::<PaymentCtxData, AppError>::new(&[
    ("load_payable_booking", false, None),
    ("check_already_paid", false, None),
    ("check_payable_status", false, None),
    ("charge_gateway", false, None),
    ("record_payment", false, None),
  ]);

  p.on_root("load_payable_booking", |ctx_data: ContextData<PaymentCtxData>| {
    Box::pin(async move {
      let (store, actor, booking_id) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.actor, guard.booking_id)
      };
      let booking = common_steps::load_booking(store.as_ref(), booking_id).await?;
      common_steps::ensure_booking_client(&actor, &booking, "pay for it")?;
      ctx_data.write().booking = Some(booking);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("check_already_paid", |ctx_data: ContextData<PaymentCtxData>| {
    Box::pin(async move {
      let (store, booking_id, is_paid) = {
        let guard = ctx_data.read();
        let is_paid = guard.booking.as_ref().map_or(false, |b| b.is_paid);
        (guard.app_state.store.clone(), guard.booking_id, is_paid)
      };
      if !is_paid {
        return Ok(PipelineControl::Continue);
      }

      let existing = store.find_payment(booking_id).await?.ok_or_else(|| {
        AppError::Internal(format!("Booking {} is marked paid but has no payment row", booking_id))
      })?;
      info!(booking_id, payment_id = existing.payment_id, "Booking already paid.");
      {
        let mut guard = ctx_data.write();
        guard.payment = Some(existing);
        guard.already_paid = true;
      }
      Ok::<_, AppError>(PipelineControl::Stop)
    })
  });

  p.on_root("check_payable_status", |ctx_data: ContextData<PaymentCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let booking = guard
        .booking
        .as_ref()
        .ok_or_else(|| AppError::Internal("Booking missing before payment checks.".to_string()))?;
      if !booking.status.is_payable() {
        warn!(booking_id = booking.booking_id, status = %booking.status, "Payment for unaccepted booking refused.");
        return Err(AppError::Conflict(format!(
          "Booking {} is {}; it must be accepted before payment.",
          booking.booking_id, booking.status
        )));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("charge_gateway", |ctx_data: ContextData<PaymentCtxData>| {
    Box::pin(async move {
      let (booking_id, amount_rwf, delay) = {
        let guard = ctx_data.read();
        let amount = guard.booking.as_ref().map_or(0, |b| b.total_price_rwf);
        (guard.booking_id, amount, guard.app_state.config.payment_delay)
      };
      let charge = payment_mock::charge(booking_id, amount_rwf, delay).await?;
      ctx_data.write().charge = Some(charge);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("record_payment", |ctx_data: ContextData<PaymentCtxData>| {
    Box::pin(async move {
      let (store, booking_id, charge) = {
        let guard = ctx_data.read();
        let charge = guard
          .charge
          .clone()
          .ok_or_else(|| AppError::Internal("Gateway charge missing before recording.".to_string()))?;
        (guard.app_state.store.clone(), guard.booking_id, charge)
      };

      let recorded = store
        .record_payment(NewPayment {
          booking_id,
          amount_rwf: charge.amount_rwf,
          method: charge.method,
          reference: charge.reference,
        })
        .await?;

      let (payment, already_paid) = match recorded {
        Some(payment) => {
          info!(booking_id, payment_id = payment.payment_id, "Booking paid.");
          (payment, false)
        }
        None => {
          // Another request paid the booking while the gateway was waiting.
          let existing = store
            .find_payment(booking_id)
            .await?
            .ok_or_else(|| AppError::Conflict(format!("Booking {} was paid concurrently", booking_id)))?;
          (existing, true)
        }
      };
      {
        let mut guard = ctx_data.write();
        guard.payment = Some(payment);
        guard.already_paid = already_paid;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
  tracing::info!("Payment pipeline registered.");
}
