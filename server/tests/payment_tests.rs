// server/tests/payment_tests.rs

mod common;

use common::*;
use flow::{ContextData, PipelineResult};
use mediahub::errors::AppError;
use mediahub::models::{Actor, BookingStatus, Payment, Role};
use mediahub::pipelines::contexts::PaymentCtxData;
use mediahub::services::payment_mock::MOCK_PAYMENT_METHOD;
use mediahub::state::AppState;
use serial_test::serial;
use std::time::Duration;

struct PayOutcome {
  result: PipelineResult,
  payment: Payment,
  already_paid: bool,
}

async fn pay(state: &AppState, who: Actor, booking_id: i64) -> Result<PayOutcome, AppError> {
  let ctx = ContextData::new(PaymentCtxData::new(state.clone(), who, booking_id));
  let result = state.flows.run(ctx.clone()).await?;
  let guard = ctx.read();
  Ok(PayOutcome {
    result,
    payment: guard.payment.clone().expect("payment in context"),
    already_paid: guard.already_paid,
  })
}

#[tokio::test]
async fn accepted_booking_is_paid_once() {
  let m = marketplace_with_booking().await;
  advance_to(&m, BookingStatus::Accepted).await;

  let first = pay(&m.state, actor(&m.client), m.booking.booking_id).await.unwrap();
  assert_eq!(first.result, PipelineResult::Completed);
  assert!(!first.already_paid);
  assert_eq!(first.payment.amount_rwf, 20_000);
  assert_eq!(first.payment.method, MOCK_PAYMENT_METHOD);
  assert!(first.payment.reference.starts_with(&format!("MH-{}-", m.booking.booking_id)));

  let booking = m.state.store.get_booking(m.booking.booking_id).await.unwrap().unwrap();
  assert!(booking.is_paid);

  let again = pay(&m.state, actor(&m.client), m.booking.booking_id).await.unwrap();
  assert_eq!(again.result, PipelineResult::Stopped);
  assert!(again.already_paid);
  assert_eq!(again.payment.payment_id, first.payment.payment_id);
  assert_eq!(again.payment.reference, first.payment.reference);
}

#[tokio::test]
async fn pending_booking_cannot_be_paid() {
  let m = marketplace_with_booking().await;

  let err = pay(&m.state, actor(&m.client), m.booking.booking_id).await.err().unwrap();
  assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);
  assert!(m.state.store.find_payment(m.booking.booking_id).await.unwrap().is_none());
}

#[tokio::test]
async fn only_the_booking_client_pays() {
  let m = marketplace_with_booking().await;
  advance_to(&m, BookingStatus::Accepted).await;
  let stranger = seed_account(&m.state, Role::Client, "stranger@mediahub.rw").await;

  for who in [actor(&stranger), actor(&m.giver)] {
    let err = pay(&m.state, who, m.booking.booking_id).await.err().unwrap();
    assert!(matches!(err, AppError::Forbidden(_)), "{:?} got {:?}", who, err);
  }

  let err = pay(&m.state, actor(&m.client), 9_999).await.err().unwrap();
  assert!(matches!(err, AppError::NotFound(_)), "got {:?}", err);
}

// Uses a real gateway delay so both requests pass the already-paid check
// before either records.
#[tokio::test]
#[serial]
async fn concurrent_payments_record_a_single_row() {
  let state = test_state_with(mediahub::config::AppConfig {
    payment_delay: Duration::from_millis(50),
    ..test_config()
  });
  let client = seed_account(&state, Role::Client, "client@mediahub.rw").await;
  let giver = seed_account(&state, Role::Giver, "giver@mediahub.rw").await;
  let service = seed_service(&state, "Drone footage").await;
  let booking = run_create_booking(&state, booking_request(&state, Some(actor(&client)), giver.id, service.service_id))
    .await
    .unwrap();
  run_set_status(&state, actor(&giver), booking.booking_id, "Accepted").await.unwrap();

  let (a, b) = tokio::join!(
    pay(&state, actor(&client), booking.booking_id),
    pay(&state, actor(&client), booking.booking_id),
  );
  let (a, b) = (a.unwrap(), b.unwrap());

  assert_eq!(a.payment.payment_id, b.payment.payment_id);
  assert_eq!(
    [a.already_paid, b.already_paid].iter().filter(|paid| **paid).count(),
    1,
    "exactly one request should report the booking as already paid"
  );

  let overview = state.store.dashboard_overview().await.unwrap();
  assert_eq!(overview.key_metrics.total_revenue, 20_000);
}
