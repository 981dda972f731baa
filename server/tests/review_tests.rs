// server/tests/review_tests.rs

mod common;

use common::*;
use flow::{ContextData, PipelineResult};
use futures_util::future::join_all;
use mediahub::errors::AppError;
use mediahub::models::{BookingStatus, GiverReviews, Review, Role};
use mediahub::pipelines::contexts::ReviewCtxData;
use mediahub::state::AppState;

async fn submit_review(
  state: &AppState,
  who: mediahub::models::Actor,
  booking_id: i64,
  rating: i64,
  comment: Option<&str>,
) -> Result<Review, AppError> {
  let ctx = ContextData::new(ReviewCtxData::new(
    state.clone(),
    who,
    booking_id,
    None,
    rating,
    comment.map(str::to_string),
  ));
  match state.flows.run(ctx.clone()).await? {
    PipelineResult::Completed => Ok(ctx.read().saved_review.clone().expect("saved review")),
    PipelineResult::Stopped => panic!("review pipeline stopped"),
  }
}

#[tokio::test]
async fn completed_booking_gets_one_review_that_can_be_edited() {
  let m = marketplace_with_booking().await;
  advance_to(&m, BookingStatus::Completed).await;
  let client = actor(&m.client);

  let first = submit_review(&m.state, client, m.booking.booking_id, 4, Some("Great shots")).await.unwrap();
  assert_eq!(first.rating.value(), 4);
  assert_eq!(first.giver_id, m.giver.id);
  assert_eq!(first.client_id, m.client.id);

  let second = submit_review(&m.state, client, m.booking.booking_id, 5, Some("Even better after edits"))
    .await
    .unwrap();
  assert_eq!(second.review_id, first.review_id);
  assert_eq!(second.rating.value(), 5);
  assert_eq!(second.comment.as_deref(), Some("Even better after edits"));

  let reviews = m.state.store.list_reviews_for_giver(m.giver.id).await.unwrap();
  assert_eq!(reviews.len(), 1);
}

#[tokio::test]
async fn concurrent_submissions_leave_a_single_review() {
  // Every submission passes its checks before any of them writes.
  let m = marketplace_on(interleaving_state()).await;
  advance_to(&m, BookingStatus::Completed).await;
  let client = actor(&m.client);

  let submissions = (1..=5).map(|rating| submit_review(&m.state, client, m.booking.booking_id, rating, None));
  let results = join_all(submissions).await;
  assert!(results.iter().all(Result::is_ok), "{:?}", results);

  let reviews = m.state.store.list_reviews_for_giver(m.giver.id).await.unwrap();
  assert_eq!(reviews.len(), 1);
  let stored = m
    .state
    .store
    .get_review_for_booking(m.booking.booking_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(stored.review_id, reviews[0].review_id);
}

#[tokio::test]
async fn ratings_outside_one_to_five_are_rejected() {
  let m = marketplace_with_booking().await;
  advance_to(&m, BookingStatus::Completed).await;

  for rating in [0, 6, -1] {
    let err = submit_review(&m.state, actor(&m.client), m.booking.booking_id, rating, None)
      .await
      .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "rating {} got {:?}", rating, err);
  }
  assert!(m
    .state
    .store
    .get_review_for_booking(m.booking.booking_id)
    .await
    .unwrap()
    .is_none());
}

#[tokio::test]
async fn unfinished_bookings_cannot_be_reviewed() {
  let m = marketplace_with_booking().await;

  let err = submit_review(&m.state, actor(&m.client), m.booking.booking_id, 5, None)
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);

  advance_to(&m, BookingStatus::Accepted).await;
  let err = submit_review(&m.state, actor(&m.client), m.booking.booking_id, 5, None)
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);
}

#[tokio::test]
async fn only_the_booking_client_reviews() {
  let m = marketplace_with_booking().await;
  advance_to(&m, BookingStatus::Completed).await;
  let stranger = seed_account(&m.state, Role::Client, "stranger@mediahub.rw").await;

  for who in [actor(&stranger), actor(&m.giver)] {
    let err = submit_review(&m.state, who, m.booking.booking_id, 3, None).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "{:?} got {:?}", who, err);
  }
}

#[tokio::test]
async fn claimed_giver_must_match_the_booking() {
  let m = marketplace_with_booking().await;
  advance_to(&m, BookingStatus::Completed).await;

  let ctx = ContextData::new(ReviewCtxData::new(
    m.state.clone(),
    actor(&m.client),
    m.booking.booking_id,
    Some(m.giver.id + 1),
    5,
    None,
  ));
  let err = m.state.flows.run(ctx).await.unwrap_err();
  assert!(matches!(err, AppError::Validation(_)), "got {:?}", err);
}

#[tokio::test]
async fn giver_average_covers_all_their_reviews() {
  let m = marketplace_with_booking().await;
  advance_to(&m, BookingStatus::Completed).await;
  submit_review(&m.state, actor(&m.client), m.booking.booking_id, 5, None).await.unwrap();

  let second = run_create_booking(
    &m.state,
    booking_request(&m.state, Some(actor(&m.client)), m.giver.id, m.service.service_id),
  )
  .await
  .unwrap();
  let giver = actor(&m.giver);
  run_set_status(&m.state, giver, second.booking_id, "Accepted").await.unwrap();
  run_set_status(&m.state, giver, second.booking_id, "Completed").await.unwrap();
  submit_review(&m.state, actor(&m.client), second.booking_id, 2, None).await.unwrap();

  let reviews = m.state.store.list_reviews_for_giver(m.giver.id).await.unwrap();
  let summary = GiverReviews::new(m.giver.id, reviews);
  assert_eq!(summary.review_count, 2);
  assert_eq!(summary.average_rating, Some(3.5));
}
