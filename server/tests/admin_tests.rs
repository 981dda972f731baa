// server/tests/admin_tests.rs

mod common;

use common::*;
use flow::{ContextData, PipelineResult};
use mediahub::errors::AppError;
use mediahub::models::{BookingFilter, BookingStatus, Role, ServiceInput, SettingsBatch};
use mediahub::pipelines::contexts::{PaymentCtxData, SettingsCtxData};
use serde_json::{json, Map, Value};

fn object(value: Value) -> Map<String, Value> {
  match value {
    Value::Object(map) => map,
    other => panic!("expected object, got {}", other),
  }
}

#[tokio::test]
async fn dashboard_counts_every_booking_and_paid_revenue() {
  let m = marketplace_with_booking().await;
  advance_to(&m, BookingStatus::Accepted).await;
  let ctx = ContextData::new(PaymentCtxData::new(m.state.clone(), actor(&m.client), m.booking.booking_id));
  m.state.flows.run(ctx).await.unwrap();

  for _ in 0..2 {
    run_create_booking(
      &m.state,
      booking_request(&m.state, Some(actor(&m.client)), m.giver.id, m.service.service_id),
    )
    .await
    .unwrap();
  }

  let overview = m.state.store.dashboard_overview().await.unwrap();
  let all = m.state.store.list_bookings(&BookingFilter::default()).await.unwrap();
  assert_eq!(overview.key_metrics.total_bookings, all.len() as i64);
  assert_eq!(overview.key_metrics.total_bookings, 3);
  assert_eq!(overview.key_metrics.total_revenue, 20_000);
  assert_eq!(overview.monthly_revenue_data.len(), 1);
  assert_eq!(overview.monthly_revenue_data[0].revenue, 20_000);
  assert_eq!(overview.service_usage_data.len(), 1);
  assert_eq!(overview.service_usage_data[0].name, "Photography");
  assert_eq!(overview.service_usage_data[0].bookings, 3);
}

#[tokio::test]
async fn dashboard_on_empty_store_has_zeroes_and_both_giver_buckets() {
  let state = test_state();
  let overview = state.store.dashboard_overview().await.unwrap();

  assert_eq!(overview.key_metrics.total_revenue, 0);
  assert_eq!(overview.key_metrics.total_bookings, 0);
  assert!(overview.monthly_revenue_data.is_empty());
  assert!(overview.service_usage_data.is_empty());
  let buckets: Vec<(&str, i64)> = overview
    .giver_status_data
    .iter()
    .map(|g| (g.status.as_str(), g.count))
    .collect();
  assert_eq!(buckets, vec![("Verified", 0), ("Pending", 0)]);
}

#[tokio::test]
async fn new_clients_only_counts_the_last_thirty_days() {
  let state = test_state();
  seed_account_created(&state, Role::Client, "fresh@mediahub.rw", 3).await;
  seed_account_created(&state, Role::Client, "old@mediahub.rw", 90).await;

  let overview = state.store.dashboard_overview().await.unwrap();
  assert_eq!(overview.key_metrics.new_clients, 1);
}

#[tokio::test]
async fn verifying_a_giver_moves_them_between_buckets() {
  let state = test_state();
  let giver = seed_account(&state, Role::Giver, "giver@mediahub.rw").await;
  seed_account(&state, Role::Giver, "second.giver@mediahub.rw").await;

  assert!(state.store.update_giver_status(giver.id, true).await.unwrap());
  assert!(!state.store.update_giver_status(9_999, true).await.unwrap());

  let overview = state.store.dashboard_overview().await.unwrap();
  assert_eq!(overview.key_metrics.verified_givers, 1);
  assert_eq!(overview.giver_status_data[0].count, 1);
  assert_eq!(overview.giver_status_data[1].count, 1);

  let givers = state.store.list_givers().await.unwrap();
  assert_eq!(givers.len(), 2);
  assert!(givers.iter().any(|g| g.giver_id == giver.id && g.is_verified));
}

#[tokio::test]
async fn services_referenced_by_bookings_cannot_be_deleted() {
  let m = marketplace_with_booking().await;
  let unused = seed_service(&m.state, "Editing").await;

  let err = m.state.store.delete_service(m.service.service_id).await.unwrap_err();
  assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);
  assert!(m.state.store.delete_service(unused.service_id).await.unwrap());
  assert!(!m.state.store.delete_service(unused.service_id).await.unwrap());

  let renamed = m
    .state
    .store
    .update_service(
      m.service.service_id,
      ServiceInput {
        name: "Event photography".to_string(),
        description: None,
        base_price_rwf: 30_000,
      },
    )
    .await
    .unwrap()
    .unwrap();
  assert_eq!(renamed.name, "Event photography");
  assert_eq!(renamed.base_price_rwf, 30_000);
}

#[tokio::test]
async fn duplicate_service_names_conflict() {
  let state = test_state();
  seed_service(&state, "Photography").await;
  let err = state
    .store
    .create_service(ServiceInput {
      name: "Photography".to_string(),
      description: None,
      base_price_rwf: 1,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);
}

#[tokio::test]
async fn settings_pipeline_saves_and_reloads() {
  let state = test_state();
  let ctx = ContextData::new(SettingsCtxData::new(
    state.clone(),
    object(json!({ "commissionRate": 10, "currency": "RWF", "maintenanceMode": false })),
  ));

  let result = state.flows.run(ctx.clone()).await.unwrap();
  assert_eq!(result, PipelineResult::Completed);

  let saved = ctx.read().saved_settings.clone().unwrap();
  assert_eq!(saved.get("commissionRate").map(String::as_str), Some("10"));
  assert_eq!(saved.get("currency").map(String::as_str), Some("RWF"));
  assert_eq!(saved.get("maintenanceMode").map(String::as_str), Some("false"));
}

#[tokio::test]
async fn settings_pipeline_rejects_bad_batches_without_writing() {
  let state = test_state();
  let cases = [
    json!({}),
    json!({ "commissionRate": 12, "currency": "R".repeat(300) }),
    json!({ "commissionRate": 12, "tiers": [1, 2] }),
  ];

  for case in cases {
    let ctx = ContextData::new(SettingsCtxData::new(state.clone(), object(case.clone())));
    let err = state.flows.run(ctx).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{} got {:?}", case, err);
  }
  assert!(state.store.list_settings().await.unwrap().is_empty());
}

#[tokio::test]
async fn storage_failure_mid_batch_rolls_back_every_key() {
  let state = test_state();
  let mut initial = SettingsBatch::new();
  initial.insert("commissionRate", "10").insert("currency", "RWF").insert("supportEmail", "help@mediahub.rw");
  state.store.upsert_settings(&initial).await.unwrap();

  // The second key in order overflows the value column.
  let mut update = SettingsBatch::new();
  update
    .insert("commissionRate", "15")
    .insert("currency", "X".repeat(400))
    .insert("supportEmail", "support@mediahub.rw");
  assert!(state.store.upsert_settings(&update).await.is_err());

  let stored = state.store.list_settings().await.unwrap();
  assert_eq!(stored.get("commissionRate").map(String::as_str), Some("10"));
  assert_eq!(stored.get("currency").map(String::as_str), Some("RWF"));
  assert_eq!(stored.get("supportEmail").map(String::as_str), Some("help@mediahub.rw"));
}
