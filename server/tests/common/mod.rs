// server/tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use flow::{ContextData, PipelineResult};
use mediahub::config::{AppConfig, StorageBackend};
use mediahub::errors::AppError;
use mediahub::models::{
  Account, Actor, Booking, BookingFilter, BookingStatus, Credentials, DashboardOverview, GiverSummary, NewAccount,
  NewBooking, NewPayment, NewReview, Payment, Review, Role, ServiceInput, ServiceType, SettingsBatch,
};
use mediahub::pipelines::contexts::{BookingStatusCtxData, CreateBookingCtxData};
use mediahub::state::AppState;
use mediahub::store::{MemoryStore, Store};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

static TRACING: Lazy<()> = Lazy::new(|| {
  let filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(Level::WARN.to_string()));
  tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().init();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

pub fn test_config() -> AppConfig {
  AppConfig {
    storage_backend: StorageBackend::Memory,
    payment_delay: Duration::ZERO,
    ..AppConfig::default()
  }
}

/// Fresh state over an empty `MemoryStore` with every pipeline registered.
pub fn test_state() -> AppState {
  test_state_with(test_config())
}

pub fn test_state_with(config: AppConfig) -> AppState {
  setup_tracing();
  mediahub::build_app_state(Arc::new(MemoryStore::new()), config)
}

/// State over an `InterleavingStore`, so requests joined on one task really
/// overlap between their reads and their writes.
pub fn interleaving_state() -> AppState {
  setup_tracing();
  mediahub::build_app_state(Arc::new(InterleavingStore::default()), test_config())
}

/// `MemoryStore` that yields to the scheduler before every write. Two
/// pipelines driven by `join!` both finish their reads before either one
/// writes.
#[derive(Default)]
pub struct InterleavingStore {
  inner: MemoryStore,
}

impl InterleavingStore {
  async fn pause() {
    tokio::task::yield_now().await;
  }
}

#[async_trait]
impl Store for InterleavingStore {
  async fn find_credentials(&self, role: Role, email: &str) -> mediahub::errors::Result<Option<Credentials>> {
    self.inner.find_credentials(role, email).await
  }

  async fn find_account(&self, role: Role, id: i64) -> mediahub::errors::Result<Option<Account>> {
    self.inner.find_account(role, id).await
  }

  async fn create_account(&self, account: NewAccount) -> mediahub::errors::Result<Account> {
    Self::pause().await;
    self.inner.create_account(account).await
  }

  async fn create_booking(&self, booking: NewBooking) -> mediahub::errors::Result<Booking> {
    Self::pause().await;
    self.inner.create_booking(booking).await
  }

  async fn get_booking(&self, booking_id: i64) -> mediahub::errors::Result<Option<Booking>> {
    self.inner.get_booking(booking_id).await
  }

  async fn list_bookings(&self, filter: &BookingFilter) -> mediahub::errors::Result<Vec<Booking>> {
    self.inner.list_bookings(filter).await
  }

  async fn update_booking_status(
    &self,
    booking_id: i64,
    expected: BookingStatus,
    next: BookingStatus,
  ) -> mediahub::errors::Result<bool> {
    Self::pause().await;
    self.inner.update_booking_status(booking_id, expected, next).await
  }

  async fn find_payment(&self, booking_id: i64) -> mediahub::errors::Result<Option<Payment>> {
    self.inner.find_payment(booking_id).await
  }

  async fn record_payment(&self, payment: NewPayment) -> mediahub::errors::Result<Option<Payment>> {
    Self::pause().await;
    self.inner.record_payment(payment).await
  }

  async fn upsert_review(&self, review: NewReview) -> mediahub::errors::Result<Review> {
    Self::pause().await;
    self.inner.upsert_review(review).await
  }

  async fn get_review(&self, review_id: i64) -> mediahub::errors::Result<Option<Review>> {
    self.inner.get_review(review_id).await
  }

  async fn get_review_for_booking(&self, booking_id: i64) -> mediahub::errors::Result<Option<Review>> {
    self.inner.get_review_for_booking(booking_id).await
  }

  async fn list_reviews_for_giver(&self, giver_id: i64) -> mediahub::errors::Result<Vec<Review>> {
    self.inner.list_reviews_for_giver(giver_id).await
  }

  async fn dashboard_overview(&self) -> mediahub::errors::Result<DashboardOverview> {
    self.inner.dashboard_overview().await
  }

  async fn list_givers(&self) -> mediahub::errors::Result<Vec<GiverSummary>> {
    self.inner.list_givers().await
  }

  async fn update_giver_status(&self, giver_id: i64, is_verified: bool) -> mediahub::errors::Result<bool> {
    Self::pause().await;
    self.inner.update_giver_status(giver_id, is_verified).await
  }

  async fn list_services(&self) -> mediahub::errors::Result<Vec<ServiceType>> {
    self.inner.list_services().await
  }

  async fn get_service(&self, service_id: i64) -> mediahub::errors::Result<Option<ServiceType>> {
    self.inner.get_service(service_id).await
  }

  async fn create_service(&self, input: ServiceInput) -> mediahub::errors::Result<ServiceType> {
    Self::pause().await;
    self.inner.create_service(input).await
  }

  async fn update_service(&self, service_id: i64, input: ServiceInput) -> mediahub::errors::Result<Option<ServiceType>> {
    Self::pause().await;
    self.inner.update_service(service_id, input).await
  }

  async fn delete_service(&self, service_id: i64) -> mediahub::errors::Result<bool> {
    Self::pause().await;
    self.inner.delete_service(service_id).await
  }

  async fn list_settings(&self) -> mediahub::errors::Result<BTreeMap<String, String>> {
    self.inner.list_settings().await
  }

  async fn upsert_settings(&self, batch: &SettingsBatch) -> mediahub::errors::Result<()> {
    Self::pause().await;
    self.inner.upsert_settings(batch).await
  }
}

pub fn actor(account: &Account) -> Actor {
  Actor {
    account_id: account.id,
    role: account.role,
  }
}

/// Inserts an account straight into the store. The hash is not a real one,
/// so these accounts cannot log in.
pub async fn seed_account(state: &AppState, role: Role, email: &str) -> Account {
  seed_account_created(state, role, email, 0).await
}

pub async fn seed_account_created(state: &AppState, role: Role, email: &str, days_ago: i64) -> Account {
  state
    .store
    .create_account(NewAccount {
      role,
      full_name: format!("Test {}", role),
      email: email.to_string(),
      password_hash: "not-a-real-hash".to_string(),
      hourly_rate_rwf: (role == Role::Giver).then_some(15_000),
      created_at: Utc::now() - ChronoDuration::days(days_ago),
    })
    .await
    .expect("seed account")
}

pub async fn seed_service(state: &AppState, name: &str) -> ServiceType {
  state
    .store
    .create_service(ServiceInput {
      name: name.to_string(),
      description: Some(format!("{} sessions", name)),
      base_price_rwf: 10_000,
    })
    .await
    .expect("seed service")
}

pub fn day(d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(2025, 1, d).expect("valid date")
}

pub fn booking_request(state: &AppState, client: Option<Actor>, giver_id: i64, service_id: i64) -> CreateBookingCtxData {
  CreateBookingCtxData {
    app_state: state.clone(),
    actor: client,
    claimed_client_id: None,
    giver_id,
    service_id,
    start_date: day(10),
    end_date: day(10),
    total_price_rwf: 20_000,
    notes: None,
    created_booking: None,
  }
}

pub async fn run_create_booking(state: &AppState, request: CreateBookingCtxData) -> Result<Booking, AppError> {
  let ctx = ContextData::new(request);
  match state.flows.run(ctx.clone()).await? {
    PipelineResult::Completed => Ok(ctx.read().created_booking.clone().expect("booking in context")),
    PipelineResult::Stopped => panic!("create booking pipeline stopped"),
  }
}

pub async fn run_set_status(state: &AppState, who: Actor, booking_id: i64, status: &str) -> Result<Booking, AppError> {
  let ctx = ContextData::new(BookingStatusCtxData::new(state.clone(), who, booking_id, status.to_string()));
  match state.flows.run(ctx.clone()).await? {
    PipelineResult::Completed => Ok(ctx.read().updated_booking.clone().expect("booking in context")),
    PipelineResult::Stopped => panic!("status pipeline stopped"),
  }
}

/// A client, a giver, a service and one pending booking between them.
pub struct Marketplace {
  pub state: AppState,
  pub client: Account,
  pub giver: Account,
  pub service: ServiceType,
  pub booking: Booking,
}

pub async fn marketplace_with_booking() -> Marketplace {
  marketplace_on(test_state()).await
}

pub async fn marketplace_on(state: AppState) -> Marketplace {
  let client = seed_account(&state, Role::Client, "client@mediahub.rw").await;
  let giver = seed_account(&state, Role::Giver, "giver@mediahub.rw").await;
  let service = seed_service(&state, "Photography").await;
  let booking = run_create_booking(
    &state,
    booking_request(&state, Some(actor(&client)), giver.id, service.service_id),
  )
  .await
  .expect("create booking");
  Marketplace {
    state,
    client,
    giver,
    service,
    booking,
  }
}

/// Drives the booking to `target` along the legal edges.
pub async fn advance_to(m: &Marketplace, target: BookingStatus) -> Booking {
  let giver = actor(&m.giver);
  let mut booking = m.booking.clone();
  if matches!(target, BookingStatus::Accepted | BookingStatus::Completed) {
    booking = run_set_status(&m.state, giver, booking.booking_id, "Accepted").await.expect("accept");
  }
  if target == BookingStatus::Completed {
    booking = run_set_status(&m.state, giver, booking.booking_id, "Completed").await.expect("complete");
  }
  booking
}
