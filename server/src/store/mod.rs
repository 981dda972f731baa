// server/src/store/mod.rs

//! Persistence seam. Pipelines and handlers talk to `dyn Store`; `MySqlStore`
//! is the production backend and `MemoryStore` mirrors its constraints in
//! process for tests and local runs.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{AppConfig, StorageBackend};
use crate::errors::Result;
use crate::models::{
  Account, Booking, BookingFilter, BookingStatus, Credentials, DashboardOverview, GiverSummary, NewAccount, NewBooking,
  NewPayment, NewReview, Payment, Review, Role, ServiceInput, ServiceType, SettingsBatch,
};

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[async_trait]
pub trait Store: Send + Sync {
  // --- accounts ---

  /// Looks an email up in the table selected by `role`.
  async fn find_credentials(&self, role: Role, email: &str) -> Result<Option<Credentials>>;
  async fn find_account(&self, role: Role, id: i64) -> Result<Option<Account>>;
  /// Fails with `AppError::Conflict` when the email is taken for that role.
  async fn create_account(&self, account: NewAccount) -> Result<Account>;

  // --- bookings ---

  async fn create_booking(&self, booking: NewBooking) -> Result<Booking>;
  async fn get_booking(&self, booking_id: i64) -> Result<Option<Booking>>;
  async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>>;
  /// Compare-and-set: writes `next` only while the stored status is still
  /// `expected`. Returns whether the row changed.
  async fn update_booking_status(&self, booking_id: i64, expected: BookingStatus, next: BookingStatus) -> Result<bool>;

  // --- payments ---

  async fn find_payment(&self, booking_id: i64) -> Result<Option<Payment>>;
  /// Inserts the payment and flips `Booking.is_paid` atomically. Returns
  /// `None` when the booking was already paid.
  async fn record_payment(&self, payment: NewPayment) -> Result<Option<Payment>>;

  // --- reviews ---

  /// Insert-or-update keyed by the unique `booking_id`.
  async fn upsert_review(&self, review: NewReview) -> Result<Review>;
  async fn get_review(&self, review_id: i64) -> Result<Option<Review>>;
  async fn get_review_for_booking(&self, booking_id: i64) -> Result<Option<Review>>;
  async fn list_reviews_for_giver(&self, giver_id: i64) -> Result<Vec<Review>>;

  // --- admin ---

  async fn dashboard_overview(&self) -> Result<DashboardOverview>;
  async fn list_givers(&self) -> Result<Vec<GiverSummary>>;
  /// `true` when a giver row was affected.
  async fn update_giver_status(&self, giver_id: i64, is_verified: bool) -> Result<bool>;

  async fn list_services(&self) -> Result<Vec<ServiceType>>;
  async fn get_service(&self, service_id: i64) -> Result<Option<ServiceType>>;
  async fn create_service(&self, input: ServiceInput) -> Result<ServiceType>;
  async fn update_service(&self, service_id: i64, input: ServiceInput) -> Result<Option<ServiceType>>;
  /// Fails with `AppError::Conflict` while bookings still reference it.
  async fn delete_service(&self, service_id: i64) -> Result<bool>;

  async fn list_settings(&self) -> Result<BTreeMap<String, String>>;
  /// All keys are written or none are.
  async fn upsert_settings(&self, batch: &SettingsBatch) -> Result<()>;
}

/// Opens the backend selected by `STORAGE_BACKEND`.
pub async fn connect(config: &AppConfig) -> Result<Arc<dyn Store>> {
  match config.storage_backend {
    StorageBackend::MySql => Ok(Arc::new(MySqlStore::connect(config).await?)),
    StorageBackend::Memory => {
      tracing::warn!("Using the in-memory store; data is lost on restart.");
      Ok(Arc::new(MemoryStore::new()))
    }
  }
}
