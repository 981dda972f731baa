// server/src/store/memory.rs

//! In-process backend with the same keys and constraints as the MySQL schema.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument, warn};

use crate::errors::{AppError, Result};
use crate::models::dashboard::{giver_status_data, NEW_CLIENT_WINDOW_DAYS, TOP_SERVICES_LIMIT};
use crate::models::settings::{SETTING_KEY_MAX_LEN, SETTING_VALUE_MAX_LEN};
use crate::models::{
  Account, Booking, BookingFilter, BookingStatus, Credentials, DashboardOverview, GiverSummary, KeyMetrics,
  MonthlyRevenue, NewAccount, NewBooking, NewPayment, NewReview, Payment, Review, Role, ServiceInput, ServiceType,
  ServiceUsage, SettingsBatch,
};
use crate::store::Store;

#[derive(Debug, Clone)]
struct AccountRecord {
  id: i64,
  full_name: String,
  email: String,
  password_hash: String,
  hourly_rate_rwf: Option<i64>,
  is_verified: bool,
  created_at: chrono::DateTime<Utc>,
}

impl AccountRecord {
  fn to_account(&self, role: Role) -> Account {
    Account {
      id: self.id,
      role,
      full_name: self.full_name.clone(),
      email: self.email.clone(),
    }
  }
}

#[derive(Debug, Default)]
struct Tables {
  accounts: HashMap<Role, BTreeMap<i64, AccountRecord>>,
  bookings: BTreeMap<i64, Booking>,
  /// Keyed by `booking_id`, which is unique in `Payment`.
  payments: BTreeMap<i64, Payment>,
  /// Keyed by `booking_id`, which is unique in `Review`.
  reviews: BTreeMap<i64, Review>,
  services: BTreeMap<i64, ServiceType>,
  settings: BTreeMap<String, String>,
  sequences: HashMap<&'static str, i64>,
}

impl Tables {
  fn next_id(&mut self, table: &'static str) -> i64 {
    let id = self.sequences.entry(table).or_insert(0);
    *id += 1;
    *id
  }

  fn accounts(&self, role: Role) -> Option<&BTreeMap<i64, AccountRecord>> {
    self.accounts.get(&role)
  }
}

/// `Store` over `parking_lot`-guarded maps. Every operation takes the lock
/// once, so multi-row writes are atomic just like their SQL transactions.
#[derive(Debug, Default)]
pub struct MemoryStore {
  tables: RwLock<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn find_credentials(&self, role: Role, email: &str) -> Result<Option<Credentials>> {
    let tables = self.tables.read();
    Ok(tables.accounts(role).and_then(|rows| {
      rows.values().find(|r| r.email == email).map(|r| Credentials {
        id: r.id,
        full_name: r.full_name.clone(),
        email: r.email.clone(),
        password_hash: r.password_hash.clone(),
      })
    }))
  }

  async fn find_account(&self, role: Role, id: i64) -> Result<Option<Account>> {
    let tables = self.tables.read();
    Ok(tables.accounts(role).and_then(|rows| rows.get(&id)).map(|r| r.to_account(role)))
  }

  #[instrument(skip(self, account), fields(role = %account.role))]
  async fn create_account(&self, account: NewAccount) -> Result<Account> {
    let mut tables = self.tables.write();
    let taken = tables
      .accounts(account.role)
      .map_or(false, |rows| rows.values().any(|r| r.email == account.email));
    if taken {
      return Err(AppError::Conflict("An account with this email already exists.".to_string()));
    }

    let id = tables.next_id(account.role.as_str());
    let record = AccountRecord {
      id,
      full_name: account.full_name,
      email: account.email,
      password_hash: account.password_hash,
      hourly_rate_rwf: account.hourly_rate_rwf,
      is_verified: false,
      created_at: account.created_at,
    };
    let created = record.to_account(account.role);
    tables.accounts.entry(account.role).or_default().insert(id, record);
    debug!(id, "Account stored.");
    Ok(created)
  }

  async fn create_booking(&self, booking: NewBooking) -> Result<Booking> {
    let mut tables = self.tables.write();
    let booking_id = tables.next_id("booking");
    let stored = Booking {
      booking_id,
      client_id: booking.client_id,
      giver_id: booking.giver_id,
      service_id: booking.service_id,
      start_date: booking.start_date,
      end_date: booking.end_date,
      total_price_rwf: booking.total_price_rwf,
      status: BookingStatus::Pending,
      notes: booking.notes,
      is_paid: false,
      created_at: Utc::now(),
    };
    tables.bookings.insert(booking_id, stored.clone());
    Ok(stored)
  }

  async fn get_booking(&self, booking_id: i64) -> Result<Option<Booking>> {
    Ok(self.tables.read().bookings.get(&booking_id).cloned())
  }

  async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>> {
    let tables = self.tables.read();
    let mut rows: Vec<Booking> = tables.bookings.values().filter(|b| filter.matches(b)).cloned().collect();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.booking_id.cmp(&a.booking_id)));
    Ok(rows)
  }

  async fn update_booking_status(&self, booking_id: i64, expected: BookingStatus, next: BookingStatus) -> Result<bool> {
    let mut tables = self.tables.write();
    match tables.bookings.get_mut(&booking_id) {
      Some(booking) if booking.status == expected => {
        booking.status = next;
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn find_payment(&self, booking_id: i64) -> Result<Option<Payment>> {
    Ok(self.tables.read().payments.get(&booking_id).cloned())
  }

  #[instrument(skip(self, payment), fields(booking_id = payment.booking_id))]
  async fn record_payment(&self, payment: NewPayment) -> Result<Option<Payment>> {
    let mut tables = self.tables.write();
    match tables.bookings.get(&payment.booking_id) {
      Some(booking) if !booking.is_paid => {}
      Some(_) => {
        warn!("Booking already paid; payment not recorded.");
        return Ok(None);
      }
      None => return Err(AppError::NotFound(format!("Booking {} not found", payment.booking_id))),
    }

    let payment_id = tables.next_id("payment");
    let stored = Payment {
      payment_id,
      booking_id: payment.booking_id,
      amount_rwf: payment.amount_rwf,
      method: payment.method,
      reference: payment.reference,
      status: "Completed".to_string(),
      paid_at: Utc::now(),
    };
    tables.payments.insert(payment.booking_id, stored.clone());
    if let Some(booking) = tables.bookings.get_mut(&payment.booking_id) {
      booking.is_paid = true;
    }
    Ok(Some(stored))
  }

  async fn upsert_review(&self, review: NewReview) -> Result<Review> {
    let mut tables = self.tables.write();
    let now = Utc::now();
    if let Some(existing) = tables.reviews.get_mut(&review.booking_id) {
      existing.rating = review.rating;
      existing.comment = review.comment;
      existing.updated_at = now;
      return Ok(existing.clone());
    }

    let review_id = tables.next_id("review");
    let stored = Review {
      review_id,
      booking_id: review.booking_id,
      client_id: review.client_id,
      giver_id: review.giver_id,
      rating: review.rating,
      comment: review.comment,
      created_at: now,
      updated_at: now,
    };
    tables.reviews.insert(review.booking_id, stored.clone());
    Ok(stored)
  }

  async fn get_review(&self, review_id: i64) -> Result<Option<Review>> {
    let tables = self.tables.read();
    Ok(tables.reviews.values().find(|r| r.review_id == review_id).cloned())
  }

  async fn get_review_for_booking(&self, booking_id: i64) -> Result<Option<Review>> {
    Ok(self.tables.read().reviews.get(&booking_id).cloned())
  }

  async fn list_reviews_for_giver(&self, giver_id: i64) -> Result<Vec<Review>> {
    let tables = self.tables.read();
    let mut rows: Vec<Review> = tables.reviews.values().filter(|r| r.giver_id == giver_id).cloned().collect();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.review_id.cmp(&a.review_id)));
    Ok(rows)
  }

  async fn dashboard_overview(&self) -> Result<DashboardOverview> {
    let tables = self.tables.read();
    let completed: Vec<&Payment> = tables.payments.values().filter(|p| p.status == "Completed").collect();

    let givers = tables.accounts(Role::Giver);
    let verified_givers = givers.map_or(0, |rows| rows.values().filter(|g| g.is_verified).count()) as i64;
    let pending_givers = givers.map_or(0, |rows| rows.values().filter(|g| !g.is_verified).count()) as i64;

    let window_start = Utc::now() - Duration::days(NEW_CLIENT_WINDOW_DAYS);
    let new_clients = tables
      .accounts(Role::Client)
      .map_or(0, |rows| rows.values().filter(|c| c.created_at >= window_start).count()) as i64;

    let mut monthly: BTreeMap<String, i64> = BTreeMap::new();
    for payment in &completed {
      *monthly.entry(payment.paid_at.format("%Y-%m").to_string()).or_insert(0) += payment.amount_rwf;
    }

    let mut per_service: HashMap<i64, i64> = HashMap::new();
    for booking in tables.bookings.values() {
      *per_service.entry(booking.service_id).or_insert(0) += 1;
    }
    let mut usage: Vec<ServiceUsage> = per_service
      .into_iter()
      .filter_map(|(service_id, bookings)| {
        tables.services.get(&service_id).map(|s| ServiceUsage {
          name: s.name.clone(),
          bookings,
        })
      })
      .collect();
    usage.sort_by(|a, b| b.bookings.cmp(&a.bookings).then_with(|| a.name.cmp(&b.name)));
    usage.truncate(TOP_SERVICES_LIMIT);

    Ok(DashboardOverview {
      key_metrics: KeyMetrics {
        total_revenue: completed.iter().map(|p| p.amount_rwf).sum(),
        total_bookings: tables.bookings.len() as i64,
        verified_givers,
        new_clients,
      },
      monthly_revenue_data: monthly
        .into_iter()
        .map(|(month, revenue)| MonthlyRevenue { month, revenue })
        .collect(),
      giver_status_data: giver_status_data(verified_givers, pending_givers),
      service_usage_data: usage,
    })
  }

  async fn list_givers(&self) -> Result<Vec<GiverSummary>> {
    let tables = self.tables.read();
    let mut givers: Vec<GiverSummary> = tables
      .accounts(Role::Giver)
      .map(|rows| {
        rows
          .values()
          .map(|g| GiverSummary {
            giver_id: g.id,
            full_name: g.full_name.clone(),
            email: g.email.clone(),
            hourly_rate_rwf: g.hourly_rate_rwf,
            is_verified: g.is_verified,
            created_at: g.created_at,
          })
          .collect()
      })
      .unwrap_or_default();
    givers.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.giver_id.cmp(&a.giver_id)));
    Ok(givers)
  }

  async fn update_giver_status(&self, giver_id: i64, is_verified: bool) -> Result<bool> {
    let mut tables = self.tables.write();
    match tables.accounts.get_mut(&Role::Giver).and_then(|rows| rows.get_mut(&giver_id)) {
      Some(giver) => {
        giver.is_verified = is_verified;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn list_services(&self) -> Result<Vec<ServiceType>> {
    let mut services: Vec<ServiceType> = self.tables.read().services.values().cloned().collect();
    services.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(services)
  }

  async fn get_service(&self, service_id: i64) -> Result<Option<ServiceType>> {
    Ok(self.tables.read().services.get(&service_id).cloned())
  }

  async fn create_service(&self, input: ServiceInput) -> Result<ServiceType> {
    let mut tables = self.tables.write();
    if tables.services.values().any(|s| s.name == input.name) {
      return Err(AppError::Conflict("A service with this name already exists.".to_string()));
    }
    let service_id = tables.next_id("service");
    let stored = ServiceType {
      service_id,
      name: input.name,
      description: input.description,
      base_price_rwf: input.base_price_rwf,
      created_at: Utc::now(),
    };
    tables.services.insert(service_id, stored.clone());
    Ok(stored)
  }

  async fn update_service(&self, service_id: i64, input: ServiceInput) -> Result<Option<ServiceType>> {
    let mut tables = self.tables.write();
    if tables
      .services
      .values()
      .any(|s| s.name == input.name && s.service_id != service_id)
    {
      return Err(AppError::Conflict("A service with this name already exists.".to_string()));
    }
    Ok(tables.services.get_mut(&service_id).map(|service| {
      service.name = input.name;
      service.description = input.description;
      service.base_price_rwf = input.base_price_rwf;
      service.clone()
    }))
  }

  async fn delete_service(&self, service_id: i64) -> Result<bool> {
    let mut tables = self.tables.write();
    let in_use = tables.bookings.values().filter(|b| b.service_id == service_id).count();
    if in_use > 0 {
      return Err(AppError::Conflict(format!(
        "Service {} is referenced by {} booking(s).",
        service_id, in_use
      )));
    }
    Ok(tables.services.remove(&service_id).is_some())
  }

  async fn list_settings(&self) -> Result<BTreeMap<String, String>> {
    Ok(self.tables.read().settings.clone())
  }

  #[instrument(skip(self, batch), fields(keys = batch.len()))]
  async fn upsert_settings(&self, batch: &SettingsBatch) -> Result<()> {
    let mut tables = self.tables.write();
    let mut staged = tables.settings.clone();
    for (key, value) in batch.iter() {
      // Same limits the MySQL columns enforce in strict mode.
      if key.chars().count() > SETTING_KEY_MAX_LEN {
        warn!(%key, "Setting key too long; batch discarded.");
        return Err(AppError::Internal(format!("Data too long for column 'setting_key' ({})", key)));
      }
      if value.chars().count() > SETTING_VALUE_MAX_LEN {
        warn!(%key, "Setting value too long; batch discarded.");
        return Err(AppError::Internal(format!("Data too long for column 'setting_value' ({})", key)));
      }
      staged.insert(key.to_string(), value.to_string());
    }
    tables.settings = staged;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::Rating;
  use chrono::NaiveDate;

  fn booking_input(service_id: i64) -> NewBooking {
    let day = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
    NewBooking {
      client_id: 42,
      giver_id: 7,
      service_id,
      start_date: day,
      end_date: day,
      total_price_rwf: 20_000,
      notes: None,
    }
  }

  #[tokio::test]
  async fn status_write_is_compare_and_set() {
    let store = MemoryStore::new();
    let booking = store.create_booking(booking_input(3)).await.unwrap();

    assert!(store
      .update_booking_status(booking.booking_id, BookingStatus::Pending, BookingStatus::Accepted)
      .await
      .unwrap());
    // A second writer that read `Pending` loses.
    assert!(!store
      .update_booking_status(booking.booking_id, BookingStatus::Pending, BookingStatus::Rejected)
      .await
      .unwrap());
    let stored = store.get_booking(booking.booking_id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Accepted);
  }

  #[tokio::test]
  async fn review_upsert_keeps_one_row_per_booking() {
    let store = MemoryStore::new();
    let review = |rating: i64| NewReview {
      booking_id: 1,
      client_id: 42,
      giver_id: 7,
      rating: Rating::try_from(rating).unwrap(),
      comment: Some(format!("{} stars", rating)),
    };
    let first = store.upsert_review(review(3)).await.unwrap();
    let second = store.upsert_review(review(5)).await.unwrap();

    assert_eq!(first.review_id, second.review_id);
    assert_eq!(second.rating.value(), 5);
    assert_eq!(store.list_reviews_for_giver(7).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn settings_batch_is_all_or_nothing() {
    let store = MemoryStore::new();
    let mut seed = SettingsBatch::new();
    seed.insert("a", "1").insert("b", "1").insert("c", "1");
    store.upsert_settings(&seed).await.unwrap();

    let mut batch = SettingsBatch::new();
    batch
      .insert("a", "2")
      .insert("b", "x".repeat(SETTING_VALUE_MAX_LEN + 1))
      .insert("c", "2");
    assert!(store.upsert_settings(&batch).await.is_err());

    let settings = store.list_settings().await.unwrap();
    assert!(settings.values().all(|v| v == "1"));
  }

  #[tokio::test]
  async fn referenced_service_cannot_be_deleted() {
    let store = MemoryStore::new();
    let service = store
      .create_service(ServiceInput {
        name: "Photography".to_string(),
        description: None,
        base_price_rwf: 10_000,
      })
      .await
      .unwrap();
    store.create_booking(booking_input(service.service_id)).await.unwrap();

    assert!(matches!(
      store.delete_service(service.service_id).await,
      Err(AppError::Conflict(_))
    ));
    assert!(!store.delete_service(999).await.unwrap());
  }
}
