// server/src/store/mysql.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::{FromRow, MySql, QueryBuilder};
use std::collections::BTreeMap;
use tracing::{debug, error, info, instrument, warn};

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::models::dashboard::{giver_status_data, NEW_CLIENT_WINDOW_DAYS, TOP_SERVICES_LIMIT};
use crate::models::{
  Account, Booking, BookingFilter, BookingStatus, Credentials, DashboardOverview, GiverSummary, KeyMetrics,
  MonthlyRevenue, NewAccount, NewBooking, NewPayment, NewReview, Payment, Rating, Review, Role, ServiceInput,
  ServiceType, ServiceUsage, SettingsBatch,
};
use crate::store::Store;

const BOOKING_COLUMNS: &str = "booking_id, client_id, giver_id, service_id, start_date, end_date, total_price_rwf, \
                               status, notes, is_paid, created_at";
const REVIEW_COLUMNS: &str = "review_id, booking_id, client_id, giver_id, rating, comment, created_at, updated_at";
const PAYMENT_COLUMNS: &str = "payment_id, booking_id, amount_rwf, method, reference, status, paid_at";
const SERVICE_COLUMNS: &str = "service_id, name, description, base_price_rwf, created_at";

/// `(table, primary key column)` holding accounts of `role`.
fn account_table(role: Role) -> (&'static str, &'static str) {
  match role {
    Role::Admin => ("Admin", "admin_id"),
    Role::Client => ("Client", "client_id"),
    Role::Giver => ("Service_Giver", "giver_id"),
  }
}

fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
  match &err {
    sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::Conflict(message.to_string()),
    _ => AppError::Sqlx(err),
  }
}

// --- Row types ---

#[derive(FromRow)]
struct CredentialsRow {
  id: i64,
  full_name: String,
  email: String,
  password_hash: String,
}

#[derive(FromRow)]
struct AccountRow {
  id: i64,
  full_name: String,
  email: String,
}

#[derive(FromRow)]
struct BookingRow {
  booking_id: i64,
  client_id: i64,
  giver_id: i64,
  service_id: i64,
  start_date: NaiveDate,
  end_date: NaiveDate,
  total_price_rwf: i64,
  status: String,
  notes: Option<String>,
  is_paid: bool,
  created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
  type Error = AppError;

  fn try_from(row: BookingRow) -> Result<Self> {
    let status = row.status.parse::<BookingStatus>().map_err(|_| {
      error!(booking_id = row.booking_id, status = %row.status, "Booking row holds an unknown status.");
      AppError::Internal(format!("Booking {} has unknown status '{}'", row.booking_id, row.status))
    })?;
    Ok(Booking {
      booking_id: row.booking_id,
      client_id: row.client_id,
      giver_id: row.giver_id,
      service_id: row.service_id,
      start_date: row.start_date,
      end_date: row.end_date,
      total_price_rwf: row.total_price_rwf,
      status,
      notes: row.notes,
      is_paid: row.is_paid,
      created_at: row.created_at,
    })
  }
}

#[derive(FromRow)]
struct ReviewRow {
  review_id: i64,
  booking_id: i64,
  client_id: i64,
  giver_id: i64,
  rating: i32,
  comment: Option<String>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
  type Error = AppError;

  fn try_from(row: ReviewRow) -> Result<Self> {
    let rating = Rating::try_from(i64::from(row.rating))
      .map_err(|e| AppError::Internal(format!("Review {} holds an invalid rating: {}", row.review_id, e)))?;
    Ok(Review {
      review_id: row.review_id,
      booking_id: row.booking_id,
      client_id: row.client_id,
      giver_id: row.giver_id,
      rating,
      comment: row.comment,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

#[derive(FromRow)]
struct PaymentRow {
  payment_id: i64,
  booking_id: i64,
  amount_rwf: i64,
  method: String,
  reference: String,
  status: String,
  paid_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
  fn from(row: PaymentRow) -> Self {
    Payment {
      payment_id: row.payment_id,
      booking_id: row.booking_id,
      amount_rwf: row.amount_rwf,
      method: row.method,
      reference: row.reference,
      status: row.status,
      paid_at: row.paid_at,
    }
  }
}

#[derive(FromRow)]
struct ServiceRow {
  service_id: i64,
  name: String,
  description: Option<String>,
  base_price_rwf: i64,
  created_at: DateTime<Utc>,
}

impl From<ServiceRow> for ServiceType {
  fn from(row: ServiceRow) -> Self {
    ServiceType {
      service_id: row.service_id,
      name: row.name,
      description: row.description,
      base_price_rwf: row.base_price_rwf,
      created_at: row.created_at,
    }
  }
}

#[derive(FromRow)]
struct GiverRow {
  giver_id: i64,
  full_name: String,
  email: String,
  hourly_rate_rwf: Option<i64>,
  is_verified: bool,
  created_at: DateTime<Utc>,
}

// --- Store ---

/// MySQL backend over a bounded `sqlx` pool.
#[derive(Debug, Clone)]
pub struct MySqlStore {
  pool: MySqlPool,
}

impl MySqlStore {
  pub fn new(pool: MySqlPool) -> Self {
    Self { pool }
  }

  #[instrument(
    name = "MySqlStore::connect",
    skip(config),
    fields(host = %config.db_host, port = config.db_port, db = %config.db_name, user = %config.db_user)
  )]
  pub async fn connect(config: &AppConfig) -> Result<Self> {
    let pool = MySqlPoolOptions::new()
      .max_connections(config.db_pool_size)
      .connect_with(config.connect_options())
      .await
      .map_err(|e| {
        error!(error = %e, "Failed to connect to MySQL.");
        AppError::Sqlx(e)
      })?;
    info!(pool_size = config.db_pool_size, "Connected to MySQL.");
    Ok(Self::new(pool))
  }
}

#[async_trait]
impl Store for MySqlStore {
  #[instrument(skip(self, email))]
  async fn find_credentials(&self, role: Role, email: &str) -> Result<Option<Credentials>> {
    let (table, id_col) = account_table(role);
    let sql = format!(
      "SELECT {id_col} AS id, full_name, email, password_hash FROM {table} WHERE email = ? LIMIT 1"
    );
    let row = sqlx::query_as::<_, CredentialsRow>(&sql)
      .bind(email)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(|r| Credentials {
      id: r.id,
      full_name: r.full_name,
      email: r.email,
      password_hash: r.password_hash,
    }))
  }

  async fn find_account(&self, role: Role, id: i64) -> Result<Option<Account>> {
    let (table, id_col) = account_table(role);
    let sql = format!("SELECT {id_col} AS id, full_name, email FROM {table} WHERE {id_col} = ?");
    let row = sqlx::query_as::<_, AccountRow>(&sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(|r| Account {
      id: r.id,
      role,
      full_name: r.full_name,
      email: r.email,
    }))
  }

  #[instrument(skip(self, account), fields(role = %account.role))]
  async fn create_account(&self, account: NewAccount) -> Result<Account> {
    let (table, _) = account_table(account.role);
    let result = if account.role == Role::Giver {
      sqlx::query(
        "INSERT INTO Service_Giver (full_name, email, password_hash, hourly_rate_rwf, is_verified, created_at) \
         VALUES (?, ?, ?, ?, FALSE, ?)",
      )
      .bind(&account.full_name)
      .bind(&account.email)
      .bind(&account.password_hash)
      .bind(account.hourly_rate_rwf)
      .bind(account.created_at)
      .execute(&self.pool)
      .await
    } else {
      let sql = format!("INSERT INTO {table} (full_name, email, password_hash, created_at) VALUES (?, ?, ?, ?)");
      sqlx::query(&sql)
        .bind(&account.full_name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
    }
    .map_err(|e| conflict_on_unique(e, "An account with this email already exists."))?;

    let id = result.last_insert_id() as i64;
    debug!(id, "Account row inserted.");
    Ok(Account {
      id,
      role: account.role,
      full_name: account.full_name,
      email: account.email,
    })
  }

  #[instrument(skip(self, booking), fields(client_id = booking.client_id, giver_id = booking.giver_id))]
  async fn create_booking(&self, booking: NewBooking) -> Result<Booking> {
    let result = sqlx::query(
      "INSERT INTO Booking (client_id, giver_id, service_id, start_date, end_date, total_price_rwf, status, notes, is_paid) \
       VALUES (?, ?, ?, ?, ?, ?, ?, ?, FALSE)",
    )
    .bind(booking.client_id)
    .bind(booking.giver_id)
    .bind(booking.service_id)
    .bind(booking.start_date)
    .bind(booking.end_date)
    .bind(booking.total_price_rwf)
    .bind(BookingStatus::Pending.as_str())
    .bind(&booking.notes)
    .execute(&self.pool)
    .await?;

    let booking_id = result.last_insert_id() as i64;
    self
      .get_booking(booking_id)
      .await?
      .ok_or_else(|| AppError::Internal(format!("Booking {} vanished after insert", booking_id)))
  }

  async fn get_booking(&self, booking_id: i64) -> Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM Booking WHERE booking_id = ?");
    sqlx::query_as::<_, BookingRow>(&sql)
      .bind(booking_id)
      .fetch_optional(&self.pool)
      .await?
      .map(Booking::try_from)
      .transpose()
  }

  async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>> {
    let mut qb: QueryBuilder<MySql> = QueryBuilder::new(format!("SELECT {BOOKING_COLUMNS} FROM Booking WHERE 1 = 1"));
    if let Some(client_id) = filter.client_id {
      qb.push(" AND client_id = ").push_bind(client_id);
    }
    if let Some(giver_id) = filter.giver_id {
      qb.push(" AND giver_id = ").push_bind(giver_id);
    }
    if let Some(status) = filter.status {
      qb.push(" AND status = ").push_bind(status.as_str());
    }
    qb.push(" ORDER BY created_at DESC, booking_id DESC");

    let rows = qb.build_query_as::<BookingRow>().fetch_all(&self.pool).await?;
    rows.into_iter().map(Booking::try_from).collect()
  }

  #[instrument(skip(self))]
  async fn update_booking_status(&self, booking_id: i64, expected: BookingStatus, next: BookingStatus) -> Result<bool> {
    let result = sqlx::query("UPDATE Booking SET status = ? WHERE booking_id = ? AND status = ?")
      .bind(next.as_str())
      .bind(booking_id)
      .bind(expected.as_str())
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() == 1)
  }

  async fn find_payment(&self, booking_id: i64) -> Result<Option<Payment>> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM Payment WHERE booking_id = ?");
    let row = sqlx::query_as::<_, PaymentRow>(&sql)
      .bind(booking_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(Payment::from))
  }

  #[instrument(skip(self, payment), fields(booking_id = payment.booking_id, amount_rwf = payment.amount_rwf))]
  async fn record_payment(&self, payment: NewPayment) -> Result<Option<Payment>> {
    let mut tx = self.pool.begin().await?;

    let flipped = sqlx::query("UPDATE Booking SET is_paid = TRUE WHERE booking_id = ? AND is_paid = FALSE")
      .bind(payment.booking_id)
      .execute(&mut *tx)
      .await?;
    if flipped.rows_affected() == 0 {
      tx.rollback().await?;
      warn!("Booking already paid; payment not recorded.");
      return Ok(None);
    }

    sqlx::query("INSERT INTO Payment (booking_id, amount_rwf, method, reference, status) VALUES (?, ?, ?, ?, 'Completed')")
      .bind(payment.booking_id)
      .bind(payment.amount_rwf)
      .bind(&payment.method)
      .bind(&payment.reference)
      .execute(&mut *tx)
      .await?;

    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM Payment WHERE booking_id = ?");
    let row = sqlx::query_as::<_, PaymentRow>(&sql)
      .bind(payment.booking_id)
      .fetch_one(&mut *tx)
      .await?;
    tx.commit().await?;
    info!(payment_id = row.payment_id, "Payment recorded.");
    Ok(Some(row.into()))
  }

  #[instrument(skip(self, review), fields(booking_id = review.booking_id, rating = review.rating.value()))]
  async fn upsert_review(&self, review: NewReview) -> Result<Review> {
    sqlx::query(
      "INSERT INTO Review (booking_id, client_id, giver_id, rating, comment) VALUES (?, ?, ?, ?, ?) \
       ON DUPLICATE KEY UPDATE rating = VALUES(rating), comment = VALUES(comment), updated_at = CURRENT_TIMESTAMP",
    )
    .bind(review.booking_id)
    .bind(review.client_id)
    .bind(review.giver_id)
    .bind(i32::from(review.rating.value()))
    .bind(&review.comment)
    .execute(&self.pool)
    .await?;

    self
      .get_review_for_booking(review.booking_id)
      .await?
      .ok_or_else(|| AppError::Internal(format!("Review for booking {} vanished after upsert", review.booking_id)))
  }

  async fn get_review(&self, review_id: i64) -> Result<Option<Review>> {
    let sql = format!("SELECT {REVIEW_COLUMNS} FROM Review WHERE review_id = ?");
    sqlx::query_as::<_, ReviewRow>(&sql)
      .bind(review_id)
      .fetch_optional(&self.pool)
      .await?
      .map(Review::try_from)
      .transpose()
  }

  async fn get_review_for_booking(&self, booking_id: i64) -> Result<Option<Review>> {
    let sql = format!("SELECT {REVIEW_COLUMNS} FROM Review WHERE booking_id = ?");
    sqlx::query_as::<_, ReviewRow>(&sql)
      .bind(booking_id)
      .fetch_optional(&self.pool)
      .await?
      .map(Review::try_from)
      .transpose()
  }

  async fn list_reviews_for_giver(&self, giver_id: i64) -> Result<Vec<Review>> {
    let sql = format!("SELECT {REVIEW_COLUMNS} FROM Review WHERE giver_id = ? ORDER BY created_at DESC, review_id DESC");
    let rows = sqlx::query_as::<_, ReviewRow>(&sql)
      .bind(giver_id)
      .fetch_all(&self.pool)
      .await?;
    rows.into_iter().map(Review::try_from).collect()
  }

  #[instrument(skip(self))]
  async fn dashboard_overview(&self) -> Result<DashboardOverview> {
    let total_revenue: i64 =
      sqlx::query_scalar("SELECT CAST(COALESCE(SUM(amount_rwf), 0) AS SIGNED) FROM Payment WHERE status = 'Completed'")
        .fetch_one(&self.pool)
        .await?;
    let total_bookings: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Booking")
      .fetch_one(&self.pool)
      .await?;
    let verified_givers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Service_Giver WHERE is_verified = TRUE")
      .fetch_one(&self.pool)
      .await?;
    let pending_givers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Service_Giver WHERE is_verified = FALSE")
      .fetch_one(&self.pool)
      .await?;
    let new_clients: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Client WHERE created_at >= NOW() - INTERVAL ? DAY")
      .bind(NEW_CLIENT_WINDOW_DAYS)
      .fetch_one(&self.pool)
      .await?;

    let monthly: Vec<(String, i64)> = sqlx::query_as(
      "SELECT DATE_FORMAT(paid_at, '%Y-%m') AS month, CAST(SUM(amount_rwf) AS SIGNED) AS revenue \
       FROM Payment WHERE status = 'Completed' GROUP BY month ORDER BY month ASC",
    )
    .fetch_all(&self.pool)
    .await?;

    let usage: Vec<(String, i64)> = sqlx::query_as(
      "SELECT s.name, COUNT(b.booking_id) AS bookings FROM Service_Type s \
       JOIN Booking b ON b.service_id = s.service_id \
       GROUP BY s.service_id, s.name ORDER BY bookings DESC, s.name ASC LIMIT ?",
    )
    .bind(TOP_SERVICES_LIMIT as i64)
    .fetch_all(&self.pool)
    .await?;

    Ok(DashboardOverview {
      key_metrics: KeyMetrics {
        total_revenue,
        total_bookings,
        verified_givers,
        new_clients,
      },
      monthly_revenue_data: monthly
        .into_iter()
        .map(|(month, revenue)| MonthlyRevenue { month, revenue })
        .collect(),
      giver_status_data: giver_status_data(verified_givers, pending_givers),
      service_usage_data: usage
        .into_iter()
        .map(|(name, bookings)| ServiceUsage { name, bookings })
        .collect(),
    })
  }

  async fn list_givers(&self) -> Result<Vec<GiverSummary>> {
    let rows = sqlx::query_as::<_, GiverRow>(
      "SELECT giver_id, full_name, email, hourly_rate_rwf, is_verified, created_at FROM Service_Giver \
       ORDER BY created_at DESC, giver_id DESC",
    )
    .fetch_all(&self.pool)
    .await?;
    Ok(
      rows
        .into_iter()
        .map(|r| GiverSummary {
          giver_id: r.giver_id,
          full_name: r.full_name,
          email: r.email,
          hourly_rate_rwf: r.hourly_rate_rwf,
          is_verified: r.is_verified,
          created_at: r.created_at,
        })
        .collect(),
    )
  }

  #[instrument(skip(self))]
  async fn update_giver_status(&self, giver_id: i64, is_verified: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE Service_Giver SET is_verified = ? WHERE giver_id = ?")
      .bind(is_verified)
      .bind(giver_id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn list_services(&self) -> Result<Vec<ServiceType>> {
    let sql = format!("SELECT {SERVICE_COLUMNS} FROM Service_Type ORDER BY name ASC");
    let rows = sqlx::query_as::<_, ServiceRow>(&sql).fetch_all(&self.pool).await?;
    Ok(rows.into_iter().map(ServiceType::from).collect())
  }

  async fn get_service(&self, service_id: i64) -> Result<Option<ServiceType>> {
    let sql = format!("SELECT {SERVICE_COLUMNS} FROM Service_Type WHERE service_id = ?");
    let row = sqlx::query_as::<_, ServiceRow>(&sql)
      .bind(service_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(ServiceType::from))
  }

  #[instrument(skip(self, input), fields(name = %input.name))]
  async fn create_service(&self, input: ServiceInput) -> Result<ServiceType> {
    let result = sqlx::query("INSERT INTO Service_Type (name, description, base_price_rwf) VALUES (?, ?, ?)")
      .bind(&input.name)
      .bind(&input.description)
      .bind(input.base_price_rwf)
      .execute(&self.pool)
      .await
      .map_err(|e| conflict_on_unique(e, "A service with this name already exists."))?;
    let service_id = result.last_insert_id() as i64;
    self
      .get_service(service_id)
      .await?
      .ok_or_else(|| AppError::Internal(format!("Service {} vanished after insert", service_id)))
  }

  #[instrument(skip(self, input), fields(name = %input.name))]
  async fn update_service(&self, service_id: i64, input: ServiceInput) -> Result<Option<ServiceType>> {
    let result = sqlx::query("UPDATE Service_Type SET name = ?, description = ?, base_price_rwf = ? WHERE service_id = ?")
      .bind(&input.name)
      .bind(&input.description)
      .bind(input.base_price_rwf)
      .bind(service_id)
      .execute(&self.pool)
      .await
      .map_err(|e| conflict_on_unique(e, "A service with this name already exists."))?;
    if result.rows_affected() == 0 {
      return Ok(None);
    }
    self.get_service(service_id).await
  }

  #[instrument(skip(self))]
  async fn delete_service(&self, service_id: i64) -> Result<bool> {
    let in_use: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Booking WHERE service_id = ?")
      .bind(service_id)
      .fetch_one(&self.pool)
      .await?;
    if in_use > 0 {
      return Err(AppError::Conflict(format!(
        "Service {} is referenced by {} booking(s).",
        service_id, in_use
      )));
    }
    let result = sqlx::query("DELETE FROM Service_Type WHERE service_id = ?")
      .bind(service_id)
      .execute(&self.pool)
      .await
      .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
          AppError::Conflict(format!("Service {} is still referenced.", service_id))
        }
        _ => AppError::Sqlx(e),
      })?;
    Ok(result.rows_affected() > 0)
  }

  async fn list_settings(&self) -> Result<BTreeMap<String, String>> {
    let rows: Vec<(String, String)> =
      sqlx::query_as("SELECT setting_key, setting_value FROM System_Setting ORDER BY setting_key ASC")
        .fetch_all(&self.pool)
        .await?;
    Ok(rows.into_iter().collect())
  }

  #[instrument(skip(self, batch), fields(keys = batch.len()))]
  async fn upsert_settings(&self, batch: &SettingsBatch) -> Result<()> {
    let mut tx = self.pool.begin().await?;
    for (key, value) in batch.iter() {
      let written = sqlx::query(
        "INSERT INTO System_Setting (setting_key, setting_value) VALUES (?, ?) \
         ON DUPLICATE KEY UPDATE setting_value = VALUES(setting_value), updated_at = CURRENT_TIMESTAMP",
      )
      .bind(key)
      .bind(value)
      .execute(&mut *tx)
      .await;

      if let Err(e) = written {
        error!(%key, error = %e, "Setting write failed; rolling back the whole batch.");
        tx.rollback().await?;
        return Err(AppError::Sqlx(e));
      }
    }
    tx.commit().await?;
    info!("Settings batch committed.");
    Ok(())
  }
}
