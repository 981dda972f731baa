// server/src/pipelines/contexts.rs

//! Context data of every workflow. Handlers receive these wrapped in
//! `flow::ContextData`; the web layer builds one, runs it, and reads the
//! filled-in output fields afterwards.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::models::{Account, Actor, Booking, BookingStatus, Credentials, Payment, Rating, Review, Role, SettingsBatch};
use crate::services::payment_mock::MockCharge;
use crate::state::AppState;

// --- Accounts ---

#[derive(Clone)]
pub struct RegisterCtxData {
  pub app_state: AppState,
  pub role: Role,
  pub full_name: String,
  pub email: String,
  pub password: String,
  pub hourly_rate_rwf: Option<i64>,
  pub password_hash: Option<String>,
  pub created_account: Option<Account>,
}

impl RegisterCtxData {
  pub fn new(
    app_state: AppState,
    role: Role,
    full_name: String,
    email: String,
    password: String,
    hourly_rate_rwf: Option<i64>,
  ) -> Self {
    Self {
      app_state,
      role,
      full_name,
      email,
      password,
      hourly_rate_rwf,
      password_hash: None,
      created_account: None,
    }
  }
}

#[derive(Clone)]
pub struct LoginCtxData {
  pub app_state: AppState,
  pub role: Role,
  pub email: String,
  pub password: String,
  /// Cleared as soon as the password has been checked.
  pub credentials: Option<Credentials>,
  pub account: Option<Account>,
  pub session_token: Option<String>,
}

impl LoginCtxData {
  pub fn new(app_state: AppState, role: Role, email: String, password: String) -> Self {
    Self {
      app_state,
      role,
      email,
      password,
      credentials: None,
      account: None,
      session_token: None,
    }
  }
}

// --- Bookings ---

#[derive(Clone)]
pub struct CreateBookingCtxData {
  pub app_state: AppState,
  /// `None` when the request carried no valid session.
  pub actor: Option<Actor>,
  pub claimed_client_id: Option<i64>,
  pub giver_id: i64,
  pub service_id: i64,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub total_price_rwf: i64,
  pub notes: Option<String>,
  pub created_booking: Option<Booking>,
}

#[derive(Clone)]
pub struct BookingStatusCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub booking_id: i64,
  pub requested_status: String,
  pub next_status: Option<BookingStatus>,
  pub booking: Option<Booking>,
  pub updated_booking: Option<Booking>,
}

impl BookingStatusCtxData {
  pub fn new(app_state: AppState, actor: Actor, booking_id: i64, requested_status: String) -> Self {
    Self {
      app_state,
      actor,
      booking_id,
      requested_status,
      next_status: None,
      booking: None,
      updated_booking: None,
    }
  }
}

// --- Reviews ---

#[derive(Clone)]
pub struct ReviewCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub booking_id: i64,
  pub claimed_giver_id: Option<i64>,
  pub raw_rating: i64,
  pub comment: Option<String>,
  pub rating: Option<Rating>,
  pub booking: Option<Booking>,
  pub saved_review: Option<Review>,
}

impl ReviewCtxData {
  pub fn new(
    app_state: AppState,
    actor: Actor,
    booking_id: i64,
    claimed_giver_id: Option<i64>,
    raw_rating: i64,
    comment: Option<String>,
  ) -> Self {
    Self {
      app_state,
      actor,
      booking_id,
      claimed_giver_id,
      raw_rating,
      comment,
      rating: None,
      booking: None,
      saved_review: None,
    }
  }
}

// --- Payments ---

#[derive(Clone)]
pub struct PaymentCtxData {
  pub app_state: AppState,
  pub actor: Actor,
  pub booking_id: i64,
  pub booking: Option<Booking>,
  pub charge: Option<MockCharge>,
  pub payment: Option<Payment>,
  /// Set when the booking had been paid before this run.
  pub already_paid: bool,
}

impl PaymentCtxData {
  pub fn new(app_state: AppState, actor: Actor, booking_id: i64) -> Self {
    Self {
      app_state,
      actor,
      booking_id,
      booking: None,
      charge: None,
      payment: None,
      already_paid: false,
    }
  }
}

// --- Admin ---

#[derive(Clone)]
pub struct SettingsCtxData {
  pub app_state: AppState,
  pub raw_settings: Map<String, Value>,
  pub batch: Option<SettingsBatch>,
  pub saved_settings: Option<BTreeMap<String, String>>,
}

impl SettingsCtxData {
  pub fn new(app_state: AppState, raw_settings: Map<String, Value>) -> Self {
    Self {
      app_state,
      raw_settings,
      batch: None,
      saved_settings: None,
    }
  }
}
