// server/src/models/booking.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;
use crate::models::Role;

/// Lifecycle of a booking.
///
/// ```text
/// Pending ──► Accepted ──► Completed
///    │
///    └──────► Rejected
/// ```
///
/// `Cancelled` is a legal stored value with no edge leading into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
  Pending,
  Accepted,
  Rejected,
  Completed,
  Cancelled,
}

impl BookingStatus {
  pub const ALL: [BookingStatus; 5] = [
    BookingStatus::Pending,
    BookingStatus::Accepted,
    BookingStatus::Rejected,
    BookingStatus::Completed,
    BookingStatus::Cancelled,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      BookingStatus::Pending => "Pending",
      BookingStatus::Accepted => "Accepted",
      BookingStatus::Rejected => "Rejected",
      BookingStatus::Completed => "Completed",
      BookingStatus::Cancelled => "Cancelled",
    }
  }

  /// States reachable in one move.
  pub fn successors(&self) -> &'static [BookingStatus] {
    match self {
      BookingStatus::Pending => &[BookingStatus::Accepted, BookingStatus::Rejected],
      BookingStatus::Accepted => &[BookingStatus::Completed],
      BookingStatus::Rejected | BookingStatus::Completed | BookingStatus::Cancelled => &[],
    }
  }

  pub fn can_transition_to(&self, next: BookingStatus) -> bool {
    self.successors().contains(&next)
  }

  pub fn is_terminal(&self) -> bool {
    self.successors().is_empty()
  }

  /// Checks one edge of the graph and returns the new state.
  pub fn transition(self, next: BookingStatus) -> Result<BookingStatus, AppError> {
    if self.can_transition_to(next) {
      Ok(next)
    } else {
      Err(AppError::InvalidTransition { from: self, to: next })
    }
  }

  /// Which party may drive a booking into `self`.
  pub fn may_be_set_by(&self, role: Role) -> bool {
    match self {
      BookingStatus::Accepted | BookingStatus::Rejected => role == Role::Giver,
      BookingStatus::Completed => matches!(role, Role::Giver | Role::Client),
      BookingStatus::Pending | BookingStatus::Cancelled => false,
    }
  }

  /// A booking can be paid once the giver has accepted it.
  pub fn is_payable(&self) -> bool {
    matches!(self, BookingStatus::Accepted | BookingStatus::Completed)
  }
}

impl fmt::Display for BookingStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for BookingStatus {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim();
    BookingStatus::ALL
      .into_iter()
      .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
      .ok_or_else(|| AppError::Validation(format!("Unknown booking status '{}'", wanted)))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Booking {
  pub booking_id: i64,
  pub client_id: i64,
  pub giver_id: i64,
  pub service_id: i64,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub total_price_rwf: i64,
  pub status: BookingStatus,
  pub notes: Option<String>,
  pub is_paid: bool,
  pub created_at: DateTime<Utc>,
}

impl Booking {
  pub fn involves(&self, role: Role, account_id: i64) -> bool {
    match role {
      Role::Admin => true,
      Role::Client => self.client_id == account_id,
      Role::Giver => self.giver_id == account_id,
    }
  }
}

#[derive(Debug, Clone)]
pub struct NewBooking {
  pub client_id: i64,
  pub giver_id: i64,
  pub service_id: i64,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub total_price_rwf: i64,
  pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
  pub client_id: Option<i64>,
  pub giver_id: Option<i64>,
  pub status: Option<BookingStatus>,
}

impl BookingFilter {
  /// Restricts the listing to what `role` is allowed to see.
  pub fn for_account(role: Role, account_id: i64) -> Self {
    match role {
      Role::Admin => Self::default(),
      Role::Client => Self {
        client_id: Some(account_id),
        ..Self::default()
      },
      Role::Giver => Self {
        giver_id: Some(account_id),
        ..Self::default()
      },
    }
  }

  pub fn matches(&self, booking: &Booking) -> bool {
    self.client_id.map_or(true, |id| booking.client_id == id)
      && self.giver_id.map_or(true, |id| booking.giver_id == id)
      && self.status.map_or(true, |status| booking.status == status)
  }
}
