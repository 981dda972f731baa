// server/src/models/account.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which credential table an account lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  Client,
  Giver,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::Admin => "admin",
      Role::Client => "client",
      Role::Giver => "giver",
    }
  }

  /// Admin accounts are seeded, never self-registered.
  pub fn can_self_register(&self) -> bool {
    !matches!(self, Role::Admin)
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "admin" => Ok(Role::Admin),
      "client" => Ok(Role::Client),
      // The giver table is called Service_Giver; accept both spellings.
      "giver" | "service_giver" => Ok(Role::Giver),
      other => Err(format!("Unknown role '{}'", other)),
    }
  }
}

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
  pub id: i64,
  pub role: Role,
  pub full_name: String,
  pub email: String,
}

/// The authenticated party behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
  pub account_id: i64,
  pub role: Role,
}

/// What the login flow needs from the credential store.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub id: i64,
  pub full_name: String,
  pub email: String,
  pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
  pub role: Role,
  pub full_name: String,
  pub email: String,
  pub password_hash: String,
  pub hourly_rate_rwf: Option<i64>,
  pub created_at: DateTime<Utc>,
}
