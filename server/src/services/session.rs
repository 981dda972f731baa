// server/src/services/session.rs

//! Bearer-token sessions kept in process memory.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::models::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
  pub account_id: i64,
  pub role: Role,
  pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SessionStore {
  ttl: Duration,
  sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
  pub fn new(ttl: Duration) -> Self {
    Self {
      ttl,
      sessions: RwLock::new(HashMap::new()),
    }
  }

  /// Opens a session and returns its token. Sessions that have already
  /// expired are dropped in the same pass.
  #[instrument(name = "SessionStore::issue", skip(self))]
  pub fn issue(&self, account_id: i64, role: Role) -> String {
    let token = Uuid::new_v4().simple().to_string();
    let now = Utc::now();
    // A TTL past chrono's range never expires.
    let expires_at = chrono::Duration::from_std(self.ttl)
      .ok()
      .and_then(|ttl| now.checked_add_signed(ttl))
      .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let session = Session {
      account_id,
      role,
      expires_at,
    };

    let mut sessions = self.sessions.write();
    let before = sessions.len();
    sessions.retain(|_, s| s.expires_at > now);
    let purged = before - sessions.len();
    sessions.insert(token.clone(), session);
    drop(sessions);

    debug!(purged, "Session issued.");
    token
  }

  /// Returns the live session behind `token`. Expired entries are dropped on
  /// the way.
  pub fn resolve(&self, token: &str) -> Option<Session> {
    let now = Utc::now();
    let found = self.sessions.read().get(token).copied();
    match found {
      Some(session) if session.expires_at > now => Some(session),
      Some(_) => {
        self.sessions.write().remove(token);
        debug!("Expired session removed.");
        None
      }
      None => None,
    }
  }

  /// `true` when a session was closed.
  pub fn revoke(&self, token: &str) -> bool {
    self.sessions.write().remove(token).is_some()
  }

  pub fn len(&self) -> usize {
    self.sessions.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.sessions.read().is_empty()
  }

  /// Drops every expired session and returns how many went.
  pub fn purge_expired(&self) -> usize {
    let now = Utc::now();
    let mut sessions = self.sessions.write();
    let before = sessions.len();
    sessions.retain(|_, s| s.expires_at > now);
    before - sessions.len()
  }
}
