// server/src/web/extractors.rs

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;

use crate::errors::AppError;
use crate::models::{Actor, Role};
use crate::state::AppState;

/// The account behind `Authorization: Bearer <token>`.
///
/// Use `Option<AuthenticatedUser>` for routes that answer anonymous callers
/// differently instead of rejecting them outright.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub account_id: i64,
  pub role: Role,
  pub token: String,
}

impl AuthenticatedUser {
  pub fn actor(&self) -> Actor {
    Actor {
      account_id: self.account_id,
      role: self.role,
    }
  }

  fn resolve(req: &HttpRequest) -> Result<Self, AppError> {
    let app_state = req
      .app_data::<web::Data<AppState>>()
      .ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))?;

    let token = bearer_token(req).ok_or_else(|| AppError::Auth("Please log in.".to_string()))?;
    let session = app_state.sessions.resolve(token).ok_or_else(|| {
      warn!("Unknown or expired session token presented.");
      AppError::Auth("Session expired. Please log in again.".to_string())
    })?;

    Ok(AuthenticatedUser {
      account_id: session.account_id,
      role: session.role,
      token: token.to_string(),
    })
  }
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(Self::resolve(req))
  }
}

/// An authenticated admin. Any other role gets 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let result = AuthenticatedUser::resolve(req).and_then(|user| {
      if user.role == Role::Admin {
        Ok(AdminUser(user))
      } else {
        warn!(account_id = user.account_id, role = %user.role, "Non-admin hit an admin route.");
        Err(AppError::Forbidden("Admin access required.".to_string()))
      }
    });
    ready(result)
  }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
  let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = value.split_once(' ')?;
  let token = token.trim();
  if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
    Some(token)
  } else {
    None
  }
}
