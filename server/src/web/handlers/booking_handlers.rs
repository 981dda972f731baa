// server/src/web/handlers/booking_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::NaiveDate;
use flow::{ContextData, PipelineResult};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::{Booking, BookingFilter, BookingStatus, Role};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{BookingStatusCtxData, CreateBookingCtxData, PaymentCtxData};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

// --- Request DTOs ---

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingPayload {
  #[serde(default, alias = "client_id")]
  pub client_id: Option<i64>,
  #[serde(alias = "giver_id")]
  pub giver_id: i64,
  #[serde(alias = "service_id")]
  pub service_id: i64,
  #[serde(alias = "start_date")]
  pub start_date: NaiveDate,
  #[serde(alias = "end_date")]
  pub end_date: NaiveDate,
  #[serde(alias = "total_price_rwf")]
  pub total_price_rwf: i64,
  #[serde(default)]
  pub notes: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct StatusUpdatePayload {
  pub status: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct BookingListQuery {
  pub status: Option<String>,
}

/// Loads a booking the caller may see: a party to it, or an admin.
pub(crate) async fn visible_booking(
  app_state: &AppState,
  auth_user: &AuthenticatedUser,
  booking_id: i64,
) -> Result<Booking, AppError> {
  let booking = common_steps::load_booking(app_state.store.as_ref(), booking_id).await?;
  if booking.involves(auth_user.role, auth_user.account_id) {
    Ok(booking)
  } else {
    warn!(account_id = auth_user.account_id, booking_id, "Access to another party's booking refused.");
    Err(AppError::Forbidden("This booking belongs to someone else.".to_string()))
  }
}

// --- Handlers ---

#[instrument(name = "handler::list_bookings", skip(app_state, auth_user, query), fields(account_id = auth_user.account_id, role = %auth_user.role))]
pub async fn list_bookings_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<BookingListQuery>,
) -> Result<HttpResponse, AppError> {
  let mut filter = BookingFilter::for_account(auth_user.role, auth_user.account_id);
  if let Some(raw) = query.status.as_deref().filter(|s| !s.trim().is_empty()) {
    filter.status = Some(raw.parse::<BookingStatus>()?);
  }
  let bookings = app_state.store.list_bookings(&filter).await?;
  Ok(HttpResponse::Ok().json(bookings))
}

#[instrument(name = "handler::create_booking", skip(app_state, auth_user, req_payload), fields(giver_id = req_payload.giver_id, service_id = req_payload.service_id))]
pub async fn create_booking_handler(
  app_state: web::Data<AppState>,
  auth_user: Option<AuthenticatedUser>,
  req_payload: web::Json<CreateBookingPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = ContextData::new(CreateBookingCtxData {
    app_state: app_state.get_ref().clone(),
    actor: auth_user.as_ref().map(AuthenticatedUser::actor),
    claimed_client_id: payload.client_id,
    giver_id: payload.giver_id,
    service_id: payload.service_id,
    start_date: payload.start_date,
    end_date: payload.end_date,
    total_price_rwf: payload.total_price_rwf,
    notes: payload.notes,
    created_booking: None,
  });

  match app_state.flows.run(ctx.clone()).await? {
    PipelineResult::Completed => {
      let booking = ctx
        .read()
        .created_booking
        .clone()
        .ok_or_else(|| AppError::Internal("Booking pipeline completed without a booking.".to_string()))?;
      Ok(HttpResponse::Created().json(json!({
        "message": "Booking created.",
        "booking": booking,
      })))
    }
    PipelineResult::Stopped => Err(AppError::Internal("Booking creation was halted.".to_string())),
  }
}

#[instrument(name = "handler::get_booking", skip(app_state, auth_user), fields(account_id = auth_user.account_id))]
pub async fn get_booking_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let booking = visible_booking(&app_state, &auth_user, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(booking))
}

#[instrument(name = "handler::update_booking_status", skip(app_state, auth_user, req_payload), fields(account_id = auth_user.account_id, status = %req_payload.status))]
pub async fn update_booking_status_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
  req_payload: web::Json<StatusUpdatePayload>,
) -> Result<HttpResponse, AppError> {
  let booking_id = path.into_inner();
  let ctx = ContextData::new(BookingStatusCtxData::new(
    app_state.get_ref().clone(),
    auth_user.actor(),
    booking_id,
    req_payload.into_inner().status,
  ));

  match app_state.flows.run(ctx.clone()).await? {
    PipelineResult::Completed => {
      let booking = ctx
        .read()
        .updated_booking
        .clone()
        .ok_or_else(|| AppError::Internal("Status pipeline completed without a booking.".to_string()))?;
      info!(booking_id, status = %booking.status, "Status change answered.");
      Ok(HttpResponse::Ok().json(json!({
        "message": format!("Booking {} is now {}.", booking.booking_id, booking.status),
        "booking": booking,
      })))
    }
    PipelineResult::Stopped => Err(AppError::Internal("Status change was halted.".to_string())),
  }
}

#[instrument(name = "handler::pay_booking", skip(app_state, auth_user), fields(account_id = auth_user.account_id))]
pub async fn pay_booking_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let booking_id = path.into_inner();
  if auth_user.role != Role::Client {
    return Err(AppError::Forbidden("Only clients can pay for bookings.".to_string()));
  }
  let ctx = ContextData::new(PaymentCtxData::new(
    app_state.get_ref().clone(),
    auth_user.actor(),
    booking_id,
  ));

  // `Stopped` means the booking was already paid; the context carries the
  // existing payment either way.
  app_state.flows.run(ctx.clone()).await?;
  let (payment, already_paid) = {
    let guard = ctx.read();
    (guard.payment.clone(), guard.already_paid)
  };
  let payment = payment.ok_or_else(|| AppError::Internal("Payment pipeline finished without a payment.".to_string()))?;

  Ok(HttpResponse::Ok().json(json!({
    "message": if already_paid { "Booking was already paid." } else { "Payment successful." },
    "payment": payment,
    "already_paid": already_paid,
  })))
}

#[instrument(name = "handler::booking_review", skip(app_state, auth_user), fields(account_id = auth_user.account_id))]
pub async fn booking_review_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let booking = visible_booking(&app_state, &auth_user, path.into_inner()).await?;
  let review = app_state
    .store
    .get_review_for_booking(booking.booking_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Booking {} has no review yet", booking.booking_id)))?;
  Ok(HttpResponse::Ok().json(review))
}
