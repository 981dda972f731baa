// server/src/web/handlers/review_handlers.rs

use actix_web::{web, HttpResponse};
use flow::{ContextData, PipelineResult};
use serde::Deserialize;
use tracing::instrument;

use crate::errors::AppError;
use crate::models::{Actor, GiverReviews, Review, Role};
use crate::pipelines::contexts::ReviewCtxData;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewPayload {
  #[serde(alias = "booking_id")]
  pub booking_id: i64,
  #[serde(default, alias = "giver_id")]
  pub giver_id: Option<i64>,
  pub rating: i64,
  #[serde(default)]
  pub comment: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct UpdateReviewPayload {
  pub rating: i64,
  #[serde(default)]
  pub comment: Option<String>,
}

async fn run_review_pipeline(app_state: &AppState, ctx_data: ReviewCtxData) -> Result<Review, AppError> {
  let ctx = ContextData::new(ctx_data);
  match app_state.flows.run(ctx.clone()).await? {
    PipelineResult::Completed => ctx
      .read()
      .saved_review
      .clone()
      .ok_or_else(|| AppError::Internal("Review pipeline completed without a review.".to_string())),
    PipelineResult::Stopped => Err(AppError::Internal("Review submission was halted.".to_string())),
  }
}

#[instrument(name = "handler::create_review", skip(app_state, auth_user, req_payload), fields(account_id = auth_user.account_id, booking_id = req_payload.booking_id))]
pub async fn create_review_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<CreateReviewPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let review = run_review_pipeline(
    &app_state,
    ReviewCtxData::new(
      app_state.get_ref().clone(),
      auth_user.actor(),
      payload.booking_id,
      payload.giver_id,
      payload.rating,
      payload.comment,
    ),
  )
  .await?;
  Ok(HttpResponse::Ok().json(review))
}

#[instrument(name = "handler::update_review", skip(app_state, auth_user, req_payload), fields(account_id = auth_user.account_id))]
pub async fn update_review_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
  req_payload: web::Json<UpdateReviewPayload>,
) -> Result<HttpResponse, AppError> {
  let review_id = path.into_inner();
  let existing = app_state
    .store
    .get_review(review_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Review {} not found", review_id)))?;

  let actor: Actor = auth_user.actor();
  if actor.role != Role::Client || existing.client_id != actor.account_id {
    return Err(AppError::Forbidden("Only the author can edit this review.".to_string()));
  }

  let payload = req_payload.into_inner();
  let review = run_review_pipeline(
    &app_state,
    ReviewCtxData::new(
      app_state.get_ref().clone(),
      actor,
      existing.booking_id,
      None,
      payload.rating,
      payload.comment,
    ),
  )
  .await?;
  Ok(HttpResponse::Ok().json(review))
}

#[instrument(name = "handler::giver_reviews", skip(app_state))]
pub async fn giver_reviews_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let giver_id = path.into_inner();
  if app_state.store.find_account(Role::Giver, giver_id).await?.is_none() {
    return Err(AppError::NotFound(format!("Service giver {} not found", giver_id)));
  }
  let reviews = app_state.store.list_reviews_for_giver(giver_id).await?;
  Ok(HttpResponse::Ok().json(GiverReviews::new(giver_id, reviews)))
}
