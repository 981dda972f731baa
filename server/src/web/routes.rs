// server/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{admin_handlers, auth_handlers, booking_handlers, catalog_handlers, review_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api")
      .route("/health", web::get().to(health_check_handler))
      // Authentication
      .route("/register", web::post().to(auth_handlers::register_handler))
      .route("/login", web::post().to(auth_handlers::login_handler))
      .route("/logout", web::post().to(auth_handlers::logout_handler))
      .route("/me", web::get().to(auth_handlers::me_handler))
      // Bookings
      .service(
        web::scope("/bookings")
          .route("", web::get().to(booking_handlers::list_bookings_handler))
          .route("", web::post().to(booking_handlers::create_booking_handler))
          .route("/{booking_id}", web::get().to(booking_handlers::get_booking_handler))
          .route(
            "/{booking_id}/status",
            web::put().to(booking_handlers::update_booking_status_handler),
          )
          .route("/{booking_id}/pay", web::post().to(booking_handlers::pay_booking_handler))
          .route("/{booking_id}/review", web::get().to(booking_handlers::booking_review_handler)),
      )
      // Reviews
      .route("/reviews", web::post().to(review_handlers::create_review_handler))
      .route("/reviews/{review_id}", web::put().to(review_handlers::update_review_handler))
      .route("/givers/{giver_id}/reviews", web::get().to(review_handlers::giver_reviews_handler))
      // Public catalogue
      .route("/services", web::get().to(catalog_handlers::list_services_handler))
      .route("/services/{service_id}", web::get().to(catalog_handlers::get_service_handler))
      // Admin
      .service(
        web::scope("/admin")
          .route("/dashboard", web::get().to(admin_handlers::dashboard_handler))
          .route("/givers", web::get().to(admin_handlers::list_givers_handler))
          .route(
            "/givers/{giver_id}/status",
            web::put().to(admin_handlers::update_giver_status_handler),
          )
          .route("/services", web::get().to(admin_handlers::list_services_handler))
          .route("/services", web::post().to(admin_handlers::create_service_handler))
          .route("/services/{service_id}", web::put().to(admin_handlers::update_service_handler))
          .route("/services/{service_id}", web::delete().to(admin_handlers::delete_service_handler))
          .route("/settings", web::get().to(admin_handlers::get_settings_handler))
          .route("/settings", web::post().to(admin_handlers::update_settings_handler)),
      ),
  );
}
