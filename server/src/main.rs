// server/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use mediahub::config::AppConfig;
use tracing::Level;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  dotenvy::dotenv().ok();
  let json_logs = std::env::var("LOG_FORMAT").map_or(false, |v| v.eq_ignore_ascii_case("json"));
  let subscriber = tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE);
  if json_logs {
    subscriber.json().init();
  } else {
    subscriber.init();
  }

  tracing::info!("Starting MediaHub server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => cfg,
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };
  let server_address = app_config.bind_address();

  let app_state = match mediahub::bootstrap(app_config).await {
    Ok(state) => state,
    Err(e) => {
      tracing::error!(error = %e, "Failed to initialise storage.");
      return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
    }
  };
  tracing::info!("Pipelines registered; binding server to {}...", server_address);

  let sessions = app_state.sessions.clone();
  actix_web::rt::spawn(async move {
    let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
    loop {
      ticker.tick().await;
      let purged = sessions.purge_expired();
      if purged > 0 {
        tracing::debug!(purged, "Expired sessions purged.");
      }
    }
  });

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .app_data(mediahub::json_config())
      .app_data(mediahub::query_config())
      .app_data(mediahub::path_config())
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(mediahub::web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
