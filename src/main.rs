use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpResponse, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;

mod api;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod routes;
mod services;
mod state;
mod store;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::services::face::HttpFaceDetector;
use crate::services::feed::RecordFeed;
use crate::services::geocode::NominatimGeocoder;
use crate::state::AppState;
use crate::store::{AttendanceStore, MemoryAttendanceStore, MySqlAttendanceStore};
use crate::utils::clock::SystemClock;
use crate::utils::form_cache::FormCache;
use serde_json::json;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

const MAX_OPEN_FORMS: u64 = 100_000;

#[get("/health")]
async fn health(state: Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "store": state.store.backend_tag()
    }))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "attendance.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let store: Arc<dyn AttendanceStore> = match &config.database_url {
        Some(url) => {
            let pool = init_db(url).await.context("failed to connect to database")?;
            Arc::new(MySqlAttendanceStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, attendance records are kept in memory only");
            Arc::new(MemoryAttendanceStore::new())
        }
    };

    let faces = HttpFaceDetector::new(config.face_detector_url.clone(), config.http_timeout())
        .context("failed to build face detector client")?;
    let geocoder = NominatimGeocoder::new(config.geocoder_url.clone(), config.http_timeout())
        .context("failed to build geocoder client")?;

    let state = AppState {
        store,
        faces: Arc::new(faces),
        geocoder: Arc::new(geocoder),
        forms: FormCache::new(config.form_ttl(), MAX_OPEN_FORMS),
        feed: RecordFeed::new(),
        clock: Arc::new(SystemClock),
    };

    info!(
        addr = %config.server_addr,
        store = state.store.backend_tag(),
        face_detector = %config.face_detector_url,
        geocoder = %config.geocoder_url,
        "configuration loaded"
    );

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(state.clone()))
            .service(health)
            .configure(|cfg| routes::configure(cfg, &config_data))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
