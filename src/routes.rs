use crate::{
    api::{attendance, capture},
    config::Config,
    error::AppError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;

// Helper to build per-scope limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("period and burst are both non-zero");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    // malformed bodies and queries answer in the same JSON shape as every other error
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::Validation(format!("Invalid id: {err}")).into()),
    );

    cfg.service(
        web::scope(&config.api_prefix)
            .service(
                web::scope("/capture")
                    .wrap(build_limiter(config.rate_capture_per_min))
                    // /capture
                    .service(web::resource("").route(web::post().to(capture::open_form)))
                    // /capture/{form_id}
                    .service(
                        web::resource("/{form_id}")
                            .route(web::get().to(capture::get_form))
                            .route(web::delete().to(capture::discard_form)),
                    )
                    // /capture/{form_id}/photo
                    .service(
                        web::resource("/{form_id}/photo")
                            .app_data(web::PayloadConfig::new(config.max_photo_bytes))
                            .route(web::put().to(capture::upload_photo)),
                    )
                    // /capture/{form_id}/location
                    .service(
                        web::resource("/{form_id}/location")
                            .route(web::put().to(capture::report_location)),
                    )
                    // /capture/{form_id}/submit
                    .service(
                        web::resource("/{form_id}/submit")
                            .route(web::post().to(capture::submit_form)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .wrap(build_limiter(config.rate_records_per_min))
                    // /attendance
                    .service(web::resource("").route(web::get().to(attendance::list_records)))
                    // fixed paths go before /{record_id}
                    .service(
                        web::resource("/status").route(web::get().to(attendance::preview_status)),
                    )
                    .service(
                        web::resource("/stream").route(web::get().to(attendance::stream_records)),
                    )
                    // /attendance/{record_id}
                    .service(
                        web::resource("/{record_id}")
                            .route(web::get().to(attendance::get_record))
                            .route(web::put().to(attendance::update_record))
                            .route(web::delete().to(attendance::delete_record)),
                    ),
            ),
    );
}

// CAPTURE (one check-in attempt)
//  POST   /capture                  -> form (status fixed here)
//  PUT    /capture/{id}/photo       -> face check
//  PUT    /capture/{id}/location    -> coordinates + address
//  POST   /capture/{id}/submit      -> attendance record

// HISTORY
//  GET    /attendance[?description=&page=&per_page=]
//  GET    /attendance/stream        (SSE)
//  GET|PUT|DELETE /attendance/{id}
