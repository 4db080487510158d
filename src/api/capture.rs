use actix_web::{
    HttpRequest, HttpResponse, Responder,
    http::{StatusCode, header},
    web,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::model::location::LocationReport;
use crate::services::capture;
use crate::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct SubmitAttendance {
    #[schema(example = "Jane Doe")]
    pub name: String,
}

/// Open a capture form
///
/// Status and display time are taken from the clock now and kept for the
/// life of the form.
#[utoipa::path(
    post,
    path = "/api/capture",
    responses(
        (status = 201, description = "Form opened", body = capture::CaptureForm)
    ),
    tag = "Capture"
)]
pub async fn open_form(state: web::Data<AppState>) -> impl Responder {
    let form = capture::open_form(&state).await;
    HttpResponse::Created().json(form)
}

#[utoipa::path(
    get,
    path = "/api/capture/{form_id}",
    params(("form_id" = String, Path, description = "Capture form ID")),
    responses(
        (status = 200, description = "Current form state", body = capture::CaptureForm),
        (status = 404, description = "Form not found or expired")
    ),
    tag = "Capture"
)]
pub async fn get_form(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let form = capture::get_form(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(form))
}

#[utoipa::path(
    delete,
    path = "/api/capture/{form_id}",
    params(("form_id" = String, Path, description = "Capture form ID")),
    responses(
        (status = 200, description = "Form discarded", body = Object, example = json!({
            "message": "Capture form discarded"
        })),
        (status = 404, description = "Form not found or expired")
    ),
    tag = "Capture"
)]
pub async fn discard_form(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    capture::discard_form(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Capture form discarded"
    })))
}

/// Upload the selfie
///
/// The raw image is the request body. It is checked for a face and then
/// dropped; only the face count is kept on the form.
#[utoipa::path(
    put,
    path = "/api/capture/{form_id}/photo",
    params(("form_id" = String, Path, description = "Capture form ID")),
    request_body(content = Vec<u8>, description = "Image bytes", content_type = "image/jpeg"),
    responses(
        (status = 200, description = "Face found", body = capture::CaptureForm),
        (status = 400, description = "Empty photo"),
        (status = 404, description = "Form not found or expired"),
        (status = 413, description = "Photo too large"),
        (status = 415, description = "Body is not an image"),
        (status = 422, description = "No face detected", body = Object, example = json!({
            "message": "No face detected, please retake the photo"
        })),
        (status = 502, description = "Face detection service failed")
    ),
    tag = "Capture"
)]
pub async fn upload_photo(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: HttpRequest,
    body: Result<web::Bytes, actix_web::Error>,
) -> Result<impl Responder, AppError> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with("image/") {
        return Err(AppError::UnsupportedMedia);
    }
    let body = body.map_err(|e| {
        if e.as_response_error().status_code() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PhotoTooLarge
        } else {
            AppError::Validation(e.to_string())
        }
    })?;
    if body.is_empty() {
        return Err(AppError::Validation("Photo is empty".to_string()));
    }

    let form = capture::attach_photo(&state, path.into_inner(), &body, content_type).await?;
    Ok(HttpResponse::Ok().json(form))
}

/// Report the device location
#[utoipa::path(
    put,
    path = "/api/capture/{form_id}/location",
    params(("form_id" = String, Path, description = "Capture form ID")),
    request_body = LocationReport,
    responses(
        (status = 200, description = "Location stored (address may be the fallback text)", body = capture::CaptureForm),
        (status = 400, description = "Coordinates out of range"),
        (status = 403, description = "Location permission denied"),
        (status = 404, description = "Form not found or expired"),
        (status = 422, description = "Location services disabled")
    ),
    tag = "Capture"
)]
pub async fn report_location(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    payload: web::Json<LocationReport>,
) -> Result<impl Responder, AppError> {
    let form = capture::attach_location(&state, path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(form))
}

/// Submit the form as an attendance record
#[utoipa::path(
    post,
    path = "/api/capture/{form_id}/submit",
    params(("form_id" = String, Path, description = "Capture form ID")),
    request_body = SubmitAttendance,
    responses(
        (status = 201, description = "Attendance recorded", body = Object, example = json!({
            "message": "Attendance recorded",
            "data": {
                "id": "7a3e0c5e-4f0e-4a51-9a43-3f1f5b1d2c11",
                "name": "Jane Doe",
                "address": "Jalan Merdeka, Bandung, 40111, Indonesia",
                "description": "Attend",
                "datetime": "19 October 2026, 08:12:45",
                "latitude": -6.914744,
                "longitude": 107.60981,
                "timestamp": "2026-10-19T01:12:47Z"
            }
        })),
        (status = 400, description = "Photo, name or location missing"),
        (status = 404, description = "Form not found or expired"),
        (status = 500, description = "Write failed; the form is kept for a retry")
    ),
    tag = "Capture"
)]
pub async fn submit_form(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    payload: web::Json<SubmitAttendance>,
) -> Result<impl Responder, AppError> {
    let record = capture::submit(&state, path.into_inner(), &payload.name).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Attendance recorded",
        "data": record
    })))
}
