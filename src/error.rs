use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Storage failure. The message is shown to the user as-is.
#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "{}", _0)]
    Database(sqlx::Error),
    #[display(fmt = "stored record {} is corrupt: {}", id, reason)]
    Corrupt { id: String, reason: String },
    #[display(fmt = "{}", _0)]
    Unavailable(String),
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "{}", _0)]
    Validation(String),
    #[display(fmt = "{}", _0)]
    Incomplete(String),
    #[display(fmt = "Attendance record not found")]
    NotFound,
    #[display(fmt = "Capture form not found or expired")]
    FormNotFound,
    #[display(fmt = "No face detected, please retake the photo")]
    NoFaceDetected,
    #[display(fmt = "Photo must be sent as an image/* body")]
    UnsupportedMedia,
    #[display(fmt = "Photo is too large")]
    PhotoTooLarge,
    #[display(fmt = "Location services are disabled. Please enable the services")]
    LocationServiceDisabled,
    #[display(fmt = "Location permissions are denied")]
    LocationPermissionDenied,
    #[display(fmt = "Location permissions are permanently denied, we cannot request permissions.")]
    LocationPermissionDeniedForever,
    #[display(fmt = "Face detection failed: {}", _0)]
    Detector(String),
    #[display(fmt = "{}", _0)]
    Storage(StoreError),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Storage(e)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Incomplete(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound | AppError::FormNotFound => StatusCode::NOT_FOUND,
            AppError::NoFaceDetected | AppError::LocationServiceDisabled => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::LocationPermissionDenied | AppError::LocationPermissionDeniedForever => {
                StatusCode::FORBIDDEN
            }
            AppError::UnsupportedMedia => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::PhotoTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Detector(_) => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string()
        }))
    }
}
