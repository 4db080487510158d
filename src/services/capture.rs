//! The check-in flow: open a form, attach a verified photo and a location,
//! then submit it as one attendance record.
//!
//! The status and display time are fixed when the form is opened. A form
//! opened at 08:29 stays `Attend` even if it is submitted at 08:35.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::model::attendance::{
    AttendanceRecord, Coordinates, FALLBACK_ADDRESS, NewAttendance, check_name,
    format_capture_datetime,
};
use crate::model::location::{CapturedLocation, LocationReport};
use crate::model::status::AttendanceStatus;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CaptureForm {
    #[schema(example = "5d4c1a8e-0a3b-4c9e-8f6e-2b7d9c0e1f23", value_type = String)]
    pub id: Uuid,
    pub description: AttendanceStatus,
    #[schema(example = "19 October 2026, 08:12:45")]
    pub datetime: String,
    #[schema(example = "2026-10-19T08:12:45", format = "date-time", value_type = String)]
    pub opened_at: NaiveDateTime,
    /// Faces found in the current photo. `None` until a photo passes the check.
    pub faces: Option<usize>,
    pub location: Option<CapturedLocation>,
}

impl CaptureForm {
    pub fn open(id: Uuid, now: NaiveDateTime) -> Self {
        Self {
            id,
            description: AttendanceStatus::at(&now),
            datetime: format_capture_datetime(&now),
            opened_at: now,
            faces: None,
            location: None,
        }
    }

    /// Builds the record to write, or says what is still missing.
    pub fn to_new_attendance(&self, name: &str) -> Result<NewAttendance, AppError> {
        if self.faces.is_none() {
            return Err(AppError::Incomplete("Please take a photo first".to_string()));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Incomplete("Please enter your name".to_string()));
        }
        check_name(name).map_err(AppError::Validation)?;
        let location = self
            .location
            .as_ref()
            .ok_or_else(|| AppError::Incomplete("Location has not been captured yet".to_string()))?;

        Ok(NewAttendance {
            name: name.to_string(),
            address: location.address.clone(),
            description: self.description,
            datetime: self.datetime.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
        })
    }
}

async fn load(state: &AppState, id: Uuid) -> Result<CaptureForm, AppError> {
    state.forms.get(&id).await.ok_or(AppError::FormNotFound)
}

pub async fn open_form(state: &AppState) -> CaptureForm {
    let form = CaptureForm::open(Uuid::new_v4(), state.clock.now());
    state.forms.put(form.clone()).await;
    info!(form_id = %form.id, description = %form.description, "capture form opened");
    form
}

pub async fn get_form(state: &AppState, id: Uuid) -> Result<CaptureForm, AppError> {
    load(state, id).await
}

pub async fn discard_form(state: &AppState, id: Uuid) -> Result<(), AppError> {
    state.forms.take(&id).await.map(|_| ()).ok_or(AppError::FormNotFound)
}

/// Runs face detection on a new photo. Zero faces clears any earlier check.
pub async fn attach_photo(
    state: &AppState,
    id: Uuid,
    image: &[u8],
    content_type: &str,
) -> Result<CaptureForm, AppError> {
    load(state, id).await?;

    let faces = state
        .faces
        .detect(image, content_type)
        .await
        .map_err(|e| {
            warn!(form_id = %id, error = %e, "face detection failed");
            AppError::Detector(e.to_string())
        })?;

    // the form may have been submitted or discarded while detection ran
    let detected = (!faces.is_empty()).then_some(faces.len());
    let form = state
        .forms
        .update(&id, |form| form.faces = detected)
        .await
        .ok_or(AppError::FormNotFound)?;

    match detected {
        Some(count) => {
            info!(form_id = %id, faces = count, "photo accepted");
            Ok(form)
        }
        None => {
            info!(form_id = %id, "photo rejected, no face detected");
            Err(AppError::NoFaceDetected)
        }
    }
}

/// Stores the device location. Geocoder failures fall back to placeholder text.
pub async fn attach_location(
    state: &AppState,
    id: Uuid,
    report: LocationReport,
) -> Result<CaptureForm, AppError> {
    load(state, id).await?;

    let coords = match report {
        LocationReport::Fix { latitude, longitude } => Coordinates { latitude, longitude },
        LocationReport::ServiceDisabled => return Err(AppError::LocationServiceDisabled),
        LocationReport::PermissionDenied { permanent: false } => {
            return Err(AppError::LocationPermissionDenied);
        }
        LocationReport::PermissionDenied { permanent: true } => {
            return Err(AppError::LocationPermissionDeniedForever);
        }
    };
    coords.validate().map_err(AppError::Validation)?;

    let (address, resolved) = match state.geocoder.reverse(coords).await {
        Ok(address) => (address, true),
        Err(e) => {
            warn!(form_id = %id, error = %e, "reverse geocoding failed, using fallback address");
            (FALLBACK_ADDRESS.to_string(), false)
        }
    };

    let location = CapturedLocation {
        latitude: coords.latitude,
        longitude: coords.longitude,
        address,
        resolved,
    };
    state
        .forms
        .update(&id, |form| form.location = Some(location))
        .await
        .ok_or(AppError::FormNotFound)
}

/// Writes the record. The form is taken out of the cache for the attempt
/// and put back if it is incomplete or the write fails, so it can be
/// resubmitted as-is. A second submit of the same form finds nothing.
pub async fn submit(state: &AppState, id: Uuid, name: &str) -> Result<AttendanceRecord, AppError> {
    let form = state.forms.take(&id).await.ok_or(AppError::FormNotFound)?;

    let new = match form.to_new_attendance(name) {
        Ok(new) => new,
        Err(e) => {
            state.forms.put(form).await;
            return Err(e);
        }
    };

    let record = match state.store.create(new).await {
        Ok(record) => record,
        Err(e) => {
            tracing::error!(form_id = %id, error = %e, "attendance write failed");
            state.forms.put(form).await;
            return Err(e.into());
        }
    };

    state.feed.created(&record);
    info!(
        form_id = %id,
        record_id = %record.id,
        description = %record.description,
        "attendance recorded"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{GatedGeocoder, StubFaceDetector, StubGeocoder, state_at};
    use crate::store::AttendanceStore;
    use crate::utils::clock::ManualClock;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    const FIX: LocationReport = LocationReport::Fix { latitude: -6.9, longitude: 107.6 };

    #[actix_web::test]
    async fn test_open_form_fixes_status_and_datetime() {
        let (state, _) = state_at(at(8, 29), StubFaceDetector::faces(1), StubGeocoder::ok("Road"));
        let form = open_form(&state).await;

        assert_eq!(form.description, AttendanceStatus::Attend);
        assert_eq!(form.datetime, "19 October 2026, 08:29:00");
        assert!(form.faces.is_none());
        assert!(get_form(&state, form.id).await.is_ok());
    }

    #[actix_web::test]
    async fn test_full_flow_records_status_from_open_time() {
        let (state, store) =
            state_at(at(9, 15), StubFaceDetector::faces(1), StubGeocoder::ok("Jalan Merdeka"));
        let mut feed = state.feed.subscribe();

        let form = open_form(&state).await;
        attach_photo(&state, form.id, b"jpeg", "image/jpeg").await.unwrap();
        let form = attach_location(&state, form.id, FIX).await.unwrap();
        assert_eq!(form.location.as_ref().unwrap().address, "Jalan Merdeka");

        let record = submit(&state, form.id, "  Jane Doe ").await.unwrap();
        assert_eq!(record.name, "Jane Doe");
        assert_eq!(record.description, AttendanceStatus::Late);
        assert_eq!(record.datetime, "19 October 2026, 09:15:00");
        assert_eq!(record.latitude, -6.9);

        // the stored Late label agrees with the hour/minute the form was opened at
        let opened = form.opened_at;
        assert_eq!(AttendanceStatus::at(&opened), record.description);

        assert_eq!(store.all().await.unwrap(), vec![record.clone()]);
        assert!(matches!(get_form(&state, form.id).await, Err(AppError::FormNotFound)));
        assert_eq!(feed.recv().await.unwrap().id, record.id);
    }

    #[actix_web::test]
    async fn test_status_not_reevaluated_at_submit() {
        let (mut state, _) = state_at(at(8, 29), StubFaceDetector::faces(1), StubGeocoder::ok("Road"));
        let clock = Arc::new(ManualClock::new(at(8, 29)));
        state.clock = clock.clone();

        let form = open_form(&state).await;
        attach_photo(&state, form.id, b"jpeg", "image/jpeg").await.unwrap();
        attach_location(&state, form.id, FIX).await.unwrap();

        clock.set(at(8, 35));
        let record = submit(&state, form.id, "Jane").await.unwrap();
        assert_eq!(record.description, AttendanceStatus::Attend);
        assert_eq!(record.datetime, "19 October 2026, 08:29:00");
    }

    #[actix_web::test]
    async fn test_missing_name_or_photo_never_writes() {
        let (state, store) = state_at(at(7, 0), StubFaceDetector::faces(1), StubGeocoder::ok("Road"));
        let form = open_form(&state).await;
        attach_location(&state, form.id, FIX).await.unwrap();

        let err = submit(&state, form.id, "Jane").await.unwrap_err();
        assert!(matches!(err, AppError::Incomplete(_)));

        attach_photo(&state, form.id, b"jpeg", "image/jpeg").await.unwrap();
        let err = submit(&state, form.id, "   ").await.unwrap_err();
        assert!(matches!(err, AppError::Incomplete(_)));

        assert_eq!(store.create_calls(), 0);
        assert!(get_form(&state, form.id).await.is_ok());
    }

    #[actix_web::test]
    async fn test_overlong_name_never_writes() {
        let (state, store) = state_at(at(7, 0), StubFaceDetector::faces(1), StubGeocoder::ok("Road"));
        let form = open_form(&state).await;
        attach_photo(&state, form.id, b"jpeg", "image/jpeg").await.unwrap();
        attach_location(&state, form.id, FIX).await.unwrap();

        let err = submit(&state, form.id, &"J".repeat(256)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.create_calls(), 0);
        assert!(get_form(&state, form.id).await.is_ok());
    }

    #[actix_web::test]
    async fn test_missing_location_never_writes() {
        let (state, store) = state_at(at(7, 0), StubFaceDetector::faces(2), StubGeocoder::ok("Road"));
        let form = open_form(&state).await;
        attach_photo(&state, form.id, b"jpeg", "image/jpeg").await.unwrap();

        assert!(matches!(
            submit(&state, form.id, "Jane").await,
            Err(AppError::Incomplete(_))
        ));
        assert_eq!(store.create_calls(), 0);
    }

    #[actix_web::test]
    async fn test_zero_faces_blocks_and_clears_previous_photo() {
        let detector = StubFaceDetector::faces(1);
        let (state, _) = state_at(at(7, 0), detector.clone(), StubGeocoder::ok("Road"));
        let form = open_form(&state).await;

        let accepted = attach_photo(&state, form.id, b"jpeg", "image/jpeg").await.unwrap();
        assert_eq!(accepted.faces, Some(1));

        detector.set_faces(0);
        let err = attach_photo(&state, form.id, b"jpeg", "image/jpeg").await.unwrap_err();
        assert!(matches!(err, AppError::NoFaceDetected));
        assert!(get_form(&state, form.id).await.unwrap().faces.is_none());
    }

    #[actix_web::test]
    async fn test_detector_failure() {
        let (state, _) = state_at(at(7, 0), StubFaceDetector::failing(), StubGeocoder::ok("Road"));
        let form = open_form(&state).await;
        let err = attach_photo(&state, form.id, b"jpeg", "image/jpeg").await.unwrap_err();
        assert!(matches!(err, AppError::Detector(_)));
    }

    #[actix_web::test]
    async fn test_geocoder_failure_uses_fallback() {
        let (state, _) = state_at(at(7, 0), StubFaceDetector::faces(1), StubGeocoder::failing());
        let form = open_form(&state).await;
        let form = attach_location(&state, form.id, FIX).await.unwrap();

        let location = form.location.unwrap();
        assert_eq!(location.address, FALLBACK_ADDRESS);
        assert!(!location.resolved);
    }

    #[actix_web::test]
    async fn test_location_errors_are_blocking() {
        let (state, _) = state_at(at(7, 0), StubFaceDetector::faces(1), StubGeocoder::ok("Road"));
        let form = open_form(&state).await;

        assert!(matches!(
            attach_location(&state, form.id, LocationReport::ServiceDisabled).await,
            Err(AppError::LocationServiceDisabled)
        ));
        assert!(matches!(
            attach_location(&state, form.id, LocationReport::PermissionDenied { permanent: false }).await,
            Err(AppError::LocationPermissionDenied)
        ));
        assert!(matches!(
            attach_location(&state, form.id, LocationReport::PermissionDenied { permanent: true }).await,
            Err(AppError::LocationPermissionDeniedForever)
        ));
        assert!(matches!(
            attach_location(&state, form.id, LocationReport::Fix { latitude: 95.0, longitude: 0.0 }).await,
            Err(AppError::Validation(_))
        ));
        assert!(get_form(&state, form.id).await.unwrap().location.is_none());
    }

    #[actix_web::test]
    async fn test_failed_write_keeps_form_for_retry() {
        let (state, store) = state_at(at(18, 5), StubFaceDetector::faces(1), StubGeocoder::ok("Road"));
        let form = open_form(&state).await;
        attach_photo(&state, form.id, b"jpeg", "image/jpeg").await.unwrap();
        attach_location(&state, form.id, FIX).await.unwrap();

        store.set_fail_writes(true);
        let err = submit(&state, form.id, "Jane").await.unwrap_err();
        assert_eq!(err.to_string(), "attendance store is unavailable");
        assert!(get_form(&state, form.id).await.is_ok());

        store.set_fail_writes(false);
        let record = submit(&state, form.id, "Jane").await.unwrap();
        assert_eq!(record.description, AttendanceStatus::Leave);
        assert_eq!(store.create_calls(), 2);
    }

    #[actix_web::test]
    async fn test_unknown_and_discarded_forms() {
        let (state, _) = state_at(at(7, 0), StubFaceDetector::faces(1), StubGeocoder::ok("Road"));
        assert!(matches!(
            submit(&state, Uuid::new_v4(), "Jane").await,
            Err(AppError::FormNotFound)
        ));

        let form = open_form(&state).await;
        discard_form(&state, form.id).await.unwrap();
        assert!(matches!(discard_form(&state, form.id).await, Err(AppError::FormNotFound)));
    }

    #[actix_web::test]
    async fn test_late_location_does_not_revive_submitted_form() {
        let (mut state, store) =
            state_at(at(7, 0), StubFaceDetector::faces(1), StubGeocoder::ok("Road"));
        let form = open_form(&state).await;
        attach_photo(&state, form.id, b"jpeg", "image/jpeg").await.unwrap();
        attach_location(&state, form.id, FIX).await.unwrap();

        let gate = GatedGeocoder::default();
        state.geocoder = Arc::new(gate.clone());

        // a second location report is still geocoding when the form is submitted
        let relocate = attach_location(&state, form.id, FIX);
        let submit_first = async {
            gate.entered.notified().await;
            let record = submit(&state, form.id, "Jane").await.unwrap();
            gate.release.notify_one();
            record
        };
        let (relocated, record) = futures::join!(relocate, submit_first);

        assert!(matches!(relocated, Err(AppError::FormNotFound)));
        assert!(matches!(get_form(&state, form.id).await, Err(AppError::FormNotFound)));
        assert!(matches!(
            submit(&state, form.id, "Jane").await,
            Err(AppError::FormNotFound)
        ));
        assert_eq!(store.all().await.unwrap(), vec![record]);
        assert_eq!(store.create_calls(), 1);
    }

    #[actix_web::test]
    async fn test_incomplete_submit_puts_form_back() {
        let (state, _) = state_at(at(7, 0), StubFaceDetector::faces(1), StubGeocoder::ok("Road"));
        let form = open_form(&state).await;
        attach_photo(&state, form.id, b"jpeg", "image/jpeg").await.unwrap();

        assert!(submit(&state, form.id, "Jane").await.is_err());
        let kept = get_form(&state, form.id).await.unwrap();
        assert_eq!(kept.faces, Some(1));
    }
}
