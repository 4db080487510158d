use crate::api::attendance::{RecordFilter, RecordListResponse, StatusPreview, StatusQuery};
use crate::api::capture::SubmitAttendance;
use crate::model::attendance::{AttendanceRecord, Coordinates, UpdateAttendance};
use crate::model::location::{CapturedLocation, LocationReport};
use crate::model::status::AttendanceStatus;
use crate::services::capture::CaptureForm;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance API",
        version = "0.1.0",
        description = r#"
## Selfie attendance

Each check-in is a **capture form**: open it, upload a selfie (a face must be
found), report the device location, then submit it with the user's name.

### Status labels
The status is fixed when the form is opened:
- **Attend**: before 08:31
- **Late**: 08:31 to 17:59
- **Leave**: 18:00 onwards

### History
Records can be listed, edited and deleted. `GET /api/attendance/stream`
pushes a snapshot followed by every change as Server-Sent Events.

### Errors
Every error answers `{"message": "..."}`.
"#,
    ),
    paths(
        crate::api::capture::open_form,
        crate::api::capture::get_form,
        crate::api::capture::discard_form,
        crate::api::capture::upload_photo,
        crate::api::capture::report_location,
        crate::api::capture::submit_form,

        crate::api::attendance::list_records,
        crate::api::attendance::get_record,
        crate::api::attendance::update_record,
        crate::api::attendance::delete_record,
        crate::api::attendance::preview_status,
        crate::api::attendance::stream_records
    ),
    components(
        schemas(
            AttendanceStatus,
            AttendanceRecord,
            UpdateAttendance,
            Coordinates,
            LocationReport,
            CapturedLocation,
            CaptureForm,
            SubmitAttendance,
            RecordFilter,
            RecordListResponse,
            StatusQuery,
            StatusPreview
        )
    ),
    tags(
        (name = "Capture", description = "Check-in form: photo, location, submit"),
        (name = "Attendance", description = "Attendance history"),
    )
)]
pub struct ApiDoc;
