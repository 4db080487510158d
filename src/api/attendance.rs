use std::convert::Infallible;

use actix_web::{HttpResponse, Responder, http::header, web};
use chrono::NaiveTime;
use futures::{Stream, StreamExt, stream};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::model::attendance::{AttendanceRecord, UpdateAttendance};
use crate::model::status::AttendanceStatus;
use crate::services::feed::RecordEvent;
use crate::state::AppState;
use crate::store::ListQuery;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct RecordFilter {
    /// Only records with this status
    #[schema(example = "Late")]
    pub description: Option<AttendanceStatus>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u32>,
    /// Items per page (max 100)
    #[schema(example = 20)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct RecordListResponse {
    pub data: Vec<AttendanceRecord>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct StatusQuery {
    /// Time of day as HH:MM; defaults to now
    #[schema(example = "08:31")]
    pub at: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct StatusPreview {
    #[schema(example = "08:31")]
    pub at: String,
    pub description: AttendanceStatus,
}

/* =========================
List attendance records
========================= */
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(RecordFilter),
    responses(
        (status = 200, description = "Paginated attendance records, newest first", body = RecordListResponse),
        (status = 400, description = "Invalid filter"),
        (status = 500, description = "Storage failure")
    ),
    tag = "Attendance"
)]
pub async fn list_records(
    state: web::Data<AppState>,
    filter: web::Query<RecordFilter>,
) -> Result<impl Responder, AppError> {
    let filter = filter.into_inner();
    let query = ListQuery::new(filter.description, filter.page, filter.per_page);

    let page = state.store.list(&query).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to list attendance records");
        AppError::from(e)
    })?;

    Ok(HttpResponse::Ok().json(RecordListResponse {
        data: page.records,
        page: query.page,
        per_page: query.per_page,
        total: page.total,
    }))
}

/* =========================
Get one record
========================= */
#[utoipa::path(
    get,
    path = "/api/attendance/{record_id}",
    params(("record_id" = String, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Record found", body = AttendanceRecord),
        (status = 404, description = "Record not found", body = Object, example = json!({
            "message": "Attendance record not found"
        }))
    ),
    tag = "Attendance"
)]
pub async fn get_record(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let record_id = path.into_inner();
    let record = state.store.get(&record_id).await?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(record))
}

/* =========================
Edit a record
========================= */
#[utoipa::path(
    put,
    path = "/api/attendance/{record_id}",
    params(("record_id" = String, Path, description = "Record ID")),
    request_body = UpdateAttendance,
    responses(
        (status = 200, description = "Record updated", body = AttendanceRecord),
        (status = 400, description = "Invalid or empty update"),
        (status = 404, description = "Record not found"),
        (status = 500, description = "Storage failure")
    ),
    tag = "Attendance"
)]
pub async fn update_record(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UpdateAttendance>,
) -> Result<impl Responder, AppError> {
    let record_id = path.into_inner();
    let changes = payload.into_inner();
    changes.validate().map_err(AppError::Validation)?;

    let record = state
        .store
        .update(&record_id, &changes)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, record_id = %record_id, "Failed to update attendance record");
            AppError::from(e)
        })?
        .ok_or(AppError::NotFound)?;

    state.feed.updated(&record);
    Ok(HttpResponse::Ok().json(record))
}

/* =========================
Delete a record
========================= */
#[utoipa::path(
    delete,
    path = "/api/attendance/{record_id}",
    params(("record_id" = String, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Record not found"),
        (status = 500, description = "Storage failure")
    ),
    tag = "Attendance"
)]
pub async fn delete_record(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let record_id = path.into_inner();

    let deleted = state.store.delete(&record_id).await.map_err(|e| {
        tracing::error!(error = %e, record_id = %record_id, "Failed to delete attendance record");
        AppError::from(e)
    })?;
    if !deleted {
        return Err(AppError::NotFound);
    }

    state.feed.deleted(&record_id);
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}

/* =========================
Status preview
========================= */
#[utoipa::path(
    get,
    path = "/api/attendance/status",
    params(StatusQuery),
    responses(
        (status = 200, description = "Status for the given or current time", body = StatusPreview),
        (status = 400, description = "Invalid time")
    ),
    tag = "Attendance"
)]
pub async fn preview_status(
    state: web::Data<AppState>,
    query: web::Query<StatusQuery>,
) -> Result<impl Responder, AppError> {
    let time = match query.at.as_deref() {
        Some(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .map_err(|_| AppError::Validation(format!("invalid time {raw:?}, expected HH:MM")))?,
        None => state.clock.now().time(),
    };

    Ok(HttpResponse::Ok().json(StatusPreview {
        at: time.format("%H:%M").to_string(),
        description: AttendanceStatus::at(&time),
    }))
}

/* =========================
Live record feed (Server-Sent Events)
========================= */
#[utoipa::path(
    get,
    path = "/api/attendance/stream",
    responses(
        (status = 200, description = "text/event-stream: a `snapshot` event with all records, then `created` / `updated` / `deleted` events"),
        (status = 500, description = "Storage failure")
    ),
    tag = "Attendance"
)]
pub async fn stream_records(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    // subscribe first so nothing written during the snapshot read is lost
    let rx = state.feed.subscribe();
    let snapshot = state.store.all().await?;
    debug!(records = snapshot.len(), "live subscriber attached");

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(record_event_stream(snapshot, rx)))
}

fn sse_frame<T: Serialize>(event: &str, data: &T) -> web::Bytes {
    let body = serde_json::to_string(data).unwrap_or_else(|_| "null".to_string());
    web::Bytes::from(format!("event: {event}\ndata: {body}\n\n"))
}

pub fn record_event_stream(
    snapshot: Vec<AttendanceRecord>,
    rx: broadcast::Receiver<RecordEvent>,
) -> impl Stream<Item = Result<web::Bytes, Infallible>> + 'static {
    let first = stream::once(async move { Ok(sse_frame("snapshot", &snapshot)) });

    let changes = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let frame = sse_frame(event.kind.as_ref(), &event);
                    return Some((Ok(frame), rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "live subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    first.chain(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::NewAttendance;
    use crate::routes;
    use crate::services::feed::RecordFeed;
    use crate::services::testing::{StubFaceDetector, StubGeocoder, state_at};
    use crate::store::{AttendanceStore, MemoryAttendanceStore};
    use actix_web::{App, http::StatusCode, test};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn peer() -> std::net::SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn new_attendance(name: &str, description: AttendanceStatus) -> NewAttendance {
        NewAttendance {
            name: name.to_string(),
            address: "Main Street".to_string(),
            description,
            datetime: "19 October 2026, 08:00:00".to_string(),
            latitude: 1.0,
            longitude: 2.0,
        }
    }

    async fn seeded() -> (AppState, Arc<MemoryAttendanceStore>, Vec<AttendanceRecord>) {
        let now = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(8, 31, 0)
            .unwrap();
        let (state, store) = state_at(now, StubFaceDetector::faces(1), StubGeocoder::ok("Road"));
        let mut records = Vec::new();
        for (name, status) in [
            ("ann", AttendanceStatus::Attend),
            ("bob", AttendanceStatus::Late),
            ("cyd", AttendanceStatus::Late),
        ] {
            records.push(store.create(new_attendance(name, status)).await.unwrap());
        }
        (state, store, records)
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state.clone()))
                    .configure(|cfg| routes::configure(cfg, &crate::config::Config::default())),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_list_records() {
        let (state, _, _) = seeded().await;
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/api/attendance?description=Late&per_page=1")
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["per_page"], 1);
        assert_eq!(body["data"][0]["name"], "cyd");
        assert_eq!(body["data"][0]["description"], "Late");
    }

    #[actix_web::test]
    async fn test_list_rejects_unknown_status() {
        let (state, _, _) = seeded().await;
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/api/attendance?description=Absent")
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_get_update_delete_record() {
        let (state, store, records) = seeded().await;
        let mut feed = state.feed.subscribe();
        let app = app!(state);
        let id = &records[0].id;

        let req = test::TestRequest::get()
            .uri(&format!("/api/attendance/{id}"))
            .peer_addr(peer())
            .to_request();
        let fetched: AttendanceRecord = test::call_and_read_body_json(&app, req).await;
        assert_eq!(&fetched, &records[0]);

        let req = test::TestRequest::put()
            .uri(&format!("/api/attendance/{id}"))
            .peer_addr(peer())
            .set_json(json!({"name": "Ann Lee", "description": "Leave"}))
            .to_request();
        let updated: AttendanceRecord = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated.name, "Ann Lee");
        assert_eq!(updated.description, AttendanceStatus::Leave);
        assert_eq!(updated.timestamp, records[0].timestamp);
        assert_eq!(feed.recv().await.unwrap().id, *id);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/attendance/{id}"))
            .peer_addr(peer())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        assert!(store.get(id).await.unwrap().is_none());

        let req = test::TestRequest::get()
            .uri(&format!("/api/attendance/{id}"))
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Attendance record not found");
    }

    #[actix_web::test]
    async fn test_update_validation() {
        let (state, _, records) = seeded().await;
        let app = app!(state);
        let uri = format!("/api/attendance/{}", records[1].id);

        for body in [json!({}), json!({"name": " "}), json!({"latitude": 120.0})] {
            let req = test::TestRequest::put()
                .uri(&uri)
                .peer_addr(peer())
                .set_json(body)
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
        }

        let req = test::TestRequest::put()
            .uri(&uri)
            .peer_addr(peer())
            .set_json(json!({"description": "Absent"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::put()
            .uri("/api/attendance/missing")
            .peer_addr(peer())
            .set_json(json!({"address": "x"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_preview_status() {
        let (state, _, _) = seeded().await;
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/api/attendance/status?at=08:30")
            .peer_addr(peer())
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"at": "08:30", "description": "Attend"}));

        // falls back to the state clock, frozen at 08:31
        let req = test::TestRequest::get()
            .uri("/api/attendance/status")
            .peer_addr(peer())
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"at": "08:31", "description": "Late"}));

        let req = test::TestRequest::get()
            .uri("/api/attendance/status?at=25:00")
            .peer_addr(peer())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_record_event_stream_sends_snapshot_then_changes() {
        let (_, _, records) = seeded().await;
        let feed = RecordFeed::new();
        let mut events = Box::pin(record_event_stream(records.clone(), feed.subscribe()));

        feed.deleted(&records[2].id);

        let snapshot = events.next().await.unwrap().unwrap();
        let snapshot = std::str::from_utf8(&snapshot).unwrap().to_string();
        assert!(snapshot.starts_with("event: snapshot\ndata: ["));
        assert!(snapshot.ends_with("\n\n"));
        assert!(snapshot.contains(&records[0].id));

        let deleted = events.next().await.unwrap().unwrap();
        assert_eq!(
            std::str::from_utf8(&deleted).unwrap(),
            format!("event: deleted\ndata: {{\"kind\":\"deleted\",\"id\":\"{}\"}}\n\n", records[2].id)
        );

        drop(feed);
        assert!(events.next().await.is_none());
    }

    #[actix_web::test]
    async fn test_stream_endpoint_headers() {
        let (state, _, _) = seeded().await;
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/api/attendance/stream")
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
    }
}
