use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::status::AttendanceStatus;

/// Address stored when reverse geocoding fails.
pub const FALLBACK_ADDRESS: &str = "Address unavailable";

/// Column widths of the `attendance` table, in characters.
pub const MAX_NAME_LEN: usize = 255;
pub const MAX_DATETIME_LEN: usize = 64;

pub fn check_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("name must not be empty".to_string());
    }
    if name.trim().chars().count() > MAX_NAME_LEN {
        return Err(format!("name must be at most {MAX_NAME_LEN} characters"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": "7a3e0c5e-4f0e-4a51-9a43-3f1f5b1d2c11",
        "name": "Jane Doe",
        "address": "Jalan Merdeka, Bandung, 40111, Indonesia",
        "description": "Attend",
        "datetime": "19 October 2026, 08:12:45",
        "latitude": -6.914744,
        "longitude": 107.60981,
        "timestamp": "2026-10-19T01:12:47Z"
    })
)]
pub struct AttendanceRecord {
    #[schema(example = "7a3e0c5e-4f0e-4a51-9a43-3f1f5b1d2c11")]
    pub id: String,
    #[schema(example = "Jane Doe")]
    pub name: String,
    pub address: String,
    pub description: AttendanceStatus,
    #[schema(example = "19 October 2026, 08:12:45")]
    pub datetime: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Creation time, assigned by the store.
    #[schema(example = "2026-10-19T01:12:47Z", format = "date-time", value_type = String)]
    pub timestamp: DateTime<Utc>,
}

/// Fields written on create. `id` and `timestamp` come from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendance {
    pub name: String,
    pub address: String,
    pub description: AttendanceStatus,
    pub datetime: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct UpdateAttendance {
    #[schema(example = "Jane Doe")]
    pub name: Option<String>,
    pub address: Option<String>,
    pub description: Option<AttendanceStatus>,
    #[schema(example = "19 October 2026, 08:12:45")]
    pub datetime: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl UpdateAttendance {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.description.is_none()
            && self.datetime.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
    }

    /// Checks the overwrite before it reaches the store.
    pub fn validate(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("No fields provided for update".to_string());
        }
        if let Some(name) = &self.name {
            check_name(name)?;
        }
        if let Some(datetime) = &self.datetime {
            if datetime.chars().count() > MAX_DATETIME_LEN {
                return Err(format!("datetime must be at most {MAX_DATETIME_LEN} characters"));
            }
        }
        if let Some(lat) = self.latitude {
            check_latitude(lat)?;
        }
        if let Some(lon) = self.longitude {
            check_longitude(lon)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, record: &mut AttendanceRecord) {
        if let Some(name) = &self.name {
            record.name = name.trim().to_string();
        }
        if let Some(address) = &self.address {
            record.address = address.clone();
        }
        if let Some(description) = self.description {
            record.description = description;
        }
        if let Some(datetime) = &self.datetime {
            record.datetime = datetime.clone();
        }
        if let Some(lat) = self.latitude {
            record.latitude = lat;
        }
        if let Some(lon) = self.longitude {
            record.longitude = lon;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    #[schema(example = -6.914744)]
    pub latitude: f64,
    #[schema(example = 107.60981)]
    pub longitude: f64,
}

impl Coordinates {
    pub fn validate(&self) -> Result<(), String> {
        check_latitude(self.latitude)?;
        check_longitude(self.longitude)
    }
}

fn check_latitude(lat: f64) -> Result<(), String> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude {lat} out of range [-90, 90]"));
    }
    Ok(())
}

fn check_longitude(lon: f64) -> Result<(), String> {
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("longitude {lon} out of range [-180, 180]"));
    }
    Ok(())
}

/// Display string stored in `datetime`, e.g. `19 October 2026, 08:12:45`.
pub fn format_capture_datetime(at: &NaiveDateTime) -> String {
    format!("{}, {}", at.format("%d %B %Y"), at.format("%H:%M:%S"))
}
