use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What the device's geolocation reported for a capture form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LocationReport {
    Fix { latitude: f64, longitude: f64 },
    ServiceDisabled,
    PermissionDenied {
        #[serde(default)]
        permanent: bool,
    },
}

/// Location attached to a capture form once a fix has been resolved.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CapturedLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    /// False when the geocoder failed and the fallback text was used.
    pub resolved: bool,
}
