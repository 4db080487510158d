use std::sync::Arc;

use crate::services::face::FaceDetector;
use crate::services::feed::RecordFeed;
use crate::services::geocode::ReverseGeocoder;
use crate::store::AttendanceStore;
use crate::utils::clock::Clock;
use crate::utils::form_cache::FormCache;

/// Shared handles for every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AttendanceStore>,
    pub faces: Arc<dyn FaceDetector>,
    pub geocoder: Arc<dyn ReverseGeocoder>,
    pub forms: FormCache,
    pub feed: RecordFeed,
    pub clock: Arc<dyn Clock>,
}
