use chrono::Timelike;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Attendance status label stored in a record's `description` field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
pub enum AttendanceStatus {
    Attend,
    Late,
    Leave,
}

impl AttendanceStatus {
    /// Buckets a time of day into a status.
    ///
    /// 08:30 is the last on-time minute; 08:31 through 17:59 is late and
    /// anything from 18:00 on counts as leaving.
    pub fn classify(hour: u32, minute: u32) -> Self {
        if hour < 8 || (hour == 8 && minute <= 30) {
            AttendanceStatus::Attend
        } else if (hour > 8 && hour < 18) || (hour == 8 && minute >= 31) {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Leave
        }
    }

    pub fn at<T: Timelike>(time: &T) -> Self {
        Self::classify(time.hour(), time.minute())
    }
}
