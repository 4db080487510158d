//! Broadcast of record changes to live subscribers.

use serde::Serialize;
use strum::AsRefStr;
use tokio::sync::broadcast;

use crate::model::attendance::AttendanceRecord;

const FEED_CAPACITY: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecordEventKind {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordEvent {
    pub kind: RecordEventKind,
    pub id: String,
    /// Absent for deletions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<AttendanceRecord>,
}

#[derive(Clone)]
pub struct RecordFeed {
    sender: broadcast::Sender<RecordEvent>,
}

impl Default for RecordFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RecordEvent> {
        self.sender.subscribe()
    }

    fn publish(&self, event: RecordEvent) {
        // no subscribers is the normal idle case
        let delivered = self.sender.send(event).unwrap_or(0);
        tracing::debug!(delivered, "record event published");
    }

    pub fn created(&self, record: &AttendanceRecord) {
        self.publish(RecordEvent {
            kind: RecordEventKind::Created,
            id: record.id.clone(),
            record: Some(record.clone()),
        });
    }

    pub fn updated(&self, record: &AttendanceRecord) {
        self.publish(RecordEvent {
            kind: RecordEventKind::Updated,
            id: record.id.clone(),
            record: Some(record.clone()),
        });
    }

    pub fn deleted(&self, id: &str) {
        self.publish(RecordEvent {
            kind: RecordEventKind::Deleted,
            id: id.to_string(),
            record: None,
        });
    }
}
