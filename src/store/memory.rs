#[cfg(test)]
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AttendanceStore, ListQuery, RecordPage};
use crate::error::StoreError;
use crate::model::attendance::{AttendanceRecord, NewAttendance, UpdateAttendance};

/// Process-local store, kept in insertion order.
///
/// Used when no database is configured, and by the handler tests.
#[derive(Default)]
pub struct MemoryAttendanceStore {
    records: RwLock<Vec<AttendanceRecord>>,
    #[cfg(test)]
    create_calls: AtomicU64,
    #[cfg(test)]
    fail_writes: AtomicBool,
}

impl MemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of create attempts, successful or not.
    #[cfg(test)]
    pub fn create_calls(&self) -> u64 {
        self.create_calls.load(Ordering::Relaxed)
    }

    /// Makes every following write fail, simulating an unreachable backend.
    #[cfg(test)]
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    #[cfg(test)]
    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("attendance store is unavailable".to_string()));
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn check_writable(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl AttendanceStore for MemoryAttendanceStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, new: NewAttendance) -> Result<AttendanceRecord, StoreError> {
        #[cfg(test)]
        self.create_calls.fetch_add(1, Ordering::Relaxed);
        self.check_writable()?;

        let record = AttendanceRecord {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            address: new.address,
            description: new.description,
            datetime: new.datetime,
            latitude: new.latitude,
            longitude: new.longitude,
            timestamp: Utc::now(),
        };
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn list(&self, query: &ListQuery) -> Result<RecordPage, StoreError> {
        let records = self.records.read().await;
        let matching: Vec<&AttendanceRecord> = records
            .iter()
            .rev()
            .filter(|r| query.description.is_none_or(|d| r.description == d))
            .collect();

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.per_page as usize)
            .cloned()
            .collect();

        Ok(RecordPage { records: page, total })
    }

    async fn all(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        Ok(self.records.read().await.iter().rev().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self.records.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn update(
        &self,
        id: &str,
        changes: &UpdateAttendance,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        self.check_writable()?;
        let mut records = self.records.write().await;
        Ok(records.iter_mut().find(|r| r.id == id).map(|r| {
            changes.apply_to(r);
            r.clone()
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }
}
