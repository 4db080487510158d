//! Record persistence. Handlers only see [`AttendanceStore`]; the backend is
//! picked at startup from the configuration.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::attendance::{AttendanceRecord, NewAttendance, UpdateAttendance};
use crate::model::status::AttendanceStatus;

pub use memory::MemoryAttendanceStore;
pub use mysql::MySqlAttendanceStore;

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

/// Normalized list query. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListQuery {
    pub description: Option<AttendanceStatus>,
    pub page: u32,
    pub per_page: u32,
}

impl ListQuery {
    pub fn new(description: Option<AttendanceStatus>, page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            description,
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

#[derive(Debug, Clone)]
pub struct RecordPage {
    pub records: Vec<AttendanceRecord>,
    pub total: i64,
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// Appends a record. The store assigns `id` and `timestamp`.
    async fn create(&self, new: NewAttendance) -> Result<AttendanceRecord, StoreError>;

    /// Newest first.
    async fn list(&self, query: &ListQuery) -> Result<RecordPage, StoreError>;

    /// Every record, newest first. Used for live-feed snapshots.
    async fn all(&self) -> Result<Vec<AttendanceRecord>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Overwrites the given fields. `Ok(None)` when no record has this id.
    async fn update(
        &self,
        id: &str,
        changes: &UpdateAttendance,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// `Ok(false)` when no record has this id.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}
