use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, MySqlPool};
use uuid::Uuid;

use super::{AttendanceStore, ListQuery, RecordPage};
use crate::error::StoreError;
use crate::model::attendance::{AttendanceRecord, NewAttendance, UpdateAttendance};
use crate::model::status::AttendanceStatus;
use crate::utils::db_utils::{build_update_sql, execute_update};

const SELECT_COLUMNS: &str = r#"
    SELECT id, name, address, description, `datetime`, latitude, longitude, `timestamp`
    FROM attendance
"#;

#[derive(FromRow)]
struct AttendanceRow {
    id: String,
    name: String,
    address: String,
    description: String,
    datetime: String,
    latitude: f64,
    longitude: f64,
    timestamp: DateTime<Utc>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let description =
            AttendanceStatus::from_str(&row.description).map_err(|_| StoreError::Corrupt {
                id: row.id.clone(),
                reason: format!("unknown status label {:?}", row.description),
            })?;

        Ok(AttendanceRecord {
            id: row.id,
            name: row.name,
            address: row.address,
            description,
            datetime: row.datetime,
            latitude: row.latitude,
            longitude: row.longitude,
            timestamp: row.timestamp,
        })
    }
}

fn into_records(rows: Vec<AttendanceRow>) -> Result<Vec<AttendanceRecord>, StoreError> {
    rows.into_iter().map(AttendanceRecord::try_from).collect()
}

pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    fn backend_tag(&self) -> &'static str {
        "mysql"
    }

    async fn create(&self, new: NewAttendance) -> Result<AttendanceRecord, StoreError> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO attendance (id, name, address, description, `datetime`, latitude, longitude)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.name)
        .bind(&new.address)
        .bind(new.description.as_ref())
        .bind(&new.datetime)
        .bind(new.latitude)
        .bind(new.longitude)
        .execute(&self.pool)
        .await?;

        // read back for the server-assigned timestamp
        self.get(&id).await?.ok_or_else(|| StoreError::Corrupt {
            id,
            reason: "record missing right after insert".to_string(),
        })
    }

    async fn list(&self, query: &ListQuery) -> Result<RecordPage, StoreError> {
        let where_clause = if query.description.is_some() {
            "WHERE description = ?"
        } else {
            ""
        };

        let sql = format!(
            "{SELECT_COLUMNS} {where_clause} ORDER BY `timestamp` DESC, id LIMIT ? OFFSET ?"
        );
        let mut rows_query = sqlx::query_as::<_, AttendanceRow>(&sql);
        if let Some(description) = query.description {
            rows_query = rows_query.bind(description.to_string());
        }
        let rows = rows_query
            .bind(query.per_page as i64)
            .bind(query.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM attendance {where_clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(description) = query.description {
            count_query = count_query.bind(description.to_string());
        }
        let total = count_query.fetch_one(&self.pool).await?;

        Ok(RecordPage {
            records: into_records(rows)?,
            total,
        })
    }

    async fn all(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY `timestamp` DESC, id");
        let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        into_records(rows)
    }

    async fn get(&self, id: &str) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?");
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(AttendanceRecord::try_from).transpose()
    }

    async fn update(
        &self,
        id: &str,
        changes: &UpdateAttendance,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        if let Some(update) = build_update_sql("attendance", changes, "id") {
            execute_update(&self.pool, update, id).await?;
        }
        // affected rows count only changed rows, so existence is checked by re-reading
        self.get(id).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM attendance WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
