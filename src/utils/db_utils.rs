use sqlx::MySqlPool;

use crate::model::attendance::UpdateAttendance;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, PartialEq)]
pub enum SqlValue {
    String(String),
    F64(f64),
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug, PartialEq)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build UPDATE SQL from the fields present in `changes`
/// ===============================
/// Column names come from a fixed list, never from the request.
/// Returns `None` when nothing is set.
pub fn build_update_sql(table: &str, changes: &UpdateAttendance, id_column: &str) -> Option<SqlUpdate> {
    let mut columns: Vec<&str> = Vec::new();
    let mut values = Vec::new();

    if let Some(name) = &changes.name {
        columns.push("name");
        values.push(SqlValue::String(name.trim().to_string()));
    }
    if let Some(address) = &changes.address {
        columns.push("address");
        values.push(SqlValue::String(address.clone()));
    }
    if let Some(description) = changes.description {
        columns.push("description");
        values.push(SqlValue::String(description.to_string()));
    }
    if let Some(datetime) = &changes.datetime {
        columns.push("`datetime`");
        values.push(SqlValue::String(datetime.clone()));
    }
    if let Some(lat) = changes.latitude {
        columns.push("latitude");
        values.push(SqlValue::F64(lat));
    }
    if let Some(lon) = changes.longitude {
        columns.push("longitude");
        values.push(SqlValue::F64(lon));
    }

    if columns.is_empty() {
        return None;
    }

    let set_clause = columns
        .iter()
        .map(|c| format!("{} = ?", c))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {} SET {} WHERE {} = ?", table, set_clause, id_column);

    Some(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate, id: &str) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
        };
    }

    let result = query.bind(id).execute(pool).await?;
    Ok(result.rows_affected())
}
