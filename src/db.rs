use sqlx::MySqlPool;

pub async fn init_db(database_url: &str) -> Result<MySqlPool, sqlx::Error> {
    let pool = MySqlPool::connect(database_url).await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

async fn ensure_schema(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance (
            id          CHAR(36)     NOT NULL PRIMARY KEY,
            name        VARCHAR(255) NOT NULL,
            address     TEXT         NOT NULL,
            description VARCHAR(16)  NOT NULL,
            `datetime`  VARCHAR(64)  NOT NULL,
            latitude    DOUBLE       NOT NULL,
            longitude   DOUBLE       NOT NULL,
            `timestamp` TIMESTAMP    NOT NULL DEFAULT CURRENT_TIMESTAMP,
            INDEX idx_attendance_timestamp (`timestamp`)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
