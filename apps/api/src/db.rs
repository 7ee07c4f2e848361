use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;

/// Creates and returns a SQLite connection pool.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    info!("Connecting to SQLite at {database_url}...");

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("SQLite connection pool established");
    Ok(pool)
}

/// Creates the plan tables if they do not exist yet.
///
/// `generated_schedule` is stored as a JSON text column. Historically it may
/// contain raw, unparseable model output — the repair endpoint exists to
/// recover exactly those rows.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS plans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            subjects TEXT NOT NULL,
            learning_goal TEXT NOT NULL DEFAULT '',
            difficulty_feedback TEXT NOT NULL DEFAULT '',
            hours_per_day TEXT NOT NULL DEFAULT '',
            off_days TEXT NOT NULL DEFAULT '',
            class_schedule TEXT NOT NULL DEFAULT '',
            generated_guide TEXT NOT NULL DEFAULT '',
            generated_schedule TEXT NOT NULL DEFAULT '',
            resources TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subject_marks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            plan_id INTEGER NOT NULL REFERENCES plans(id),
            subject_name TEXT NOT NULL,
            component_type TEXT NOT NULL,
            assessment_name TEXT NOT NULL,
            max_marks REAL NOT NULL,
            obtained_marks REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database schema ready");
    Ok(())
}
