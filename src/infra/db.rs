use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

const SCHEMA: [&str; 3] = [
    r#"CREATE TABLE IF NOT EXISTS blogs (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        title       TEXT NOT NULL,
        description TEXT NOT NULL,
        content     TEXT NOT NULL,
        date        TEXT NOT NULL,
        slug        TEXT NOT NULL,
        image       TEXT
    )"#,
    "CREATE INDEX IF NOT EXISTS blogs_slug_idx ON blogs (slug)",
    "CREATE INDEX IF NOT EXISTS blogs_date_idx ON blogs (date)",
];

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePool::connect(database_url).await?;
    init_schema(&pool).await?;
    Ok(pool)
}

/// Single-connection in-memory database; every new pool starts empty.
pub async fn memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    init_schema(&pool).await?;
    Ok(pool)
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
