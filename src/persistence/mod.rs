pub mod events;
pub mod matches;
pub mod participants;
pub mod singles;
pub mod teams;

use sqlx::{
    Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::{ServiceError, ServiceResult, events::SEEDED_EVENT_TYPES};

const SCHEMA_SQL: &str = "\
CREATE TABLE IF NOT EXISTS persons (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS teams (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS team_members (
    team_id INTEGER NOT NULL REFERENCES teams (id),
    person_id INTEGER NOT NULL REFERENCES persons (id),
    PRIMARY KEY (team_id, person_id)
);
CREATE TABLE IF NOT EXISTS singles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    person_id INTEGER NOT NULL REFERENCES persons (id)
);
CREATE TABLE IF NOT EXISTS matches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    start_time INTEGER NOT NULL,
    end_time INTEGER,
    status TEXT NOT NULL DEFAULT 'scheduled'
);
CREATE TABLE IF NOT EXISTS participants (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    participant_type TEXT NOT NULL,
    match_id INTEGER NOT NULL REFERENCES matches (id),
    team_id INTEGER REFERENCES teams (id),
    single_id INTEGER REFERENCES singles (id),
    score INTEGER NOT NULL DEFAULT 0,
    CHECK ((team_id IS NULL) <> (single_id IS NULL))
);
CREATE TABLE IF NOT EXISTS event_types (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    match_id INTEGER NOT NULL REFERENCES matches (id),
    event_type_id INTEGER NOT NULL REFERENCES event_types (id),
    participant_id INTEGER NOT NULL REFERENCES participants (id),
    timestamp_sec INTEGER NOT NULL,
    description TEXT
);
";

pub fn create_db_pool() -> Pool<Sqlite> {
    let db_path = std::env::var("MATCHDAY_DB").expect("MATCHDAY_DB env var not set");

    let conn_options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(false)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_lazy_with(conn_options)
}

pub async fn init_schema(pool: &Pool<Sqlite>) -> ServiceResult<()> {
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await
        .map_err(db_err)?;
    Ok(())
}

/// Inserts the fixed event types (Goal, Penalty, Yellow Card, Red Card).
/// Idempotent; names already present are left untouched.
pub async fn seed_event_types(pool: &Pool<Sqlite>) -> ServiceResult<()> {
    for name in SEEDED_EVENT_TYPES {
        sqlx::query("INSERT INTO event_types (name) VALUES (?) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(pool)
            .await
            .map_err(db_err)?;
    }
    Ok(())
}

pub(crate) fn db_err(e: sqlx::Error) -> ServiceError {
    match e {
        sqlx::Error::RowNotFound => ServiceError::NotFound("Row not found".to_string()),
        e if is_unique_violation(&e) => {
            ServiceError::Conflict("Uniqueness constraint violated".to_string())
        }
        e => ServiceError::Internal(e.to_string()),
    }
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A single-connection in-memory database with the schema applied and
    /// event types seeded. One connection so every handle sees the same DB.
    pub async fn memory_pool() -> Pool<Sqlite> {
        let conn_options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(conn_options)
            .await
            .expect("Failed to open in-memory database");
        init_schema(&pool).await.expect("Failed to apply schema");
        seed_event_types(&pool)
            .await
            .expect("Failed to seed event types");
        pool
    }
}
