use chrono::DateTime;
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};

use crate::{
    ServiceError, ServiceResult,
    matches::{Match, MatchFilter, MatchId, MatchStatus, MatchUpdate, NewMatch},
    persistence::db_err,
};

#[async_trait::async_trait]
pub trait MatchRepository {
    async fn create_match(&self, data: &NewMatch) -> ServiceResult<Match>;
    async fn get_match(&self, id: MatchId) -> ServiceResult<Option<Match>>;
    async fn get_matches(&self, filter: &MatchFilter) -> ServiceResult<Vec<Match>>;
    async fn update_match(&self, id: MatchId, update: &MatchUpdate) -> ServiceResult<()>;
    /// Deletes the match and everything hanging off it, children first, in
    /// one transaction: events of the match, then its participants, then the
    /// match row itself.
    async fn delete_match(&self, id: MatchId) -> ServiceResult<()>;
}

pub struct SqliteMatchRepository {
    pool: Pool<Sqlite>,
}

impl SqliteMatchRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn match_from_row(row: &SqliteRow) -> ServiceResult<Match> {
        let start_secs: i64 = row.try_get("start_time").map_err(db_err)?;
        let end_secs: Option<i64> = row.try_get("end_time").map_err(db_err)?;
        let status: String = row.try_get("status").map_err(db_err)?;
        let end_time = match end_secs {
            Some(secs) => Some(DateTime::from_timestamp(secs, 0).ok_or_else(|| {
                ServiceError::Internal(format!("Invalid end_time in match row: {}", secs))
            })?),
            None => None,
        };
        Ok(Match {
            id: row.try_get("id").map_err(db_err)?,
            start_time: DateTime::from_timestamp(start_secs, 0).ok_or_else(|| {
                ServiceError::Internal(format!("Invalid start_time in match row: {}", start_secs))
            })?,
            end_time,
            status: MatchStatus::parse(&status).map_err(|_| {
                ServiceError::Internal(format!("Unknown status in match row: {}", status))
            })?,
        })
    }
}

#[async_trait::async_trait]
impl MatchRepository for SqliteMatchRepository {
    async fn create_match(&self, data: &NewMatch) -> ServiceResult<Match> {
        let res = sqlx::query("INSERT INTO matches (start_time, status) VALUES (?, ?)")
            .bind(data.start_time.timestamp())
            .bind(data.status.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(Match {
            id: res.last_insert_rowid(),
            start_time: data.start_time,
            end_time: None,
            status: data.status,
        })
    }

    async fn get_match(&self, id: MatchId) -> ServiceResult<Option<Match>> {
        let row = sqlx::query("SELECT id, start_time, end_time, status FROM matches WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(Self::match_from_row).transpose()
    }

    async fn get_matches(&self, filter: &MatchFilter) -> ServiceResult<Vec<Match>> {
        let mut sql = "SELECT id, start_time, end_time, status FROM matches".to_string();
        if filter.status.is_some() {
            sql.push_str(" WHERE status = ?");
        }
        let mut query = sqlx::query(&sql);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter().map(Self::match_from_row).collect()
    }

    async fn update_match(&self, id: MatchId, update: &MatchUpdate) -> ServiceResult<()> {
        let mut sets = Vec::new();
        if update.start_time.is_some() {
            sets.push("start_time = ?");
        }
        if update.end_time.is_some() {
            sets.push("end_time = ?");
        }
        if update.status.is_some() {
            sets.push("status = ?");
        }
        if sets.is_empty() {
            return Ok(());
        }
        let sql = format!("UPDATE matches SET {} WHERE id = ?", sets.join(", "));
        let mut query = sqlx::query(&sql);
        if let Some(start_time) = update.start_time {
            query = query.bind(start_time.timestamp());
        }
        if let Some(end_time) = update.end_time {
            query = query.bind(end_time.timestamp());
        }
        if let Some(status) = update.status {
            query = query.bind(status.as_str());
        }
        let res = query
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return ServiceError::not_found("Match not found");
        }
        Ok(())
    }

    async fn delete_match(&self, id: MatchId) -> ServiceResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let found = sqlx::query("SELECT id FROM matches WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if found.is_none() {
            return ServiceError::not_found("Match not found");
        }

        sqlx::query("DELETE FROM events WHERE match_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM participants WHERE match_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM matches WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}
