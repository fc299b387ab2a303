use sqlx::{Pool, Row, Sqlite, Transaction, sqlite::SqliteRow};

use crate::{
    ServiceError, ServiceResult,
    participants::{Competitor, NewParticipant, Participant, ParticipantFilter, ParticipantId},
    persistence::db_err,
};

#[async_trait::async_trait]
pub trait ParticipantRepository {
    /// Creates the participant after verifying, inside the same transaction,
    /// that the match and the referenced team or single exist.
    async fn create_participant(&self, data: &NewParticipant) -> ServiceResult<Participant>;
    async fn get_participant(&self, id: ParticipantId) -> ServiceResult<Option<Participant>>;
    async fn get_participants(
        &self,
        filter: &ParticipantFilter,
    ) -> ServiceResult<Vec<Participant>>;
    async fn update_participant(
        &self,
        id: ParticipantId,
        score: Option<i64>,
        competitor: Option<Competitor>,
    ) -> ServiceResult<()>;
    async fn delete_participant(&self, id: ParticipantId) -> ServiceResult<()>;
}

pub struct SqliteParticipantRepository {
    pool: Pool<Sqlite>,
}

impl SqliteParticipantRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn participant_from_row(row: &SqliteRow) -> ServiceResult<Participant> {
        let kind: String = row.try_get("participant_type").map_err(db_err)?;
        let team_id: Option<i64> = row.try_get("team_id").map_err(db_err)?;
        let single_id: Option<i64> = row.try_get("single_id").map_err(db_err)?;
        let competitor = Competitor::from_parts(&kind, team_id, single_id).map_err(|_| {
            ServiceError::Internal("Participant row violates the team/single invariant".to_string())
        })?;
        Ok(Participant {
            id: row.try_get("id").map_err(db_err)?,
            match_id: row.try_get("match_id").map_err(db_err)?,
            competitor,
            score: row.try_get("score").map_err(db_err)?,
        })
    }

    async fn check_competitor_exists(
        tx: &mut Transaction<'_, Sqlite>,
        competitor: &Competitor,
    ) -> ServiceResult<()> {
        match competitor {
            Competitor::Team { team_id } => {
                let found = sqlx::query("SELECT id FROM teams WHERE id = ?")
                    .bind(team_id)
                    .fetch_optional(&mut **tx)
                    .await
                    .map_err(db_err)?;
                if found.is_none() {
                    return ServiceError::not_found("Team not found");
                }
            }
            Competitor::Single { single_id } => {
                let found = sqlx::query("SELECT id FROM singles WHERE id = ?")
                    .bind(single_id)
                    .fetch_optional(&mut **tx)
                    .await
                    .map_err(db_err)?;
                if found.is_none() {
                    return ServiceError::not_found("Single not found");
                }
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ParticipantRepository for SqliteParticipantRepository {
    async fn create_participant(&self, data: &NewParticipant) -> ServiceResult<Participant> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let match_found = sqlx::query("SELECT id FROM matches WHERE id = ?")
            .bind(data.match_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if match_found.is_none() {
            return ServiceError::not_found("Match not found");
        }
        Self::check_competitor_exists(&mut tx, &data.competitor).await?;

        let res = sqlx::query(
            "INSERT INTO participants (participant_type, match_id, team_id, single_id, score) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(data.competitor.kind())
        .bind(data.match_id)
        .bind(data.competitor.team_id())
        .bind(data.competitor.single_id())
        .bind(data.score)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(Participant {
            id: res.last_insert_rowid(),
            match_id: data.match_id,
            competitor: data.competitor,
            score: data.score,
        })
    }

    async fn get_participant(&self, id: ParticipantId) -> ServiceResult<Option<Participant>> {
        let row = sqlx::query(
            "SELECT id, participant_type, match_id, team_id, single_id, score FROM participants WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(Self::participant_from_row).transpose()
    }

    async fn get_participants(
        &self,
        filter: &ParticipantFilter,
    ) -> ServiceResult<Vec<Participant>> {
        let mut sql =
            "SELECT id, participant_type, match_id, team_id, single_id, score FROM participants"
                .to_string();
        let mut clauses = Vec::new();
        if filter.participant_type.is_some() {
            clauses.push("participant_type = ?");
        }
        if filter.match_id.is_some() {
            clauses.push("match_id = ?");
        }
        if filter.team_id.is_some() {
            clauses.push("team_id = ?");
        }
        if filter.single_id.is_some() {
            clauses.push("single_id = ?");
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let mut query = sqlx::query(&sql);
        if let Some(kind) = &filter.participant_type {
            query = query.bind(kind);
        }
        if let Some(match_id) = filter.match_id {
            query = query.bind(match_id);
        }
        if let Some(team_id) = filter.team_id {
            query = query.bind(team_id);
        }
        if let Some(single_id) = filter.single_id {
            query = query.bind(single_id);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter().map(Self::participant_from_row).collect()
    }

    async fn update_participant(
        &self,
        id: ParticipantId,
        score: Option<i64>,
        competitor: Option<Competitor>,
    ) -> ServiceResult<()> {
        if score.is_none() && competitor.is_none() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        if let Some(competitor) = &competitor {
            Self::check_competitor_exists(&mut tx, competitor).await?;
        }

        let mut sets = Vec::new();
        if score.is_some() {
            sets.push("score = ?");
        }
        if competitor.is_some() {
            sets.push("participant_type = ?");
            sets.push("team_id = ?");
            sets.push("single_id = ?");
        }
        let sql = format!("UPDATE participants SET {} WHERE id = ?", sets.join(", "));
        let mut query = sqlx::query(&sql);
        if let Some(score) = score {
            query = query.bind(score);
        }
        if let Some(competitor) = &competitor {
            query = query
                .bind(competitor.kind())
                .bind(competitor.team_id())
                .bind(competitor.single_id());
        }
        let res = query.bind(id).execute(&mut *tx).await.map_err(db_err)?;
        if res.rows_affected() == 0 {
            return ServiceError::not_found("Participant not found");
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn delete_participant(&self, id: ParticipantId) -> ServiceResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let found = sqlx::query("SELECT id FROM participants WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if found.is_none() {
            return ServiceError::not_found("Participant not found");
        }

        sqlx::query("DELETE FROM events WHERE participant_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM participants WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}
