use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};

use crate::{
    ServiceError, ServiceResult,
    persistence::{db_err, is_unique_violation},
    singles::PersonId,
    teams::{Team, TeamFilter, TeamId},
};

#[async_trait::async_trait]
pub trait TeamRepository {
    async fn create_team(&self, name: &str) -> ServiceResult<Team>;
    async fn get_team(&self, id: TeamId) -> ServiceResult<Option<Team>>;
    async fn get_teams(&self, filter: &TeamFilter) -> ServiceResult<Vec<Team>>;
    async fn update_team(&self, id: TeamId, name: &str) -> ServiceResult<()>;
    /// Deletes the team and everything referencing it, children first, in one
    /// transaction: events of its participants, the participants, its roster
    /// rows, then the team itself.
    async fn delete_team(&self, id: TeamId) -> ServiceResult<()>;
    async fn add_member(&self, team_id: TeamId, person_id: PersonId) -> ServiceResult<()>;
}

pub struct SqliteTeamRepository {
    pool: Pool<Sqlite>,
}

impl SqliteTeamRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn team_from_row(row: &SqliteRow) -> ServiceResult<Team> {
        Ok(Team {
            id: row.try_get("id").map_err(db_err)?,
            name: row.try_get("name").map_err(db_err)?,
        })
    }

    fn name_conflict(e: sqlx::Error) -> ServiceError {
        if is_unique_violation(&e) {
            ServiceError::Conflict("Team name already in use".to_string())
        } else {
            db_err(e)
        }
    }
}

#[async_trait::async_trait]
impl TeamRepository for SqliteTeamRepository {
    async fn create_team(&self, name: &str) -> ServiceResult<Team> {
        let res = sqlx::query("INSERT INTO teams (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(Self::name_conflict)?;
        Ok(Team {
            id: res.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    async fn get_team(&self, id: TeamId) -> ServiceResult<Option<Team>> {
        let row = sqlx::query("SELECT id, name FROM teams WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(Self::team_from_row).transpose()
    }

    async fn get_teams(&self, filter: &TeamFilter) -> ServiceResult<Vec<Team>> {
        let mut sql = "SELECT id, name FROM teams".to_string();
        if filter.name.is_some() {
            sql.push_str(" WHERE name = ?");
        }
        let mut query = sqlx::query(&sql);
        if let Some(name) = &filter.name {
            query = query.bind(name);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter().map(Self::team_from_row).collect()
    }

    async fn update_team(&self, id: TeamId, name: &str) -> ServiceResult<()> {
        let res = sqlx::query("UPDATE teams SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::name_conflict)?;
        if res.rows_affected() == 0 {
            return ServiceError::not_found("Team not found");
        }
        Ok(())
    }

    async fn delete_team(&self, id: TeamId) -> ServiceResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let found = sqlx::query("SELECT id FROM teams WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if found.is_none() {
            return ServiceError::not_found("Team not found");
        }

        sqlx::query(
            "DELETE FROM events WHERE participant_id IN (SELECT id FROM participants WHERE team_id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        sqlx::query("DELETE FROM participants WHERE team_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM team_members WHERE team_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM teams WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn add_member(&self, team_id: TeamId, person_id: PersonId) -> ServiceResult<()> {
        sqlx::query("INSERT INTO team_members (team_id, person_id) VALUES (?, ?)")
            .bind(team_id)
            .bind(person_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ServiceError::Conflict("Person is already a member of this team".to_string())
                } else {
                    db_err(e)
                }
            })?;
        Ok(())
    }
}
