use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};

use crate::{
    ServiceError, ServiceResult,
    participants::ParticipantId,
    persistence::db_err,
    singles::{Person, PersonId, Single, SingleFilter, SingleId, SingleWithPerson},
};

#[async_trait::async_trait]
pub trait SingleRepository {
    async fn create_person(&self, name: &str) -> ServiceResult<Person>;
    /// Creates the single after verifying, inside the same transaction, that
    /// the person exists.
    async fn create_single(&self, person_id: PersonId) -> ServiceResult<Single>;
    async fn get_single(&self, id: SingleId) -> ServiceResult<Option<Single>>;
    async fn get_single_with_person(&self, id: SingleId)
    -> ServiceResult<Option<SingleWithPerson>>;
    async fn get_singles(&self, filter: &SingleFilter) -> ServiceResult<Vec<Single>>;
    async fn update_single(&self, id: SingleId, person_id: PersonId) -> ServiceResult<()>;
    async fn link_participant(
        &self,
        id: SingleId,
        participant_id: ParticipantId,
    ) -> ServiceResult<()>;
    async fn unlink_participant(
        &self,
        id: SingleId,
        participant_id: ParticipantId,
    ) -> ServiceResult<()>;
    /// Deletes the single and everything referencing it, children first, in
    /// one transaction: events of its participants, the participants, then
    /// the single itself.
    async fn delete_single(&self, id: SingleId) -> ServiceResult<()>;
}

pub struct SqliteSingleRepository {
    pool: Pool<Sqlite>,
}

impl SqliteSingleRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn single_from_row(row: &SqliteRow) -> ServiceResult<Single> {
        Ok(Single {
            id: row.try_get("id").map_err(db_err)?,
            person_id: row.try_get("person_id").map_err(db_err)?,
        })
    }
}

#[async_trait::async_trait]
impl SingleRepository for SqliteSingleRepository {
    async fn create_person(&self, name: &str) -> ServiceResult<Person> {
        let res = sqlx::query("INSERT INTO persons (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(Person {
            id: res.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    async fn create_single(&self, person_id: PersonId) -> ServiceResult<Single> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let person_found = sqlx::query("SELECT id FROM persons WHERE id = ?")
            .bind(person_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if person_found.is_none() {
            return ServiceError::not_found("Person not found");
        }

        let res = sqlx::query("INSERT INTO singles (person_id) VALUES (?)")
            .bind(person_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(Single {
            id: res.last_insert_rowid(),
            person_id,
        })
    }

    async fn get_single(&self, id: SingleId) -> ServiceResult<Option<Single>> {
        let row = sqlx::query("SELECT id, person_id FROM singles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(Self::single_from_row).transpose()
    }

    async fn get_single_with_person(
        &self,
        id: SingleId,
    ) -> ServiceResult<Option<SingleWithPerson>> {
        let row = sqlx::query(
            "SELECT s.id, s.person_id, p.name AS person_name \
             FROM singles s JOIN persons p ON p.id = s.person_id WHERE s.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let single = Self::single_from_row(&row)?;
        let person = Person {
            id: single.person_id,
            name: row.try_get("person_name").map_err(db_err)?,
        };
        Ok(Some(SingleWithPerson { single, person }))
    }

    async fn get_singles(&self, filter: &SingleFilter) -> ServiceResult<Vec<Single>> {
        let mut sql = "SELECT id, person_id FROM singles".to_string();
        if filter.person_id.is_some() {
            sql.push_str(" WHERE person_id = ?");
        }
        let mut query = sqlx::query(&sql);
        if let Some(person_id) = filter.person_id {
            query = query.bind(person_id);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter().map(Self::single_from_row).collect()
    }

    async fn update_single(&self, id: SingleId, person_id: PersonId) -> ServiceResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let person_found = sqlx::query("SELECT id FROM persons WHERE id = ?")
            .bind(person_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if person_found.is_none() {
            return ServiceError::not_found("Person not found");
        }

        let res = sqlx::query("UPDATE singles SET person_id = ? WHERE id = ?")
            .bind(person_id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return ServiceError::not_found("Single not found");
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn link_participant(
        &self,
        id: SingleId,
        participant_id: ParticipantId,
    ) -> ServiceResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let single_found = sqlx::query("SELECT id FROM singles WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if single_found.is_none() {
            return ServiceError::not_found("Single not found");
        }

        let participant = sqlx::query("SELECT participant_type FROM participants WHERE id = ?")
            .bind(participant_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        let Some(participant) = participant else {
            return ServiceError::not_found("Participant not found");
        };
        let kind: String = participant.try_get("participant_type").map_err(db_err)?;
        if kind != "single" {
            return ServiceError::invalid_input("Participant type must be single");
        }

        sqlx::query("UPDATE participants SET single_id = ?, team_id = NULL WHERE id = ?")
            .bind(id)
            .bind(participant_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn unlink_participant(
        &self,
        id: SingleId,
        participant_id: ParticipantId,
    ) -> ServiceResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let single_found = sqlx::query("SELECT id FROM singles WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if single_found.is_none() {
            return ServiceError::not_found("Single not found");
        }

        let participant = sqlx::query("SELECT single_id FROM participants WHERE id = ?")
            .bind(participant_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        let Some(participant) = participant else {
            return ServiceError::not_found("Participant not found");
        };
        let linked: Option<i64> = participant.try_get("single_id").map_err(db_err)?;
        if linked != Some(id) {
            return ServiceError::invalid_input("Participant is not linked to this single");
        }

        sqlx::query("DELETE FROM events WHERE participant_id = ?")
            .bind(participant_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM participants WHERE id = ?")
            .bind(participant_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn delete_single(&self, id: SingleId) -> ServiceResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let found = sqlx::query("SELECT id FROM singles WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if found.is_none() {
            return ServiceError::not_found("Single not found");
        }

        sqlx::query(
            "DELETE FROM events WHERE participant_id IN (SELECT id FROM participants WHERE single_id = ?)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        sqlx::query("DELETE FROM participants WHERE single_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM singles WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}
