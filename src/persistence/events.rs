use sqlx::{Pool, Row, Sqlite, Transaction, sqlite::SqliteRow};

use crate::{
    ServiceError, ServiceResult,
    events::{
        EventFilter, EventId, EventType, EventTypeId, EventUpdate, GOAL_EVENT_TYPE, InGameEvent,
        NewEvent,
    },
    persistence::{db_err, is_unique_violation},
};

#[async_trait::async_trait]
pub trait EventRepository {
    /// Inserts the event and, when its type is named "Goal", increments the
    /// participant's score in the same transaction. A failed score update
    /// rolls the insert back, so no event is ever left without its side
    /// effect.
    async fn create_event(&self, data: &NewEvent) -> ServiceResult<InGameEvent>;
    async fn get_event(&self, id: EventId) -> ServiceResult<Option<InGameEvent>>;
    async fn get_events(&self, filter: &EventFilter) -> ServiceResult<Vec<InGameEvent>>;
    async fn update_event(&self, id: EventId, update: &EventUpdate) -> ServiceResult<()>;
    async fn delete_event(&self, id: EventId) -> ServiceResult<()>;
    async fn create_event_type(&self, name: &str) -> ServiceResult<EventType>;
    async fn get_event_types(&self) -> ServiceResult<Vec<EventType>>;
}

pub struct SqliteEventRepository {
    pool: Pool<Sqlite>,
}

impl SqliteEventRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn event_from_row(row: &SqliteRow) -> ServiceResult<InGameEvent> {
        Ok(InGameEvent {
            id: row.try_get("id").map_err(db_err)?,
            match_id: row.try_get("match_id").map_err(db_err)?,
            event_type_id: row.try_get("event_type_id").map_err(db_err)?,
            participant_id: row.try_get("participant_id").map_err(db_err)?,
            timestamp_sec: row.try_get("timestamp_sec").map_err(db_err)?,
            description: row.try_get("description").map_err(db_err)?,
        })
    }

    async fn fetch_event_type_name(
        tx: &mut Transaction<'_, Sqlite>,
        id: EventTypeId,
    ) -> ServiceResult<Option<String>> {
        let row = sqlx::query("SELECT name FROM event_types WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_err)?;
        row.map(|r| r.try_get("name")).transpose().map_err(db_err)
    }

    async fn check_row_exists(
        tx: &mut Transaction<'_, Sqlite>,
        table: &str,
        id: i64,
        missing: &str,
    ) -> ServiceResult<()> {
        let sql = format!("SELECT id FROM {} WHERE id = ?", table);
        let found = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_err)?;
        if found.is_none() {
            return ServiceError::not_found(missing);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl EventRepository for SqliteEventRepository {
    async fn create_event(&self, data: &NewEvent) -> ServiceResult<InGameEvent> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        Self::check_row_exists(&mut tx, "matches", data.match_id, "Match not found").await?;
        Self::check_row_exists(
            &mut tx,
            "participants",
            data.participant_id,
            "Participant not found",
        )
        .await?;
        let Some(type_name) = Self::fetch_event_type_name(&mut tx, data.event_type_id).await?
        else {
            return ServiceError::not_found("Event type not found");
        };

        let res = sqlx::query(
            "INSERT INTO events (match_id, event_type_id, participant_id, timestamp_sec, description) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(data.match_id)
        .bind(data.event_type_id)
        .bind(data.participant_id)
        .bind(data.timestamp_sec)
        .bind(&data.description)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if type_name == GOAL_EVENT_TYPE {
            // In-place increment; concurrent goals serialize on the row and
            // never lose an update.
            let updated = sqlx::query("UPDATE participants SET score = score + 1 WHERE id = ?")
                .bind(data.participant_id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            if updated.rows_affected() == 0 {
                return ServiceError::not_found("Participant not found");
            }
        }

        tx.commit().await.map_err(db_err)?;
        Ok(InGameEvent {
            id: res.last_insert_rowid(),
            match_id: data.match_id,
            event_type_id: data.event_type_id,
            participant_id: data.participant_id,
            timestamp_sec: data.timestamp_sec,
            description: data.description.clone(),
        })
    }

    async fn get_event(&self, id: EventId) -> ServiceResult<Option<InGameEvent>> {
        let row = sqlx::query(
            "SELECT id, match_id, event_type_id, participant_id, timestamp_sec, description FROM events WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(Self::event_from_row).transpose()
    }

    async fn get_events(&self, filter: &EventFilter) -> ServiceResult<Vec<InGameEvent>> {
        let mut sql =
            "SELECT id, match_id, event_type_id, participant_id, timestamp_sec, description FROM events"
                .to_string();
        let mut clauses = Vec::new();
        if filter.match_id.is_some() {
            clauses.push("match_id = ?");
        }
        if filter.participant_id.is_some() {
            clauses.push("participant_id = ?");
        }
        if filter.event_type_id.is_some() {
            clauses.push("event_type_id = ?");
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let mut query = sqlx::query(&sql);
        if let Some(match_id) = filter.match_id {
            query = query.bind(match_id);
        }
        if let Some(participant_id) = filter.participant_id {
            query = query.bind(participant_id);
        }
        if let Some(event_type_id) = filter.event_type_id {
            query = query.bind(event_type_id);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;
        rows.iter().map(Self::event_from_row).collect()
    }

    async fn update_event(&self, id: EventId, update: &EventUpdate) -> ServiceResult<()> {
        if update.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        if let Some(match_id) = update.match_id {
            Self::check_row_exists(&mut tx, "matches", match_id, "Match not found").await?;
        }
        if let Some(participant_id) = update.participant_id {
            Self::check_row_exists(&mut tx, "participants", participant_id, "Participant not found")
                .await?;
        }
        if let Some(event_type_id) = update.event_type_id {
            if Self::fetch_event_type_name(&mut tx, event_type_id)
                .await?
                .is_none()
            {
                return ServiceError::not_found("Event type not found");
            }
        }

        let mut sets = Vec::new();
        if update.match_id.is_some() {
            sets.push("match_id = ?");
        }
        if update.event_type_id.is_some() {
            sets.push("event_type_id = ?");
        }
        if update.participant_id.is_some() {
            sets.push("participant_id = ?");
        }
        if update.timestamp_sec.is_some() {
            sets.push("timestamp_sec = ?");
        }
        if update.description.is_some() {
            sets.push("description = ?");
        }
        let sql = format!("UPDATE events SET {} WHERE id = ?", sets.join(", "));
        let mut query = sqlx::query(&sql);
        if let Some(match_id) = update.match_id {
            query = query.bind(match_id);
        }
        if let Some(event_type_id) = update.event_type_id {
            query = query.bind(event_type_id);
        }
        if let Some(participant_id) = update.participant_id {
            query = query.bind(participant_id);
        }
        if let Some(timestamp_sec) = update.timestamp_sec {
            query = query.bind(timestamp_sec);
        }
        if let Some(description) = &update.description {
            query = query.bind(description);
        }
        let res = query.bind(id).execute(&mut *tx).await.map_err(db_err)?;
        if res.rows_affected() == 0 {
            return ServiceError::not_found("In-game event not found");
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn delete_event(&self, id: EventId) -> ServiceResult<()> {
        let res = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return ServiceError::not_found("In-game event not found");
        }
        Ok(())
    }

    async fn create_event_type(&self, name: &str) -> ServiceResult<EventType> {
        let res = sqlx::query("INSERT INTO event_types (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ServiceError::Conflict("Event type name already in use".to_string())
                } else {
                    db_err(e)
                }
            })?;
        Ok(EventType {
            id: res.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    async fn get_event_types(&self) -> ServiceResult<Vec<EventType>> {
        let rows = sqlx::query("SELECT id, name FROM event_types ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter()
            .map(|row| {
                Ok(EventType {
                    id: row.try_get("id").map_err(db_err)?,
                    name: row.try_get("name").map_err(db_err)?,
                })
            })
            .collect()
    }
}
