use log::info;

use crate::{
    ServiceError, ServiceResult, app::ArcEventRepository, matches::MatchId,
    participants::ParticipantId, persistence::events::EventRepository,
};

pub type EventId = i64;
pub type EventTypeId = i64;

/// The event type whose creation increments the participant's score. Keyed
/// by the stable seeded name, never by a positionally-assigned id.
pub const GOAL_EVENT_TYPE: &str = "Goal";

pub const SEEDED_EVENT_TYPES: [&str; 4] = [GOAL_EVENT_TYPE, "Penalty", "Yellow Card", "Red Card"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventType {
    pub id: EventTypeId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InGameEvent {
    pub id: EventId,
    pub match_id: MatchId,
    pub event_type_id: EventTypeId,
    pub participant_id: ParticipantId,
    pub timestamp_sec: i64,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub match_id: MatchId,
    pub event_type_id: EventTypeId,
    pub participant_id: ParticipantId,
    pub timestamp_sec: i64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EventUpdate {
    pub match_id: Option<MatchId>,
    pub event_type_id: Option<EventTypeId>,
    pub participant_id: Option<ParticipantId>,
    pub timestamp_sec: Option<i64>,
    pub description: Option<String>,
}

impl EventUpdate {
    pub fn is_empty(&self) -> bool {
        self.match_id.is_none()
            && self.event_type_id.is_none()
            && self.participant_id.is_none()
            && self.timestamp_sec.is_none()
            && self.description.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub match_id: Option<MatchId>,
    pub participant_id: Option<ParticipantId>,
    pub event_type_id: Option<EventTypeId>,
}

#[async_trait::async_trait]
pub trait EventService {
    async fn create_event(&self, data: NewEvent) -> ServiceResult<InGameEvent>;
    async fn get_events(&self, filter: EventFilter) -> ServiceResult<Vec<InGameEvent>>;
    async fn get_event(&self, id: EventId) -> ServiceResult<InGameEvent>;
    async fn update_event(&self, id: EventId, update: EventUpdate) -> ServiceResult<InGameEvent>;
    async fn delete_event(&self, id: EventId) -> ServiceResult<()>;
}

pub struct EventServiceImpl {
    event_repository: ArcEventRepository,
}

impl EventServiceImpl {
    pub fn new(event_repository: ArcEventRepository) -> Self {
        Self { event_repository }
    }

    fn validate_timestamp(timestamp_sec: i64) -> ServiceResult<()> {
        if timestamp_sec < 0 {
            return Err(ServiceError::InvalidInput(
                "Invalid event data".to_string(),
                vec!["timestamp_sec must be >= 0".to_string()],
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl EventService for EventServiceImpl {
    async fn create_event(&self, data: NewEvent) -> ServiceResult<InGameEvent> {
        Self::validate_timestamp(data.timestamp_sec)?;
        let event = self.event_repository.create_event(&data).await?;
        info!(
            "Recorded event {} (type {}) for participant {} in match {}",
            event.id, event.event_type_id, event.participant_id, event.match_id
        );
        Ok(event)
    }

    async fn get_events(&self, filter: EventFilter) -> ServiceResult<Vec<InGameEvent>> {
        self.event_repository.get_events(&filter).await
    }

    async fn get_event(&self, id: EventId) -> ServiceResult<InGameEvent> {
        let Some(event) = self.event_repository.get_event(id).await? else {
            return ServiceError::not_found("In-game event not found");
        };
        Ok(event)
    }

    async fn update_event(&self, id: EventId, update: EventUpdate) -> ServiceResult<InGameEvent> {
        if let Some(timestamp_sec) = update.timestamp_sec {
            Self::validate_timestamp(timestamp_sec)?;
        }
        if !update.is_empty() {
            self.event_repository.update_event(id, &update).await?;
            info!("Updated event {}", id);
        }
        self.get_event(id).await
    }

    async fn delete_event(&self, id: EventId) -> ServiceResult<()> {
        self.event_repository.delete_event(id).await?;
        info!("Deleted event {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        app::{AppState, construct_app},
        matches::{MatchService, MatchStatus, NewMatch},
        participants::{Competitor, NewParticipant, ParticipantId, ParticipantService},
        persistence::{events::SqliteEventRepository, test_support::memory_pool},
        teams::{TeamId, TeamService},
    };

    struct Scenario {
        pool: sqlx::Pool<sqlx::Sqlite>,
        app: AppState,
        match_id: crate::matches::MatchId,
        home: ParticipantId,
        away: ParticipantId,
    }

    /// Two teams, one match, one participant per team.
    async fn scenario() -> Scenario {
        let pool = memory_pool().await;
        let app = construct_app(pool.clone());

        let mut participants = Vec::new();
        let start_time = chrono::DateTime::from_timestamp(Utc::now().timestamp(), 0).unwrap();
        let match_id = app
            .match_service
            .create_match(NewMatch {
                start_time,
                status: MatchStatus::InProgress,
            })
            .await
            .unwrap()
            .record
            .id;
        for name in ["Sparta", "Dukla"] {
            let team: TeamId = app
                .team_service
                .create_team(name.to_string())
                .await
                .unwrap()
                .id;
            let participant = app
                .participant_service
                .create_participant(NewParticipant {
                    match_id,
                    competitor: Competitor::Team { team_id: team },
                    score: 0,
                })
                .await
                .unwrap();
            participants.push(participant.participant.id);
        }

        Scenario {
            pool,
            app,
            match_id,
            home: participants[0],
            away: participants[1],
        }
    }

    async fn type_id(pool: &sqlx::Pool<sqlx::Sqlite>, name: &str) -> EventTypeId {
        SqliteEventRepository::new(pool.clone())
            .get_event_types()
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.name == name)
            .unwrap_or_else(|| panic!("event type {} not seeded", name))
            .id
    }

    async fn score_of(app: &AppState, id: ParticipantId) -> i64 {
        app.participant_service
            .get_participant(id)
            .await
            .unwrap()
            .participant
            .score
    }

    #[tokio::test]
    async fn goal_increments_scorer_by_exactly_one() {
        let s = scenario().await;
        let goal = type_id(&s.pool, GOAL_EVENT_TYPE).await;

        s.app
            .event_service
            .create_event(NewEvent {
                match_id: s.match_id,
                event_type_id: goal,
                participant_id: s.home,
                timestamp_sec: 540,
                description: Some("header from the far post".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(score_of(&s.app, s.home).await, 1);
        assert_eq!(score_of(&s.app, s.away).await, 0);
    }

    #[tokio::test]
    async fn non_goal_events_leave_score_unchanged() {
        let s = scenario().await;
        for name in ["Penalty", "Yellow Card", "Red Card"] {
            let event_type = type_id(&s.pool, name).await;
            s.app
                .event_service
                .create_event(NewEvent {
                    match_id: s.match_id,
                    event_type_id: event_type,
                    participant_id: s.home,
                    timestamp_sec: 60,
                    description: None,
                })
                .await
                .unwrap();
        }
        assert_eq!(score_of(&s.app, s.home).await, 0);
    }

    #[tokio::test]
    async fn create_rejects_negative_timestamps() {
        let s = scenario().await;
        let goal = type_id(&s.pool, GOAL_EVENT_TYPE).await;
        let err = s
            .app
            .event_service
            .create_event(NewEvent {
                match_id: s.match_id,
                event_type_id: goal,
                participant_id: s.home,
                timestamp_sec: -1,
                description: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_, _)));
    }

    #[tokio::test]
    async fn create_for_missing_participant_leaves_no_orphan_event() {
        let s = scenario().await;
        let goal = type_id(&s.pool, GOAL_EVENT_TYPE).await;
        let err = s
            .app
            .event_service
            .create_event(NewEvent {
                match_id: s.match_id,
                event_type_id: goal,
                participant_id: 999,
                timestamp_sec: 10,
                description: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let events = s
            .app
            .event_service
            .get_events(EventFilter::default())
            .await
            .unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn create_for_missing_event_type_is_not_found() {
        let s = scenario().await;
        let err = s
            .app
            .event_service
            .create_event(NewEvent {
                match_id: s.match_id,
                event_type_id: 999,
                participant_id: s.home,
                timestamp_sec: 10,
                description: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn concurrent_goals_both_land() {
        let s = scenario().await;
        let goal = type_id(&s.pool, GOAL_EVENT_TYPE).await;

        let mut handles = Vec::new();
        for timestamp_sec in [300, 301] {
            let event_service = s.app.event_service.clone();
            let data = NewEvent {
                match_id: s.match_id,
                event_type_id: goal,
                participant_id: s.home,
                timestamp_sec,
                description: None,
            };
            handles.push(tokio::spawn(async move {
                event_service.create_event(data).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(score_of(&s.app, s.home).await, 2);
    }

    #[tokio::test]
    async fn update_does_not_touch_score() {
        let s = scenario().await;
        let goal = type_id(&s.pool, GOAL_EVENT_TYPE).await;
        let penalty = type_id(&s.pool, "Penalty").await;
        let event = s
            .app
            .event_service
            .create_event(NewEvent {
                match_id: s.match_id,
                event_type_id: penalty,
                participant_id: s.home,
                timestamp_sec: 30,
                description: None,
            })
            .await
            .unwrap();

        let updated = s
            .app
            .event_service
            .update_event(
                event.id,
                EventUpdate {
                    event_type_id: Some(goal),
                    description: Some("upgraded after review".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.event_type_id, goal);
        assert_eq!(updated.description.as_deref(), Some("upgraded after review"));
        // Retyping an event is a correction, not a new goal.
        assert_eq!(score_of(&s.app, s.home).await, 0);
    }

    #[tokio::test]
    async fn duplicate_event_type_name_is_a_conflict() {
        let s = scenario().await;
        let repository = SqliteEventRepository::new(s.pool.clone());
        let err = repository
            .create_event_type(GOAL_EVENT_TYPE)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let extra = repository.create_event_type("Own Goal").await.unwrap();
        assert_eq!(extra.name, "Own Goal");
    }

    #[tokio::test]
    async fn delete_event_is_permanent() {
        let s = scenario().await;
        let penalty = type_id(&s.pool, "Penalty").await;
        let event = s
            .app
            .event_service
            .create_event(NewEvent {
                match_id: s.match_id,
                event_type_id: penalty,
                participant_id: s.away,
                timestamp_sec: 75,
                description: None,
            })
            .await
            .unwrap();

        s.app.event_service.delete_event(event.id).await.unwrap();
        assert!(matches!(
            s.app.event_service.get_event(event.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            s.app.event_service.delete_event(event.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
