use chrono::{DateTime, Utc};
use log::info;

use crate::{
    ServiceError, ServiceResult,
    app::{ArcMatchRepository, ArcParticipantService},
    participants::{ParticipantDetail, ParticipantFilter, ParticipantService},
    persistence::matches::MatchRepository,
};

pub type MatchId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Completed => "completed",
            MatchStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> ServiceResult<Self> {
        match s {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "in_progress" => Ok(MatchStatus::InProgress),
            "completed" => Ok(MatchStatus::Completed),
            "cancelled" => Ok(MatchStatus::Cancelled),
            other => Err(ServiceError::InvalidInput(
                format!("Invalid match status '{}'", other),
                vec![
                    "status must be one of scheduled, in_progress, completed, cancelled"
                        .to_string(),
                ],
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub id: MatchId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: MatchStatus,
}

#[derive(Debug, Clone)]
pub struct NewMatch {
    pub start_time: DateTime<Utc>,
    pub status: MatchStatus,
}

#[derive(Debug, Clone, Default)]
pub struct MatchUpdate {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<MatchStatus>,
}

impl MatchUpdate {
    pub fn is_empty(&self) -> bool {
        self.start_time.is_none() && self.end_time.is_none() && self.status.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    pub status: Option<MatchStatus>,
    pub include_participants: bool,
}

#[derive(Debug, Clone)]
pub struct MatchDetail {
    pub record: Match,
    /// Present when the caller asked for eager-loaded participants; each one
    /// carries its resolved team or single-with-person.
    pub participants: Option<Vec<ParticipantDetail>>,
}

#[async_trait::async_trait]
pub trait MatchService {
    async fn create_match(&self, data: NewMatch) -> ServiceResult<MatchDetail>;
    async fn get_matches(&self, filter: MatchFilter) -> ServiceResult<Vec<MatchDetail>>;
    async fn get_match(
        &self,
        id: MatchId,
        include_participants: bool,
    ) -> ServiceResult<MatchDetail>;
    async fn update_match(&self, id: MatchId, update: MatchUpdate) -> ServiceResult<MatchDetail>;
    async fn delete_match(&self, id: MatchId) -> ServiceResult<()>;
}

pub struct MatchServiceImpl {
    match_repository: ArcMatchRepository,
    participant_service: ArcParticipantService,
}

impl MatchServiceImpl {
    pub fn new(
        match_repository: ArcMatchRepository,
        participant_service: ArcParticipantService,
    ) -> Self {
        Self {
            match_repository,
            participant_service,
        }
    }

    async fn load_participants(&self, id: MatchId) -> ServiceResult<Vec<ParticipantDetail>> {
        self.participant_service
            .get_participants(ParticipantFilter {
                match_id: Some(id),
                ..Default::default()
            })
            .await
    }
}

#[async_trait::async_trait]
impl MatchService for MatchServiceImpl {
    async fn create_match(&self, data: NewMatch) -> ServiceResult<MatchDetail> {
        let record = self.match_repository.create_match(&data).await?;
        info!(
            "Created match {} starting at {}",
            record.id, record.start_time
        );
        Ok(MatchDetail {
            record,
            participants: Some(Vec::new()),
        })
    }

    async fn get_matches(&self, filter: MatchFilter) -> ServiceResult<Vec<MatchDetail>> {
        let records = self.match_repository.get_matches(&filter).await?;
        let mut details = Vec::with_capacity(records.len());
        for record in records {
            let participants = if filter.include_participants {
                Some(self.load_participants(record.id).await?)
            } else {
                None
            };
            details.push(MatchDetail {
                record,
                participants,
            });
        }
        Ok(details)
    }

    async fn get_match(
        &self,
        id: MatchId,
        include_participants: bool,
    ) -> ServiceResult<MatchDetail> {
        let Some(record) = self.match_repository.get_match(id).await? else {
            return ServiceError::not_found("Match not found");
        };
        let participants = if include_participants {
            Some(self.load_participants(id).await?)
        } else {
            None
        };
        Ok(MatchDetail {
            record,
            participants,
        })
    }

    async fn update_match(&self, id: MatchId, update: MatchUpdate) -> ServiceResult<MatchDetail> {
        if !update.is_empty() {
            self.match_repository.update_match(id, &update).await?;
            info!("Updated match {}", id);
        }
        self.get_match(id, true).await
    }

    async fn delete_match(&self, id: MatchId) -> ServiceResult<()> {
        self.match_repository.delete_match(id).await?;
        info!("Deleted match {} with its participants and events", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        app::construct_app,
        events::{EventFilter, EventService, NewEvent},
        participants::{Competitor, NewParticipant},
        persistence::{
            events::{EventRepository, SqliteEventRepository},
            test_support::memory_pool,
        },
        teams::TeamService,
    };

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            MatchStatus::Scheduled,
            MatchStatus::InProgress,
            MatchStatus::Completed,
            MatchStatus::Cancelled,
        ] {
            assert_eq!(MatchStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn status_rejects_unknown_values() {
        let err = MatchStatus::parse("paused").unwrap_err();
        let ServiceError::InvalidInput(msg, errors) = err else {
            panic!("expected InvalidInput");
        };
        assert!(msg.contains("paused"));
        assert_eq!(errors.len(), 1);
    }

    fn now() -> chrono::DateTime<Utc> {
        // Stored with second precision, so truncate for comparisons.
        chrono::DateTime::from_timestamp(Utc::now().timestamp(), 0).unwrap()
    }

    #[tokio::test]
    async fn round_trip_with_eager_loaded_team_participants() {
        let pool = memory_pool().await;
        let app = construct_app(pool);

        let sparta = app.team_service.create_team("Sparta".to_string()).await.unwrap();
        let dukla = app.team_service.create_team("Dukla".to_string()).await.unwrap();
        let created = app
            .match_service
            .create_match(NewMatch {
                start_time: now(),
                status: MatchStatus::Scheduled,
            })
            .await
            .unwrap();

        for team in [&sparta, &dukla] {
            app.participant_service
                .create_participant(NewParticipant {
                    match_id: created.record.id,
                    competitor: Competitor::Team { team_id: team.id },
                    score: 0,
                })
                .await
                .unwrap();
        }

        let detail = app
            .match_service
            .get_match(created.record.id, true)
            .await
            .unwrap();
        assert_eq!(detail.record, created.record);
        let participants = detail.participants.unwrap();
        assert_eq!(participants.len(), 2);
        let names: Vec<String> = participants
            .iter()
            .map(|p| p.team.as_ref().unwrap().name.clone())
            .collect();
        assert_eq!(names, vec!["Sparta".to_string(), "Dukla".to_string()]);
        assert!(participants.iter().all(|p| p.single.is_none()));
    }

    #[tokio::test]
    async fn update_changes_only_documented_fields() {
        let pool = memory_pool().await;
        let app = construct_app(pool);

        let created = app
            .match_service
            .create_match(NewMatch {
                start_time: now(),
                status: MatchStatus::Scheduled,
            })
            .await
            .unwrap();

        let end = now();
        let updated = app
            .match_service
            .update_match(
                created.record.id,
                MatchUpdate {
                    start_time: None,
                    end_time: Some(end),
                    status: Some(MatchStatus::Completed),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.record.status, MatchStatus::Completed);
        assert_eq!(updated.record.end_time, Some(end));
        assert_eq!(updated.record.start_time, created.record.start_time);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let pool = memory_pool().await;
        let app = construct_app(pool);

        for status in [MatchStatus::Scheduled, MatchStatus::InProgress] {
            app.match_service
                .create_match(NewMatch {
                    start_time: now(),
                    status,
                })
                .await
                .unwrap();
        }

        let in_progress = app
            .match_service
            .get_matches(MatchFilter {
                status: Some(MatchStatus::InProgress),
                include_participants: false,
            })
            .await
            .unwrap();
        assert_eq!(in_progress.len(), 1);
        assert_eq!(in_progress[0].record.status, MatchStatus::InProgress);

        let all = app.match_service.get_matches(MatchFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn delete_cascades_to_participants_and_events() {
        let pool = memory_pool().await;
        let app = construct_app(pool.clone());

        let team = app.team_service.create_team("Sparta".to_string()).await.unwrap();
        let created = app
            .match_service
            .create_match(NewMatch {
                start_time: now(),
                status: MatchStatus::InProgress,
            })
            .await
            .unwrap();
        let participant = app
            .participant_service
            .create_participant(NewParticipant {
                match_id: created.record.id,
                competitor: Competitor::Team { team_id: team.id },
                score: 0,
            })
            .await
            .unwrap();

        let event_repository = SqliteEventRepository::new(pool);
        let goal_type = event_repository
            .get_event_types()
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.name == crate::events::GOAL_EVENT_TYPE)
            .unwrap();
        let event = app
            .event_service
            .create_event(NewEvent {
                match_id: created.record.id,
                event_type_id: goal_type.id,
                participant_id: participant.participant.id,
                timestamp_sec: 120,
                description: None,
            })
            .await
            .unwrap();

        app.match_service.delete_match(created.record.id).await.unwrap();

        assert!(matches!(
            app.match_service.get_match(created.record.id, false).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            app.participant_service
                .get_participant(participant.participant.id)
                .await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            app.event_service.get_event(event.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(
            app.event_service
                .get_events(EventFilter::default())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn delete_missing_match_is_not_found() {
        let pool = memory_pool().await;
        let app = construct_app(pool);
        assert!(matches!(
            app.match_service.delete_match(42).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
