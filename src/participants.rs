use log::info;

use crate::{
    ServiceError, ServiceResult,
    app::{ArcParticipantRepository, ArcSingleRepository, ArcTeamRepository},
    matches::MatchId,
    persistence::{
        participants::ParticipantRepository, singles::SingleRepository, teams::TeamRepository,
    },
    singles::{SingleId, SingleWithPerson},
    teams::{Team, TeamId},
};

pub type ParticipantId = i64;

/// The competitor behind a participant: exactly one of a team or a single.
///
/// The two nullable foreign keys of the storage row only exist at the
/// persistence and JSON boundaries; everything in between carries this
/// tagged form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Competitor {
    Team { team_id: TeamId },
    Single { single_id: SingleId },
}

impl Competitor {
    pub fn kind(&self) -> &'static str {
        match self {
            Competitor::Team { .. } => "team",
            Competitor::Single { .. } => "single",
        }
    }

    pub fn team_id(&self) -> Option<TeamId> {
        match self {
            Competitor::Team { team_id } => Some(*team_id),
            Competitor::Single { .. } => None,
        }
    }

    pub fn single_id(&self) -> Option<SingleId> {
        match self {
            Competitor::Team { .. } => None,
            Competitor::Single { single_id } => Some(*single_id),
        }
    }

    /// Validates the raw `(participant_type, team_id, single_id)` triple and
    /// produces the tagged form. Collects one sub-error per violated field.
    pub fn from_parts(
        kind: &str,
        team_id: Option<TeamId>,
        single_id: Option<SingleId>,
    ) -> ServiceResult<Self> {
        let mut errors = Vec::new();
        let competitor = match kind {
            "team" => {
                if single_id.is_some() {
                    errors.push("single_id must be null for team participant".to_string());
                }
                match team_id {
                    Some(team_id) => Some(Competitor::Team { team_id }),
                    None => {
                        errors.push("team_id is required for team participant".to_string());
                        None
                    }
                }
            }
            "single" => {
                if team_id.is_some() {
                    errors.push("team_id must be null for single participant".to_string());
                }
                match single_id {
                    Some(single_id) => Some(Competitor::Single { single_id }),
                    None => {
                        errors.push("single_id is required for single participant".to_string());
                        None
                    }
                }
            }
            other => {
                errors.push(format!(
                    "participant_type must be 'team' or 'single', got '{}'",
                    other
                ));
                None
            }
        };
        match (competitor, errors.is_empty()) {
            (Some(competitor), true) => Ok(competitor),
            _ => Err(ServiceError::InvalidInput(
                "Invalid participant data".to_string(),
                errors,
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub match_id: MatchId,
    pub competitor: Competitor,
    pub score: i64,
}

#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub match_id: MatchId,
    pub competitor: Competitor,
    pub score: i64,
}

/// Partial update. When any of the competitor fields is present the whole
/// triple is re-validated: `participant_type` falls back to the stored kind,
/// the ids are taken from the patch alone.
#[derive(Debug, Clone, Default)]
pub struct ParticipantUpdate {
    pub score: Option<i64>,
    pub participant_type: Option<String>,
    pub team_id: Option<TeamId>,
    pub single_id: Option<SingleId>,
}

impl ParticipantUpdate {
    pub fn touches_competitor(&self) -> bool {
        self.participant_type.is_some() || self.team_id.is_some() || self.single_id.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParticipantFilter {
    pub participant_type: Option<String>,
    pub match_id: Option<MatchId>,
    pub team_id: Option<TeamId>,
    pub single_id: Option<SingleId>,
}

/// A participant with its competitor resolved for display: the team, or the
/// single together with its person.
#[derive(Debug, Clone)]
pub struct ParticipantDetail {
    pub participant: Participant,
    pub team: Option<Team>,
    pub single: Option<SingleWithPerson>,
}

#[async_trait::async_trait]
pub trait ParticipantService {
    async fn create_participant(&self, data: NewParticipant) -> ServiceResult<ParticipantDetail>;
    async fn get_participants(
        &self,
        filter: ParticipantFilter,
    ) -> ServiceResult<Vec<ParticipantDetail>>;
    async fn get_participant(&self, id: ParticipantId) -> ServiceResult<ParticipantDetail>;
    async fn update_participant(
        &self,
        id: ParticipantId,
        update: ParticipantUpdate,
    ) -> ServiceResult<ParticipantDetail>;
    async fn delete_participant(&self, id: ParticipantId) -> ServiceResult<()>;
    /// Resolves competitor details for rows already fetched elsewhere (used
    /// by the match service for eager loading).
    async fn resolve_details(
        &self,
        participants: Vec<Participant>,
    ) -> ServiceResult<Vec<ParticipantDetail>>;
}

pub struct ParticipantServiceImpl {
    participant_repository: ArcParticipantRepository,
    team_repository: ArcTeamRepository,
    single_repository: ArcSingleRepository,
}

impl ParticipantServiceImpl {
    pub fn new(
        participant_repository: ArcParticipantRepository,
        team_repository: ArcTeamRepository,
        single_repository: ArcSingleRepository,
    ) -> Self {
        Self {
            participant_repository,
            team_repository,
            single_repository,
        }
    }

    async fn resolve_detail(&self, participant: Participant) -> ServiceResult<ParticipantDetail> {
        match participant.competitor {
            Competitor::Team { team_id } => {
                let Some(team) = self.team_repository.get_team(team_id).await? else {
                    return ServiceError::internal(format!(
                        "Participant {} references missing team {}",
                        participant.id, team_id
                    ));
                };
                Ok(ParticipantDetail {
                    participant,
                    team: Some(team),
                    single: None,
                })
            }
            Competitor::Single { single_id } => {
                let Some(single) = self
                    .single_repository
                    .get_single_with_person(single_id)
                    .await?
                else {
                    return ServiceError::internal(format!(
                        "Participant {} references missing single {}",
                        participant.id, single_id
                    ));
                };
                Ok(ParticipantDetail {
                    participant,
                    team: None,
                    single: Some(single),
                })
            }
        }
    }
}

#[async_trait::async_trait]
impl ParticipantService for ParticipantServiceImpl {
    async fn create_participant(&self, data: NewParticipant) -> ServiceResult<ParticipantDetail> {
        let participant = self.participant_repository.create_participant(&data).await?;
        info!(
            "Created participant {} ({}) for match {}",
            participant.id,
            participant.competitor.kind(),
            participant.match_id
        );
        self.resolve_detail(participant).await
    }

    async fn get_participants(
        &self,
        filter: ParticipantFilter,
    ) -> ServiceResult<Vec<ParticipantDetail>> {
        let participants = self
            .participant_repository
            .get_participants(&filter)
            .await?;
        self.resolve_details(participants).await
    }

    async fn get_participant(&self, id: ParticipantId) -> ServiceResult<ParticipantDetail> {
        let Some(participant) = self.participant_repository.get_participant(id).await? else {
            return ServiceError::not_found("Participant not found");
        };
        self.resolve_detail(participant).await
    }

    async fn update_participant(
        &self,
        id: ParticipantId,
        update: ParticipantUpdate,
    ) -> ServiceResult<ParticipantDetail> {
        let Some(existing) = self.participant_repository.get_participant(id).await? else {
            return ServiceError::not_found("Participant not found");
        };

        let competitor = if update.touches_competitor() {
            let kind = update
                .participant_type
                .as_deref()
                .unwrap_or_else(|| existing.competitor.kind());
            Some(Competitor::from_parts(
                kind,
                update.team_id,
                update.single_id,
            )?)
        } else {
            None
        };

        self.participant_repository
            .update_participant(id, update.score, competitor)
            .await?;
        info!("Updated participant {}", id);
        self.get_participant(id).await
    }

    async fn delete_participant(&self, id: ParticipantId) -> ServiceResult<()> {
        self.participant_repository.delete_participant(id).await?;
        info!("Deleted participant {}", id);
        Ok(())
    }

    async fn resolve_details(
        &self,
        participants: Vec<Participant>,
    ) -> ServiceResult<Vec<ParticipantDetail>> {
        let mut details = Vec::with_capacity(participants.len());
        for participant in participants {
            details.push(self.resolve_detail(participant).await?);
        }
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_accepts_team() {
        let competitor = Competitor::from_parts("team", Some(3), None).unwrap();
        assert_eq!(competitor, Competitor::Team { team_id: 3 });
        assert_eq!(competitor.kind(), "team");
        assert_eq!(competitor.team_id(), Some(3));
        assert_eq!(competitor.single_id(), None);
    }

    #[test]
    fn from_parts_accepts_single() {
        let competitor = Competitor::from_parts("single", None, Some(7)).unwrap();
        assert_eq!(competitor, Competitor::Single { single_id: 7 });
        assert_eq!(competitor.single_id(), Some(7));
    }

    #[test]
    fn from_parts_rejects_missing_team_id() {
        let err = Competitor::from_parts("team", None, None).unwrap_err();
        let ServiceError::InvalidInput(_, errors) = err else {
            panic!("expected InvalidInput");
        };
        assert_eq!(
            errors,
            vec!["team_id is required for team participant".to_string()]
        );
    }

    #[test]
    fn from_parts_rejects_conflicting_ids() {
        let err = Competitor::from_parts("team", Some(1), Some(2)).unwrap_err();
        let ServiceError::InvalidInput(_, errors) = err else {
            panic!("expected InvalidInput");
        };
        assert_eq!(
            errors,
            vec!["single_id must be null for team participant".to_string()]
        );
    }

    #[test]
    fn from_parts_rejects_unknown_kind() {
        let err = Competitor::from_parts("robot", Some(1), None).unwrap_err();
        let ServiceError::InvalidInput(_, errors) = err else {
            panic!("expected InvalidInput");
        };
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("participant_type"));
    }

    #[test]
    fn from_parts_collects_multiple_errors() {
        let err = Competitor::from_parts("single", Some(1), None).unwrap_err();
        let ServiceError::InvalidInput(_, errors) = err else {
            panic!("expected InvalidInput");
        };
        assert_eq!(errors.len(), 2);
    }

    use chrono::Utc;

    use crate::{
        app::{AppState, construct_app},
        events::EventService,
        matches::{MatchService, MatchStatus, NewMatch},
        persistence::{singles::SqliteSingleRepository, test_support::memory_pool},
        singles::SingleService,
        teams::TeamService,
    };

    async fn setup() -> (sqlx::Pool<sqlx::Sqlite>, AppState) {
        let pool = memory_pool().await;
        let app = construct_app(pool.clone());
        (pool, app)
    }

    async fn create_match(app: &AppState) -> MatchId {
        let start_time = chrono::DateTime::from_timestamp(Utc::now().timestamp(), 0).unwrap();
        app.match_service
            .create_match(NewMatch {
                start_time,
                status: MatchStatus::Scheduled,
            })
            .await
            .unwrap()
            .record
            .id
    }

    #[tokio::test]
    async fn create_requires_existing_match() {
        let (_pool, app) = setup().await;
        let team = app.team_service.create_team("Sparta".to_string()).await.unwrap();
        let err = app
            .participant_service
            .create_participant(NewParticipant {
                match_id: 99,
                competitor: Competitor::Team { team_id: team.id },
                score: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_requires_existing_team() {
        let (_pool, app) = setup().await;
        let match_id = create_match(&app).await;
        let err = app
            .participant_service
            .create_participant(NewParticipant {
                match_id,
                competitor: Competitor::Team { team_id: 99 },
                score: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_filters_are_conjunctive() {
        let (pool, app) = setup().await;
        let match_id = create_match(&app).await;
        let other_match_id = create_match(&app).await;
        let team = app.team_service.create_team("Sparta".to_string()).await.unwrap();
        let person = SqliteSingleRepository::new(pool.clone())
            .create_person("Jaromir")
            .await
            .unwrap();
        let single = app.single_service.create_single(person.id).await.unwrap();

        for (target, competitor) in [
            (match_id, Competitor::Team { team_id: team.id }),
            (
                match_id,
                Competitor::Single {
                    single_id: single.single.id,
                },
            ),
            (other_match_id, Competitor::Team { team_id: team.id }),
        ] {
            app.participant_service
                .create_participant(NewParticipant {
                    match_id: target,
                    competitor,
                    score: 0,
                })
                .await
                .unwrap();
        }

        let filtered = app
            .participant_service
            .get_participants(ParticipantFilter {
                participant_type: Some("team".to_string()),
                match_id: Some(match_id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].participant.match_id, match_id);
        assert_eq!(filtered[0].team.as_ref().unwrap().name, "Sparta");

        let singles_only = app
            .participant_service
            .get_participants(ParticipantFilter {
                participant_type: Some("single".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(singles_only.len(), 1);
        let resolved = singles_only[0].single.as_ref().unwrap();
        assert_eq!(resolved.person.name, "Jaromir");
    }

    #[tokio::test]
    async fn update_score_only() {
        let (_pool, app) = setup().await;
        let match_id = create_match(&app).await;
        let team = app.team_service.create_team("Sparta".to_string()).await.unwrap();
        let created = app
            .participant_service
            .create_participant(NewParticipant {
                match_id,
                competitor: Competitor::Team { team_id: team.id },
                score: 0,
            })
            .await
            .unwrap();

        let updated = app
            .participant_service
            .update_participant(
                created.participant.id,
                ParticipantUpdate {
                    score: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.participant.score, 3);
        assert_eq!(updated.participant.competitor, created.participant.competitor);
    }

    #[tokio::test]
    async fn update_revalidates_competitor_change() {
        let (pool, app) = setup().await;
        let match_id = create_match(&app).await;
        let team = app.team_service.create_team("Sparta".to_string()).await.unwrap();
        let person = SqliteSingleRepository::new(pool.clone())
            .create_person("Jaromir")
            .await
            .unwrap();
        let single = app.single_service.create_single(person.id).await.unwrap();
        let created = app
            .participant_service
            .create_participant(NewParticipant {
                match_id,
                competitor: Competitor::Team { team_id: team.id },
                score: 0,
            })
            .await
            .unwrap();

        // Passing a single_id while the stored kind is team is a conflict.
        let err = app
            .participant_service
            .update_participant(
                created.participant.id,
                ParticipantUpdate {
                    single_id: Some(single.single.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_, _)));

        // Switching kinds with the matching id is fine.
        let updated = app
            .participant_service
            .update_participant(
                created.participant.id,
                ParticipantUpdate {
                    participant_type: Some("single".to_string()),
                    single_id: Some(single.single.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            updated.participant.competitor,
            Competitor::Single {
                single_id: single.single.id
            }
        );

        // And the new reference must exist.
        let err = app
            .participant_service
            .update_participant(
                created.participant.id,
                ParticipantUpdate {
                    single_id: Some(99),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_removes_participant_and_its_events() {
        let (pool, app) = setup().await;
        let match_id = create_match(&app).await;
        let team = app.team_service.create_team("Sparta".to_string()).await.unwrap();
        let created = app
            .participant_service
            .create_participant(NewParticipant {
                match_id,
                competitor: Competitor::Team { team_id: team.id },
                score: 0,
            })
            .await
            .unwrap();

        let goal: (i64,) = sqlx::query_as("SELECT id FROM event_types WHERE name = 'Goal'")
            .fetch_one(&pool)
            .await
            .unwrap();
        let event = app
            .event_service
            .create_event(crate::events::NewEvent {
                match_id,
                event_type_id: goal.0,
                participant_id: created.participant.id,
                timestamp_sec: 10,
                description: None,
            })
            .await
            .unwrap();

        app.participant_service
            .delete_participant(created.participant.id)
            .await
            .unwrap();
        assert!(matches!(
            app.participant_service.get_participant(created.participant.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            app.event_service.get_event(event.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
