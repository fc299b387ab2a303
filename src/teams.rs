use log::info;

use crate::{
    ServiceError, ServiceResult,
    app::{ArcParticipantRepository, ArcTeamRepository},
    participants::{Participant, ParticipantFilter},
    persistence::{participants::ParticipantRepository, teams::TeamRepository},
};

pub type TeamId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct TeamFilter {
    pub name: Option<String>,
    pub include_participants: bool,
}

#[derive(Debug, Clone)]
pub struct TeamDetail {
    pub team: Team,
    pub participants: Option<Vec<Participant>>,
}

#[async_trait::async_trait]
pub trait TeamService {
    async fn create_team(&self, name: String) -> ServiceResult<Team>;
    async fn get_teams(&self, filter: TeamFilter) -> ServiceResult<Vec<TeamDetail>>;
    async fn get_team(&self, id: TeamId, include_participants: bool) -> ServiceResult<TeamDetail>;
    async fn update_team(&self, id: TeamId, name: String) -> ServiceResult<Team>;
    async fn delete_team(&self, id: TeamId) -> ServiceResult<()>;
}

pub struct TeamServiceImpl {
    team_repository: ArcTeamRepository,
    participant_repository: ArcParticipantRepository,
}

impl TeamServiceImpl {
    pub fn new(
        team_repository: ArcTeamRepository,
        participant_repository: ArcParticipantRepository,
    ) -> Self {
        Self {
            team_repository,
            participant_repository,
        }
    }

    fn validate_name(name: &str) -> ServiceResult<()> {
        if name.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "Invalid team data".to_string(),
                vec!["name must not be empty".to_string()],
            ));
        }
        Ok(())
    }

    async fn load_participants(&self, id: TeamId) -> ServiceResult<Vec<Participant>> {
        self.participant_repository
            .get_participants(&ParticipantFilter {
                team_id: Some(id),
                ..Default::default()
            })
            .await
    }
}

#[async_trait::async_trait]
impl TeamService for TeamServiceImpl {
    async fn create_team(&self, name: String) -> ServiceResult<Team> {
        Self::validate_name(&name)?;
        let team = self.team_repository.create_team(&name).await?;
        info!("Created team {} '{}'", team.id, team.name);
        Ok(team)
    }

    async fn get_teams(&self, filter: TeamFilter) -> ServiceResult<Vec<TeamDetail>> {
        let teams = self.team_repository.get_teams(&filter).await?;
        let mut details = Vec::with_capacity(teams.len());
        for team in teams {
            let participants = if filter.include_participants {
                Some(self.load_participants(team.id).await?)
            } else {
                None
            };
            details.push(TeamDetail { team, participants });
        }
        Ok(details)
    }

    async fn get_team(&self, id: TeamId, include_participants: bool) -> ServiceResult<TeamDetail> {
        let Some(team) = self.team_repository.get_team(id).await? else {
            return ServiceError::not_found("Team not found");
        };
        let participants = if include_participants {
            Some(self.load_participants(id).await?)
        } else {
            None
        };
        Ok(TeamDetail { team, participants })
    }

    async fn update_team(&self, id: TeamId, name: String) -> ServiceResult<Team> {
        Self::validate_name(&name)?;
        self.team_repository.update_team(id, &name).await?;
        info!("Renamed team {} to '{}'", id, name);
        Ok(Team { id, name })
    }

    async fn delete_team(&self, id: TeamId) -> ServiceResult<()> {
        self.team_repository.delete_team(id).await?;
        info!("Deleted team {} with its participants", id);
        Ok(())
    }
}
