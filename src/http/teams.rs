use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    ServiceError,
    app::AppState,
    http::MessageResponse,
    participants::Participant,
    teams::{Team, TeamDetail, TeamFilter, TeamId, TeamService},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(get_all))
        .route("/{id}", get(get_by_id).put(update).delete(remove))
}

#[derive(serde::Deserialize)]
pub struct CreateTeamRequest {
    name: String,
}

#[derive(serde::Deserialize)]
pub struct UpdateTeamRequest {
    name: Option<String>,
}

#[derive(serde::Deserialize)]
pub struct TeamListQuery {
    name: Option<String>,
    #[serde(rename = "includeParticipants", default)]
    include_participants: bool,
}

#[derive(serde::Deserialize)]
pub struct TeamGetQuery {
    #[serde(rename = "includeParticipants", default)]
    include_participants: bool,
}

#[derive(serde::Serialize)]
pub struct JsonTeam {
    id: TeamId,
    name: String,
}

impl JsonTeam {
    pub fn from_team(team: Team) -> Self {
        Self {
            id: team.id,
            name: team.name,
        }
    }
}

#[derive(serde::Serialize)]
pub struct JsonTeamDetail {
    id: TeamId,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    participants: Option<Vec<JsonTeamParticipant>>,
}

/// Participant row as shown under a team: the competitor side is implied, so
/// only the match linkage and score are interesting.
#[derive(serde::Serialize)]
pub struct JsonTeamParticipant {
    id: i64,
    match_id: i64,
    score: i64,
}

impl JsonTeamDetail {
    fn from_detail(detail: TeamDetail) -> Self {
        Self {
            id: detail.team.id,
            name: detail.team.name,
            participants: detail.participants.map(|participants| {
                participants
                    .into_iter()
                    .map(JsonTeamParticipant::from_participant)
                    .collect()
            }),
        }
    }
}

impl JsonTeamParticipant {
    fn from_participant(participant: Participant) -> Self {
        Self {
            id: participant.id,
            match_id: participant.match_id,
            score: participant.score,
        }
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateTeamRequest>,
) -> Result<(StatusCode, Json<JsonTeam>), ServiceError> {
    let team = state.team_service.create_team(body.name).await?;
    Ok((StatusCode::CREATED, Json(JsonTeam::from_team(team))))
}

pub async fn get_all(
    State(state): State<AppState>,
    Query(query): Query<TeamListQuery>,
) -> Result<Json<Vec<JsonTeamDetail>>, ServiceError> {
    let filter = TeamFilter {
        name: query.name,
        include_participants: query.include_participants,
    };
    let details = state.team_service.get_teams(filter).await?;
    Ok(Json(
        details.into_iter().map(JsonTeamDetail::from_detail).collect(),
    ))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<TeamId>,
    Query(query): Query<TeamGetQuery>,
) -> Result<Json<JsonTeamDetail>, ServiceError> {
    let detail = state
        .team_service
        .get_team(id, query.include_participants)
        .await?;
    Ok(Json(JsonTeamDetail::from_detail(detail)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<TeamId>,
    Json(body): Json<UpdateTeamRequest>,
) -> Result<Json<JsonTeam>, ServiceError> {
    let team = match body.name {
        Some(name) => state.team_service.update_team(id, name).await?,
        // Nothing to change; behave like a read.
        None => state.team_service.get_team(id, false).await?.team,
    };
    Ok(Json(JsonTeam::from_team(team)))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<TeamId>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.team_service.delete_team(id).await?;
    Ok(Json(MessageResponse::new("Team successfully deleted")))
}
