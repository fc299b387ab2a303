use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    ServiceError,
    app::AppState,
    http::{MessageResponse, singles::JsonSingleWithPerson, teams::JsonTeam},
    matches::MatchId,
    participants::{
        Competitor, NewParticipant, ParticipantDetail, ParticipantFilter, ParticipantId,
        ParticipantService, ParticipantUpdate,
    },
    singles::SingleId,
    teams::TeamId,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(get_all))
        .route("/{id}", get(get_by_id).put(update).delete(remove))
}

#[derive(serde::Deserialize)]
pub struct CreateParticipantRequest {
    participant_type: String,
    match_id: MatchId,
    team_id: Option<TeamId>,
    single_id: Option<SingleId>,
    score: Option<i64>,
}

#[derive(serde::Deserialize)]
pub struct UpdateParticipantRequest {
    score: Option<i64>,
    participant_type: Option<String>,
    team_id: Option<TeamId>,
    single_id: Option<SingleId>,
}

#[derive(serde::Deserialize)]
pub struct ParticipantListQuery {
    participant_type: Option<String>,
    match_id: Option<MatchId>,
    team_id: Option<TeamId>,
    single_id: Option<SingleId>,
}

#[derive(serde::Serialize)]
pub struct JsonParticipantDetail {
    id: ParticipantId,
    participant_type: String,
    match_id: MatchId,
    team_id: Option<TeamId>,
    single_id: Option<SingleId>,
    score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    team: Option<JsonTeam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    single: Option<JsonSingleWithPerson>,
}

impl JsonParticipantDetail {
    pub fn from_detail(detail: ParticipantDetail) -> Self {
        let participant = detail.participant;
        Self {
            id: participant.id,
            participant_type: participant.competitor.kind().to_string(),
            match_id: participant.match_id,
            team_id: participant.competitor.team_id(),
            single_id: participant.competitor.single_id(),
            score: participant.score,
            team: detail.team.map(JsonTeam::from_team),
            single: detail.single.map(JsonSingleWithPerson::from_single),
        }
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateParticipantRequest>,
) -> Result<(StatusCode, Json<JsonParticipantDetail>), ServiceError> {
    let competitor = Competitor::from_parts(&body.participant_type, body.team_id, body.single_id)?;
    let data = NewParticipant {
        match_id: body.match_id,
        competitor,
        score: body.score.unwrap_or(0),
    };
    let detail = state.participant_service.create_participant(data).await?;
    Ok((
        StatusCode::CREATED,
        Json(JsonParticipantDetail::from_detail(detail)),
    ))
}

pub async fn get_all(
    State(state): State<AppState>,
    Query(query): Query<ParticipantListQuery>,
) -> Result<Json<Vec<JsonParticipantDetail>>, ServiceError> {
    let filter = ParticipantFilter {
        participant_type: query.participant_type,
        match_id: query.match_id,
        team_id: query.team_id,
        single_id: query.single_id,
    };
    let details = state.participant_service.get_participants(filter).await?;
    Ok(Json(
        details
            .into_iter()
            .map(JsonParticipantDetail::from_detail)
            .collect(),
    ))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<ParticipantId>,
) -> Result<Json<JsonParticipantDetail>, ServiceError> {
    let detail = state.participant_service.get_participant(id).await?;
    Ok(Json(JsonParticipantDetail::from_detail(detail)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<ParticipantId>,
    Json(body): Json<UpdateParticipantRequest>,
) -> Result<Json<JsonParticipantDetail>, ServiceError> {
    let update = ParticipantUpdate {
        score: body.score,
        participant_type: body.participant_type,
        team_id: body.team_id,
        single_id: body.single_id,
    };
    let detail = state
        .participant_service
        .update_participant(id, update)
        .await?;
    Ok(Json(JsonParticipantDetail::from_detail(detail)))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<ParticipantId>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.participant_service.delete_participant(id).await?;
    Ok(Json(MessageResponse::new(
        "Participant successfully deleted",
    )))
}
