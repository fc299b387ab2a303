use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};

use crate::{
    ServiceError,
    app::AppState,
    http::MessageResponse,
    participants::{Participant, ParticipantId},
    singles::{
        Person, PersonId, SingleDetail, SingleFilter, SingleId, SingleService, SingleWithPerson,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(get_all))
        .route("/{id}", get(get_by_id).put(update).delete(remove))
        .route("/{id}/participant", post(link_participant))
        .route(
            "/{id}/participant/{participant_id}",
            delete(unlink_participant),
        )
}

#[derive(serde::Deserialize)]
pub struct CreateSingleRequest {
    person_id: PersonId,
}

#[derive(serde::Deserialize)]
pub struct UpdateSingleRequest {
    person_id: PersonId,
}

#[derive(serde::Deserialize)]
pub struct LinkParticipantRequest {
    participant_id: ParticipantId,
}

#[derive(serde::Deserialize)]
pub struct SingleListQuery {
    person_id: Option<PersonId>,
    #[serde(rename = "includePerson", default)]
    include_person: bool,
    #[serde(rename = "includeParticipants", default)]
    include_participants: bool,
}

#[derive(serde::Serialize)]
pub struct JsonPerson {
    id: PersonId,
    name: String,
}

impl JsonPerson {
    pub fn from_person(person: Person) -> Self {
        Self {
            id: person.id,
            name: person.name,
        }
    }
}

#[derive(serde::Serialize)]
pub struct JsonSingleWithPerson {
    id: SingleId,
    person_id: PersonId,
    person: JsonPerson,
}

impl JsonSingleWithPerson {
    pub fn from_single(with_person: SingleWithPerson) -> Self {
        Self {
            id: with_person.single.id,
            person_id: with_person.single.person_id,
            person: JsonPerson::from_person(with_person.person),
        }
    }
}

#[derive(serde::Serialize)]
pub struct JsonSingleDetail {
    id: SingleId,
    person_id: PersonId,
    #[serde(skip_serializing_if = "Option::is_none")]
    person: Option<JsonPerson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    participants: Option<Vec<JsonSingleParticipant>>,
}

/// Participant row as shown under a single: competitor side implied.
#[derive(serde::Serialize)]
pub struct JsonSingleParticipant {
    id: i64,
    match_id: i64,
    score: i64,
}

impl JsonSingleDetail {
    fn from_detail(detail: SingleDetail) -> Self {
        Self {
            id: detail.single.id,
            person_id: detail.single.person_id,
            person: detail.person.map(JsonPerson::from_person),
            participants: detail.participants.map(|participants| {
                participants
                    .into_iter()
                    .map(JsonSingleParticipant::from_participant)
                    .collect()
            }),
        }
    }
}

impl JsonSingleParticipant {
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
    Json(body): Json<CreateSingleRequest>,
) -> Result<(StatusCode, Json<JsonSingleDetail>), ServiceError> {
    let detail = state.single_service.create_single(body.person_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(JsonSingleDetail::from_detail(detail)),
    ))
}

pub async fn get_all(
    State(state): State<AppState>,
    Query(query): Query<SingleListQuery>,
) -> Result<Json<Vec<JsonSingleDetail>>, ServiceError> {
    let filter = SingleFilter {
        person_id: query.person_id,
        include_person: query.include_person,
        include_participants: query.include_participants,
    };
    let details = state.single_service.get_singles(filter).await?;
    Ok(Json(
        details
            .into_iter()
            .map(JsonSingleDetail::from_detail)
            .collect(),
    ))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<SingleId>,
) -> Result<Json<JsonSingleDetail>, ServiceError> {
    let detail = state.single_service.get_single(id).await?;
    Ok(Json(JsonSingleDetail::from_detail(detail)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<SingleId>,
    Json(body): Json<UpdateSingleRequest>,
) -> Result<Json<JsonSingleDetail>, ServiceError> {
    let detail = state
        .single_service
        .update_single(id, body.person_id)
        .await?;
    Ok(Json(JsonSingleDetail::from_detail(detail)))
}

pub async fn link_participant(
    State(state): State<AppState>,
    Path(id): Path<SingleId>,
    Json(body): Json<LinkParticipantRequest>,
) -> Result<Json<JsonSingleDetail>, ServiceError> {
    let detail = state
        .single_service
        .link_participant(id, body.participant_id)
        .await?;
    Ok(Json(JsonSingleDetail::from_detail(detail)))
}

pub async fn unlink_participant(
    State(state): State<AppState>,
    Path((id, participant_id)): Path<(SingleId, ParticipantId)>,
) -> Result<Json<JsonSingleDetail>, ServiceError> {
    let detail = state
        .single_service
        .unlink_participant(id, participant_id)
        .await?;
    Ok(Json(JsonSingleDetail::from_detail(detail)))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<SingleId>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.single_service.delete_single(id).await?;
    Ok(Json(MessageResponse::new("Single successfully deleted")))
}
