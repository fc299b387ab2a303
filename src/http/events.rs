use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    ServiceError,
    app::AppState,
    events::{EventFilter, EventId, EventService, EventTypeId, EventUpdate, InGameEvent, NewEvent},
    http::MessageResponse,
    matches::MatchId,
    participants::ParticipantId,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(get_all))
        .route("/{id}", get(get_by_id).put(update).delete(remove))
}

#[derive(serde::Deserialize)]
pub struct CreateEventRequest {
    match_id: MatchId,
    event_type_id: EventTypeId,
    participant_id: ParticipantId,
    timestamp_sec: i64,
    description: Option<String>,
}

#[derive(serde::Deserialize)]
pub struct UpdateEventRequest {
    match_id: Option<MatchId>,
    event_type_id: Option<EventTypeId>,
    participant_id: Option<ParticipantId>,
    timestamp_sec: Option<i64>,
    description: Option<String>,
}

#[derive(serde::Deserialize)]
pub struct EventListQuery {
    match_id: Option<MatchId>,
    participant_id: Option<ParticipantId>,
    event_type_id: Option<EventTypeId>,
}

#[derive(serde::Serialize)]
pub struct JsonEvent {
    id: EventId,
    match_id: MatchId,
    event_type_id: EventTypeId,
    participant_id: ParticipantId,
    timestamp_sec: i64,
    description: Option<String>,
}

impl JsonEvent {
    fn from_event(event: InGameEvent) -> Self {
        Self {
            id: event.id,
            match_id: event.match_id,
            event_type_id: event.event_type_id,
            participant_id: event.participant_id,
            timestamp_sec: event.timestamp_sec,
            description: event.description,
        }
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<JsonEvent>), ServiceError> {
    let data = NewEvent {
        match_id: body.match_id,
        event_type_id: body.event_type_id,
        participant_id: body.participant_id,
        timestamp_sec: body.timestamp_sec,
        description: body.description,
    };
    let event = state.event_service.create_event(data).await?;
    Ok((StatusCode::CREATED, Json(JsonEvent::from_event(event))))
}

pub async fn get_all(
    State(state): State<AppState>,
    Query(query): Query<EventListQuery>,
) -> Result<Json<Vec<JsonEvent>>, ServiceError> {
    let filter = EventFilter {
        match_id: query.match_id,
        participant_id: query.participant_id,
        event_type_id: query.event_type_id,
    };
    let events = state.event_service.get_events(filter).await?;
    Ok(Json(events.into_iter().map(JsonEvent::from_event).collect()))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<Json<JsonEvent>, ServiceError> {
    let event = state.event_service.get_event(id).await?;
    Ok(Json(JsonEvent::from_event(event)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
    Json(body): Json<UpdateEventRequest>,
) -> Result<Json<JsonEvent>, ServiceError> {
    let update = EventUpdate {
        match_id: body.match_id,
        event_type_id: body.event_type_id,
        participant_id: body.participant_id,
        timestamp_sec: body.timestamp_sec,
        description: body.description,
    };
    let event = state.event_service.update_event(id, update).await?;
    Ok(Json(JsonEvent::from_event(event)))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.event_service.delete_event(id).await?;
    Ok(Json(MessageResponse::new(
        "In-game event successfully deleted",
    )))
}
