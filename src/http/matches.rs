use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::DateTime;

use crate::{
    ServiceError, ServiceResult,
    app::AppState,
    http::{MessageResponse, participants::JsonParticipantDetail},
    matches::{
        MatchDetail, MatchFilter, MatchId, MatchService, MatchStatus, MatchUpdate, NewMatch,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(get_all))
        .route("/{id}", get(get_by_id).put(update).delete(remove))
}

#[derive(serde::Deserialize)]
pub struct CreateMatchRequest {
    start_time: i64,
    status: Option<String>,
}

#[derive(serde::Deserialize)]
pub struct UpdateMatchRequest {
    start_time: Option<i64>,
    end_time: Option<i64>,
    status: Option<String>,
}

#[derive(serde::Deserialize)]
pub struct MatchListQuery {
    status: Option<String>,
    #[serde(rename = "includeParticipants", default)]
    include_participants: bool,
}

#[derive(serde::Deserialize)]
pub struct MatchGetQuery {
    #[serde(rename = "includeParticipants")]
    include_participants: Option<bool>,
}

#[derive(serde::Serialize)]
pub struct JsonMatch {
    id: MatchId,
    start_time: i64,
    end_time: Option<i64>,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    participants: Option<Vec<JsonParticipantDetail>>,
}

impl JsonMatch {
    fn from_detail(detail: MatchDetail) -> Self {
        Self {
            id: detail.record.id,
            start_time: detail.record.start_time.timestamp(),
            end_time: detail.record.end_time.map(|t| t.timestamp()),
            status: detail.record.status.as_str().to_string(),
            participants: detail.participants.map(|participants| {
                participants
                    .into_iter()
                    .map(JsonParticipantDetail::from_detail)
                    .collect()
            }),
        }
    }
}

fn parse_timestamp(secs: i64, field: &str) -> ServiceResult<chrono::DateTime<chrono::Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        ServiceError::InvalidInput(
            "Invalid match data".to_string(),
            vec![format!("{} is not a valid unix timestamp", field)],
        )
    })
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateMatchRequest>,
) -> Result<(StatusCode, Json<JsonMatch>), ServiceError> {
    let status = match body.status.as_deref() {
        Some(s) => MatchStatus::parse(s)?,
        None => MatchStatus::Scheduled,
    };
    let data = NewMatch {
        start_time: parse_timestamp(body.start_time, "start_time")?,
        status,
    };
    let detail = state.match_service.create_match(data).await?;
    Ok((StatusCode::CREATED, Json(JsonMatch::from_detail(detail))))
}

pub async fn get_all(
    State(state): State<AppState>,
    Query(query): Query<MatchListQuery>,
) -> Result<Json<Vec<JsonMatch>>, ServiceError> {
    let filter = MatchFilter {
        status: query.status.as_deref().map(MatchStatus::parse).transpose()?,
        include_participants: query.include_participants,
    };
    let details = state.match_service.get_matches(filter).await?;
    Ok(Json(details.into_iter().map(JsonMatch::from_detail).collect()))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<MatchId>,
    Query(query): Query<MatchGetQuery>,
) -> Result<Json<JsonMatch>, ServiceError> {
    let include_participants = query.include_participants.unwrap_or(true);
    let detail = state.match_service.get_match(id, include_participants).await?;
    Ok(Json(JsonMatch::from_detail(detail)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<MatchId>,
    Json(body): Json<UpdateMatchRequest>,
) -> Result<Json<JsonMatch>, ServiceError> {
    let update = MatchUpdate {
        start_time: body
            .start_time
            .map(|secs| parse_timestamp(secs, "start_time"))
            .transpose()?,
        end_time: body
            .end_time
            .map(|secs| parse_timestamp(secs, "end_time"))
            .transpose()?,
        status: body.status.as_deref().map(MatchStatus::parse).transpose()?,
    };
    let detail = state.match_service.update_match(id, update).await?;
    Ok(Json(JsonMatch::from_detail(detail)))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<MatchId>,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.match_service.delete_match(id).await?;
    Ok(Json(MessageResponse::new("Match successfully deleted")))
}
