use std::sync::Arc;

use axum::response::IntoResponse;
use sqlx::{Pool, Sqlite};
use thiserror::Error;

use crate::{
    events::{EventService, EventServiceImpl},
    matches::{MatchService, MatchServiceImpl},
    participants::{ParticipantService, ParticipantServiceImpl},
    persistence::{
        events::{EventRepository, SqliteEventRepository},
        matches::{MatchRepository, SqliteMatchRepository},
        participants::{ParticipantRepository, SqliteParticipantRepository},
        singles::{SingleRepository, SqliteSingleRepository},
        teams::{SqliteTeamRepository, TeamRepository},
    },
    singles::{SingleService, SingleServiceImpl},
    teams::{TeamService, TeamServiceImpl},
};

pub type ArcMatchService = Arc<Box<dyn MatchService + Send + Sync + 'static>>;
pub type ArcParticipantService = Arc<Box<dyn ParticipantService + Send + Sync + 'static>>;
pub type ArcTeamService = Arc<Box<dyn TeamService + Send + Sync + 'static>>;
pub type ArcSingleService = Arc<Box<dyn SingleService + Send + Sync + 'static>>;
pub type ArcEventService = Arc<Box<dyn EventService + Send + Sync + 'static>>;

pub type ArcMatchRepository = Arc<Box<dyn MatchRepository + Send + Sync + 'static>>;
pub type ArcParticipantRepository = Arc<Box<dyn ParticipantRepository + Send + Sync + 'static>>;
pub type ArcTeamRepository = Arc<Box<dyn TeamRepository + Send + Sync + 'static>>;
pub type ArcSingleRepository = Arc<Box<dyn SingleRepository + Send + Sync + 'static>>;
pub type ArcEventRepository = Arc<Box<dyn EventRepository + Send + Sync + 'static>>;

#[derive(Clone)]
pub struct AppState {
    pub match_service: ArcMatchService,
    pub participant_service: ArcParticipantService,
    pub team_service: ArcTeamService,
    pub single_service: ArcSingleService,
    pub event_service: ArcEventService,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String, Vec<String>),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found<T, R>(msg: T) -> ServiceResult<R>
    where
        T: Into<String>,
    {
        Err(ServiceError::NotFound(msg.into()))
    }

    pub fn invalid_input<T, R>(msg: T) -> ServiceResult<R>
    where
        T: Into<String>,
    {
        Err(ServiceError::InvalidInput(msg.into(), Vec::new()))
    }

    pub fn conflict<T, R>(msg: T) -> ServiceResult<R>
    where
        T: Into<String>,
    {
        Err(ServiceError::Conflict(msg.into()))
    }

    pub fn internal<T, R>(msg: T) -> ServiceResult<R>
    where
        T: Into<String>,
    {
        Err(ServiceError::Internal(msg.into()))
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::http::Response<axum::body::Body> {
        let (status, message, errors) = match self {
            ServiceError::NotFound(msg) => (axum::http::StatusCode::NOT_FOUND, msg, Vec::new()),
            ServiceError::InvalidInput(msg, errors) => {
                (axum::http::StatusCode::BAD_REQUEST, msg, errors)
            }
            ServiceError::Conflict(msg) => (axum::http::StatusCode::BAD_REQUEST, msg, Vec::new()),
            ServiceError::Internal(msg) => {
                // The raw storage error stays in the logs; callers get a generic message.
                log::error!("Internal error: {}", msg);
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Unexpected server error".to_string(),
                    Vec::new(),
                )
            }
        };
        let body = serde_json::json!({ "message": message, "errors": errors });
        (status, axum::Json(body)).into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub fn construct_app(pool: Pool<Sqlite>) -> AppState {
    let match_repository: ArcMatchRepository =
        Arc::new(Box::new(SqliteMatchRepository::new(pool.clone())));
    let participant_repository: ArcParticipantRepository =
        Arc::new(Box::new(SqliteParticipantRepository::new(pool.clone())));
    let team_repository: ArcTeamRepository =
        Arc::new(Box::new(SqliteTeamRepository::new(pool.clone())));
    let single_repository: ArcSingleRepository =
        Arc::new(Box::new(SqliteSingleRepository::new(pool.clone())));
    let event_repository: ArcEventRepository =
        Arc::new(Box::new(SqliteEventRepository::new(pool)));

    let participant_service: ArcParticipantService =
        Arc::new(Box::new(ParticipantServiceImpl::new(
            participant_repository.clone(),
            team_repository.clone(),
            single_repository.clone(),
        )));

    let match_service: ArcMatchService = Arc::new(Box::new(MatchServiceImpl::new(
        match_repository,
        participant_service.clone(),
    )));

    let team_service: ArcTeamService = Arc::new(Box::new(TeamServiceImpl::new(
        team_repository,
        participant_repository.clone(),
    )));

    let single_service: ArcSingleService = Arc::new(Box::new(SingleServiceImpl::new(
        single_repository,
        participant_repository,
    )));

    let event_service: ArcEventService =
        Arc::new(Box::new(EventServiceImpl::new(event_repository)));

    AppState {
        match_service,
        participant_service,
        team_service,
        single_service,
        event_service,
    }
}
