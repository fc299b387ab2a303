use axum::Router;
use log::info;

use crate::app::AppState;

mod events;
mod matches;
mod participants;
mod singles;
mod teams;

pub async fn run(
    state: AppState,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) {
    let router: Router<AppState> = Router::new().nest(
        "/api",
        Router::new()
            .nest("/matches", matches::router())
            .nest("/participants", participants::router())
            .nest("/teams", teams::router())
            .nest("/singles", singles::router())
            .nest("/events", events::router()),
    );

    let port = std::env::var("MATCHDAY_HTTP_PORT")
        .expect("MATCHDAY_HTTP_PORT must be set")
        .parse::<u16>()
        .expect("MATCHDAY_HTTP_PORT must be a valid u16");

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .unwrap();

    info!("API server listening on port {}", port);
    axum::serve(listener, router.with_state(state))
        .with_graceful_shutdown(shutdown_signal)
        .await
        .unwrap();

    info!("HTTP API shut down gracefully");
}

#[derive(serde::Serialize)]
pub struct MessageResponse {
    message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
