use application::{DispatchError, PrinterCommand};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse, Json, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use domain::PrinterError;
use futures::Stream;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/commands", post(send_command))
        .route("/api/events", get(sse_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn send_command(
    State(state): State<Arc<AppState>>,
    Json(command): Json<PrinterCommand>,
) -> Response {
    match state.commands.send(command).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

async fn sse_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).map(|msg| match msg {
        Ok(event) => Event::default()
            .event(event.event_type())
            .json_data(&event)
            .map_err(|_| axum::Error::new("Serialization error")),
        // Slow subscriber fell behind the broadcast buffer
        Err(_) => Ok(Event::default().comment("lagged")),
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

/// Failure body: `{ "code": ..., "message": ... }`
pub struct ApiError(pub DispatchError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            DispatchError::Closed => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::Printer(e) => match e {
                PrinterError::InvalidArgument(_) | PrinterError::ImageDecode(_) => {
                    StatusCode::BAD_REQUEST
                }
                PrinterError::AlreadyConnected { .. }
                | PrinterError::NotConnected
                | PrinterError::JobAlreadyPending => StatusCode::CONFLICT,
                PrinterError::JobTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> &'static str {
        match &self.0 {
            DispatchError::Closed => "unavailable",
            DispatchError::Printer(e) => e.code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "code": self.code(), "message": self.0.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
