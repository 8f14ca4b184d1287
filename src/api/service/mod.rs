pub mod auth;
pub mod endpoints;
pub mod router;
pub mod types;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::core::booking::BookingManager;
use crate::core::error::EngineError;
use crate::core::planner::Planner;
use crate::core::schedule::ScheduleStore;

#[derive(Clone)]
pub struct AuthTokens {
    pub api_token: Arc<str>,
    pub admin_token: Arc<str>,
}

#[derive(Clone)]
pub struct State {
    pub store: Arc<ScheduleStore>,
    pub planner: Arc<Planner>,
    pub engine: Arc<BookingManager>,
    pub auth: AuthTokens,
}

impl State {
    pub fn new(
        store: Arc<ScheduleStore>,
        planner: Arc<Planner>,
        engine: Arc<BookingManager>,
        auth: AuthTokens,
    ) -> Self {
        Self {
            store,
            planner,
            engine,
            auth,
        }
    }
}

impl axum::extract::FromRef<State> for Arc<ScheduleStore> {
    fn from_ref(input: &State) -> Self {
        Arc::clone(&input.store)
    }
}

impl axum::extract::FromRef<State> for Arc<Planner> {
    fn from_ref(input: &State) -> Self {
        Arc::clone(&input.planner)
    }
}

impl axum::extract::FromRef<State> for Arc<BookingManager> {
    fn from_ref(input: &State) -> Self {
        Arc::clone(&input.engine)
    }
}

impl axum::extract::FromRef<State> for AuthTokens {
    fn from_ref(input: &State) -> Self {
        input.auth.clone()
    }
}

impl IntoResponse for types::ErrorResponse {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

impl types::ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            seats: None,
        }
    }
}

impl From<EngineError> for types::ErrorResponse {
    fn from(value: EngineError) -> Self {
        let status = match &value {
            EngineError::SeatConflict { .. } => StatusCode::CONFLICT,
            EngineError::RouteNotFound(_) | EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::IllegalState(_)
            | EngineError::InvalidRequest(_)
            | EngineError::ScheduleIntegrity(_) => StatusCode::BAD_REQUEST,
        };

        let seats = match &value {
            EngineError::SeatConflict { seats } => Some(seats.clone()),
            _ => None,
        };

        Self {
            status,
            message: value.to_string(),
            seats,
        }
    }
}
