use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::database;
use crate::state::AppState;
use crate::utils::error::AppError;

pub mod admin;
pub mod auth;
pub mod events;
pub mod extract;
pub mod registrations;
pub mod skills;
pub mod users;

const SERVICE_NAME: &str = "volunteer-api";

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
    database: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> Response {
    match database::ping(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            axum::Json(HealthPayload {
                status: "ok",
                service: SERVICE_NAME,
                database: "up",
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check could not reach the database");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                axum::Json(HealthPayload {
                    status: "degraded",
                    service: SERVICE_NAME,
                    database: "down",
                }),
            )
                .into_response()
        }
    }
}

pub async fn not_found() -> AppError {
    AppError::NotFound("The requested route does not exist".to_string())
}
