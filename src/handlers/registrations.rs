use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use uuid::Uuid;

use super::extract::{optional_json, Json, Path, Query};
use crate::models::registration::{
    CreateRegistrationRequest, RegistrationResponse, UpdateRegistrationStatusRequest,
};
use crate::services::auth::AuthUser;
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::pagination::{PageParams, Paged};
use crate::utils::response::{created, no_content};

/// The body is optional; `{ "notes": ... }` when present.
pub async fn register(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(event_id): Path<Uuid>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let request: CreateRegistrationRequest = optional_json(&body)?;
    Ok(created(
        state.registrations.register(&actor, event_id, request).await?,
    ))
}

pub async fn cancel(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(event_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    state.registrations.cancel(&actor, event_id).await?;
    Ok(no_content())
}

pub async fn my_registrations(
    State(state): State<AppState>,
    actor: AuthUser,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Paged<RegistrationResponse>>> {
    Ok(Json(state.registrations.list_mine(&actor, params).await?))
}

pub async fn event_registrations(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(event_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Paged<RegistrationResponse>>> {
    Ok(Json(
        state
            .registrations
            .list_for_event(&actor, event_id, params)
            .await?,
    ))
}

pub async fn update_status(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRegistrationStatusRequest>,
) -> AppResult<Json<RegistrationResponse>> {
    Ok(Json(
        state.registrations.update_status(&actor, id, request).await?,
    ))
}
