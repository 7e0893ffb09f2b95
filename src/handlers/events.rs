use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use super::extract::{Json, Path, Query, ValidatedJson};
use crate::models::event::{CreateEventRequest, EventQuery, EventResponse, UpdateEventRequest};
use crate::services::auth::AuthUser;
use crate::services::export::ExportQuery;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::pagination::Paged;
use crate::utils::response::{created, file, no_content};

const IMAGE_FIELD: &str = "file";

pub async fn list_events(
    State(state): State<AppState>,
    actor: Option<AuthUser>,
    Query(query): Query<EventQuery>,
) -> AppResult<Json<Paged<EventResponse>>> {
    Ok(Json(state.events.list(actor.as_ref(), query).await?))
}

pub async fn my_events(
    State(state): State<AppState>,
    actor: AuthUser,
    Query(query): Query<EventQuery>,
) -> AppResult<Json<Paged<EventResponse>>> {
    Ok(Json(state.events.list_mine(&actor, query).await?))
}

pub async fn get_event(
    State(state): State<AppState>,
    actor: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<EventResponse>> {
    Ok(Json(state.events.get(actor.as_ref(), id).await?))
}

pub async fn create_event(
    State(state): State<AppState>,
    actor: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateEventRequest>,
) -> AppResult<impl IntoResponse> {
    Ok(created(state.events.create(&actor, request).await?))
}

pub async fn update_event(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateEventRequest>,
) -> AppResult<Json<EventResponse>> {
    Ok(Json(state.events.update(&actor, id, request).await?))
}

pub async fn delete_event(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    state.events.delete(&actor, id).await?;
    Ok(no_content())
}

pub async fn upload_image(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<EventResponse>> {
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let bytes = field.bytes().await?;
        return Ok(Json(state.events.set_image(&actor, id, &bytes).await?));
    }

    Err(AppError::ValidationError(format!(
        "Multipart field '{}' is required",
        IMAGE_FIELD
    )))
}

pub async fn export_registrations(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> AppResult<Response> {
    let export = state
        .exports
        .event_registrations(&actor, id, query.format)
        .await?;
    Ok(file(export.bytes, export.content_type, &export.filename))
}
