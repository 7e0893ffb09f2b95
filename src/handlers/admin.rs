use axum::extract::State;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use super::extract::{Json, Path, Query};
use crate::middleware::AdminUser;
use crate::models::event::{EventQuery, EventResponse};
use crate::models::report::SummaryReport;
use crate::models::user::{AdminUserResponse, ChangeRoleRequest, UserListQuery};
use crate::services::export::ExportQuery;
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::pagination::Paged;
use crate::utils::response::{file, no_content};

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<Paged<AdminUserResponse>>> {
    Ok(Json(state.users.list(query).await?))
}

pub async fn change_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangeRoleRequest>,
) -> AppResult<Json<AdminUserResponse>> {
    Ok(Json(state.users.change_role(&admin, id, request).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    state.users.delete(&admin, id).await?;
    Ok(no_content())
}

pub async fn restore_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AdminUserResponse>> {
    Ok(Json(state.users.restore(&admin, id).await?))
}

pub async fn list_events(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<EventQuery>,
) -> AppResult<Json<Paged<EventResponse>>> {
    Ok(Json(state.events.admin_list(query).await?))
}

pub async fn restore_event(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<EventResponse>> {
    Ok(Json(state.events.restore(&admin, id).await?))
}

pub async fn summary(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<SummaryReport>> {
    Ok(Json(state.reports.summary().await?))
}

pub async fn export_events(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ExportQuery>,
) -> AppResult<Response> {
    let export = state.exports.events_report(query.format).await?;
    Ok(file(export.bytes, export.content_type, &export.filename))
}
