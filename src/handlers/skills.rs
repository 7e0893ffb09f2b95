use axum::extract::State;
use axum::response::IntoResponse;
use uuid::Uuid;

use super::extract::{Json, Path, Query, ValidatedJson};
use crate::middleware::AdminUser;
use crate::models::skill::{CreateSkillRequest, SkillQuery, SkillResponse};
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::response::{created, no_content};

pub async fn list_skills(
    State(state): State<AppState>,
    Query(query): Query<SkillQuery>,
) -> AppResult<Json<Vec<SkillResponse>>> {
    Ok(Json(state.skills.list(query.category.as_deref()).await?))
}

pub async fn create_skill(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ValidatedJson(request): ValidatedJson<CreateSkillRequest>,
) -> AppResult<impl IntoResponse> {
    Ok(created(state.skills.create(&admin, request).await?))
}

pub async fn delete_skill(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    state.skills.delete(&admin, id).await?;
    Ok(no_content())
}
