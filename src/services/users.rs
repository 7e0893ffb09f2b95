use sqlx::PgPool;
use uuid::Uuid;

use crate::database::users::UserFilter;
use crate::database::{RegistrationRepository, SkillRepository, UserRepository};
use crate::models::skill::{ReplaceSkillsRequest, SkillResponse};
use crate::models::user::{
    AdminUserResponse, ChangeRoleRequest, UpdateProfileRequest, UserListQuery, UserResponse,
};
use crate::services::auth::AuthUser;
use crate::services::skills::SkillService;
use crate::utils::error::{AppError, AppResult};
use crate::utils::logging::log_admin_action;
use crate::utils::pagination::{PageParams, Paged};

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
    users: UserRepository,
    skills: SkillRepository,
    skill_service: SkillService,
}

impl UserService {
    pub fn new(
        pool: PgPool,
        users: UserRepository,
        skills: SkillRepository,
        skill_service: SkillService,
    ) -> Self {
        Self {
            pool,
            users,
            skills,
            skill_service,
        }
    }

    pub async fn update_profile(
        &self,
        actor: &AuthUser,
        request: UpdateProfileRequest,
    ) -> AppResult<UserResponse> {
        let user = self
            .users
            .update_name(actor.id, request.name.trim())
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let skills = self.skills_of(actor.id).await?;

        Ok(UserResponse::new(user, skills))
    }

    pub async fn skills_of(&self, user_id: Uuid) -> AppResult<Vec<SkillResponse>> {
        Ok(self
            .skills
            .for_user(user_id)
            .await?
            .into_iter()
            .map(SkillResponse::from)
            .collect())
    }

    /// Replaces the caller's whole skill set.
    pub async fn replace_skills(
        &self,
        actor: &AuthUser,
        request: ReplaceSkillsRequest,
    ) -> AppResult<Vec<SkillResponse>> {
        let skill_ids = self.skill_service.resolve_ids(&request.skill_ids).await?;

        let mut tx = self.pool.begin().await?;
        SkillRepository::replace_for_user(&mut tx, actor.id, &skill_ids).await?;
        tx.commit().await?;

        self.skills_of(actor.id).await
    }

    pub async fn list(&self, query: UserListQuery) -> AppResult<Paged<AdminUserResponse>> {
        let page = PageParams {
            page: query.page,
            page_size: query.page_size,
        }
        .clamp();
        let filter = UserFilter {
            search: query.search,
            role: query.role,
            include_deleted: query.include_deleted,
        };

        let (users, total) = self.users.list(&filter, page).await?;
        Ok(Paged::new(users, page, total).map(AdminUserResponse::from))
    }

    pub async fn change_role(
        &self,
        actor: &AuthUser,
        user_id: Uuid,
        request: ChangeRoleRequest,
    ) -> AppResult<AdminUserResponse> {
        if actor.id == user_id {
            return Err(AppError::BusinessRule(
                "Administrators cannot change their own role".to_string(),
            ));
        }

        let user = self
            .users
            .update_role(user_id, request.role)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        log_admin_action(actor.id, "change_role", Some(user_id));
        Ok(user.into())
    }

    pub async fn delete(&self, actor: &AuthUser, user_id: Uuid) -> AppResult<()> {
        if actor.id == user_id {
            return Err(AppError::BusinessRule(
                "Administrators cannot delete their own account".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        if !UserRepository::soft_delete(&mut tx, user_id).await? {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }
        let cancelled =
            RegistrationRepository::cancel_upcoming_for_user(&mut tx, user_id).await?;
        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            cancelled,
            "Cancelled upcoming registrations of deleted user"
        );
        log_admin_action(actor.id, "delete_user", Some(user_id));
        Ok(())
    }

    pub async fn restore(&self, actor: &AuthUser, user_id: Uuid) -> AppResult<AdminUserResponse> {
        let user = self
            .users
            .restore(user_id)
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict(_) => AppError::Conflict(
                    "Another active account already uses this email".to_string(),
                ),
                other => other,
            })?;

        let user = match user {
            Some(user) => user,
            None => {
                return match self.users.find_by_id_including_deleted(user_id).await? {
                    Some(_) => Err(AppError::BusinessRule("User is not deleted".to_string())),
                    None => Err(AppError::NotFound(format!("User {} not found", user_id))),
                }
            }
        };

        log_admin_action(actor.id, "restore_user", Some(user_id));
        Ok(user.into())
    }
}
