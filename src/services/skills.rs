use std::collections::HashSet;
use uuid::Uuid;

use crate::database::SkillRepository;
use crate::models::skill::{CreateSkillRequest, SkillResponse};
use crate::services::auth::AuthUser;
use crate::utils::error::{AppError, AppResult};
use crate::utils::logging::log_admin_action;

#[derive(Clone)]
pub struct SkillService {
    skills: SkillRepository,
}

impl SkillService {
    pub fn new(skills: SkillRepository) -> Self {
        Self { skills }
    }

    pub async fn list(&self, category: Option<&str>) -> AppResult<Vec<SkillResponse>> {
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        Ok(self
            .skills
            .list(category)
            .await?
            .into_iter()
            .map(SkillResponse::from)
            .collect())
    }

    pub async fn create(
        &self,
        actor: &AuthUser,
        request: CreateSkillRequest,
    ) -> AppResult<SkillResponse> {
        let skill = self
            .skills
            .create(request.name.trim(), request.category.trim())
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict(_) => {
                    AppError::Conflict(format!("Skill '{}' already exists", request.name.trim()))
                }
                other => other,
            })?;

        log_admin_action(actor.id, "create_skill", Some(skill.id));
        Ok(skill.into())
    }

    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> AppResult<()> {
        if !self.skills.delete(id).await? {
            return Err(AppError::NotFound(format!("Skill {} not found", id)));
        }

        log_admin_action(actor.id, "delete_skill", Some(id));
        Ok(())
    }

    /// Collapses duplicates and checks every id names an existing skill.
    pub async fn resolve_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
        let unique = dedupe(ids);
        if unique.is_empty() {
            return Ok(unique);
        }

        let found = self.skills.count_existing(&unique).await?;
        if found != unique.len() as i64 {
            return Err(AppError::BusinessRule(
                "One or more skills do not exist".to_string(),
            ));
        }

        Ok(unique)
    }
}

/// Removes duplicates while keeping first-seen order.
fn dedupe(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_keeps_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedupe(&[a, b, a, b, a]), vec![a, b]);
        assert!(dedupe(&[]).is_empty());
    }
}
