use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, FromRow)]
pub struct Skill {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Skill tagged with the user or event that owns it, used when loading
/// skills for many owners in one query.
#[derive(Debug, Clone, FromRow)]
pub struct OwnedSkill {
    pub owner_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub category: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSkillRequest {
    #[validate(
        custom = "super::not_blank",
        length(min = 1, max = 80, message = "Name must be 1 to 80 characters")
    )]
    pub name: String,
    #[validate(
        custom = "super::not_blank",
        length(min = 1, max = 80, message = "Category must be 1 to 80 characters")
    )]
    pub category: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceSkillsRequest {
    pub skill_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkillQuery {
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillResponse {
    pub id: Uuid,
    pub name: String,
    pub category: String,
}

impl From<Skill> for SkillResponse {
    fn from(skill: Skill) -> Self {
        Self {
            id: skill.id,
            name: skill.name,
            category: skill.category,
        }
    }
}

impl From<OwnedSkill> for SkillResponse {
    fn from(skill: OwnedSkill) -> Self {
        Self {
            id: skill.id,
            name: skill.name,
            category: skill.category,
        }
    }
}
