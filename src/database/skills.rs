use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::skill::{OwnedSkill, Skill};

#[derive(Clone)]
pub struct SkillRepository {
    pool: PgPool,
}

impl SkillRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, category: Option<&str>) -> Result<Vec<Skill>, sqlx::Error> {
        sqlx::query_as::<_, Skill>(
            r#"
            SELECT id, name, category, created_at FROM skills
            WHERE $1::TEXT IS NULL OR LOWER(category) = LOWER($1)
            ORDER BY category, name
            "#,
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn create(&self, name: &str, category: &str) -> Result<Skill, sqlx::Error> {
        sqlx::query_as::<_, Skill>(
            r#"
            INSERT INTO skills (id, name, category)
            VALUES ($1, $2, $3)
            RETURNING id, name, category, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(category)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM skills WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_existing(&self, ids: &[Uuid]) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM skills WHERE id = ANY($1)")
            .bind(ids)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn for_user(&self, user_id: Uuid) -> Result<Vec<Skill>, sqlx::Error> {
        sqlx::query_as::<_, Skill>(
            r#"
            SELECT s.id, s.name, s.category, s.created_at
            FROM skills s
            JOIN user_skills us ON us.skill_id = s.id
            WHERE us.user_id = $1
            ORDER BY s.category, s.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn for_events(&self, event_ids: &[Uuid]) -> Result<Vec<OwnedSkill>, sqlx::Error> {
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, OwnedSkill>(
            r#"
            SELECT es.event_id AS owner_id, s.id, s.name, s.category
            FROM skills s
            JOIN event_skills es ON es.skill_id = s.id
            WHERE es.event_id = ANY($1)
            ORDER BY s.category, s.name
            "#,
        )
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn replace_for_user(
        conn: &mut PgConnection,
        user_id: Uuid,
        skill_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM user_skills WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            "INSERT INTO user_skills (user_id, skill_id) SELECT $1, UNNEST($2::UUID[])",
        )
        .bind(user_id)
        .bind(skill_ids)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn replace_for_event(
        conn: &mut PgConnection,
        event_id: Uuid,
        skill_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM event_skills WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            "INSERT INTO event_skills (event_id, skill_id) SELECT $1, UNNEST($2::UUID[])",
        )
        .bind(event_id)
        .bind(skill_ids)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
