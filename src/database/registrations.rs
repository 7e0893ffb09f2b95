use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::registration::{Registration, RegistrationDetail, RegistrationStatus};
use crate::utils::pagination::Page;

const REGISTRATION_COLUMNS: &str =
    "id, event_id, user_id, status, notes, registered_at, updated_at";

const DETAIL_SELECT: &str = r#"
    SELECT r.id, r.event_id, e.title AS event_title, e.start_time AS event_start_time,
           e.status AS event_status, r.user_id, u.name AS user_name, u.email AS user_email,
           r.status, r.notes, r.registered_at, r.updated_at
    FROM registrations r
    JOIN events e ON e.id = r.event_id
    JOIN users u ON u.id = r.user_id"#;

#[derive(Clone)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Registration>, sqlx::Error> {
        sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn detail(&self, id: Uuid) -> Result<Option<RegistrationDetail>, sqlx::Error> {
        sqlx::query_as::<_, RegistrationDetail>(&format!("{DETAIL_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Registrations of a volunteer on events that are not soft-deleted.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> Result<(Vec<RegistrationDetail>, i64), sqlx::Error> {
        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM registrations r
            JOIN events e ON e.id = r.event_id
            WHERE r.user_id = $1 AND e.is_deleted = FALSE
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, RegistrationDetail>(&format!(
            r#"{DETAIL_SELECT}
            WHERE r.user_id = $1 AND e.is_deleted = FALSE
            ORDER BY e.start_time DESC, r.id
            LIMIT $2 OFFSET $3"#
        ))
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }

    /// Registrations of active volunteers for one event.
    pub async fn list_for_event(
        &self,
        event_id: Uuid,
        page: Page,
    ) -> Result<(Vec<RegistrationDetail>, i64), sqlx::Error> {
        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM registrations r
            JOIN users u ON u.id = r.user_id
            WHERE r.event_id = $1 AND u.is_deleted = FALSE
            "#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, RegistrationDetail>(&format!(
            r#"{DETAIL_SELECT}
            WHERE r.event_id = $1 AND u.is_deleted = FALSE
            ORDER BY r.registered_at ASC, r.id
            LIMIT $2 OFFSET $3"#
        ))
        .bind(event_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }

    pub async fn all_for_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<RegistrationDetail>, sqlx::Error> {
        sqlx::query_as::<_, RegistrationDetail>(&format!(
            r#"{DETAIL_SELECT}
            WHERE r.event_id = $1 AND u.is_deleted = FALSE
            ORDER BY r.registered_at ASC, r.id"#
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn find_for_update(
        conn: &mut PgConnection,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Registration>, sqlx::Error> {
        sqlx::query_as::<_, Registration>(&format!(
            r#"
            SELECT {REGISTRATION_COLUMNS} FROM registrations
            WHERE event_id = $1 AND user_id = $2
            FOR UPDATE
            "#
        ))
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await
    }

    pub async fn find_by_id_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Registration>, sqlx::Error> {
        sqlx::query_as::<_, Registration>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Spots held on an event. Registrations of deleted accounts do not
    /// count.
    pub async fn count_occupied(
        conn: &mut PgConnection,
        event_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM registrations r
            JOIN users u ON u.id = r.user_id AND u.is_deleted = FALSE
            WHERE r.event_id = $1 AND r.status <> 'cancelled'
            "#,
        )
        .bind(event_id)
        .fetch_one(conn)
        .await?;

        Ok(count)
    }

    pub async fn insert(
        conn: &mut PgConnection,
        event_id: Uuid,
        user_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Registration, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Registration>(&format!(
            r#"
            INSERT INTO registrations
                (id, event_id, user_id, status, notes, registered_at, updated_at)
            VALUES ($1, $2, $3, 'confirmed', $4, $5, $5)
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(event_id)
        .bind(user_id)
        .bind(notes)
        .bind(now)
        .fetch_one(conn)
        .await
    }

    /// Turns a cancelled registration back into a confirmed one.
    pub async fn reactivate(
        conn: &mut PgConnection,
        id: Uuid,
        notes: Option<&str>,
    ) -> Result<Registration, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Registration>(&format!(
            r#"
            UPDATE registrations
            SET status = 'confirmed', notes = $2, registered_at = $3, updated_at = $3
            WHERE id = $1
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(notes)
        .bind(now)
        .fetch_one(conn)
        .await
    }

    pub async fn set_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: RegistrationStatus,
    ) -> Result<Registration, sqlx::Error> {
        sqlx::query_as::<_, Registration>(&format!(
            r#"
            UPDATE registrations SET status = $2, updated_at = $3
            WHERE id = $1
            RETURNING {REGISTRATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_one(conn)
        .await
    }

    /// Cancels every confirmed registration of an event.
    pub async fn cancel_confirmed_for_event(
        conn: &mut PgConnection,
        event_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE registrations SET status = 'cancelled', updated_at = $2
            WHERE event_id = $1 AND status = 'confirmed'
            "#,
        )
        .bind(event_id)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Cancels a user's confirmed registrations on events that have not
    /// started yet.
    pub async fn cancel_upcoming_for_user(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE registrations r SET status = 'cancelled', updated_at = $2
            FROM events e
            WHERE e.id = r.event_id AND r.user_id = $1
              AND r.status = 'confirmed' AND e.start_time > $2
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }
}
