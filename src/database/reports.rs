use chrono::Utc;
use sqlx::PgPool;

use crate::models::report::{EventTotals, RegistrationTotals, SummaryReport, UserTotals};

#[derive(Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Totals over rows that are not soft-deleted. Registrations count
    /// only when both their event and volunteer are still active.
    pub async fn summary(&self) -> Result<SummaryReport, sqlx::Error> {
        let users = sqlx::query_as::<_, UserTotals>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE role = 'volunteer') AS volunteers,
                   COUNT(*) FILTER (WHERE role = 'organizer') AS organizers,
                   COUNT(*) FILTER (WHERE role = 'admin') AS admins
            FROM users
            WHERE is_deleted = FALSE
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let events = sqlx::query_as::<_, EventTotals>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'draft') AS draft,
                   COUNT(*) FILTER (WHERE status = 'published') AS published,
                   COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled,
                   COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                   COUNT(*) FILTER (WHERE status = 'published' AND start_time > $1) AS upcoming
            FROM events
            WHERE is_deleted = FALSE
            "#,
        )
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        let registrations = sqlx::query_as::<_, RegistrationTotals>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE r.status = 'confirmed') AS confirmed,
                   COUNT(*) FILTER (WHERE r.status = 'cancelled') AS cancelled,
                   COUNT(*) FILTER (WHERE r.status = 'attended') AS attended,
                   COUNT(*) FILTER (WHERE r.status = 'no_show') AS no_show
            FROM registrations r
            JOIN events e ON e.id = r.event_id AND e.is_deleted = FALSE
            JOIN users u ON u.id = r.user_id AND u.is_deleted = FALSE
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(SummaryReport {
            users,
            events,
            registrations,
        })
    }
}
