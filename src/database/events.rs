use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::contains_pattern;
use crate::models::event::{Event, EventChanges, EventFilter, EventLock, EventStatus};
use crate::utils::pagination::Page;

const EVENT_SELECT: &str = r#"
    SELECT e.id, e.title, e.description, e.location, e.start_time, e.duration_minutes,
           e.capacity, e.status, e.organizer_id, u.name AS organizer_name, e.image_url,
           (SELECT COUNT(*) FROM registrations r
             JOIN users ru ON ru.id = r.user_id AND ru.is_deleted = FALSE
             WHERE r.event_id = e.id AND r.status <> 'cancelled') AS registered_count,
           e.is_deleted, e.created_at, e.updated_at
    FROM events e
    JOIN users u ON u.id = e.organizer_id
    WHERE TRUE"#;

/// Column values for a new event.
#[derive(Debug, Clone)]
pub struct NewEvent<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub location: &'a str,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub capacity: i32,
    pub status: EventStatus,
    pub organizer_id: Uuid,
}

#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>, sqlx::Error> {
        Self::fetch(&mut *self.pool.acquire().await?, id).await
    }

    /// Reads the active event through the given connection, e.g. the
    /// transaction that already holds its row lock.
    pub async fn fetch(conn: &mut PgConnection, id: Uuid) -> Result<Option<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            "{EVENT_SELECT} AND e.id = $1 AND e.is_deleted = FALSE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    pub async fn find_by_id_including_deleted(
        &self,
        id: Uuid,
    ) -> Result<Option<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!("{EVENT_SELECT} AND e.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list(
        &self,
        filter: &EventFilter,
        page: Page,
    ) -> Result<(Vec<Event>, i64), sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events e WHERE TRUE");
        push_filters(&mut count, filter);
        let (total,): (i64,) = count.build_query_as().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(EVENT_SELECT);
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY e.start_time ASC, e.id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let events = select.build_query_as::<Event>().fetch_all(&self.pool).await?;
        Ok((events, total))
    }

    /// Every non-deleted event, for exports.
    pub async fn all(&self) -> Result<Vec<Event>, sqlx::Error> {
        sqlx::query_as::<_, Event>(&format!(
            "{EVENT_SELECT} AND e.is_deleted = FALSE ORDER BY e.start_time ASC, e.id ASC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    pub async fn insert(
        conn: &mut PgConnection,
        event: NewEvent<'_>,
    ) -> Result<Uuid, sqlx::Error> {
        let now = Utc::now();
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO events (id, title, description, location, start_time, duration_minutes,
                                capacity, status, organizer_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event.title)
        .bind(event.description)
        .bind(event.location)
        .bind(event.start_time)
        .bind(event.duration_minutes)
        .bind(event.capacity)
        .bind(event.status)
        .bind(event.organizer_id)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(id)
    }

    /// Locks the event row for the rest of the transaction.
    pub async fn lock(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<EventLock>, sqlx::Error> {
        sqlx::query_as::<_, EventLock>(
            r#"
            SELECT start_time, capacity, status, organizer_id, image_url
            FROM events
            WHERE id = $1 AND is_deleted = FALSE
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        changes: &EventChanges,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE events
            SET title = $2, description = $3, location = $4, start_time = $5,
                duration_minutes = $6, capacity = $7, status = $8, updated_at = $9
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(&changes.location)
        .bind(changes.start_time)
        .bind(changes.duration_minutes)
        .bind(changes.capacity)
        .bind(changes.status)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(())
    }

    pub async fn set_image(
        conn: &mut PgConnection,
        id: Uuid,
        image_url: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE events SET image_url = $2, updated_at = $3
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .bind(image_url)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn soft_delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE events SET is_deleted = TRUE, deleted_at = $2, updated_at = $2
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn restore(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE events SET is_deleted = FALSE, deleted_at = NULL, updated_at = $2
            WHERE id = $1 AND is_deleted = TRUE
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &EventFilter) {
    if !filter.include_deleted {
        qb.push(" AND e.is_deleted = FALSE");
    }
    if let Some(statuses) = &filter.statuses {
        if statuses.is_empty() {
            qb.push(" AND FALSE");
        } else {
            qb.push(" AND e.status IN (");
            let mut separated = qb.separated(", ");
            for status in statuses {
                separated.push_bind(*status);
            }
            separated.push_unseparated(")");
        }
    }
    if let Some(organizer_id) = filter.organizer_id {
        qb.push(" AND e.organizer_id = ").push_bind(organizer_id);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = contains_pattern(search);
        qb.push(" AND (e.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR e.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(location) = filter.location.as_deref().filter(|s| !s.trim().is_empty()) {
        qb.push(" AND e.location ILIKE ")
            .push_bind(contains_pattern(location));
    }
    if let Some(from) = filter.from {
        qb.push(" AND e.start_time >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND e.start_time <= ").push_bind(to);
    }
    if let Some(skill_id) = filter.skill_id {
        qb.push(" AND EXISTS (SELECT 1 FROM event_skills es")
            .push(" WHERE es.event_id = e.id AND es.skill_id = ")
            .push_bind(skill_id)
            .push(")");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_for(filter: &EventFilter) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM events e WHERE TRUE");
        push_filters(&mut qb, filter);
        qb.sql().to_string()
    }

    #[test]
    fn test_default_filter_excludes_deleted() {
        assert_eq!(
            sql_for(&EventFilter::default()),
            "SELECT 1 FROM events e WHERE TRUE AND e.is_deleted = FALSE"
        );
    }

    #[test]
    fn test_status_list() {
        let filter = EventFilter {
            statuses: Some(vec![EventStatus::Published, EventStatus::Completed]),
            include_deleted: true,
            ..Default::default()
        };
        assert_eq!(
            sql_for(&filter),
            "SELECT 1 FROM events e WHERE TRUE AND e.status IN ($1, $2)"
        );
    }

    #[test]
    fn test_empty_status_list_matches_nothing() {
        let filter = EventFilter {
            statuses: Some(vec![]),
            include_deleted: true,
            ..Default::default()
        };
        assert!(sql_for(&filter).ends_with("AND FALSE"));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let filter = EventFilter {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(!sql_for(&filter).contains("ILIKE"));
    }

    #[test]
    fn test_skill_filter_uses_exists() {
        let filter = EventFilter {
            skill_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(sql_for(&filter).contains("EXISTS (SELECT 1 FROM event_skills es"));
    }
}
