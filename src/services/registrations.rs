//! Volunteer sign-ups.
//!
//! Every path that can take a spot runs in one transaction holding the
//! event row lock, so two concurrent sign-ups cannot both see the last
//! free spot.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{EventRepository, RegistrationRepository};
use crate::models::event::{EventLock, EventStatus};
use crate::models::registration::{
    CreateRegistrationRequest, RegistrationResponse, RegistrationStatus,
    UpdateRegistrationStatusRequest,
};
use crate::services::auth::AuthUser;
use crate::utils::error::{AppError, AppResult};
use crate::utils::logging::log_registration_action;
use crate::utils::pagination::{PageParams, Paged};

#[derive(Clone)]
pub struct RegistrationService {
    pool: PgPool,
    events: EventRepository,
    registrations: RegistrationRepository,
}

/// Checks that a new spot may be taken on the locked event.
fn check_can_take_spot(
    event: &EventLock,
    occupied: i64,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if event.status != EventStatus::Published {
        return Err(AppError::BusinessRule(
            "Event is not open for registration".to_string(),
        ));
    }
    if event.has_started(now) {
        return Err(AppError::BusinessRule("Event has already started".to_string()));
    }
    if occupied >= i64::from(event.capacity) {
        return Err(AppError::BusinessRule("Event is full".to_string()));
    }
    Ok(())
}

impl RegistrationService {
    pub fn new(
        pool: PgPool,
        events: EventRepository,
        registrations: RegistrationRepository,
    ) -> Self {
        Self {
            pool,
            events,
            registrations,
        }
    }

    pub async fn register(
        &self,
        actor: &AuthUser,
        event_id: Uuid,
        request: CreateRegistrationRequest,
    ) -> AppResult<RegistrationResponse> {
        let notes = request
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        let mut tx = self.pool.begin().await?;
        let event = EventRepository::lock(&mut tx, event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

        let existing = RegistrationRepository::find_for_update(&mut tx, event_id, actor.id).await?;
        if existing.as_ref().is_some_and(|r| r.status.occupies_spot()) {
            return Err(AppError::Conflict(
                "You are already registered for this event".to_string(),
            ));
        }

        let occupied = RegistrationRepository::count_occupied(&mut tx, event_id).await?;
        check_can_take_spot(&event, occupied, Utc::now())?;

        let registration = match existing {
            Some(cancelled) => {
                RegistrationRepository::reactivate(&mut tx, cancelled.id, notes).await?
            }
            None => RegistrationRepository::insert(&mut tx, event_id, actor.id, notes)
                .await
                .map_err(|e| match AppError::from(e) {
                    AppError::Conflict(_) => AppError::Conflict(
                        "You are already registered for this event".to_string(),
                    ),
                    other => other,
                })?,
        };
        tx.commit().await?;

        log_registration_action(event_id, actor.id, "register");
        self.response(registration.id).await
    }

    /// Cancels the caller's own registration.
    pub async fn cancel(&self, actor: &AuthUser, event_id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let event = EventRepository::lock(&mut tx, event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;

        let registration = RegistrationRepository::find_for_update(&mut tx, event_id, actor.id)
            .await?
            .filter(|r| r.status == RegistrationStatus::Confirmed)
            .ok_or_else(|| {
                AppError::NotFound("You have no active registration for this event".to_string())
            })?;

        if event.start_time <= Utc::now() {
            return Err(AppError::BusinessRule(
                "Registrations cannot be cancelled after the event has started".to_string(),
            ));
        }

        RegistrationRepository::set_status(&mut tx, registration.id, RegistrationStatus::Cancelled)
            .await?;
        tx.commit().await?;

        log_registration_action(event_id, actor.id, "cancel");
        Ok(())
    }

    /// Status change by the event's organizer or an admin. Moving a
    /// cancelled registration back to an occupying status needs a free spot.
    pub async fn update_status(
        &self,
        actor: &AuthUser,
        registration_id: Uuid,
        request: UpdateRegistrationStatusRequest,
    ) -> AppResult<RegistrationResponse> {
        let not_found =
            || AppError::NotFound(format!("Registration {} not found", registration_id));

        let event_id = self
            .registrations
            .find_by_id(registration_id)
            .await?
            .ok_or_else(not_found)?
            .event_id;

        let mut tx = self.pool.begin().await?;
        let event = EventRepository::lock(&mut tx, event_id)
            .await?
            .ok_or_else(not_found)?;
        if !actor.can_manage_event(event.organizer_id) {
            return Err(AppError::Forbidden(
                "Only the organizer or an administrator can manage registrations".to_string(),
            ));
        }

        let registration = RegistrationRepository::find_by_id_for_update(&mut tx, registration_id)
            .await?
            .ok_or_else(not_found)?;

        if !registration.status.occupies_spot() && request.status.occupies_spot() {
            let occupied = RegistrationRepository::count_occupied(&mut tx, event_id).await?;
            if occupied >= i64::from(event.capacity) {
                return Err(AppError::BusinessRule("Event is full".to_string()));
            }
        }

        RegistrationRepository::set_status(&mut tx, registration_id, request.status).await?;
        tx.commit().await?;

        log_registration_action(event_id, registration.user_id, request.status.as_str());
        self.response(registration_id).await
    }

    pub async fn list_mine(
        &self,
        actor: &AuthUser,
        params: PageParams,
    ) -> AppResult<Paged<RegistrationResponse>> {
        let page = params.clamp();
        let (items, total) = self.registrations.list_for_user(actor.id, page).await?;
        Ok(Paged::new(items, page, total).map(RegistrationResponse::from))
    }

    pub async fn list_for_event(
        &self,
        actor: &AuthUser,
        event_id: Uuid,
        params: PageParams,
    ) -> AppResult<Paged<RegistrationResponse>> {
        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))?;
        if !actor.can_manage_event(event.organizer_id) {
            return Err(AppError::Forbidden(
                "Only the organizer or an administrator can view registrations".to_string(),
            ));
        }

        let page = params.clamp();
        let (items, total) = self.registrations.list_for_event(event_id, page).await?;
        Ok(Paged::new(items, page, total).map(RegistrationResponse::from))
    }

    async fn response(&self, id: Uuid) -> AppResult<RegistrationResponse> {
        self.registrations
            .detail(id)
            .await?
            .map(RegistrationResponse::from)
            .ok_or_else(|| AppError::NotFound(format!("Registration {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event(status: EventStatus, starts_in: Duration, capacity: i32) -> EventLock {
        EventLock {
            start_time: Utc::now() + starts_in,
            capacity,
            status,
            organizer_id: Uuid::new_v4(),
            image_url: None,
        }
    }

    #[test]
    fn test_open_event_with_room_accepts() {
        let e = event(EventStatus::Published, Duration::days(1), 3);
        assert!(check_can_take_spot(&e, 2, Utc::now()).is_ok());
    }

    #[test]
    fn test_full_event_rejects() {
        let e = event(EventStatus::Published, Duration::days(1), 3);
        let err = check_can_take_spot(&e, 3, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(ref m) if m == "Event is full"));
    }

    #[test]
    fn test_unpublished_event_rejects() {
        for status in [EventStatus::Draft, EventStatus::Cancelled, EventStatus::Completed] {
            let e = event(status, Duration::days(1), 10);
            assert!(check_can_take_spot(&e, 0, Utc::now()).is_err());
        }
    }

    #[test]
    fn test_started_event_rejects() {
        let e = event(EventStatus::Published, -Duration::minutes(5), 10);
        let err = check_can_take_spot(&e, 0, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }
}
