use chrono::Utc;
use file_format::FileFormat;
use sqlx::PgPool;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::database::events::NewEvent;
use crate::database::{EventRepository, RegistrationRepository, SkillRepository};
use crate::models::event::{
    CreateEventRequest, Event, EventChanges, EventFilter, EventQuery, EventResponse, EventStatus,
    UpdateEventRequest,
};
use crate::models::skill::SkillResponse;
use crate::models::user::UserRole;
use crate::services::auth::AuthUser;
use crate::services::skills::SkillService;
use crate::utils::error::{AppError, AppResult};
use crate::utils::logging::{log_admin_action, log_event_action};
use crate::utils::pagination::{Page, PageParams, Paged};

/// Public URL prefix uploaded files are served under.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageKind {
    /// Identifies an image by its content rather than the name or content
    /// type the client sent.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match FileFormat::from_bytes(bytes) {
            FileFormat::PortableNetworkGraphics => Some(ImageKind::Png),
            FileFormat::JointPhotographicExpertsGroup => Some(ImageKind::Jpeg),
            FileFormat::GraphicsInterchangeFormat => Some(ImageKind::Gif),
            FileFormat::Webp => Some(ImageKind::Webp),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
        }
    }
}

#[derive(Clone)]
pub struct EventService {
    pool: PgPool,
    events: EventRepository,
    skills: SkillRepository,
    skill_service: SkillService,
    uploads: UploadConfig,
}

impl EventService {
    pub fn new(
        pool: PgPool,
        events: EventRepository,
        skills: SkillRepository,
        skill_service: SkillService,
        uploads: UploadConfig,
    ) -> Self {
        Self {
            pool,
            events,
            skills,
            skill_service,
            uploads,
        }
    }

    /// Public listing. Everyone except admins is limited to published
    /// events; deleted events are never listed here.
    pub async fn list(
        &self,
        actor: Option<&AuthUser>,
        query: EventQuery,
    ) -> AppResult<Paged<EventResponse>> {
        let is_admin = actor.map_or(false, AuthUser::is_admin);
        let page = page_of(&query);
        let filter = EventFilter {
            statuses: visible_statuses(is_admin, query.status),
            ..filter_from(query, false)
        };

        self.page(&filter, page).await
    }

    /// Admin listing with any status and optionally deleted events.
    pub async fn admin_list(&self, query: EventQuery) -> AppResult<Paged<EventResponse>> {
        let page = page_of(&query);
        let include_deleted = query.include_deleted;
        let filter = EventFilter {
            statuses: query.status.map(|s| vec![s]),
            ..filter_from(query, include_deleted)
        };

        self.page(&filter, page).await
    }

    /// Events organized by the caller, any status.
    pub async fn list_mine(
        &self,
        actor: &AuthUser,
        query: EventQuery,
    ) -> AppResult<Paged<EventResponse>> {
        actor.require_role(&[UserRole::Organizer, UserRole::Admin])?;

        let page = page_of(&query);
        let filter = EventFilter {
            statuses: query.status.map(|s| vec![s]),
            organizer_id: Some(actor.id),
            ..filter_from(query, false)
        };

        self.page(&filter, page).await
    }

    pub async fn get(&self, actor: Option<&AuthUser>, id: Uuid) -> AppResult<EventResponse> {
        let event = self.find_visible(actor, id).await?;
        let mut responses = self.to_responses(vec![event]).await?;
        responses
            .pop()
            .ok_or_else(|| AppError::internal("event response missing"))
    }

    pub async fn create(
        &self,
        actor: &AuthUser,
        request: CreateEventRequest,
    ) -> AppResult<EventResponse> {
        actor.require_role(&[UserRole::Organizer, UserRole::Admin])?;

        let status = request.status.unwrap_or(EventStatus::Draft);
        if !matches!(status, EventStatus::Draft | EventStatus::Published) {
            return Err(AppError::BusinessRule(
                "New events must be Draft or Published".to_string(),
            ));
        }
        if request.start_time <= Utc::now() {
            return Err(AppError::BusinessRule(
                "Event start time must be in the future".to_string(),
            ));
        }

        let skill_ids = match &request.skill_ids {
            Some(ids) => self.skill_service.resolve_ids(ids).await?,
            None => Vec::new(),
        };

        let mut tx = self.pool.begin().await?;
        let id = EventRepository::insert(
            &mut tx,
            NewEvent {
                title: request.title.trim(),
                description: request.description.trim(),
                location: request.location.trim(),
                start_time: request.start_time,
                duration_minutes: request.duration_minutes,
                capacity: request.capacity,
                status,
                organizer_id: actor.id,
            },
        )
        .await?;
        if !skill_ids.is_empty() {
            SkillRepository::replace_for_event(&mut tx, id, &skill_ids).await?;
        }
        tx.commit().await?;

        log_event_action(id, "create", actor.id);
        self.get(Some(actor), id).await
    }

    pub async fn update(
        &self,
        actor: &AuthUser,
        id: Uuid,
        request: UpdateEventRequest,
    ) -> AppResult<EventResponse> {
        let skill_ids = match &request.skill_ids {
            Some(ids) => Some(self.skill_service.resolve_ids(ids).await?),
            None => None,
        };

        let mut tx = self.pool.begin().await?;
        let current = EventRepository::lock(&mut tx, id)
            .await?
            .ok_or_else(|| event_not_found(id))?;
        if !actor.can_manage_event(current.organizer_id) {
            return Err(AppError::Forbidden(
                "Only the organizer or an administrator can edit this event".to_string(),
            ));
        }

        let existing = EventRepository::fetch(&mut tx, id)
            .await?
            .ok_or_else(|| event_not_found(id))?;

        let status = request.status.unwrap_or(current.status);
        if !current.status.can_transition_to(status) {
            return Err(AppError::BusinessRule(format!(
                "Cannot change event status from {} to {}",
                current.status.as_str(),
                status.as_str()
            )));
        }

        let occupied = RegistrationRepository::count_occupied(&mut tx, id).await?;
        let capacity = request.capacity.unwrap_or(current.capacity);
        if i64::from(capacity) < occupied {
            return Err(AppError::BusinessRule(format!(
                "Capacity cannot be lower than the {} registered volunteers",
                occupied
            )));
        }

        let changes = EventChanges {
            title: request
                .title
                .map(|t| t.trim().to_string())
                .unwrap_or(existing.title),
            description: request
                .description
                .map(|d| d.trim().to_string())
                .unwrap_or(existing.description),
            location: request
                .location
                .map(|l| l.trim().to_string())
                .unwrap_or(existing.location),
            start_time: request.start_time.unwrap_or(current.start_time),
            duration_minutes: request.duration_minutes.unwrap_or(existing.duration_minutes),
            capacity,
            status,
        };

        let moved_into_past = request
            .start_time
            .is_some_and(|start| start != current.start_time && start <= Utc::now());
        if moved_into_past {
            return Err(AppError::BusinessRule(
                "Event start time must be in the future".to_string(),
            ));
        }

        EventRepository::update(&mut tx, id, &changes).await?;
        if let Some(skill_ids) = &skill_ids {
            SkillRepository::replace_for_event(&mut tx, id, skill_ids).await?;
        }
        if status == EventStatus::Cancelled && current.status != EventStatus::Cancelled {
            let cancelled =
                RegistrationRepository::cancel_confirmed_for_event(&mut tx, id).await?;
            tracing::info!(
                event_id = %id,
                cancelled,
                "Cancelled registrations of cancelled event"
            );
        }
        tx.commit().await?;

        log_event_action(id, "update", actor.id);
        self.get(Some(actor), id).await
    }

    pub async fn delete(&self, actor: &AuthUser, id: Uuid) -> AppResult<()> {
        let event = self
            .events
            .find_by_id(id)
            .await?
            .ok_or_else(|| event_not_found(id))?;
        if !actor.can_manage_event(event.organizer_id) {
            return Err(AppError::Forbidden(
                "Only the organizer or an administrator can delete this event".to_string(),
            ));
        }

        if !self.events.soft_delete(id).await? {
            return Err(event_not_found(id));
        }

        log_event_action(id, "delete", actor.id);
        Ok(())
    }

    pub async fn restore(&self, actor: &AuthUser, id: Uuid) -> AppResult<EventResponse> {
        if !self.events.restore(id).await? {
            return match self.events.find_by_id_including_deleted(id).await? {
                Some(_) => Err(AppError::BusinessRule("Event is not deleted".to_string())),
                None => Err(event_not_found(id)),
            };
        }

        log_admin_action(actor.id, "restore_event", Some(id));
        self.get(Some(actor), id).await
    }

    /// Stores an uploaded image for the event and returns the updated
    /// event. The event row stays locked until the new url is committed;
    /// the previous file is removed best-effort afterwards.
    pub async fn set_image(
        &self,
        actor: &AuthUser,
        id: Uuid,
        bytes: &[u8],
    ) -> AppResult<EventResponse> {
        let mut tx = self.pool.begin().await?;
        let event = EventRepository::lock(&mut tx, id)
            .await?
            .ok_or_else(|| event_not_found(id))?;
        if !actor.can_manage_event(event.organizer_id) {
            return Err(AppError::Forbidden(
                "Only the organizer or an administrator can change this event".to_string(),
            ));
        }

        if bytes.is_empty() {
            return Err(AppError::ValidationError("Uploaded file is empty".to_string()));
        }
        if bytes.len() > self.uploads.max_bytes {
            return Err(AppError::ValidationError(format!(
                "Image must be at most {} bytes",
                self.uploads.max_bytes
            )));
        }
        let kind = ImageKind::sniff(bytes).ok_or_else(|| {
            AppError::ValidationError(
                "Only PNG, JPEG, GIF and WebP images are accepted".to_string(),
            )
        })?;

        let file_name = format!("{}.{}", Uuid::new_v4(), kind.extension());
        let dir = Path::new(&self.uploads.dir).join("events");
        tokio::fs::create_dir_all(&dir).await.map_err(AppError::internal)?;
        let path = dir.join(&file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(AppError::internal)?;

        let url = format!("{}/events/{}", UPLOADS_URL_PREFIX, file_name);
        let stored = match EventRepository::set_image(&mut tx, id, &url).await {
            Ok(true) => tx.commit().await.map_err(AppError::from),
            Ok(false) => Err(event_not_found(id)),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = stored {
            remove_image(&path).await;
            return Err(e);
        }

        if let Some(previous) = event.image_url.as_deref().and_then(|p| self.local_path(p)) {
            remove_image(&previous).await;
        }

        log_event_action(id, "set_image", actor.id);
        self.get(Some(actor), id).await
    }

    /// Loads an event the caller is allowed to see. Drafts look missing
    /// to callers who cannot manage them.
    pub async fn find_visible(&self, actor: Option<&AuthUser>, id: Uuid) -> AppResult<Event> {
        let event = self
            .events
            .find_by_id(id)
            .await?
            .ok_or_else(|| event_not_found(id))?;

        let can_manage = actor.map_or(false, |a| a.can_manage_event(event.organizer_id));
        if event.status == EventStatus::Draft && !can_manage {
            return Err(event_not_found(id));
        }

        Ok(event)
    }

    /// Maps an uploaded file url back to its location on disk.
    fn local_path(&self, url: &str) -> Option<PathBuf> {
        let relative = url.strip_prefix(UPLOADS_URL_PREFIX)?.trim_start_matches('/');
        if relative.is_empty() || relative.split('/').any(|part| part == ".." || part.is_empty()) {
            return None;
        }
        Some(Path::new(&self.uploads.dir).join(relative))
    }

    async fn page(&self, filter: &EventFilter, page: Page) -> AppResult<Paged<EventResponse>> {
        let (events, total) = self.events.list(filter, page).await?;
        let items = self.to_responses(events).await?;
        Ok(Paged::new(items, page, total))
    }

    async fn to_responses(&self, events: Vec<Event>) -> AppResult<Vec<EventResponse>> {
        let ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
        let mut skills_by_event: HashMap<Uuid, Vec<SkillResponse>> = HashMap::new();
        for skill in self.skills.for_events(&ids).await? {
            skills_by_event
                .entry(skill.owner_id)
                .or_default()
                .push(skill.into());
        }

        Ok(events
            .into_iter()
            .map(|event| {
                let skills = skills_by_event.remove(&event.id).unwrap_or_default();
                EventResponse::new(event, skills)
            })
            .collect())
    }
}

async fn remove_image(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove event image");
    }
}

fn event_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Event {} not found", id))
}

fn page_of(query: &EventQuery) -> Page {
    PageParams {
        page: query.page,
        page_size: query.page_size,
    }
    .clamp()
}

fn filter_from(query: EventQuery, include_deleted: bool) -> EventFilter {
    EventFilter {
        search: query.search,
        location: query.location,
        statuses: None,
        from: query.from,
        to: query.to,
        skill_id: query.skill_id,
        organizer_id: None,
        include_deleted,
    }
}

/// Statuses a caller may list; `None` means any status. An empty list
/// matches nothing.
fn visible_statuses(is_admin: bool, requested: Option<EventStatus>) -> Option<Vec<EventStatus>> {
    match (is_admin, requested) {
        (true, requested) => requested.map(|status| vec![status]),
        (false, None) | (false, Some(EventStatus::Published)) => Some(vec![EventStatus::Published]),
        (false, Some(_)) => Some(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] =
        b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR\x00\x00\x00\x01\x00\x00\x00\x01";

    #[test]
    fn test_sniff_images() {
        assert_eq!(ImageKind::sniff(PNG_HEADER), Some(ImageKind::Png));
        assert_eq!(ImageKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::sniff(b"GIF89a...."), Some(ImageKind::Gif));
        assert_eq!(ImageKind::sniff(b"RIFF\x00\x00\x00\x00WEBPVP8 "), Some(ImageKind::Webp));
        assert_eq!(ImageKind::sniff(b"<svg></svg>"), None);
        assert_eq!(ImageKind::sniff(b"%PDF-1.7\n"), None);
        assert_eq!(ImageKind::sniff(b""), None);
    }

    #[test]
    fn test_non_admins_only_see_published() {
        assert_eq!(visible_statuses(false, None), Some(vec![EventStatus::Published]));
        assert_eq!(
            visible_statuses(false, Some(EventStatus::Published)),
            Some(vec![EventStatus::Published])
        );
        assert_eq!(visible_statuses(false, Some(EventStatus::Draft)), Some(vec![]));
    }

    #[test]
    fn test_admins_see_requested_status() {
        assert_eq!(
            visible_statuses(true, Some(EventStatus::Cancelled)),
            Some(vec![EventStatus::Cancelled])
        );
        assert_eq!(visible_statuses(true, None), None);
    }

    fn service_with_upload_dir(dir: &str) -> UploadConfig {
        UploadConfig {
            dir: dir.to_string(),
            max_bytes: 1024,
        }
    }

    #[tokio::test]
    async fn test_local_path_rejects_traversal() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let skill_service = SkillService::new(SkillRepository::new(pool.clone()));
        let service = EventService::new(
            pool.clone(),
            EventRepository::new(pool.clone()),
            SkillRepository::new(pool),
            skill_service,
            service_with_upload_dir("data/uploads"),
        );

        assert_eq!(
            service.local_path("/uploads/events/a.png"),
            Some(Path::new("data/uploads").join("events/a.png"))
        );
        assert_eq!(service.local_path("/uploads/../secret"), None);
        assert_eq!(service.local_path("https://cdn.example.com/a.png"), None);
        assert_eq!(service.local_path("/uploads/"), None);
    }
}
