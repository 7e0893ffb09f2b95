use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::skill::SkillResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "snake_case")]
#[serde(rename_all = "PascalCase")]
pub enum EventStatus {
    Draft,
    Published,
    Cancelled,
    Completed,
}

impl EventStatus {
    /// Cancelled and completed events are final.
    pub fn can_transition_to(self, next: EventStatus) -> bool {
        use EventStatus::*;

        match (self, next) {
            (a, b) if a == b => true,
            (Draft, Published) | (Draft, Cancelled) => true,
            (Published, Draft) | (Published, Cancelled) | (Published, Completed) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "Draft",
            EventStatus::Published => "Published",
            EventStatus::Cancelled => "Cancelled",
            EventStatus::Completed => "Completed",
        }
    }
}

/// Event row joined with its organizer name and occupied spot count.
#[derive(Debug, Clone, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub capacity: i32,
    pub status: EventStatus,
    pub organizer_id: Uuid,
    pub organizer_name: String,
    pub image_url: Option<String>,
    pub registered_count: i64,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn available_spots(&self) -> i64 {
        (i64::from(self.capacity) - self.registered_count).max(0)
    }

}

/// Columns checked by writers while the event row is locked.
#[derive(Debug, Clone, FromRow)]
pub struct EventLock {
    pub start_time: DateTime<Utc>,
    pub capacity: i32,
    pub status: EventStatus,
    pub organizer_id: Uuid,
    pub image_url: Option<String>,
}

impl EventLock {
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[validate(
        custom = "super::not_blank",
        length(min = 1, max = 200, message = "Title must be 1 to 200 characters")
    )]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: String,
    #[validate(
        custom = "super::not_blank",
        length(min = 1, max = 300, message = "Location must be 1 to 300 characters")
    )]
    pub location: String,
    pub start_time: DateTime<Utc>,
    #[validate(range(min = 1, max = 10080, message = "Duration must be 1 to 10080 minutes"))]
    pub duration_minutes: i32,
    #[validate(range(min = 1, max = 100000, message = "Capacity must be 1 to 100000"))]
    pub capacity: i32,
    pub status: Option<EventStatus>,
    pub skill_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[validate(
        custom = "super::not_blank",
        length(min = 1, max = 200, message = "Title must be 1 to 200 characters")
    )]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,
    #[validate(
        custom = "super::not_blank",
        length(min = 1, max = 300, message = "Location must be 1 to 300 characters")
    )]
    pub location: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 10080, message = "Duration must be 1 to 10080 minutes"))]
    pub duration_minutes: Option<i32>,
    #[validate(range(min = 1, max = 100000, message = "Capacity must be 1 to 100000"))]
    pub capacity: Option<i32>,
    pub status: Option<EventStatus>,
    pub skill_ids: Option<Vec<Uuid>>,
}

/// Fully resolved column values written by an update.
#[derive(Debug, Clone)]
pub struct EventChanges {
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub capacity: i32,
    pub status: EventStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search: Option<String>,
    pub location: Option<String>,
    pub status: Option<EventStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub skill_id: Option<Uuid>,
    #[serde(default)]
    pub include_deleted: bool,
}

/// Filter handed to the repository once visibility rules are applied.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub search: Option<String>,
    pub location: Option<String>,
    pub statuses: Option<Vec<EventStatus>>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub skill_id: Option<Uuid>,
    pub organizer_id: Option<Uuid>,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    pub registered_count: i64,
    pub available_spots: i64,
    pub status: EventStatus,
    pub organizer_id: Uuid,
    pub organizer_name: String,
    pub image_url: Option<String>,
    pub skills: Vec<SkillResponse>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventResponse {
    pub fn new(event: Event, skills: Vec<SkillResponse>) -> Self {
        Self {
            end_time: event.end_time(),
            available_spots: event.available_spots(),
            id: event.id,
            title: event.title,
            description: event.description,
            location: event.location,
            start_time: event.start_time,
            duration_minutes: event.duration_minutes,
            capacity: event.capacity,
            registered_count: event.registered_count,
            status: event.status,
            organizer_id: event.organizer_id,
            organizer_name: event.organizer_name,
            image_url: event.image_url,
            skills,
            is_deleted: event.is_deleted,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(capacity: i32, registered_count: i64) -> Event {
        let start = Utc.with_ymd_and_hms(2030, 5, 1, 9, 0, 0).unwrap();
        Event {
            id: Uuid::new_v4(),
            title: "Beach cleanup".to_string(),
            description: String::new(),
            location: "North beach".to_string(),
            start_time: start,
            duration_minutes: 90,
            capacity,
            status: EventStatus::Published,
            organizer_id: Uuid::new_v4(),
            organizer_name: "Org".to_string(),
            image_url: None,
            registered_count,
            is_deleted: false,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_end_time_adds_duration() {
        let e = event(10, 0);
        assert_eq!(e.end_time(), Utc.with_ymd_and_hms(2030, 5, 1, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_available_spots_never_negative() {
        assert_eq!(event(10, 3).available_spots(), 7);
        assert_eq!(event(10, 10).available_spots(), 0);
        assert_eq!(event(5, 8).available_spots(), 0);
    }

    #[test]
    fn test_status_transitions() {
        use EventStatus::*;

        assert!(Draft.can_transition_to(Published));
        assert!(Published.can_transition_to(Completed));
        assert!(Published.can_transition_to(Draft));
        assert!(!Draft.can_transition_to(Completed));
        assert!(!Cancelled.can_transition_to(Published));
        assert!(!Completed.can_transition_to(Draft));
        assert!(Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn test_blank_title_and_location_are_rejected() {
        let request = CreateEventRequest {
            title: "  ".to_string(),
            description: String::new(),
            location: "\n".to_string(),
            start_time: Utc.with_ymd_and_hms(2030, 5, 1, 9, 0, 0).unwrap(),
            duration_minutes: 60,
            capacity: 5,
            status: None,
            skill_ids: None,
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("location"));

        let update = UpdateEventRequest {
            title: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
        assert!(UpdateEventRequest::default().validate().is_ok());
    }

    #[test]
    fn test_response_hides_deleted_flag_when_false() {
        let json = serde_json::to_value(EventResponse::new(event(4, 1), vec![])).unwrap();
        assert!(json.get("isDeleted").is_none());
        assert_eq!(json["availableSpots"], 3);
        assert_eq!(json["status"], "Published");
    }
}
