use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::event::EventStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "registration_status", rename_all = "snake_case")]
#[serde(rename_all = "PascalCase")]
pub enum RegistrationStatus {
    Confirmed,
    Cancelled,
    Attended,
    NoShow,
}

impl RegistrationStatus {
    /// Every status except `Cancelled` holds one of the event's spots.
    pub fn occupies_spot(self) -> bool {
        !matches!(self, RegistrationStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Confirmed => "Confirmed",
            RegistrationStatus::Cancelled => "Cancelled",
            RegistrationStatus::Attended => "Attended",
            RegistrationStatus::NoShow => "NoShow",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Registration {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: RegistrationStatus,
    pub notes: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration joined with the event and volunteer it links.
#[derive(Debug, Clone, FromRow)]
pub struct RegistrationDetail {
    pub id: Uuid,
    pub event_id: Uuid,
    pub event_title: String,
    pub event_start_time: DateTime<Utc>,
    pub event_status: EventStatus,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub status: RegistrationStatus,
    pub notes: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRegistrationRequest {
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRegistrationStatusRequest {
    pub status: RegistrationStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub event_title: String,
    pub event_start_time: DateTime<Utc>,
    pub event_status: EventStatus,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub status: RegistrationStatus,
    pub notes: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RegistrationDetail> for RegistrationResponse {
    fn from(detail: RegistrationDetail) -> Self {
        Self {
            id: detail.id,
            event_id: detail.event_id,
            event_title: detail.event_title,
            event_start_time: detail.event_start_time,
            event_status: detail.event_status,
            user_id: detail.user_id,
            user_name: detail.user_name,
            user_email: detail.user_email,
            status: detail.status,
            notes: detail.notes,
            registered_at: detail.registered_at,
            updated_at: detail.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_cancelled_frees_a_spot() {
        assert!(RegistrationStatus::Confirmed.occupies_spot());
        assert!(RegistrationStatus::Attended.occupies_spot());
        assert!(RegistrationStatus::NoShow.occupies_spot());
        assert!(!RegistrationStatus::Cancelled.occupies_spot());
    }

    #[test]
    fn test_status_json_names() {
        assert_eq!(serde_json::to_value(RegistrationStatus::NoShow).unwrap(), "NoShow");
    }
}
