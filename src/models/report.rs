use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub users: UserTotals,
    pub events: EventTotals,
    pub registrations: RegistrationTotals,
}

#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserTotals {
    pub total: i64,
    pub volunteers: i64,
    pub organizers: i64,
    pub admins: i64,
}

#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventTotals {
    pub total: i64,
    pub draft: i64,
    pub published: i64,
    pub cancelled: i64,
    pub completed: i64,
    pub upcoming: i64,
}

#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationTotals {
    pub total: i64,
    pub confirmed: i64,
    pub cancelled: i64,
    pub attended: i64,
    pub no_show: i64,
}
