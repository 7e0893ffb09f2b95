use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::DatabaseConfig;

pub mod events;
pub mod registrations;
pub mod reports;
pub mod skills;
pub mod users;

pub use events::EventRepository;
pub use registrations::RegistrationRepository;
pub use reports::ReportRepository;
pub use skills::SkillRepository;
pub use users::UserRepository;

pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.url)
        .await?;

    tracing::info!("Successfully connected to database");
    Ok(pool)
}

pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!().run(pool).await?;
    tracing::info!("Migrations run successfully");
    Ok(())
}

pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Escapes `LIKE` wildcards and wraps the term for a contains match.
pub(crate) fn contains_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern(" park "), "%park%");
        assert_eq!(contains_pattern("100%_sure"), "%100\\%\\_sure%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }
}
