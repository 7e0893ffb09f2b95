//! Tracing setup and structured action logging.

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::LoggingConfig;

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    info!(level = %config.level, json = config.json, "Logging initialized");
}

pub fn log_auth_event(user_id: Uuid, action: &str) {
    info!(user_id = %user_id, action = action, "Auth event");
}

pub fn log_event_action(event_id: Uuid, action: &str, user_id: Uuid) {
    info!(
        event_id = %event_id,
        action = action,
        user_id = %user_id,
        "Event action performed"
    );
}

pub fn log_registration_action(event_id: Uuid, user_id: Uuid, action: &str) {
    info!(
        event_id = %event_id,
        user_id = %user_id,
        action = action,
        "Registration action performed"
    );
}

pub fn log_admin_action(admin_id: Uuid, action: &str, target: Option<Uuid>) {
    warn!(
        admin_id = %admin_id,
        action = action,
        target = ?target,
        "Admin action performed"
    );
}
