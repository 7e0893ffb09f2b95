use serial_test::serial;
use std::env;

use volunteer_server::config::{Settings, SettingsError};

const VARS: [&str; 4] = [
    "DATABASE_URL",
    "RUST_ENV",
    "VOLUNTEER__SERVER__PORT",
    "VOLUNTEER__AUTH__JWT_SECRET",
];

fn clear() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_environment_overrides_defaults() {
    clear();
    env::set_var("DATABASE_URL", "postgres://db.internal/volunteer");
    env::set_var("RUST_ENV", "production");
    env::set_var("VOLUNTEER__SERVER__PORT", "4000");

    let settings = Settings::load().unwrap();
    clear();

    assert_eq!(settings.database.url, "postgres://db.internal/volunteer");
    assert_eq!(settings.server.port, 4000);
    assert!(settings.is_production());
    assert_eq!(settings.auth.issuer, "volunteer-api");
}

#[test]
#[serial]
fn test_weak_secret_fails_to_load() {
    clear();
    env::set_var("VOLUNTEER__AUTH__JWT_SECRET", "too-short");

    let result = Settings::load();
    clear();

    assert!(matches!(result, Err(SettingsError::Invalid(_))));
}
