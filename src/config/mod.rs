use serde::{Deserialize, Serialize};
use std::env;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
    pub uploads: UploadConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub token_ttl_minutes: i64,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Account created with the admin role on first start when no user owns
/// the email yet.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    /// Comma separated list of origins.
    pub allowed_origins: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    pub dir: String,
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl Settings {
    /// Layers defaults, an optional `config.toml` and `VOLUNTEER__*`
    /// environment variables. `DATABASE_URL` and `RUST_ENV` override the
    /// matching keys when set.
    pub fn load() -> Result<Self, SettingsError> {
        let defaults = Settings::default();

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&defaults)?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("VOLUNTEER")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("environment", env::var("RUST_ENV").ok())?
            .build()?;

        let settings: Settings = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(SettingsError::Invalid(format!(
                "auth.jwt_secret must be at least {} bytes",
                MIN_JWT_SECRET_LEN
            )));
        }
        if self.auth.token_ttl_minutes <= 0 {
            return Err(SettingsError::Invalid(
                "auth.token_ttl_minutes must be positive".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(SettingsError::Invalid("server.port must not be 0".to_string()));
        }
        if self.database.url.trim().is_empty() {
            return Err(SettingsError::Invalid("database.url must be set".to_string()));
        }
        if self.uploads.max_bytes == 0 {
            return Err(SettingsError::Invalid(
                "uploads.max_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3001,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/volunteer".to_string(),
                max_connections: 5,
                min_connections: 1,
            },
            auth: AuthConfig {
                jwt_secret: "development-secret-change-me-0123456789".to_string(),
                issuer: "volunteer-api".to_string(),
                token_ttl_minutes: 60 * 24,
                bootstrap_admin: None,
            },
            cors: CorsConfig {
                allowed_origins: cors::DEFAULT_ALLOWED_ORIGINS.to_string(),
            },
            uploads: UploadConfig {
                dir: "uploads".to_string(),
                max_bytes: 5 * 1024 * 1024,
            },
            logging: LoggingConfig {
                level: "info,sqlx=warn,tower_http=info".to_string(),
                json: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_short_jwt_secret_is_rejected() {
        let mut settings = Settings::default();
        settings.auth.jwt_secret = "short".to_string();
        assert!(matches!(settings.validate(), Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_zero_upload_limit_is_rejected() {
        let mut settings = Settings::default();
        settings.uploads.max_bytes = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_production_flag() {
        let mut settings = Settings::default();
        assert!(!settings.is_production());
        settings.environment = "Production".to_string();
        assert!(settings.is_production());
    }
}
