//! Password hashing, token issuance and the authenticated caller.
//!
//! Passwords are stored as argon2id PHC strings. Tokens are HS256 JWTs
//! signed with the configured secret; the caller's role is always reloaded
//! from the database when a token is presented, so the role claim is only
//! informational.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{AuthConfig, BootstrapAdmin};
use crate::database::{SkillRepository, UserRepository};
use crate::models::skill::SkillResponse;
use crate::models::user::{
    normalize_email, AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, User,
    UserResponse, UserRole,
};
use crate::utils::error::{AppError, AppResult};
use crate::utils::logging::log_auth_event;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// The caller of a request, as loaded from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Owners manage their own events; admins manage every event.
    pub fn can_manage_event(&self, organizer_id: Uuid) -> bool {
        self.is_admin() || (self.role == UserRole::Organizer && self.id == organizer_id)
    }

    pub fn require_role(&self, roles: &[UserRole]) -> AppResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Role {} may not perform this action",
                self.role.as_str()
            )))
        }
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

/// Generates a new password hash using argon2.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(AppError::internal)
}

/// Verifies a password against a stored PHC string. Unparsable hashes
/// never verify.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let hash = match PasswordHash::new(password_hash) {
        Ok(hash) => hash,
        Err(err) => {
            tracing::error!("failed to parse password hash: {}", err);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
}

async fn hash_password_blocking(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(AppError::internal)?
}

async fn verify_password_blocking(password: String, password_hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .map_err(AppError::internal)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("access token is expired")]
    Expired,
    #[error("access token validation error: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::AuthError("Access token has expired".to_string()),
            TokenError::Invalid(_) => AppError::AuthError("Access token is invalid".to_string()),
        }
    }
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    lifetime: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.issuer.clone(),
            lifetime: Duration::minutes(config.token_ttl_minutes),
        }
    }

    pub fn issue(&self, user: &User) -> AppResult<(String, DateTime<Utc>)> {
        self.issue_at(user, Utc::now())
    }

    fn issue_at(&self, user: &User, now: DateTime<Utc>) -> AppResult<(String, DateTime<Utc>)> {
        let expires_at = now + self.lifetime;
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AppError::internal)?;

        Ok((token, expires_at))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);

        match jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => {
                if e.kind() == &jsonwebtoken::errors::ErrorKind::ExpiredSignature {
                    Err(TokenError::Expired)
                } else {
                    Err(TokenError::Invalid(e))
                }
            }
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    skills: SkillRepository,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(users: UserRepository, skills: SkillRepository, tokens: Arc<TokenService>) -> Self {
        Self {
            users,
            skills,
            tokens,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<AuthResponse> {
        let email = normalize_email(&request.email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let password_hash = hash_password_blocking(request.password).await?;
        let user = self
            .users
            .create(request.name.trim(), &email, &password_hash, UserRole::Volunteer)
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict(_) => {
                    AppError::Conflict("Email is already registered".to_string())
                }
                other => other,
            })?;

        log_auth_event(user.id, "register");
        self.auth_response(user, Vec::new())
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        let email = normalize_email(&request.email);
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::AuthError(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password_blocking(request.password, user.password_hash.clone()).await? {
            tracing::warn!(user_id = %user.id, "Failed login attempt");
            return Err(AppError::AuthError(INVALID_CREDENTIALS.to_string()));
        }

        log_auth_event(user.id, "login");
        let skills = self.user_skills(user.id).await?;
        self.auth_response(user, skills)
    }

    /// Resolves a bearer token to an active user.
    pub async fn authenticate(&self, token: &str) -> AppResult<AuthUser> {
        let claims = self.tokens.validate(token)?;
        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::AuthError("Account no longer exists".to_string()))?;

        Ok(user.into())
    }

    pub async fn me(&self, actor: &AuthUser) -> AppResult<UserResponse> {
        let user = self
            .users
            .find_by_id(actor.id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let skills = self.user_skills(user.id).await?;

        Ok(UserResponse::new(user, skills))
    }

    pub async fn change_password(
        &self,
        actor: &AuthUser,
        request: ChangePasswordRequest,
    ) -> AppResult<()> {
        let user = self
            .users
            .find_by_id(actor.id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !verify_password_blocking(request.current_password, user.password_hash).await? {
            return Err(AppError::AuthError("Current password is incorrect".to_string()));
        }

        let password_hash = hash_password_blocking(request.new_password).await?;
        self.users.update_password(user.id, &password_hash).await?;

        log_auth_event(user.id, "change_password");
        Ok(())
    }

    /// Creates the configured admin account unless its email is taken.
    pub async fn ensure_bootstrap_admin(&self, admin: &BootstrapAdmin) -> AppResult<()> {
        let email = normalize_email(&admin.email);
        if self.users.find_by_email(&email).await?.is_some() {
            tracing::debug!(email = %email, "Bootstrap admin already exists");
            return Ok(());
        }

        let password_hash = hash_password_blocking(admin.password.clone()).await?;
        let user = self
            .users
            .create(admin.name.trim(), &email, &password_hash, UserRole::Admin)
            .await?;

        tracing::info!(user_id = %user.id, email = %email, "Bootstrap admin created");
        Ok(())
    }

    async fn user_skills(&self, user_id: Uuid) -> AppResult<Vec<SkillResponse>> {
        Ok(self
            .skills
            .for_user(user_id)
            .await?
            .into_iter()
            .map(SkillResponse::from)
            .collect())
    }

    fn auth_response(&self, user: User, skills: Vec<SkillResponse>) -> AppResult<AuthResponse> {
        let (token, expires_at) = self.tokens.issue(&user)?;

        Ok(AuthResponse {
            token,
            expires_at,
            user: UserResponse::new(user, skills),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn user(role: UserRole) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            password_hash: String::new(),
            role,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn tokens() -> TokenService {
        TokenService::new(&Settings::default().auth)
    }

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn test_garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_token_carries_identity() {
        let user = user(UserRole::Organizer);
        let (token, expires_at) = tokens().issue(&user).unwrap();
        let claims = tokens().validate(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, UserRole::Organizer);
        assert_eq!(claims.exp, expires_at.timestamp());
        assert_eq!(claims.iss, "volunteer-api");
    }

    #[test]
    fn test_expired_token_is_reported_as_expired() {
        let service = tokens();
        let issued = Utc::now() - Duration::days(30);
        let (token, _) = service.issue_at(&user(UserRole::Volunteer), issued).unwrap();

        assert!(matches!(service.validate(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_token_from_other_secret_is_invalid() {
        let mut config = Settings::default().auth;
        config.jwt_secret = "another-secret-that-is-long-enough-000".to_string();
        let (token, _) = TokenService::new(&config)
            .issue(&user(UserRole::Admin))
            .unwrap();

        assert!(matches!(tokens().validate(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_token_from_other_issuer_is_invalid() {
        let mut config = Settings::default().auth;
        config.issuer = "someone-else".to_string();
        let (token, _) = TokenService::new(&config)
            .issue(&user(UserRole::Admin))
            .unwrap();

        assert!(tokens().validate(&token).is_err());
    }

    #[test]
    fn test_role_guards() {
        let volunteer: AuthUser = user(UserRole::Volunteer).into();
        let organizer: AuthUser = user(UserRole::Organizer).into();
        let admin: AuthUser = user(UserRole::Admin).into();

        assert!(volunteer
            .require_role(&[UserRole::Organizer, UserRole::Admin])
            .is_err());
        assert!(organizer
            .require_role(&[UserRole::Organizer, UserRole::Admin])
            .is_ok());
        assert!(admin.is_admin());

        assert!(organizer.can_manage_event(organizer.id));
        assert!(!organizer.can_manage_event(Uuid::new_v4()));
        assert!(admin.can_manage_event(Uuid::new_v4()));
        assert!(!volunteer.can_manage_event(volunteer.id));

        assert!(matches!(
            volunteer.require_role(&[UserRole::Admin]),
            Err(AppError::Forbidden(_))
        ));
        assert!(admin.require_role(&[UserRole::Organizer, UserRole::Admin]).is_ok());
    }
}
