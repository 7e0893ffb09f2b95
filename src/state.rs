use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Settings;
use crate::database::{
    EventRepository, RegistrationRepository, ReportRepository, SkillRepository, UserRepository,
};
use crate::services::{
    AuthService, EventService, ExportService, RegistrationService, ReportService, SkillService,
    TokenService, UserService,
};

/// Shared handles passed to every handler. Cloning is cheap: the pool and
/// repositories are reference counted.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub settings: Arc<Settings>,
    pub auth: AuthService,
    pub users: UserService,
    pub events: EventService,
    pub registrations: RegistrationService,
    pub skills: SkillService,
    pub exports: ExportService,
    pub reports: ReportService,
}

impl AppState {
    pub fn new(pool: PgPool, settings: Settings) -> Self {
        let user_repo = UserRepository::new(pool.clone());
        let event_repo = EventRepository::new(pool.clone());
        let registration_repo = RegistrationRepository::new(pool.clone());
        let skill_repo = SkillRepository::new(pool.clone());

        let tokens = Arc::new(TokenService::new(&settings.auth));
        let skills = SkillService::new(skill_repo.clone());

        Self {
            auth: AuthService::new(user_repo.clone(), skill_repo.clone(), tokens),
            users: UserService::new(pool.clone(), user_repo, skill_repo.clone(), skills.clone()),
            events: EventService::new(
                pool.clone(),
                event_repo.clone(),
                skill_repo,
                skills.clone(),
                settings.uploads.clone(),
            ),
            registrations: RegistrationService::new(
                pool.clone(),
                event_repo.clone(),
                registration_repo.clone(),
            ),
            skills,
            exports: ExportService::new(event_repo, registration_repo),
            reports: ReportService::new(ReportRepository::new(pool.clone())),
            settings: Arc::new(settings),
            pool,
        }
    }
}
