pub mod auth;
pub mod events;
pub mod export;
pub mod registrations;
pub mod reports;
pub mod skills;
pub mod users;

pub use auth::{AuthService, AuthUser, TokenService};
pub use events::EventService;
pub use export::ExportService;
pub use registrations::RegistrationService;
pub use reports::ReportService;
pub use skills::SkillService;
pub use users::UserService;
