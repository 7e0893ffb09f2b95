pub mod event;
pub mod registration;
pub mod report;
pub mod skill;
pub mod user;

pub use event::{Event, EventStatus};
pub use registration::{Registration, RegistrationStatus};
pub use skill::Skill;
pub use user::{User, UserRole};

use validator::ValidationError;

/// Rejects text that is empty once surrounding whitespace is trimmed.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("Must not be blank".into());
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_blank() {
        assert!(not_blank("Beach cleanup").is_ok());
        assert!(not_blank("  a ").is_ok());
        assert_eq!(not_blank(" \t\n ").unwrap_err().code, "blank");
        assert!(not_blank("").is_err());
    }
}
