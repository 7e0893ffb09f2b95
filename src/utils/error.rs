use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use heck::ToLowerCamelCase;
use thiserror::Error;
use tracing::{error, warn};
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::utils::response::{error as error_response, FieldErrors};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Validation failed")]
    InvalidFields(#[from] ValidationErrors),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Business rule violated: {0}")]
    BusinessRule(String),

    #[error("Database error")]
    DatabaseError(sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidFields(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BusinessRule(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::InvalidFields(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::BusinessRule(_) => "BUSINESS_RULE_VIOLATION",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        AppError::InternalServerError(err.to_string())
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::BusinessRule(msg) => {
                warn!(code = self.code(), message = %msg, "Request rejected");
            }
            AppError::InvalidFields(errors) => {
                warn!(code = self.code(), errors = ?errors, "Request rejected");
            }
            AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("Resource already exists".to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                AppError::BusinessRule("Referenced resource does not exist".to_string())
            }
            _ => AppError::DatabaseError(err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::ValidationError(err.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

/// Flattens nested validator output into `field -> messages`. Nested
/// struct and list errors are keyed with dotted / indexed paths.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut out = FieldErrors::new();
    collect_field_errors(errors, "", &mut out);
    out
}

fn collect_field_errors(errors: &ValidationErrors, prefix: &str, out: &mut FieldErrors) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_lower_camel_case()
        } else {
            format!("{}.{}", prefix, field.to_lower_camel_case())
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                let messages = out.entry(path).or_default();
                for err in errs {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", err.code));
                    messages.push(message);
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_field_errors(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_field_errors(nested, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        let (public_message, errors) = match &self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::BusinessRule(msg) => (msg.clone(), None),
            AppError::InvalidFields(errs) => (
                "One or more validation errors occurred".to_string(),
                Some(field_errors(errs)),
            ),
            AppError::DatabaseError(_) => ("A database error occurred".to_string(), None),
            AppError::InternalServerError(_) => {
                ("An unexpected error occurred".to_string(), None)
            }
        };

        error_response(code, public_message, errors, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::response::ApiErrorResponse;
    use validator::Validate;

    #[derive(Validate)]
    struct Signup {
        #[validate(length(min = 1, message = "Name is required"))]
        display_name: String,
        #[validate(email(message = "Email is invalid"))]
        email: String,
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::ValidationError("x".into()), 400),
            (AppError::AuthError("x".into()), 401),
            (AppError::Forbidden("x".into()), 403),
            (AppError::NotFound("x".into()), 404),
            (AppError::Conflict("x".into()), 409),
            (AppError::BusinessRule("x".into()), 422),
            (AppError::internal("boom"), 500),
        ];

        for (err, status) in cases {
            assert_eq!(err.status_code().as_u16(), status, "{:?}", err);
        }
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_other_sqlx_errors_are_opaque() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.extensions().get::<ApiErrorResponse>().unwrap();
        assert_eq!(body.message, "A database error occurred");
        assert_eq!(body.code, "DATABASE_ERROR");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let response = AppError::internal("disk on fire").into_response();
        let body = response.extensions().get::<ApiErrorResponse>().unwrap();
        assert!(!body.message.contains("disk"));
    }

    #[test]
    fn test_validation_errors_are_keyed_by_camel_case_field() {
        let input = Signup {
            display_name: String::new(),
            email: "not-an-email".to_string(),
        };
        let errors = input.validate().unwrap_err();
        let fields = field_errors(&errors);

        assert_eq!(fields["displayName"], vec!["Name is required".to_string()]);
        assert_eq!(fields["email"], vec!["Email is invalid".to_string()]);

        let response = AppError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.extensions().get::<ApiErrorResponse>().unwrap();
        assert!(body.errors.is_some());
    }

    #[tokio::test]
    async fn test_non_multipart_upload_is_a_validation_error() {
        use axum::body::Body;
        use axum::extract::Multipart;
        use axum::http::Request;
        use axum::routing::post;
        use axum::Router;
        use tower::ServiceExt;

        async fn upload(multipart: Result<Multipart, MultipartRejection>) -> AppResult<StatusCode> {
            multipart?;
            Ok(StatusCode::NO_CONTENT)
        }

        let request = Request::post("/upload")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = Router::new()
            .route("/upload", post(upload))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_multi_word_fields_are_camel_cased() {
        #[derive(Validate)]
        struct Shift {
            #[validate(range(min = 1, message = "Duration must be positive"))]
            duration_minutes: i32,
            #[validate(length(min = 1, message = "Location is required"))]
            location: String,
        }

        let errors = Shift {
            duration_minutes: 0,
            location: String::new(),
        }
        .validate()
        .unwrap_err();
        let fields = field_errors(&errors);

        assert!(fields.contains_key("durationMinutes"));
        assert!(fields.contains_key("location"));
    }
}
