use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::collections::BTreeMap;

/// Field name to the list of messages that failed for it.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Uniform error body. `trace_id` is filled in by the request id
/// middleware once the response leaves the handler.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    pub message: String,
    pub code: String,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    pub trace_id: Option<String>,
}

pub fn created<T>(data: T) -> impl IntoResponse
where
    T: Serialize,
{
    (StatusCode::CREATED, Json(data))
}

pub fn no_content() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

/// Binary download with an attachment filename.
pub fn file(bytes: Vec<u8>, content_type: &'static str, filename: &str) -> Response {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

pub fn error(
    code: &str,
    message: impl Into<String>,
    errors: Option<FieldErrors>,
    status: StatusCode,
) -> Response {
    let body = ApiErrorResponse {
        message: message.into(),
        code: code.to_string(),
        status_code: status.as_u16(),
        errors,
        trace_id: None,
    };

    let mut response = (status, Json(body.clone())).into_response();
    response.extensions_mut().insert(body);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_is_camel_case() {
        let body = ApiErrorResponse {
            message: "Event not found".to_string(),
            code: "NOT_FOUND".to_string(),
            status_code: 404,
            errors: None,
            trace_id: Some("abc".to_string()),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["statusCode"], 404);
        assert_eq!(json["traceId"], "abc");
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn test_error_response_carries_body_extension() {
        let response = error("CONFLICT", "exists", None, StatusCode::CONFLICT);
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = response.extensions().get::<ApiErrorResponse>().unwrap();
        assert_eq!(body.status_code, 409);
    }

    #[test]
    fn test_file_sets_disposition() {
        let response = file(b"a,b".to_vec(), "text/csv", "export.csv");
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"export.csv\""
        );
    }
}
