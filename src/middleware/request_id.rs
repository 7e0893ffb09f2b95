use axum::extract::Request;
use axum::http::header::CONTENT_LENGTH;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::utils::response::ApiErrorResponse;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Copies the request id into the `traceId` of error bodies.
///
/// Error responses carry their body as a response extension; this
/// rewrites that body once the id is known and leaves every other
/// response untouched.
pub async fn attach_trace_id(request: Request, next: Next) -> Response {
    let trace_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let response = next.run(request).await;
    let Some(mut body) = response.extensions().get::<ApiErrorResponse>().cloned() else {
        return response;
    };
    body.trace_id = trace_id;

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    parts.extensions.remove::<ApiErrorResponse>();
    (parts, Json(body)).into_response()
}
