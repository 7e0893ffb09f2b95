use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{admin, auth, events, health_check, not_found, registrations, skills, users};
use crate::middleware::{attach_trace_id, REQUEST_ID_HEADER};
use crate::state::AppState;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/password", put(auth::change_password))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/me", put(users::update_profile))
        .route(
            "/me/skills",
            get(users::my_skills).put(users::replace_my_skills),
        )
}

fn event_routes(image_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(events::list_events).post(events::create_event))
        .route("/mine", get(events::my_events))
        .route(
            "/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route(
            "/:id/image",
            post(events::upload_image).layer(DefaultBodyLimit::max(image_limit)),
        )
        .route(
            "/:id/registrations",
            get(registrations::event_registrations)
                .post(registrations::register)
                .delete(registrations::cancel),
        )
        .route(
            "/:id/registrations/export",
            get(events::export_registrations),
        )
}

fn registration_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(registrations::my_registrations))
        .route("/:id/status", patch(registrations::update_status))
}

fn skill_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(skills::list_skills).post(skills::create_skill))
        .route("/:id", delete(skills::delete_skill))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/:id", delete(admin::delete_user))
        .route("/users/:id/role", put(admin::change_role))
        .route("/users/:id/restore", post(admin::restore_user))
        .route("/events", get(admin::list_events))
        .route("/events/:id/restore", post(admin::restore_event))
        .route("/reports/summary", get(admin::summary))
        .route("/reports/events/export", get(admin::export_events))
}

pub fn create_routes(state: AppState) -> Router {
    let settings = state.settings.clone();

    let api = Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_routes())
        .nest("/users", user_routes())
        .nest(
            "/events",
            event_routes(settings.uploads.max_bytes + MULTIPART_OVERHEAD),
        )
        .nest("/registrations", registration_routes())
        .nest("/skills", skill_routes())
        .nest("/admin", admin_routes());

    Router::new()
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(&settings.uploads.dir))
        .fallback(not_found)
        .with_state(state)
        .layer(axum::middleware::from_fn(attach_trace_id))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(create_security_headers_layer(&settings))
        .layer(create_cors_layer(&settings.cors))
}
