pub mod auth;
pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod store;
pub mod utils;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    security_headers::security_headers_middleware, tracing::request_id_middleware,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::auth::{Actor, AuthorizationGate, Identity, ResourceScope, SessionResolver, TokenCodec};
use crate::config::StudioConfig;
use crate::store::StudioStore;
use crate::utils::uploads::UPLOADS_URL_PREFIX;

/// Multipart framing allowance on top of the configured file size.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: StudioConfig,
    pub store: Arc<dyn StudioStore>,
    pub sessions: SessionResolver,
    pub gate: AuthorizationGate,
}

impl AppState {
    /// Wire the resolver and gate to a single store handle.
    pub fn new(config: StudioConfig, store: Arc<dyn StudioStore>) -> Self {
        let codec = TokenCodec::new(
            config.session.secret.as_ref(),
            config.session.max_age_seconds,
        );

        Self {
            sessions: SessionResolver::new(codec, store.clone()),
            gate: AuthorizationGate::new(store.clone()),
            store,
            config,
        }
    }

    /// Authorize `identity` for `scope`, mapping a denial to its HTTP error.
    pub async fn authorize(
        &self,
        identity: &Identity,
        scope: ResourceScope,
    ) -> Result<Actor, AppError> {
        self.gate.authorize(identity, &scope).await?.into_result()
    }
}

pub fn build_router(state: AppState) -> Router {
    use handlers::{auth, clients, pages, relationships, students};

    let upload_limit = state.config.uploads.max_bytes + MULTIPART_OVERHEAD_BYTES;

    let api_routes = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/check-user", post(auth::check_user))
        .route("/api/auth/set-password", post(auth::set_password))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/user", get(auth::current_user))
        .route(
            "/api/studios/:studio_id/clients",
            get(clients::list_clients),
        )
        .route(
            "/api/clients/:client_id",
            get(clients::get_client).patch(clients::update_client),
        )
        .route(
            "/api/studio-instructors/:link_id/approval",
            post(relationships::set_instructor_approval),
        )
        .route(
            "/api/studio-students/:link_id/approval",
            post(relationships::set_student_approval),
        )
        .route("/api/students/:student_id", get(students::get_student))
        .route(
            "/api/students/:student_id/profile-picture",
            post(students::upload_profile_picture).layer(DefaultBodyLimit::max(upload_limit)),
        );

    let mut page_routes = Router::new()
        .route("/", get(pages::app_shell))
        .route("/login", get(pages::app_shell))
        .route("/signup", get(pages::app_shell))
        .route("/profile", get(pages::app_shell));
    for section in [
        "/dashboard",
        "/studios",
        "/clients",
        "/lessons",
        "/homework",
        "/notebook",
        "/exercises",
    ] {
        page_routes = page_routes
            .route(section, get(pages::app_shell))
            .route(&format!("{}/*rest", section), get(pages::app_shell));
    }

    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .security
                .allowed_origins
                .iter()
                .filter_map(|o| match o.parse::<HeaderValue>() {
                    Ok(v) => Some(v),
                    Err(e) => {
                        tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                        None
                    }
                })
                .collect::<Vec<HeaderValue>>(),
        )
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true);

    Router::new()
        .route("/health", get(health_check))
        .merge(api_routes)
        .merge(page_routes)
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .nest_service(UPLOADS_URL_PREFIX, ServeDir::new(&state.config.uploads.dir))
        .with_state(state.clone())
        // Coarse per-path authentication
        .layer(from_fn_with_state(
            state.clone(),
            middleware::edge_filter_middleware,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri().path(),
                    user_id = tracing::field::Empty,
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}

/// Liveness plus a store ping.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Store health check failed");
        e
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
    })))
}
