use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, Environment};
use crate::database::Database;
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::services::{AuthService, FeedService, FileService, Mailer, PortalService};

/// Shared handler state. Everything inside is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            mailer,
        }
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.db.clone(), self.config.clone(), self.mailer.clone())
    }

    pub fn portal_service(&self) -> PortalService {
        PortalService::new(self.db.clone(), self.config.clone(), self.mailer.clone())
    }

    pub fn file_service(&self) -> FileService {
        FileService::new(self.db.clone(), self.config.clone())
    }

    pub fn feed_service(&self) -> FeedService {
        FeedService::new(self.db.clone())
    }
}

pub fn router(state: AppState) -> Router {
    let max_body = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config);

    let mut app = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        // Protected API
        .merge(protected_routes().route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware)))
        // Global middleware
        .layer(DefaultBodyLimit::max(max_body));

    if let Some(cors) = cors {
        app = app.layer(cors);
    }
    if state.config.api.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    app.with_state(state)
}

fn public_routes() -> Router<AppState> {
    use public::{auth, plans};

    Router::new()
        .route("/plans", get(plans::list))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/otp/request", post(auth::otp_request))
        .route("/auth/otp/verify", post(auth::otp_verify))
        .route("/auth/magic-link/request", post(auth::magic_link_request))
        .route("/auth/magic-link/verify", post(auth::magic_link_verify))
        .route("/auth/password-reset/request", post(auth::password_reset_request))
        .route("/auth/password-reset/confirm", post(auth::password_reset_confirm))
}

fn protected_routes() -> Router<AppState> {
    use protected::{activities, files, notifications, portals, session, updates, usage};

    Router::new()
        .route("/api/auth/whoami", get(session::whoami))
        // Usage accounting
        .route("/api/usage", get(usage::report))
        .route("/api/usage/check-portal", get(usage::check_portal))
        .route("/api/usage/check-upload", post(usage::check_upload))
        .route("/api/usage/over-limit", get(usage::over_limit))
        .route("/api/usage/upgrade", get(usage::upgrade))
        // Portals
        .route("/api/portals", get(portals::list).post(portals::create))
        .route(
            "/api/portals/:id",
            get(portals::show).patch(portals::update).delete(portals::delete),
        )
        .route("/api/portals/:id/files", get(files::list).post(files::create))
        .route("/api/files/:id", axum::routing::delete(files::delete))
        .route("/api/portals/:id/updates", get(updates::list).post(updates::create))
        .route("/api/portals/:id/activities", get(activities::list))
        // Notifications
        .route("/api/notifications", get(notifications::list))
        .route("/api/notifications/read-all", post(notifications::read_all))
        .route("/api/notifications/:id/read", post(notifications::read))
}

fn cors_layer(config: &AppConfig) -> Option<CorsLayer> {
    if !config.security.enable_cors {
        return None;
    }
    if matches!(config.environment, Environment::Development) {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers(Any),
    )
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Client Portal API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Freelancer client portals with plan-limit accounting",
            "endpoints": {
                "health": "/health (public)",
                "plans": "/plans (public)",
                "auth": "/auth/* (public - session acquisition)",
                "api": "/api/* (protected - bearer token)"
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> Response {
    match state.db.health_check().await {
        Ok(()) => Json(json!({
            "success": true,
            "data": { "status": "ok", "database": "connected" }
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "Database unavailable",
                    "code": "SERVICE_UNAVAILABLE"
                })),
            )
                .into_response()
        }
    }
}
