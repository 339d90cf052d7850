/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use alifh_api::{app::{self, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let mailer = app::magic_link_sender(&config)?;
/// let router = app::build_router(AppState::new(pool, config, mailer));
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{security::SecurityHeadersLayer, session::session_layer},
    routes,
};
use alifh_shared::auth::{
    delivery::{LogSender, MagicLinkSender, WebhookSender},
    middleware::SessionSettings,
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub session_settings: Arc<SessionSettings>,
    pub mailer: Arc<dyn MagicLinkSender>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, mailer: Arc<dyn MagicLinkSender>) -> Self {
        Self {
            db,
            session_settings: Arc::new(config.session_settings()),
            config: Arc::new(config),
            mailer,
        }
    }

    /// Magic-link signing secret
    pub fn auth_secret(&self) -> &str {
        &self.config.auth.secret
    }
}

/// Webhook delivery when `MAGIC_LINK_WEBHOOK_URL` is set, log output otherwise
pub fn magic_link_sender(config: &Config) -> anyhow::Result<Arc<dyn MagicLinkSender>> {
    match &config.auth.magic_link_webhook_url {
        Some(url) => {
            tracing::info!(endpoint = %url, "Magic links will be delivered via webhook");
            Ok(Arc::new(WebhookSender::new(url.clone())?))
        }
        None => {
            tracing::warn!("MAGIC_LINK_WEBHOOK_URL not set; magic links will only be logged");
            Ok(Arc::new(LogSender))
        }
    }
}

/// Builds the complete router
///
/// ```text
/// /
/// ├── GET /health
/// ├── GET /dashboard                       # redirect to the caller's dashboard
/// ├── GET /admin | /partner/{owner,admin,staff} | /account
/// └── /api
///     ├── /auth
///     │   ├── POST /sign-up/email
///     │   ├── POST /sign-in/email
///     │   ├── POST /sign-in/magic-link
///     │   ├── GET  /magic-link/verify
///     │   ├── POST /sign-out
///     │   ├── GET  /get-session
///     │   ├── POST /update-user
///     │   ├── POST /change-password
///     │   └── GET  /session                # session extension
///     ├── /admin                           # platform admins
///     ├── /partners/:slug                  # partner members
///     └── /vehicles                        # public marketplace
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, request tracing, session
/// resolution.
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let dashboard_routes = Router::new()
        .route("/dashboard", get(routes::dashboards::dashboard_redirect))
        .route("/admin", get(routes::dashboards::admin_dashboard))
        .route("/partner/owner", get(routes::dashboards::partner_owner_dashboard))
        .route("/partner/admin", get(routes::dashboards::partner_admin_dashboard))
        .route("/partner/staff", get(routes::dashboards::partner_staff_dashboard))
        .route("/account", get(routes::dashboards::account_dashboard));

    let auth_routes = Router::new()
        .route("/sign-up/email", post(routes::auth::sign_up_email))
        .route("/sign-in/email", post(routes::auth::sign_in_email))
        .route("/sign-in/magic-link", post(routes::auth::request_magic_link))
        .route("/magic-link/verify", get(routes::auth::verify_magic_link))
        .route("/sign-out", post(routes::auth::sign_out))
        .route("/get-session", get(routes::auth::get_session))
        .route("/update-user", post(routes::auth::update_user))
        .route("/change-password", post(routes::auth::change_password))
        .route("/session", get(routes::session::session_extension));

    let admin_routes = Router::new()
        .route("/users", get(routes::admin::list_users))
        .route("/users/:id/role", patch(routes::admin::update_user_role))
        .route(
            "/partners",
            get(routes::admin::list_partners).post(routes::admin::create_partner),
        )
        .route("/partners/:id/status", patch(routes::admin::update_partner_status))
        .route("/partners/:id/members", post(routes::admin::add_partner_member));

    let partner_routes = Router::new()
        .route(
            "/",
            get(routes::partners::get_partner).patch(routes::partners::update_partner),
        )
        .route(
            "/members",
            get(routes::partners::list_members).post(routes::partners::add_member),
        )
        .route(
            "/members/:user_id",
            patch(routes::partners::update_member).delete(routes::partners::remove_member),
        )
        .route(
            "/vehicles",
            get(routes::partners::list_vehicles).post(routes::partners::create_vehicle),
        )
        .route(
            "/vehicles/:id",
            patch(routes::partners::update_vehicle).delete(routes::partners::delete_vehicle),
        )
        .route("/vehicles/:id/status", patch(routes::partners::set_vehicle_status));

    let vehicle_routes = Router::new()
        .route("/", get(routes::vehicles::search_vehicles))
        .route("/:id", get(routes::vehicles::get_vehicle));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/admin", admin_routes)
        .nest("/partners/:slug", partner_routes)
        .nest("/vehicles", vehicle_routes);

    let cors = cors_layer(&state.config);
    let production = state.config.api.production;

    Router::new()
        .merge(health_routes)
        .merge(dashboard_routes)
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_layer,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
