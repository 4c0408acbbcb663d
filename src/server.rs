//! # Server Configuration
//!
//! Router assembly, shared state and the HTTP server loop.

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{MethodRouter, delete, get, post, put},
};
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{JwtManager, require_auth};
use crate::config::{AppConfig, ConfigError};
use crate::handlers::{self, auth, favorites, messages, properties, users};
use crate::storage::{ImageStore, LocalDiskStore};
use crate::telemetry::{TRACE_ID_HEADER, trace_middleware};

/// Multipart overhead allowed on top of the image payload.
const FORM_FIELDS_ALLOWANCE: usize = 1024 * 1024;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub jwt: Arc<JwtManager>,
    pub images: Arc<dyn ImageStore>,
}

impl AppState {
    /// Builds state with images stored under the configured upload directory.
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Result<Self, ConfigError> {
        let images = Arc::new(LocalDiskStore::new(config.upload_dir.clone()));
        Self::with_image_store(config, db, images)
    }

    pub fn with_image_store(
        config: AppConfig,
        db: DatabaseConnection,
        images: Arc<dyn ImageStore>,
    ) -> Result<Self, ConfigError> {
        let secret = config
            .jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingJwtSecret)?;
        let jwt = Arc::new(JwtManager::new(
            secret.as_bytes(),
            config.jwt_expires_in_seconds,
        ));

        Ok(Self {
            config: Arc::new(config),
            db,
            jwt,
            images,
        })
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let authenticated = middleware::from_fn_with_state(state.clone(), require_auth);
    let protect = |route: MethodRouter<AppState>| route.route_layer(authenticated.clone());

    let form_limit = DefaultBodyLimit::max(
        state
            .config
            .max_image_bytes
            .saturating_mul(properties::MAX_IMAGES_PER_REQUEST)
            .saturating_add(FORM_FIELDS_ALLOWANCE),
    );

    let api = Router::new()
        // auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", protect(get(auth::me)))
        .route("/api/auth/password", protect(put(auth::change_password)))
        .route("/api/auth/profile", protect(put(auth::update_profile)))
        // properties
        .route(
            "/api/properties",
            get(properties::list_properties)
                .merge(protect(post(properties::create_property)).layer(form_limit.clone())),
        )
        .route("/api/properties/search", post(properties::search_properties))
        .route(
            "/api/properties/{id}",
            get(properties::get_property).merge(
                protect(
                    put(properties::update_property).delete(properties::delete_property),
                )
                .layer(form_limit),
            ),
        )
        // users
        .route("/api/users", protect(get(users::list_users)))
        .route("/api/users/agents/all", get(users::list_agents))
        .route(
            "/api/users/{id}",
            protect(
                get(users::get_user)
                    .put(users::update_user)
                    .delete(users::delete_user),
            ),
        )
        // favorites
        .route("/api/favorites", protect(get(favorites::list_favorites)))
        .route(
            "/api/favorites/{propertyId}",
            protect(post(favorites::add_favorite).delete(favorites::remove_favorite)),
        )
        // messages
        .route("/api/messages/user", protect(get(messages::list_sent)))
        .route("/api/messages/agent", protect(get(messages::list_received)))
        .route(
            "/api/messages/reply/{messageId}",
            protect(post(messages::reply_message)),
        )
        .route(
            "/api/messages/{propertyId}/{agentId}",
            protect(post(messages::send_message)),
        )
        .route(
            "/api/messages/{messageId}",
            protect(delete(messages::delete_message)),
        );

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .merge(api)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .with_state(state.clone())
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .layer(middleware::from_fn(trace_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, TRACE_ID_HEADER])
        .expose_headers([TRACE_ID_HEADER])
        .allow_credentials(true)
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let addr = config
        .bind_addr()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {e}"))?;
    let profile = config.profile.clone();

    let state = AppState::new(config, db)?;
    tokio::fs::create_dir_all(&state.config.upload_dir).await?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::auth::change_password,
        crate::handlers::auth::update_profile,
        crate::handlers::properties::list_properties,
        crate::handlers::properties::get_property,
        crate::handlers::properties::search_properties,
        crate::handlers::properties::create_property,
        crate::handlers::properties::update_property,
        crate::handlers::properties::delete_property,
        crate::handlers::users::list_users,
        crate::handlers::users::list_agents,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::favorites::list_favorites,
        crate::handlers::favorites::add_favorite,
        crate::handlers::favorites::remove_favorite,
        crate::handlers::messages::list_sent,
        crate::handlers::messages::list_received,
        crate::handlers::messages::send_message,
        crate::handlers::messages::reply_message,
        crate::handlers::messages::delete_message,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::Role,
            crate::models::PropertyType,
            crate::models::PropertyStatus,
            crate::error::ApiError,
            crate::handlers::HealthStatus,
            crate::handlers::types::Pagination,
            crate::handlers::types::PropertyListResponse,
            crate::handlers::types::MessageResponse,
            crate::handlers::types::UserView,
            crate::handlers::types::PropertyView,
            crate::handlers::types::ImageView,
            crate::handlers::types::OwnerView,
            crate::handlers::types::MessageView,
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::ChangePasswordRequest,
            crate::handlers::auth::UpdateProfileRequest,
            crate::handlers::auth::AuthResponse,
            crate::handlers::auth::UserResponse,
            crate::handlers::properties::SearchRequest,
            crate::handlers::properties::PropertyForm,
            crate::handlers::properties::PropertyResponse,
            crate::handlers::users::UserWithProperties,
            crate::handlers::users::UpdateUserRequest,
            crate::handlers::messages::SendMessageRequest,
            crate::handlers::messages::SentMessageResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Registration, login and account management"),
        (name = "properties", description = "Property listings"),
        (name = "users", description = "User administration and agent directory"),
        (name = "favorites", description = "Saved properties"),
        (name = "messages", description = "Inquiries between users and agents"),
    ),
    info(
        title = "Estate API",
        description = "REST API for a real-estate listing marketplace",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
