/// Application state, router builder, and auth middleware
///
/// # Example
///
/// ```no_run
/// use orgdesk_api::{app::AppState, config::Config};
/// use orgdesk_shared::{mailer::LogMailer, storage::FsBlobStore};
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let storage = Arc::new(FsBlobStore::new(&config.storage.root));
/// let state = AppState::new(pool, config, storage, Arc::new(LogMailer));
/// let app = orgdesk_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, patch, post},
    Router,
};
use orgdesk_shared::{
    auth::jwt,
    mailer::Mailer,
    models::user::User,
    storage::{BlobStore, MAX_DOCUMENT_BYTES},
    tenancy::{self, TenantScope},
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Blob store for document bytes
    pub storage: Arc<dyn BlobStore>,

    /// Outbound mail transport
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Creates new application state
    pub fn new(
        db: PgPool,
        config: Config,
        storage: Arc<dyn BlobStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            storage,
            mailer,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Per-request authentication context
///
/// Installed into request extensions by [`jwt_auth_layer`] after the
/// token checks out. Carries the freshly loaded user row and the tenant
/// scope resolved from the database for this request, so a context
/// switch or membership removal takes effect on the very next request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The authenticated user, loaded this request
    pub user: User,

    /// Tenant scope resolved from the user's active organization
    pub scope: TenantScope,
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                                  # Health check (public)
/// ├── /v1/
/// │   ├── /auth/                               # Public
/// │   │   ├── POST /register
/// │   │   ├── POST /login
/// │   │   └── POST /refresh
/// │   ├── /invitations/
/// │   │   ├── GET  /:token                     # Resolve (auth optional)
/// │   │   └── POST /:token/accept              # Redeem (auth)
/// │   ├── /organizations/                      # Auth
/// │   │   ├── GET/POST /
/// │   │   ├── GET/PATCH/DELETE /:org_id
/// │   │   ├── POST /:org_id/switch
/// │   │   ├── GET  /:org_id/members
/// │   │   ├── PATCH/DELETE /:org_id/members/:user_id
/// │   │   └── GET/POST /:org_id/invitations
/// │   ├── /projects/                           # Auth + active org
/// │   │   ├── GET/POST /
/// │   │   ├── GET/PATCH/DELETE /:project_id
/// │   │   ├── GET/POST /:project_id/tasks
/// │   │   └── GET/POST /:project_id/documents  # POST is multipart
/// │   ├── /tasks/:task_id                      # GET/PATCH/DELETE
/// │   ├── /documents/:document_id              # PATCH/DELETE
/// │   ├── /documents/:document_id/download     # GET
/// │   └── /comments                            # GET/POST, DELETE /:id
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Public: no auth required
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    // Resolution is public (the link lands in an email client); the
    // handler picks up an Authorization header itself if one is sent.
    let invitation_public_routes =
        Router::new().route("/:token", get(routes::invitations::resolve));

    let invitation_routes = Router::new()
        .route("/:token/accept", post(routes::invitations::accept))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let organization_routes = Router::new()
        .route(
            "/",
            get(routes::organizations::list).post(routes::organizations::create),
        )
        .route(
            "/:org_id",
            get(routes::organizations::show)
                .patch(routes::organizations::update)
                .delete(routes::organizations::remove),
        )
        .route("/:org_id/switch", post(routes::organizations::switch))
        .route("/:org_id/members", get(routes::members::list))
        .route(
            "/:org_id/members/:user_id",
            patch(routes::members::change_role).delete(routes::members::remove),
        )
        .route(
            "/:org_id/invitations",
            get(routes::members::list_invitations).post(routes::members::invite),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let project_routes = Router::new()
        .route(
            "/",
            get(routes::projects::list).post(routes::projects::create),
        )
        .route(
            "/:project_id",
            get(routes::projects::show)
                .patch(routes::projects::update)
                .delete(routes::projects::remove),
        )
        .route(
            "/:project_id/tasks",
            get(routes::tasks::list).post(routes::tasks::create),
        )
        .route(
            "/:project_id/documents",
            get(routes::documents::list).post(routes::documents::upload),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let task_routes = Router::new()
        .route(
            "/:task_id",
            get(routes::tasks::show)
                .patch(routes::tasks::update)
                .delete(routes::tasks::remove),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let document_routes = Router::new()
        .route(
            "/:document_id",
            patch(routes::documents::rename).delete(routes::documents::remove),
        )
        .route("/:document_id/download", get(routes::documents::download))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let comment_routes = Router::new()
        .route(
            "/",
            get(routes::comments::list).post(routes::comments::create),
        )
        .route("/:comment_id", delete(routes::comments::remove))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest(
            "/invitations",
            invitation_public_routes.merge(invitation_routes),
        )
        .nest("/organizations", organization_routes)
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .nest("/documents", document_routes)
        .nest("/comments", comment_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
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
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        // Body cap sized for multipart document uploads; the handler
        // enforces the per-file ceiling separately.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_DOCUMENT_BYTES + 64 * 1024))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Validates the Bearer token, loads the user, resolves the tenant
/// scope from the database, and injects [`AuthContext`] into request
/// extensions. Tokens of deleted accounts fail here even if unexpired.
pub async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            crate::error::ApiError::Unauthorized("Missing authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        crate::error::ApiError::BadRequest("Expected Bearer token".to_string())
    })?;

    let claims = jwt::validate_access_token(token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| {
            crate::error::ApiError::Unauthorized("Account no longer exists".to_string())
        })?;

    let scope = tenancy::resolve_scope(&state.db, user.id).await?;

    req.extensions_mut().insert(AuthContext { user, scope });

    Ok(next.run(req).await)
}
