//! # tcv_api
//!
//! HTTP API library for Temp Cover: admin, insurance and policyholder
//! endpoints plus policy document downloads.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use sqlx::PgPool;
use tcv_core::documents::{DocumentDispatcher, DocumentRenderer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::config::ApiConfig;
use crate::handlers::{admin, documents, insurance, user};
use crate::services::email::{MailError, MailTemplates, Mailer, mailer_from_config};
use crate::services::uploads::{CloudinaryStore, DisabledImageStore, ImageStore};

/// Upper bound on a create-insurance form with its images.
const UPLOAD_BODY_LIMIT: usize = 25 * 1024 * 1024;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool.
    pub pool: PgPool,
    /// API configuration.
    pub config: ApiConfig,
    pub documents: Arc<DocumentDispatcher>,
    pub mailer: Arc<dyn Mailer>,
    pub templates: Arc<MailTemplates>,
    pub images: Arc<dyn ImageStore>,
}

impl AppState {
    /// Wire services from `config`: SMTP when configured (else mail is
    /// logged), Cloudinary when configured (else uploads are refused).
    ///
    /// Fails when SMTP is configured but unusable.
    pub fn new(pool: PgPool, config: ApiConfig) -> Result<Self, MailError> {
        let mailer = mailer_from_config(config.smtp.as_ref())?;
        let images: Arc<dyn ImageStore> = match config.cloudinary.clone() {
            Some(cloudinary) => Arc::new(CloudinaryStore::new(cloudinary)),
            None => Arc::new(DisabledImageStore),
        };
        let renderer = Arc::new(DocumentRenderer::from_config(&config.documents));
        Ok(Self {
            pool,
            documents: Arc::new(DocumentDispatcher::new(renderer)),
            config,
            mailer,
            templates: Arc::new(MailTemplates::new()?),
            images,
        })
    }
}

/// Run embedded database migrations.
///
/// Delegates to `tcv_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    tcv_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/api/admin/login", post(admin::login_handler))
        .route(
            "/api/user/pdf/{insurance_id}/{document_type}",
            get(documents::document_handler),
        );

    // Reached through an emailed link
    let link = Router::new()
        .route("/api/user/verify/{token}", post(user::verify_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_link,
        ));

    // Admin-only routes
    let admin_only = Router::new()
        .route("/api/admin/create", post(admin::create_admin_handler))
        .route("/api/admin/get-admins", get(admin::list_admins_handler))
        .route(
            "/api/admin/send-email/{insurance_no}",
            post(admin::send_email_handler),
        )
        .route(
            "/api/admin/update/{admin_id}",
            put(admin::update_password_handler),
        )
        .route(
            "/api/insurance/get-insurances",
            get(insurance::list_insurances_handler),
        )
        .route(
            "/api/insurance/details/{insurance_no}",
            get(insurance::insurance_details_handler),
        )
        .route(
            "/api/insurance/generate-insurance-no",
            get(insurance::generate_insurance_no_handler),
        )
        .route(
            "/api/insurance/create-insurance",
            post(insurance::create_insurance_handler)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/api/insurance/edit-insurance/{insurance_no}",
            put(insurance::update_insurance_handler),
        )
        .route("/api/user/get-users", get(user::list_users_handler))
        .route("/api/user/details/{user_id}", get(user::user_details_handler))
        .route("/api/user/edit-user/{user_id}", put(user::update_user_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_admin,
        ));

    let assets = ServeDir::new(&state.config.documents.assets_dir);

    Router::new()
        .merge(public)
        .merge(link)
        .merge(admin_only)
        .nest_service("/static", assets)
        .layer(cors)
        .with_state(state)
}
