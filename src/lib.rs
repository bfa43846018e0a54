pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::image_upload::ImageUploadService;
use crate::services::storage::StorageService;
use axum::{
    Router,
    http::HeaderValue,
    middleware::from_fn,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::education::list_education,
        api::handlers::education::upsert_education,
        api::handlers::education::delete_education,
        api::handlers::experience::list_experience,
        api::handlers::experience::upsert_experience,
        api::handlers::experience::delete_experience,
        api::handlers::portfolio::list_portfolio,
        api::handlers::portfolio::get_portfolio,
        api::handlers::portfolio::upsert_portfolio,
        api::handlers::portfolio::delete_portfolio,
        api::handlers::profile::get_profile,
        api::handlers::profile::upsert_profile,
        api::handlers::profile::delete_profile,
        api::handlers::users::get_user_cv,
        api::handlers::users::signup,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            entities::users::Model,
            entities::cv_education::Model,
            entities::cv_experience::Model,
            entities::cv_portfolio::Model,
            entities::cv_portfolio_url::Model,
            entities::cv_profile::Model,
            entities::cv_skill::Model,
            entities::cv_level::Model,
            entities::cv_license_certificate::Model,
            api::error::FieldError,
            api::handlers::education::EducationForm,
            api::handlers::experience::ExperienceForm,
            api::handlers::portfolio::PortfolioForm,
            api::handlers::profile::ProfileForm,
            api::handlers::portfolio::PortfolioWithUrls,
            api::handlers::portfolio::PortfolioUrlInput,
            api::handlers::users::SkillWithLevel,
            api::handlers::users::UserCv,
            api::handlers::users::SignupRequest,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "education", description = "Education history"),
        (name = "experience", description = "Work experience"),
        (name = "portfolio", description = "Portfolio entries and their links"),
        (name = "profile", description = "Personal profile"),
        (name = "users", description = "Public CV lookup and signup"),
        (name = "system", description = "Health and status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: Arc<dyn StorageService>,
    pub images: Arc<ImageUploadService>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageService>, config: AppConfig) -> Self {
        let images = Arc::new(ImageUploadService::new(storage.clone(), &config));
        Self {
            db,
            storage,
            images,
            config,
        }
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    if config.allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

pub fn create_app(state: AppState) -> Router {
    use api::handlers::{education, experience, health, portfolio, profile, users};

    // Uploads are served from where they are written
    let images_dir = state.config.public_dir.join("images");
    let files_dir = state.config.public_dir.join("file");

    // GET takes the owner id, DELETE the row id; both share one path pattern
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health::health_check))
        .route("/api/cv/education", post(education::upsert_education))
        .route(
            "/api/cv/education/:id",
            get(education::list_education).delete(education::delete_education),
        )
        .route("/api/cv/experience", post(experience::upsert_experience))
        .route(
            "/api/cv/experience/:id",
            get(experience::list_experience).delete(experience::delete_experience),
        )
        .route("/api/cv/portfolio", post(portfolio::upsert_portfolio))
        .route("/api/cv/portfolio/detail/:id", get(portfolio::get_portfolio))
        .route(
            "/api/cv/portfolio/:id",
            get(portfolio::list_portfolio).delete(portfolio::delete_portfolio),
        )
        .route("/api/cv/profile", post(profile::upsert_profile))
        .route(
            "/api/cv/profile/:id",
            get(profile::get_profile).delete(profile::delete_profile),
        )
        .route("/api/v1/user/signup", post(users::signup))
        .route("/api/v1/user/:username", get(users::get_user_cv))
        .nest_service("/images", ServeDir::new(images_dir))
        .nest_service("/file", ServeDir::new(files_dir))
        .layer(from_fn(api::middleware::metrics::metrics_middleware))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors_layer(&state.config))
        .layer(axum::extract::DefaultBodyLimit::max(state.config.body_limit()))
        .with_state(state)
}
