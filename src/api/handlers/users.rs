use crate::AppState;
use crate::api::error::{AppError, FieldError};
use crate::api::extract::{ApiJson, ApiPath};
use crate::api::handlers::DataResponse;
use crate::api::handlers::portfolio::{PortfolioWithUrls, with_urls};
use crate::api::handlers::profile::expand_profile;
use crate::entities::{
    cv_education, cv_experience, cv_level, cv_license_certificate, cv_portfolio, cv_profile,
    cv_skill, prelude::*, users,
};
use crate::services::image_upload::{EDUCATION_IMAGE, EXPERIENCE_IMAGE, PORTFOLIO_THUMBNAIL};
use crate::utils::public_url::{LICENSE_CERTIFICATE_BASE_URL, RequestOrigin};
use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

pub const STATUS_PROCESS_VERIFICATION: &str = "process_verification";

/// A skill and the level it is held at
#[derive(Debug, Serialize, ToSchema)]
pub struct SkillWithLevel {
    #[serde(flatten)]
    pub skill: cv_skill::Model,
    pub level: Option<cv_level::Model>,
}

/// Everything shown on a public CV page
#[derive(Debug, Serialize, ToSchema)]
pub struct UserCv {
    #[serde(flatten)]
    pub user: users::Model,
    pub profile: Option<cv_profile::Model>,
    pub skill: Vec<SkillWithLevel>,
    pub experience: Vec<cv_experience::Model>,
    pub education: Vec<cv_education::Model>,
    pub license_certificate: Vec<cv_license_certificate::Model>,
    pub portfolio: Vec<PortfolioWithUrls>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SignupRequest {
    #[validate(
        length(min = 8, max = 50, message = "The 'username' field must be between 8 and 50 characters"),
        custom(function = "validate_alpha_dash")
    )]
    pub username: String,
    #[validate(length(min = 8, message = "The 'password' field must be at least 8 characters"))]
    pub password: String,
    #[validate(email(message = "The 'email' field must be a valid e-mail"))]
    pub email: String,
}

/// Letters, digits, `-` and `_` only.
pub fn validate_alpha_dash(value: &str) -> Result<(), ValidationError> {
    if value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("alphadash").with_message(
            "The 'username' field may only contain letters, numbers, dashes and underscores".into(),
        ))
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/user/{username}",
    params(("username" = String, Path, description = "Public username")),
    responses(
        (status = 200, description = "User with profile, skills, experience, education, licenses and portfolio", body = UserCv),
        (status = 404, description = "User not found")
    ),
    tag = "users"
)]
pub async fn get_user_cv(
    State(state): State<AppState>,
    origin: RequestOrigin,
    ApiPath(username): ApiPath<String>,
) -> Result<Json<DataResponse<UserCv>>, AppError> {
    let user = Users::find()
        .filter(users::Column::Username.eq(username.clone()))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User not found: {}", username)))?;

    let profile = user
        .find_related(CvProfile)
        .one(&state.db)
        .await?
        .map(|row| expand_profile(&origin, row));

    // Most proficient first
    let skill = user
        .find_related(CvSkill)
        .find_also_related(CvLevel)
        .order_by_desc(cv_level::Column::Order)
        .order_by_asc(cv_skill::Column::Name)
        .all(&state.db)
        .await?
        .into_iter()
        .map(|(skill, level)| SkillWithLevel { skill, level })
        .collect();

    let mut experience = user
        .find_related(CvExperience)
        .order_by_desc(cv_experience::Column::StartDate)
        .all(&state.db)
        .await?;
    for row in &mut experience {
        origin.expand(EXPERIENCE_IMAGE.base_url, &mut row.image_company);
    }

    let mut education = user
        .find_related(CvEducation)
        .order_by_desc(cv_education::Column::StartDate)
        .all(&state.db)
        .await?;
    for row in &mut education {
        origin.expand(EDUCATION_IMAGE.base_url, &mut row.image);
    }

    let mut license_certificate = user
        .find_related(CvLicenseCertificate)
        .order_by_desc(cv_license_certificate::Column::StartDate)
        .all(&state.db)
        .await?;
    for row in &mut license_certificate {
        origin.expand(LICENSE_CERTIFICATE_BASE_URL, &mut row.file);
    }

    let portfolio_rows = user
        .find_related(CvPortfolio)
        .order_by_desc(cv_portfolio::Column::CreatedAt)
        .all(&state.db)
        .await?;
    let mut portfolio = with_urls(&state.db, portfolio_rows).await?;
    for entry in &mut portfolio {
        origin.expand(PORTFOLIO_THUMBNAIL.base_url, &mut entry.portfolio.thumbnail);
    }

    Ok(Json(DataResponse::new(
        format!("Found user {}", user.username),
        UserCv {
            user,
            profile,
            skill,
            experience,
            education,
            license_certificate,
            portfolio,
        },
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/user/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Account created, pending verification", body = users::Model),
        (status = 400, description = "Validation failed or username taken")
    ),
    tag = "users"
)]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<Json<DataResponse<users::Model>>, AppError> {
    payload.validate()?;

    let taken = Users::find()
        .filter(users::Column::Username.eq(payload.username.clone()))
        .one(&state.db)
        .await?
        .is_some();
    if taken {
        return Err(AppError::Validation(vec![FieldError::new(
            "username",
            "unique",
            format!("The username '{}' is already taken", payload.username),
        )]));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .to_string();

    let now = Utc::now();
    let user = users::ActiveModel {
        username: Set(payload.username.clone()),
        email: Set(payload.email),
        name: Set(payload.username),
        password_hash: Set(password_hash),
        status: Set(STATUS_PROCESS_VERIFICATION.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("👤 Signed up {} ({})", user.username, user.id);

    Ok(Json(DataResponse::new(
        format!("Created user {}", user.username),
        user,
    )))
}
