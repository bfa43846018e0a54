use crate::AppState;
use crate::api::error::AppError;
use crate::api::extract::{ApiMultipart, ApiPath};
use crate::api::handlers::DataResponse;
use crate::entities::{cv_profile, prelude::*};
use crate::services::image_upload::{ImageSlot, PROFILE_BANNER, PROFILE_IMAGE};
use crate::services::records::{CvForm, NewImages, upsert_with_images};
use crate::utils::form::FieldReader;
use crate::utils::public_url::{PROFILE_RESUME_BASE_URL, RequestOrigin};
use async_trait::async_trait;
use axum::{Json, extract::State};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Validate)]
pub struct ProfileInput {
    pub id: Option<String>,
    #[validate(required(message = "The 'users_id' field is required"))]
    pub users_id: Option<i32>,
    #[validate(
        required(message = "The 'name' field is required"),
        length(max = 255, message = "The 'name' field must be at most 255 characters")
    )]
    pub name: Option<String>,
    #[validate(length(max = 255, message = "The 'motto' field must be at most 255 characters"))]
    pub motto: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 50, message = "The 'phone' field must be at most 50 characters"))]
    pub phone: Option<String>,
    #[validate(url(message = "The 'web' field must be a valid URL"))]
    pub web: Option<String>,
    pub location: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

/// A user has at most one profile: without a known `id` the user's
/// existing profile is updated.
#[async_trait]
impl CvForm for ProfileInput {
    type Entity = CvProfile;
    type Model = cv_profile::Model;
    type Active = cv_profile::ActiveModel;

    const SLOTS: &'static [ImageSlot] = &[PROFILE_IMAGE, PROFILE_BANNER];

    fn read(reader: &mut FieldReader<'_>) -> Self {
        Self {
            id: reader.text("id"),
            users_id: reader.int("users_id"),
            name: reader.text("name"),
            motto: reader.text("motto"),
            description: reader.text("description"),
            phone: reader.text("phone"),
            web: reader.text("web"),
            location: reader.text("location"),
            birth_date: reader.date("birth_date"),
        }
    }

    fn users_id(&self) -> i32 {
        self.users_id.unwrap_or_default()
    }

    async fn find_existing(
        &self,
        db: &DatabaseConnection,
    ) -> Result<Option<cv_profile::Model>, DbErr> {
        if let Some(id) = &self.id {
            if let Some(row) = CvProfile::find_by_id(id.clone()).one(db).await? {
                return Ok(Some(row));
            }
        }
        CvProfile::find()
            .filter(cv_profile::Column::UsersId.eq(self.users_id()))
            .one(db)
            .await
    }

    fn stored_image(row: &cv_profile::Model, slot: &ImageSlot) -> Option<String> {
        if *slot == PROFILE_BANNER {
            row.banner_image.clone()
        } else {
            row.image.clone()
        }
    }

    fn new_row(now: DateTime<Utc>) -> cv_profile::ActiveModel {
        cv_profile::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            image: Set(None),
            banner_image: Set(None),
            latest_resume: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
    }

    fn apply(
        &self,
        row: &mut cv_profile::ActiveModel,
        images: &NewImages<'_>,
        now: DateTime<Utc>,
    ) {
        row.users_id = Set(self.users_id());
        row.name = Set(self.name.clone().unwrap_or_default());
        row.motto = Set(self.motto.clone());
        row.description = Set(self.description.clone());
        row.phone = Set(self.phone.clone());
        row.web = Set(self.web.clone());
        row.location = Set(self.location.clone());
        row.birth_date = Set(self.birth_date);
        if let Some(image) = images.get(&PROFILE_IMAGE) {
            row.image = Set(Some(image));
        }
        if let Some(banner_image) = images.get(&PROFILE_BANNER) {
            row.banner_image = Set(Some(banner_image));
        }
        row.updated_at = Set(now);
    }
}

#[derive(ToSchema)]
pub struct ProfileForm {
    pub id: Option<String>,
    pub users_id: i32,
    pub name: String,
    pub motto: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub web: Option<String>,
    pub location: Option<String>,
    pub birth_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<Vec<u8>>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub banner_image: Option<Vec<u8>>,
}

pub fn expand_profile(origin: &RequestOrigin, mut profile: cv_profile::Model) -> cv_profile::Model {
    origin.expand(PROFILE_IMAGE.base_url, &mut profile.image);
    origin.expand(PROFILE_BANNER.base_url, &mut profile.banner_image);
    origin.expand(PROFILE_RESUME_BASE_URL, &mut profile.latest_resume);
    profile
}

#[utoipa::path(
    get,
    path = "/api/cv/profile/{users_id}",
    params(("users_id" = i32, Path, description = "Owner of the profile")),
    responses(
        (status = 200, description = "Profile of the user", body = cv_profile::Model),
        (status = 404, description = "Profile not found")
    ),
    tag = "profile"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    origin: RequestOrigin,
    ApiPath(users_id): ApiPath<i32>,
) -> Result<Json<DataResponse<cv_profile::Model>>, AppError> {
    let profile = CvProfile::find()
        .filter(cv_profile::Column::UsersId.eq(users_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Profile not found for user {}", users_id))
        })?;

    Ok(Json(DataResponse::data(expand_profile(&origin, profile))))
}

#[utoipa::path(
    post,
    path = "/api/cv/profile",
    request_body(content = ProfileForm, content_type = "multipart/form-data", description = "Profile fields and optional `image` and `banner_image` files"),
    responses(
        (status = 200, description = "Profile created or updated", body = cv_profile::Model),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "User not found")
    ),
    tag = "profile"
)]
pub async fn upsert_profile(
    State(state): State<AppState>,
    ApiMultipart(multipart): ApiMultipart,
) -> Result<Json<DataResponse<cv_profile::Model>>, AppError> {
    let saved = upsert_with_images::<ProfileInput>(&state, multipart).await?;
    let message = saved.message("Profile");
    info!("🪪 {} ({}) for user {}", message, saved.row.id, saved.row.users_id);

    Ok(Json(DataResponse::new(message, saved.row)))
}

#[utoipa::path(
    delete,
    path = "/api/cv/profile/{id}",
    params(("id" = String, Path, description = "Profile id")),
    responses(
        (status = 200, description = "Profile deleted", body = cv_profile::Model),
        (status = 404, description = "Profile not found")
    ),
    tag = "profile"
)]
pub async fn delete_profile(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<DataResponse<cv_profile::Model>>, AppError> {
    let row = CvProfile::find_by_id(id.clone())
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile not found with id {}", id)))?;

    CvProfile::delete_by_id(row.id.clone()).exec(&state.db).await?;

    if let Some(image) = row.image.as_deref() {
        state.images.remove(&PROFILE_IMAGE, image).await;
    }
    if let Some(banner_image) = row.banner_image.as_deref() {
        state.images.remove(&PROFILE_BANNER, banner_image).await;
    }

    Ok(Json(DataResponse::new(
        format!("Profile with id {} deleted", row.id),
        row,
    )))
}
