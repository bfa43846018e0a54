use crate::AppState;
use crate::api::error::AppError;
use crate::api::extract::{ApiMultipart, ApiPath};
use crate::api::handlers::{DataResponse, ListResponse};
use crate::entities::{cv_experience, prelude::*};
use crate::services::image_upload::{EXPERIENCE_IMAGE, ImageSlot};
use crate::services::records::{CvForm, NewImages, upsert_with_images};
use crate::utils::form::FieldReader;
use crate::utils::public_url::RequestOrigin;
use async_trait::async_trait;
use axum::{Json, extract::State};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::Value;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Validate)]
pub struct ExperienceInput {
    pub id: Option<String>,
    #[validate(required(message = "The 'users_id' field is required"))]
    pub users_id: Option<i32>,
    #[validate(
        required(message = "The 'company' field is required"),
        length(max = 255, message = "The 'company' field must be at most 255 characters")
    )]
    pub company: Option<String>,
    #[validate(
        required(message = "The 'job' field is required"),
        length(max = 255, message = "The 'job' field must be at most 255 characters")
    )]
    pub job: Option<String>,
    pub location: Option<String>,
    #[validate(required(message = "The 'start_date' field is required"))]
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(required(message = "The 'description' field is required"))]
    pub description: Option<String>,
    pub is_graduated: bool,
    pub tags: Option<Value>,
}

#[async_trait]
impl CvForm for ExperienceInput {
    type Entity = CvExperience;
    type Model = cv_experience::Model;
    type Active = cv_experience::ActiveModel;

    const SLOTS: &'static [ImageSlot] = &[EXPERIENCE_IMAGE];

    fn read(reader: &mut FieldReader<'_>) -> Self {
        Self {
            id: reader.text("id"),
            users_id: reader.int("users_id"),
            company: reader.text("company"),
            job: reader.text("job"),
            location: reader.text("location"),
            start_date: reader.date("start_date"),
            end_date: reader.date("end_date"),
            description: reader.text("description"),
            is_graduated: reader.flag("is_graduated"),
            tags: reader.tags("tags"),
        }
    }

    fn users_id(&self) -> i32 {
        self.users_id.unwrap_or_default()
    }

    async fn find_existing(
        &self,
        db: &DatabaseConnection,
    ) -> Result<Option<cv_experience::Model>, DbErr> {
        match &self.id {
            Some(id) => CvExperience::find_by_id(id.clone()).one(db).await,
            None => Ok(None),
        }
    }

    fn stored_image(row: &cv_experience::Model, _slot: &ImageSlot) -> Option<String> {
        row.image_company.clone()
    }

    fn new_row(now: DateTime<Utc>) -> cv_experience::ActiveModel {
        cv_experience::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            image_company: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
    }

    fn apply(
        &self,
        row: &mut cv_experience::ActiveModel,
        images: &NewImages<'_>,
        now: DateTime<Utc>,
    ) {
        row.users_id = Set(self.users_id());
        row.company = Set(self.company.clone().unwrap_or_default());
        row.job = Set(self.job.clone().unwrap_or_default());
        row.location = Set(self.location.clone());
        row.start_date = Set(self.start_date.unwrap_or_default());
        row.end_date = Set(self.end_date);
        row.description = Set(self.description.clone().unwrap_or_default());
        row.is_graduated = Set(self.is_graduated);
        row.tags = Set(self.tags.clone());
        if let Some(image) = images.get(&EXPERIENCE_IMAGE) {
            row.image_company = Set(Some(image));
        }
        row.updated_at = Set(now);
    }
}

/// Multipart body of `POST /api/cv/experience`
#[derive(ToSchema)]
pub struct ExperienceForm {
    pub id: Option<String>,
    pub users_id: i32,
    pub company: String,
    pub job: String,
    pub location: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub description: String,
    pub is_graduated: Option<bool>,
    pub tags: Option<Vec<String>>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub image_company: Option<Vec<u8>>,
}

#[utoipa::path(
    get,
    path = "/api/cv/experience/{users_id}",
    params(("users_id" = i32, Path, description = "Owner of the entries")),
    responses(
        (status = 200, description = "Experience entries, newest first", body = [cv_experience::Model])
    ),
    tag = "experience"
)]
pub async fn list_experience(
    State(state): State<AppState>,
    origin: RequestOrigin,
    ApiPath(users_id): ApiPath<i32>,
) -> Result<Json<ListResponse<cv_experience::Model>>, AppError> {
    let mut rows = CvExperience::find()
        .filter(cv_experience::Column::UsersId.eq(users_id))
        .order_by_desc(cv_experience::Column::StartDate)
        .all(&state.db)
        .await?;

    for row in &mut rows {
        origin.expand(EXPERIENCE_IMAGE.base_url, &mut row.image_company);
    }

    Ok(Json(ListResponse::new(rows)))
}

#[utoipa::path(
    post,
    path = "/api/cv/experience",
    request_body(content = ExperienceForm, content_type = "multipart/form-data", description = "Experience fields, `tags` and an optional `image_company` file"),
    responses(
        (status = 200, description = "Experience created or updated", body = cv_experience::Model),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "User not found")
    ),
    tag = "experience"
)]
pub async fn upsert_experience(
    State(state): State<AppState>,
    ApiMultipart(multipart): ApiMultipart,
) -> Result<Json<DataResponse<cv_experience::Model>>, AppError> {
    let saved = upsert_with_images::<ExperienceInput>(&state, multipart).await?;
    let message = saved.message("Experience");
    info!("💼 {} ({}) for user {}", message, saved.row.id, saved.row.users_id);

    Ok(Json(DataResponse::new(message, saved.row)))
}

#[utoipa::path(
    delete,
    path = "/api/cv/experience/{id}",
    params(("id" = String, Path, description = "Experience id")),
    responses(
        (status = 200, description = "Experience deleted", body = cv_experience::Model),
        (status = 404, description = "Experience not found")
    ),
    tag = "experience"
)]
pub async fn delete_experience(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<DataResponse<cv_experience::Model>>, AppError> {
    let row = CvExperience::find_by_id(id.clone())
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Experience not found with id {}", id)))?;

    CvExperience::delete_by_id(row.id.clone())
        .exec(&state.db)
        .await?;

    if let Some(image) = row.image_company.as_deref() {
        state.images.remove(&EXPERIENCE_IMAGE, image).await;
    }

    Ok(Json(DataResponse::new(
        format!("Experience with id {} deleted", row.id),
        row,
    )))
}
