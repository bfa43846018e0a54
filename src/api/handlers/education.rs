use crate::AppState;
use crate::api::error::AppError;
use crate::api::extract::{ApiMultipart, ApiPath};
use crate::api::handlers::{DataResponse, ListResponse};
use crate::entities::{cv_education, prelude::*};
use crate::services::image_upload::{EDUCATION_IMAGE, ImageSlot};
use crate::services::records::{CvForm, NewImages, upsert_with_images};
use crate::utils::form::FieldReader;
use crate::utils::public_url::RequestOrigin;
use async_trait::async_trait;
use axum::{Json, extract::State};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Validate)]
pub struct EducationInput {
    pub id: Option<String>,
    #[validate(required(message = "The 'users_id' field is required"))]
    pub users_id: Option<i32>,
    #[validate(
        required(message = "The 'name' field is required"),
        length(max = 255, message = "The 'name' field must be at most 255 characters")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "The 'major' field is required"),
        length(max = 255, message = "The 'major' field must be at most 255 characters")
    )]
    pub major: Option<String>,
    #[validate(
        required(message = "The 'field_of_study' field is required"),
        length(max = 255, message = "The 'field_of_study' field must be at most 255 characters")
    )]
    pub field_of_study: Option<String>,
    #[validate(required(message = "The 'start_date' field is required"))]
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_graduated: bool,
}

#[async_trait]
impl CvForm for EducationInput {
    type Entity = CvEducation;
    type Model = cv_education::Model;
    type Active = cv_education::ActiveModel;

    const SLOTS: &'static [ImageSlot] = &[EDUCATION_IMAGE];

    fn read(reader: &mut FieldReader<'_>) -> Self {
        Self {
            id: reader.text("id"),
            users_id: reader.int("users_id"),
            name: reader.text("name"),
            major: reader.text("major"),
            field_of_study: reader.text("field_of_study"),
            start_date: reader.date("start_date"),
            end_date: reader.date("end_date"),
            is_graduated: reader.flag("is_graduated"),
        }
    }

    fn users_id(&self) -> i32 {
        self.users_id.unwrap_or_default()
    }

    async fn find_existing(
        &self,
        db: &DatabaseConnection,
    ) -> Result<Option<cv_education::Model>, DbErr> {
        match &self.id {
            Some(id) => CvEducation::find_by_id(id.clone()).one(db).await,
            None => Ok(None),
        }
    }

    fn stored_image(row: &cv_education::Model, _slot: &ImageSlot) -> Option<String> {
        row.image.clone()
    }

    fn new_row(now: DateTime<Utc>) -> cv_education::ActiveModel {
        cv_education::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            image: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
    }

    // Required fields were checked before this runs
    fn apply(
        &self,
        row: &mut cv_education::ActiveModel,
        images: &NewImages<'_>,
        now: DateTime<Utc>,
    ) {
        row.users_id = Set(self.users_id());
        row.name = Set(self.name.clone().unwrap_or_default());
        row.major = Set(self.major.clone().unwrap_or_default());
        row.field_of_study = Set(self.field_of_study.clone().unwrap_or_default());
        row.start_date = Set(self.start_date.unwrap_or_default());
        row.end_date = Set(self.end_date);
        row.is_graduated = Set(self.is_graduated);
        if let Some(image) = images.get(&EDUCATION_IMAGE) {
            row.image = Set(Some(image));
        }
        row.updated_at = Set(now);
    }
}

#[derive(ToSchema)]
pub struct EducationForm {
    pub id: Option<String>,
    pub users_id: i32,
    pub name: String,
    pub major: String,
    pub field_of_study: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_graduated: Option<bool>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<Vec<u8>>,
}

#[utoipa::path(
    get,
    path = "/api/cv/education/{users_id}",
    params(("users_id" = i32, Path, description = "Owner of the entries")),
    responses(
        (status = 200, description = "Education entries, newest first", body = [cv_education::Model])
    ),
    tag = "education"
)]
pub async fn list_education(
    State(state): State<AppState>,
    origin: RequestOrigin,
    ApiPath(users_id): ApiPath<i32>,
) -> Result<Json<ListResponse<cv_education::Model>>, AppError> {
    let mut rows = CvEducation::find()
        .filter(cv_education::Column::UsersId.eq(users_id))
        .order_by_desc(cv_education::Column::StartDate)
        .all(&state.db)
        .await?;

    for row in &mut rows {
        origin.expand(EDUCATION_IMAGE.base_url, &mut row.image);
    }

    Ok(Json(ListResponse::new(rows)))
}

#[utoipa::path(
    post,
    path = "/api/cv/education",
    request_body(content = EducationForm, content_type = "multipart/form-data", description = "Education fields and an optional `image` file"),
    responses(
        (status = 200, description = "Education created or updated", body = cv_education::Model),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "User not found")
    ),
    tag = "education"
)]
pub async fn upsert_education(
    State(state): State<AppState>,
    ApiMultipart(multipart): ApiMultipart,
) -> Result<Json<DataResponse<cv_education::Model>>, AppError> {
    let saved = upsert_with_images::<EducationInput>(&state, multipart).await?;
    let message = saved.message("Education");
    info!("🎓 {} ({}) for user {}", message, saved.row.id, saved.row.users_id);

    Ok(Json(DataResponse::new(message, saved.row)))
}

#[utoipa::path(
    delete,
    path = "/api/cv/education/{id}",
    params(("id" = String, Path, description = "Education id")),
    responses(
        (status = 200, description = "Education deleted", body = cv_education::Model),
        (status = 404, description = "Education not found")
    ),
    tag = "education"
)]
pub async fn delete_education(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<DataResponse<cv_education::Model>>, AppError> {
    let row = CvEducation::find_by_id(id.clone())
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Education not found with id {}", id)))?;

    CvEducation::delete_by_id(row.id.clone()).exec(&state.db).await?;

    if let Some(image) = row.image.as_deref() {
        state.images.remove(&EDUCATION_IMAGE, image).await;
    }

    Ok(Json(DataResponse::new(
        format!("Education with id {} deleted", row.id),
        row,
    )))
}
