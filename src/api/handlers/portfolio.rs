use crate::AppState;
use crate::api::error::{AppError, FieldError};
use crate::api::extract::{ApiMultipart, ApiPath};
use crate::api::handlers::{DataResponse, ListResponse};
use crate::entities::{cv_portfolio, cv_portfolio_url, prelude::*};
use crate::services::image_upload::{ImageSlot, PORTFOLIO_THUMBNAIL};
use crate::services::records::{CvForm, NewImages, upsert_with_images};
use crate::utils::form::FieldReader;
use crate::utils::public_url::RequestOrigin;
use async_trait::async_trait;
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    LoaderTrait, ModelTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A portfolio row together with its links
#[derive(Debug, Serialize, ToSchema)]
pub struct PortfolioWithUrls {
    #[serde(flatten)]
    pub portfolio: cv_portfolio::Model,
    pub urls: Vec<cv_portfolio_url::Model>,
}

impl PortfolioWithUrls {
    fn expand(mut self, origin: &RequestOrigin) -> Self {
        origin.expand(PORTFOLIO_THUMBNAIL.base_url, &mut self.portfolio.thumbnail);
        self
    }
}

/// One entry of the `urls` form field
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PortfolioUrlInput {
    pub nameurl: String,
    pub contenturl: String,
}

#[derive(Debug, Validate)]
pub struct PortfolioInput {
    pub id: Option<String>,
    #[validate(required(message = "The 'users_id' field is required"))]
    pub users_id: Option<i32>,
    #[validate(
        required(message = "The 'title' field is required"),
        length(max = 255, message = "The 'title' field must be at most 255 characters")
    )]
    pub title: Option<String>,
    #[validate(
        required(message = "The 'slug' field is required"),
        length(max = 255, message = "The 'slug' field must be at most 255 characters")
    )]
    pub slug: Option<String>,
    #[validate(required(message = "The 'description' field is required"))]
    pub description: Option<String>,
    pub tags: Option<Value>,
    pub urls: Vec<PortfolioUrlInput>,
}

#[async_trait]
impl CvForm for PortfolioInput {
    type Entity = CvPortfolio;
    type Model = cv_portfolio::Model;
    type Active = cv_portfolio::ActiveModel;

    const SLOTS: &'static [ImageSlot] = &[PORTFOLIO_THUMBNAIL];

    fn read(reader: &mut FieldReader<'_>) -> Self {
        Self {
            id: reader.text("id"),
            users_id: reader.int("users_id"),
            title: reader.text("title"),
            slug: reader.text("slug"),
            description: reader.text("description"),
            tags: reader.tags("tags"),
            urls: read_urls(reader),
        }
    }

    fn users_id(&self) -> i32 {
        self.users_id.unwrap_or_default()
    }

    async fn find_existing(
        &self,
        db: &DatabaseConnection,
    ) -> Result<Option<cv_portfolio::Model>, DbErr> {
        match &self.id {
            Some(id) => CvPortfolio::find_by_id(id.clone()).one(db).await,
            None => Ok(None),
        }
    }

    fn stored_image(row: &cv_portfolio::Model, _slot: &ImageSlot) -> Option<String> {
        row.thumbnail.clone()
    }

    fn new_row(now: DateTime<Utc>) -> cv_portfolio::ActiveModel {
        cv_portfolio::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            thumbnail: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
    }

    fn apply(
        &self,
        row: &mut cv_portfolio::ActiveModel,
        images: &NewImages<'_>,
        now: DateTime<Utc>,
    ) {
        row.users_id = Set(self.users_id());
        row.title = Set(self.title.clone().unwrap_or_default());
        row.slug = Set(self.slug.clone().unwrap_or_default());
        row.description = Set(self.description.clone().unwrap_or_default());
        row.tags = Set(self.tags.clone());
        if let Some(thumbnail) = images.get(&PORTFOLIO_THUMBNAIL) {
            row.thumbnail = Set(Some(thumbnail));
        }
        row.updated_at = Set(now);
    }

    /// The submitted links replace the portfolio's links
    async fn after_save(
        &self,
        txn: &DatabaseTransaction,
        row: &cv_portfolio::Model,
    ) -> Result<(), AppError> {
        CvPortfolioUrl::delete_many()
            .filter(cv_portfolio_url::Column::PortfolioId.eq(row.id.clone()))
            .exec(txn)
            .await?;

        if self.urls.is_empty() {
            return Ok(());
        }
        let links = self.urls.iter().map(|u| cv_portfolio_url::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            portfolio_id: Set(row.id.clone()),
            users_id: Set(row.users_id),
            name: Set(u.nameurl.clone()),
            url: Set(u.contenturl.clone()),
        });
        CvPortfolioUrl::insert_many(links)
            .exec_without_returning(txn)
            .await?;
        Ok(())
    }
}

#[derive(ToSchema)]
pub struct PortfolioForm {
    pub id: Option<String>,
    pub users_id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub tags: Option<Vec<String>>,
    /// JSON array of `{nameurl, contenturl}`
    pub urls: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub thumbnail: Option<Vec<u8>>,
}

/// `urls` arrives as a JSON string: `[{"nameurl": "..", "contenturl": ".."}]`
fn read_urls(reader: &mut FieldReader<'_>) -> Vec<PortfolioUrlInput> {
    let Some(raw) = reader.text("urls") else {
        return Vec::new();
    };

    let urls: Vec<PortfolioUrlInput> = match serde_json::from_str(&raw) {
        Ok(urls) => urls,
        Err(_) => {
            reader.push_error(FieldError::new(
                "urls",
                "array",
                "The 'urls' field must be a JSON array of {nameurl, contenturl}",
            ));
            return Vec::new();
        }
    };

    if urls
        .iter()
        .any(|u| u.nameurl.trim().is_empty() || u.contenturl.trim().is_empty())
    {
        reader.push_error(FieldError::new(
            "urls",
            "required",
            "Every entry of 'urls' needs a nameurl and a contenturl",
        ));
    }
    urls
}

/// Loads the links of each portfolio, keeping the order of `rows`.
pub async fn with_urls<C: ConnectionTrait>(
    db: &C,
    rows: Vec<cv_portfolio::Model>,
) -> Result<Vec<PortfolioWithUrls>, DbErr> {
    let urls = rows.load_many(CvPortfolioUrl, db).await?;
    Ok(rows
        .into_iter()
        .zip(urls)
        .map(|(portfolio, urls)| PortfolioWithUrls { portfolio, urls })
        .collect())
}

#[utoipa::path(
    get,
    path = "/api/cv/portfolio/{users_id}",
    params(("users_id" = i32, Path, description = "Owner of the entries")),
    responses(
        (status = 200, description = "Portfolio entries with their links", body = [PortfolioWithUrls])
    ),
    tag = "portfolio"
)]
pub async fn list_portfolio(
    State(state): State<AppState>,
    origin: RequestOrigin,
    ApiPath(users_id): ApiPath<i32>,
) -> Result<Json<ListResponse<PortfolioWithUrls>>, AppError> {
    let rows = CvPortfolio::find()
        .filter(cv_portfolio::Column::UsersId.eq(users_id))
        .order_by_desc(cv_portfolio::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let data = with_urls(&state.db, rows)
        .await?
        .into_iter()
        .map(|p| p.expand(&origin))
        .collect();

    Ok(Json(ListResponse::new(data)))
}

#[utoipa::path(
    get,
    path = "/api/cv/portfolio/detail/{id}",
    params(("id" = String, Path, description = "Portfolio id")),
    responses(
        (status = 200, description = "Portfolio with its links", body = PortfolioWithUrls),
        (status = 404, description = "Portfolio not found")
    ),
    tag = "portfolio"
)]
pub async fn get_portfolio(
    State(state): State<AppState>,
    origin: RequestOrigin,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<DataResponse<PortfolioWithUrls>>, AppError> {
    let portfolio = CvPortfolio::find_by_id(id.clone())
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Portfolio not found with id {}", id)))?;
    let urls = portfolio.find_related(CvPortfolioUrl).all(&state.db).await?;

    Ok(Json(DataResponse::data(
        PortfolioWithUrls { portfolio, urls }.expand(&origin),
    )))
}

#[utoipa::path(
    post,
    path = "/api/cv/portfolio",
    request_body(content = PortfolioForm, content_type = "multipart/form-data", description = "Portfolio fields, `tags`, `urls` (JSON) and an optional `thumbnail` file"),
    responses(
        (status = 200, description = "Portfolio created or updated", body = PortfolioWithUrls),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "User not found")
    ),
    tag = "portfolio"
)]
pub async fn upsert_portfolio(
    State(state): State<AppState>,
    ApiMultipart(multipart): ApiMultipart,
) -> Result<Json<DataResponse<PortfolioWithUrls>>, AppError> {
    let saved = upsert_with_images::<PortfolioInput>(&state, multipart).await?;
    let message = saved.message("Portfolio");
    let portfolio = saved.row;
    let urls = portfolio.find_related(CvPortfolioUrl).all(&state.db).await?;
    info!(
        "🗂️  {} ({}) with {} link(s) for user {}",
        message,
        portfolio.id,
        urls.len(),
        portfolio.users_id
    );

    Ok(Json(DataResponse::new(
        message,
        PortfolioWithUrls { portfolio, urls },
    )))
}

#[utoipa::path(
    delete,
    path = "/api/cv/portfolio/{id}",
    params(("id" = String, Path, description = "Portfolio id")),
    responses(
        (status = 200, description = "Portfolio and its links deleted", body = cv_portfolio::Model),
        (status = 404, description = "Portfolio not found")
    ),
    tag = "portfolio"
)]
pub async fn delete_portfolio(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<DataResponse<cv_portfolio::Model>>, AppError> {
    let row = CvPortfolio::find_by_id(id.clone())
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Portfolio not found with id {}", id)))?;

    let txn = state.db.begin().await?;
    CvPortfolioUrl::delete_many()
        .filter(cv_portfolio_url::Column::PortfolioId.eq(row.id.clone()))
        .exec(&txn)
        .await?;
    CvPortfolio::delete_by_id(row.id.clone()).exec(&txn).await?;
    txn.commit().await?;

    if let Some(thumbnail) = row.thumbnail.as_deref() {
        state.images.remove(&PORTFOLIO_THUMBNAIL, thumbnail).await;
    }

    Ok(Json(DataResponse::new(
        format!("Portfolio with id {} deleted", row.id),
        row,
    )))
}
