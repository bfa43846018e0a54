//! The upsert shared by every CV resource: parse the multipart form,
//! validate it, resolve the row and its owner, stage the uploaded images,
//! then save the row and only afterwards commit or discard the images.

use crate::AppState;
use crate::api::error::AppError;
use crate::entities::{prelude::*, users};
use crate::services::image_upload::{ImageSlot, StagedImage, UploadTarget};
use crate::utils::form::FieldReader;
use crate::utils::multipart::MultipartForm;
use async_trait::async_trait;
use axum::extract::Multipart;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, IntoActiveModel, TransactionTrait,
};
use validator::Validate;

/// A multipart form that creates or updates one row of `Entity`.
#[async_trait]
pub trait CvForm: Validate + Send + Sync + Sized {
    type Entity: EntityTrait<Model = Self::Model, ActiveModel = Self::Active>;
    type Model: IntoActiveModel<Self::Active> + Send + Sync;
    type Active: ActiveModelBehavior<Entity = Self::Entity> + Send + 'static;

    /// Image fields the form may carry
    const SLOTS: &'static [ImageSlot];

    fn read(reader: &mut FieldReader<'_>) -> Self;
    fn users_id(&self) -> i32;

    /// The row this form updates; `None` creates a new one.
    async fn find_existing(&self, db: &DatabaseConnection) -> Result<Option<Self::Model>, DbErr>;

    /// Filename `row` currently stores for `slot`
    fn stored_image(row: &Self::Model, slot: &ImageSlot) -> Option<String>;

    /// Empty row with a generated id and `created_at`
    fn new_row(now: DateTime<Utc>) -> Self::Active;

    /// Copies the submitted fields onto `row`. Images not in `images` keep
    /// their stored value.
    fn apply(&self, row: &mut Self::Active, images: &NewImages<'_>, now: DateTime<Utc>);

    /// Writes that belong in the same transaction as the row itself
    async fn after_save(
        &self,
        _txn: &DatabaseTransaction,
        _row: &Self::Model,
    ) -> Result<(), AppError> {
        Ok(())
    }
}

/// Filenames of the images uploaded with the form
pub struct NewImages<'a>(&'a [StagedImage]);

impl NewImages<'_> {
    pub fn get(&self, slot: &ImageSlot) -> Option<String> {
        self.0
            .iter()
            .find(|staged| staged.slot == *slot)
            .map(|staged| staged.filename.clone())
    }
}

#[derive(Debug)]
pub struct Upserted<M> {
    pub row: M,
    pub created: bool,
}

impl<M> Upserted<M> {
    /// "`name` created" or "`name` updated"
    pub fn message(&self, name: &str) -> String {
        let verb = if self.created { "created" } else { "updated" };
        format!("{} {}", name, verb)
    }
}

pub async fn upsert_with_images<F: CvForm>(
    state: &AppState,
    multipart: Multipart,
) -> Result<Upserted<F::Model>, AppError> {
    let mut form =
        MultipartForm::from_multipart(multipart, state.config.upload_tmp_dir.as_deref()).await?;

    let input = {
        let mut reader = FieldReader::new(&form);
        let input = F::read(&mut reader);
        reader.finish(input)?
    };

    let existing = input.find_existing(&state.db).await?;
    ensure_user_exists(&state.db, input.users_id()).await?;

    let mut staged = Vec::new();
    for slot in F::SLOTS {
        let Some(uploaded_file) = form.take_file(slot.field) else {
            continue;
        };
        let previous_filename = existing.as_ref().and_then(|row| F::stored_image(row, slot));
        let target = UploadTarget {
            previous_filename: previous_filename.as_deref(),
            uploaded_file,
        };
        match state.images.stage(slot, target).await {
            Ok(image) => staged.push(image),
            Err(e) => {
                discard_all(state, staged).await;
                return Err(e);
            }
        }
    }

    let now = Utc::now();
    let created = existing.is_none();
    let mut active = match existing {
        Some(row) => row.into_active_model(),
        None => F::new_row(now),
    };
    input.apply(&mut active, &NewImages(&staged), now);

    let row = match write_row(&state.db, &input, active, !created).await {
        Ok(row) => row,
        Err(e) => {
            discard_all(state, staged).await;
            return Err(e);
        }
    };

    for image in staged {
        state.images.commit(image).await?;
    }

    Ok(Upserted { row, created })
}

async fn write_row<F: CvForm>(
    db: &DatabaseConnection,
    input: &F,
    active: F::Active,
    exists: bool,
) -> Result<F::Model, AppError> {
    // Dropping the transaction on error rolls it back
    let txn = db.begin().await?;
    let row = save(&txn, active, exists).await?;
    input.after_save(&txn, &row).await?;
    txn.commit().await?;
    Ok(row)
}

async fn discard_all(state: &AppState, staged: Vec<StagedImage>) {
    for image in staged {
        state.images.discard(image).await;
    }
}

pub async fn ensure_user_exists<C: ConnectionTrait>(
    db: &C,
    users_id: i32,
) -> Result<users::Model, AppError> {
    Users::find_by_id(users_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User not found with id {}", users_id)))
}

/// Update when the row was loaded from the database, insert otherwise.
pub async fn save<C, A>(
    db: &C,
    active: A,
    exists: bool,
) -> Result<<A::Entity as EntityTrait>::Model, AppError>
where
    C: ConnectionTrait,
    A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
{
    let model = if exists {
        active.update(db).await?
    } else {
        active.insert(db).await?
    };
    Ok(model)
}
