use crate::api::error::AppError;
use crate::config::AppConfig;
use crate::services::image_processor::{self, EncodeOptions, OutputFormat};
use crate::services::storage::StorageService;
use crate::utils::multipart::UploadedFile;
use crate::utils::validation::{
    UploadValidationError, validate_extension, validate_file_size, validate_mime_type,
    verify_image_magic,
};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Where one kind of image lives and how large it may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSlot {
    /// Multipart field carrying the file
    pub field: &'static str,
    /// Directory under the public root, also the URL prefix
    pub base_url: &'static str,
    pub max_width: u32,
}

impl ImageSlot {
    pub fn key(&self, filename: &str) -> String {
        format!("{}/{}", self.base_url, filename)
    }
}

pub const EXPERIENCE_IMAGE: ImageSlot = ImageSlot {
    field: "image_company",
    base_url: "images/cv/experience",
    max_width: 200,
};

pub const EDUCATION_IMAGE: ImageSlot = ImageSlot {
    field: "image",
    base_url: "images/cv/education",
    max_width: 300,
};

pub const PORTFOLIO_THUMBNAIL: ImageSlot = ImageSlot {
    field: "thumbnail",
    base_url: "images/cv/portfolio",
    max_width: 400,
};

pub const PROFILE_IMAGE: ImageSlot = ImageSlot {
    field: "image",
    base_url: "images/cv/profile",
    max_width: 300,
};

pub const PROFILE_BANNER: ImageSlot = ImageSlot {
    field: "banner_image",
    base_url: "images/cv/profile",
    max_width: 1200,
};

/// A freshly uploaded file and the filename it replaces, if any.
#[derive(Debug)]
pub struct UploadTarget<'a> {
    pub previous_filename: Option<&'a str>,
    pub uploaded_file: UploadedFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenamePlan {
    pub filename: String,
    /// Previous file left behind by an extension change
    pub orphaned: Option<String>,
    /// The new file takes over the previous file's exact name
    pub replaces_previous: bool,
}

/// Picks the stored name for an upload with extension `ext`.
///
/// The base name of `previous` is reused so the record keeps pointing at
/// the same file; without one a UUID v4 is generated. When the extension
/// changes the previous file no longer matches and is reported as
/// orphaned.
pub fn plan_filename(ext: &str, previous: Option<&str>) -> FilenamePlan {
    let previous = previous
        .and_then(|p| Path::new(p).file_name())
        .and_then(|p| p.to_str())
        .filter(|p| !p.is_empty());

    let stem = previous
        .and_then(|p| Path::new(p).file_stem())
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let filename = format!("{}.{}", stem, ext);
    let replaces_previous = previous == Some(filename.as_str());
    let orphaned = previous.filter(|p| *p != filename).map(|p| p.to_string());

    FilenamePlan {
        filename,
        orphaned,
        replaces_previous,
    }
}

/// A validated, re-encoded upload waiting for its row to be saved.
///
/// A new name is written to storage right away, so nothing stored is
/// touched yet. A same-name replacement stays in the temp dir until
/// [`ImageUploadService::commit`]. After a failed save,
/// [`ImageUploadService::discard`] removes whatever was staged.
#[derive(Debug)]
pub struct StagedImage {
    pub slot: ImageSlot,
    pub filename: String,
    orphaned: Option<String>,
    replacement: Option<UploadedFile>,
}

/// Validates, names, stores and re-encodes uploaded images.
pub struct ImageUploadService {
    storage: Arc<dyn StorageService>,
    max_size_mb: u64,
    quality: u8,
    allowed_extensions: Vec<String>,
}

impl ImageUploadService {
    pub fn new(storage: Arc<dyn StorageService>, config: &AppConfig) -> Self {
        Self {
            storage,
            max_size_mb: config.max_image_size_mb,
            quality: config.image_quality,
            allowed_extensions: config.allowed_image_extensions.clone(),
        }
    }

    /// Checks size, extension, declared type and the leading bytes;
    /// returns the lowercased extension.
    pub fn validate(
        &self,
        file: &UploadedFile,
        header: &[u8],
    ) -> Result<String, UploadValidationError> {
        validate_file_size(file.size_bytes, self.max_size_mb)?;
        let ext = validate_extension(&file.original_name, &self.allowed_extensions)?;
        validate_mime_type(file.mime_type.as_deref(), &self.allowed_extensions)?;
        verify_image_magic(header)?;
        Ok(ext)
    }

    /// Validates and re-encodes `target.uploaded_file` for `slot`. The
    /// previous file is left alone until the staged image is committed.
    pub async fn stage(
        &self,
        slot: &ImageSlot,
        target: UploadTarget<'_>,
    ) -> Result<StagedImage, AppError> {
        let UploadTarget {
            previous_filename,
            uploaded_file,
        } = target;

        let header = read_header(uploaded_file.path()).await?;
        let ext = self.validate(&uploaded_file, &header).map_err(|e| {
            warn!(
                "🚫 Rejected upload '{}' for {}: {} ({})",
                uploaded_file.original_name,
                slot.field,
                e,
                e.code()
            );
            AppError::BadRequest(e.to_string())
        })?;

        let format = OutputFormat::from_extension(&ext)
            .ok_or_else(|| AppError::BadRequest(format!("Unsupported image type: {}", ext)))?;
        let plan = plan_filename(&ext, previous_filename);

        let path = uploaded_file.path().to_path_buf();
        let opts = EncodeOptions {
            max_width: slot.max_width,
            quality: self.quality,
        };
        let (width, height) =
            tokio::task::spawn_blocking(move || image_processor::normalize_image(&path, format, opts))
                .await
                .map_err(|e| AppError::Internal(format!("Image task failed: {}", e)))?
                .map_err(|e| {
                    warn!("Failed to process {}: {}", uploaded_file.original_name, e);
                    AppError::BadRequest(format!("Uploaded file is not a valid image: {}", e))
                })?;

        let key = slot.key(&plan.filename);
        debug!("Staged {} ({}x{})", key, width, height);

        if plan.replaces_previous {
            return Ok(StagedImage {
                slot: *slot,
                filename: plan.filename,
                orphaned: None,
                replacement: Some(uploaded_file),
            });
        }

        self.storage.persist_file(uploaded_file.path(), &key).await?;
        // The temp file now lives at `key`; don't let the guard touch it
        let _ = uploaded_file.temp_path.keep();

        Ok(StagedImage {
            slot: *slot,
            filename: plan.filename,
            orphaned: plan.orphaned,
            replacement: None,
        })
    }

    /// Makes a staged image final once its row is saved: moves a
    /// same-name replacement into place and deletes the orphaned file.
    pub async fn commit(&self, staged: StagedImage) -> Result<(), AppError> {
        let key = staged.slot.key(&staged.filename);
        if let Some(file) = staged.replacement {
            self.storage.persist_file(file.path(), &key).await?;
            let _ = file.temp_path.keep();
        }
        info!("🖼️  Stored {}", key);

        if let Some(orphaned) = staged.orphaned {
            self.remove(&staged.slot, &orphaned).await;
        }
        Ok(())
    }

    /// Drops a staged image whose row could not be saved. The file the row
    /// still points at is never touched.
    pub async fn discard(&self, staged: StagedImage) {
        match staged.replacement {
            // Dropping the temp file is enough
            Some(_) => debug!("Dropped staged replacement for {}", staged.filename),
            None => self.remove(&staged.slot, &staged.filename).await,
        }
    }

    /// Deletes a stored image if it exists. Failures are logged only.
    pub async fn remove(&self, slot: &ImageSlot, filename: &str) {
        if filename.is_empty() {
            return;
        }
        let key = slot.key(filename);
        match self.storage.file_exists(&key).await {
            Ok(true) => match self.storage.delete_file(&key).await {
                Ok(()) => info!("🗑️  Deleted {}", key),
                Err(e) => warn!("Failed to delete {}: {}", key, e),
            },
            Ok(false) => debug!("Nothing to delete at {}", key),
            Err(e) => warn!("Failed to check {}: {}", key, e),
        }
    }
}

/// First bytes of an upload, enough for content sniffing.
async fn read_header(path: &Path) -> Result<Vec<u8>, AppError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to open upload: {}", e)))?;
    let mut header = vec![0u8; 64];
    let n = file
        .read(&mut header)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read upload: {}", e)))?;
    header.truncate(n);
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::LocalStorageService;
    use image::{DynamicImage, ImageOutputFormat, RgbImage};
    use std::io::Cursor;
    use std::path::PathBuf;

    fn service(root: &Path) -> ImageUploadService {
        let storage: Arc<dyn StorageService> = Arc::new(LocalStorageService::new(root));
        ImageUploadService::new(storage, &AppConfig::development())
    }

    fn png_upload(name: &str) -> UploadedFile {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(40, 20))
            .write_to(&mut out, ImageOutputFormat::Png)
            .unwrap();
        let bytes = out.into_inner();

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), &bytes).unwrap();
        UploadedFile {
            original_name: name.to_string(),
            temp_path: file.into_temp_path(),
            size_bytes: bytes.len() as u64,
            mime_type: Some("image/png".to_string()),
        }
    }

    fn stored(root: &Path, filename: &str) -> PathBuf {
        root.join(EDUCATION_IMAGE.base_url).join(filename)
    }

    fn target(previous: &str) -> UploadTarget<'_> {
        UploadTarget {
            previous_filename: Some(previous),
            uploaded_file: png_upload("campus.png"),
        }
    }

    #[tokio::test]
    async fn test_same_name_replacement_waits_for_commit() {
        let root = tempfile::tempdir().unwrap();
        let images = service(root.path());
        std::fs::create_dir_all(root.path().join(EDUCATION_IMAGE.base_url)).unwrap();
        std::fs::write(stored(root.path(), "keep.png"), b"old").unwrap();

        let staged = images.stage(&EDUCATION_IMAGE, target("keep.png")).await.unwrap();
        assert_eq!(staged.filename, "keep.png");
        assert_eq!(std::fs::read(stored(root.path(), "keep.png")).unwrap(), b"old");

        images.discard(staged).await;
        assert_eq!(std::fs::read(stored(root.path(), "keep.png")).unwrap(), b"old");

        let staged = images.stage(&EDUCATION_IMAGE, target("keep.png")).await.unwrap();
        images.commit(staged).await.unwrap();
        let bytes = std::fs::read(stored(root.path(), "keep.png")).unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_extension_change_keeps_previous_until_commit() {
        let root = tempfile::tempdir().unwrap();
        let images = service(root.path());
        std::fs::create_dir_all(root.path().join(EDUCATION_IMAGE.base_url)).unwrap();
        std::fs::write(stored(root.path(), "old.jpg"), b"old").unwrap();

        let staged = images.stage(&EDUCATION_IMAGE, target("old.jpg")).await.unwrap();
        assert_eq!(staged.filename, "old.png");
        assert!(stored(root.path(), "old.png").exists());
        assert!(stored(root.path(), "old.jpg").exists());

        images.discard(staged).await;
        assert!(!stored(root.path(), "old.png").exists());
        assert!(stored(root.path(), "old.jpg").exists());

        let staged = images.stage(&EDUCATION_IMAGE, target("old.jpg")).await.unwrap();
        images.commit(staged).await.unwrap();
        assert!(stored(root.path(), "old.png").exists());
        assert!(!stored(root.path(), "old.jpg").exists());
    }

    #[tokio::test]
    async fn test_stage_rejects_disguised_file() {
        let root = tempfile::tempdir().unwrap();
        let images = service(root.path());
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"GIF89a not a png").unwrap();
        let upload = UploadedFile {
            original_name: "cat.png".to_string(),
            temp_path: file.into_temp_path(),
            size_bytes: 16,
            mime_type: Some("image/png".to_string()),
        };

        let result = images
            .stage(
                &EDUCATION_IMAGE,
                UploadTarget {
                    previous_filename: None,
                    uploaded_file: upload,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(!root.path().join(EDUCATION_IMAGE.base_url).exists());
    }

    #[test]
    fn test_plan_without_previous_uses_uuid() {
        let plan = plan_filename("png", None);
        let (stem, ext) = plan.filename.rsplit_once('.').unwrap();
        assert_eq!(ext, "png");
        assert!(Uuid::parse_str(stem).is_ok());
        assert_eq!(plan.orphaned, None);
        assert!(!plan.replaces_previous);

        let other = plan_filename("png", Some(""));
        assert_ne!(other.filename, plan.filename);
        assert_eq!(other.orphaned, None);
    }

    #[test]
    fn test_plan_same_extension_reuses_name() {
        let plan = plan_filename("jpg", Some("3f1c.jpg"));
        assert_eq!(plan.filename, "3f1c.jpg");
        assert_eq!(plan.orphaned, None);
        assert!(plan.replaces_previous);
    }

    #[test]
    fn test_plan_extension_change_orphans_previous() {
        let plan = plan_filename("png", Some("3f1c.jpg"));
        assert_eq!(plan.filename, "3f1c.png");
        assert_eq!(plan.orphaned.as_deref(), Some("3f1c.jpg"));
        assert!(!plan.replaces_previous);
    }

    #[test]
    fn test_plan_ignores_directories_in_previous() {
        let plan = plan_filename("png", Some("../../etc/3f1c.png"));
        assert_eq!(plan.filename, "3f1c.png");
        assert_eq!(plan.orphaned, None);
    }

    #[test]
    fn test_slot_key() {
        assert_eq!(
            PORTFOLIO_THUMBNAIL.key("a.png"),
            "images/cv/portfolio/a.png"
        );
        assert_eq!(PROFILE_IMAGE.base_url, PROFILE_BANNER.base_url);
    }
}
