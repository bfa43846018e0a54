use crate::api::error::AppError;
use axum::extract::Multipart;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

/// A file part of a multipart request, spooled to a temp file. The temp
/// file is removed on drop unless it has been moved away first.
#[derive(Debug)]
pub struct UploadedFile {
    pub original_name: String,
    pub temp_path: TempPath,
    pub size_bytes: u64,
    pub mime_type: Option<String>,
}

impl UploadedFile {
    pub fn path(&self) -> &Path {
        &self.temp_path
    }
}

/// Text fields and files of a multipart form. Repeated text fields keep
/// every value in arrival order.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    pub async fn from_multipart(
        mut multipart: Multipart,
        tmp_dir: Option<&Path>,
    ) -> Result<Self, AppError> {
        let mut form = MultipartForm::default();

        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name.is_empty() {
                continue;
            }

            let Some(original_name) = field.file_name().map(|s| s.to_string()) else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.push_field(&name, text);
                continue;
            };

            // Browsers send an empty file part when nothing was selected
            if original_name.is_empty() {
                continue;
            }

            let mime_type = field.content_type().map(|s| s.to_string());
            let tmp_dir: PathBuf = tmp_dir.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir);
            let named = tempfile::Builder::new()
                .prefix("cv-upload-")
                .tempfile_in(&tmp_dir)
                .map_err(|e| AppError::Internal(format!("Failed to create temp file: {}", e)))?;
            let (std_file, temp_path) = named.into_parts();
            let mut file = tokio::fs::File::from_std(std_file);

            let mut size_bytes = 0u64;
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?
            {
                size_bytes += chunk.len() as u64;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| AppError::Internal(format!("Failed to spool upload: {}", e)))?;
            }
            file.flush()
                .await
                .map_err(|e| AppError::Internal(format!("Failed to spool upload: {}", e)))?;

            if size_bytes == 0 {
                continue;
            }

            tracing::debug!(
                "📎 Received file field '{}': {} ({} bytes)",
                name,
                original_name,
                size_bytes
            );

            form.files.insert(
                name,
                UploadedFile {
                    original_name,
                    temp_path,
                    size_bytes,
                    mime_type,
                },
            );
        }

        Ok(form)
    }

    pub fn push_field(&mut self, name: &str, value: String) {
        self.fields.entry(name.to_string()).or_default().push(value);
    }

    /// Last value of a text field, trimmed; empty values count as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .and_then(|v| v.last())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Every non-empty value of a repeatable field (`tags` or `tags[]`).
    pub fn list(&self, name: &str) -> Vec<String> {
        let bracketed = format!("{}[]", name);
        [name, bracketed.as_str()]
            .iter()
            .filter_map(|key| self.fields.get(*key))
            .flatten()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}
