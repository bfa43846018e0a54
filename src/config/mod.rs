use std::env;
use std::path::PathBuf;

/// Runtime configuration for the CV backend
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Database connection string (default: "sqlite://cv.db?mode=rwc")
    pub database_url: String,

    /// Directory served as static content; images live under `images/cv/*` (default: "public")
    pub public_dir: PathBuf,

    /// Scheme + host used to build absolute image URLs. Derived per request when unset.
    pub public_origin: Option<String>,

    /// Directory for multipart temp files (default: OS temp dir)
    pub upload_tmp_dir: Option<PathBuf>,

    /// Maximum accepted image size in megabytes (default: 5)
    pub max_image_size_mb: u64,

    /// Re-encoding quality, 1-100 (default: 70)
    pub image_quality: u8,

    /// Allowed image extensions, lowercase without dot (default: png, jpeg, jpg)
    pub allowed_image_extensions: Vec<String>,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://cv.db?mode=rwc".to_string(),
            public_dir: PathBuf::from("public"),
            public_origin: None,
            upload_tmp_dir: None,
            max_image_size_mb: 5,
            image_quality: 70,
            allowed_image_extensions: vec![
                "png".to_string(),
                "jpeg".to_string(),
                "jpg".to_string(),
            ],
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(default.database_url),

            public_dir: env::var("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.public_dir),

            public_origin: env::var("PUBLIC_ORIGIN")
                .ok()
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty()),

            upload_tmp_dir: env::var("UPLOAD_TMP_DIR").ok().map(PathBuf::from),

            max_image_size_mb: env::var("MAX_IMAGE_SIZE_MB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_image_size_mb),

            image_quality: env::var("IMAGE_QUALITY")
                .ok()
                .and_then(|v| v.parse::<u8>().ok())
                .map(|q| q.clamp(1, 100))
                .unwrap_or(default.image_quality),

            allowed_image_extensions: env::var("ALLOWED_IMAGE_EXTENSIONS")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(default.allowed_image_extensions),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Config for tests and local runs: in-memory database, fixed origin
    pub fn development() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            public_origin: Some("http://localhost:3000".to_string()),
            ..Self::default()
        }
    }

    pub fn max_image_size_bytes(&self) -> u64 {
        self.max_image_size_mb.saturating_mul(1024 * 1024)
    }

    /// Request body ceiling: one image per slot plus room for the text fields
    pub fn body_limit(&self) -> usize {
        usize::try_from(self.max_image_size_bytes())
            .unwrap_or(usize::MAX)
            .saturating_mul(2)
            .saturating_add(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.max_image_size_mb, 5);
        assert_eq!(config.image_quality, 70);
        assert_eq!(config.public_dir, PathBuf::from("public"));
        assert_eq!(config.allowed_image_extensions, vec!["png", "jpeg", "jpg"]);
        assert!(config.public_origin.is_none());
    }

    #[test]
    fn test_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(
            config.public_origin.as_deref(),
            Some("http://localhost:3000")
        );
    }

    #[test]
    fn test_size_limits() {
        let config = AppConfig::default();
        assert_eq!(config.max_image_size_bytes(), 5 * 1024 * 1024);
        assert!(config.body_limit() > config.max_image_size_bytes() as usize);

        let huge = AppConfig {
            max_image_size_mb: u64::MAX,
            ..AppConfig::default()
        };
        assert_eq!(huge.max_image_size_bytes(), u64::MAX);
        assert_eq!(huge.body_limit(), usize::MAX);
    }
}
