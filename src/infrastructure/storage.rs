use crate::services::storage::LocalStorageService;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(public_dir: &Path) -> anyhow::Result<Arc<LocalStorageService>> {
    tokio::fs::create_dir_all(public_dir).await?;
    let root = tokio::fs::canonicalize(public_dir).await?;

    info!("🗂️  Public storage: {}", root.display());

    Ok(Arc::new(LocalStorageService::new(root)))
}
