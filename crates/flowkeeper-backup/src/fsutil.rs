//! Small async file helpers shared by the index and snapshot store

use crate::error::{BackupError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tokio::fs;

/// Suffix of in-flight writes
pub const TEMP_SUFFIX: &str = "tmp";

/// Write `bytes` to a sibling temp file, then rename it over `path`.
pub async fn write_atomic(path: &Utf8Path, bytes: &[u8]) -> Result<()> {
    let temp_path = temp_path_for(path);

    fs::write(&temp_path, bytes)
        .await
        .map_err(|e| BackupError::io(&temp_path, e))?;

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(BackupError::io(path, e));
    }

    Ok(())
}

fn temp_path_for(path: &Utf8Path) -> Utf8PathBuf {
    let file_name = path.file_name().unwrap_or("file");
    path.with_file_name(format!("{}.{}", file_name, TEMP_SUFFIX))
}
