//! Photo files on local disk.

use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "heic"];

/// Build a stored file name for an upload: the photo id plus the original
/// extension when it is a known image type.
pub fn stored_name(photo_id: &str, original_name: Option<&str>) -> AppResult<String> {
    let extension = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| AppError::BadRequest("Uploaded file must have an image extension".into()))?;

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Unsupported image type: .{}",
            extension
        )));
    }
    Ok(format!("{}.{}", photo_id, extension))
}

/// Resolve a stored file name inside `dir`, refusing anything that could
/// escape it.
pub fn resolve(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let valid = !file_name.is_empty()
        && file_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        && !file_name.starts_with('.');
    valid.then(|| dir.join(file_name))
}

pub async fn save(dir: &Path, file_name: &str, bytes: &[u8]) -> AppResult<()> {
    let path = resolve(dir, file_name)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid file name: {}", file_name)))?;
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(&path, bytes).await?;
    Ok(())
}

pub async fn read(dir: &Path, file_name: &str) -> AppResult<Vec<u8>> {
    let path = resolve(dir, file_name).ok_or(AppError::NotFound)?;
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::NotFound),
        Err(e) => Err(e.into()),
    }
}

/// Remove stored files. Failures are logged and otherwise ignored; the
/// database rows are already gone by the time this runs.
pub async fn remove_all<I, S>(dir: &Path, file_names: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for file_name in file_names {
        let file_name = file_name.as_ref();
        let Some(path) = resolve(dir, file_name) else {
            tracing::warn!("Refusing to remove suspicious file name {}", file_name);
            continue;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}
