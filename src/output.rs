use crate::error::AppError;
use crate::render::GENERATED_AT_KEY;
use serde_json::Value;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

/// Writes `content` unless the file already holds exactly these bytes.
pub fn write_if_changed(path: &Path, content: &[u8]) -> Result<WriteOutcome, AppError> {
    match fs::read(path) {
        Ok(existing) if existing == content => {
            info!(path = %path.display(), "content unchanged, skipping write");
            return Ok(WriteOutcome::Unchanged);
        }
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(AppError::filesystem(path, e)),
    }

    replace(path, content)?;
    info!(path = %path.display(), bytes = content.len(), "written");
    Ok(WriteOutcome::Written)
}

/// Like [`write_if_changed`], but two metadata documents that differ only in
/// their generation timestamp count as equal.
pub fn write_metadata_if_changed(path: &Path, json: &str) -> Result<WriteOutcome, AppError> {
    match fs::read_to_string(path) {
        Ok(existing) => {
            if same_metadata(&existing, json) {
                info!(path = %path.display(), "metadata unchanged, skipping write");
                return Ok(WriteOutcome::Unchanged);
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(AppError::filesystem(path, e)),
    }

    replace(path, json.as_bytes())?;
    info!(path = %path.display(), "metadata written");
    Ok(WriteOutcome::Written)
}

pub fn ensure_dir(dir: &Path) -> Result<(), AppError> {
    fs::create_dir_all(dir).map_err(|e| AppError::filesystem(dir, e))
}

fn same_metadata(existing: &str, fresh: &str) -> bool {
    let strip = |text: &str| {
        serde_json::from_str::<Value>(text).ok().map(|mut value| {
            if let Some(object) = value.as_object_mut() {
                object.remove(GENERATED_AT_KEY);
            }
            value
        })
    };
    match (strip(existing), strip(fresh)) {
        (Some(old), Some(new)) => old == new,
        _ => false,
    }
}

/// Temp file in the target directory, then rename over the target.
fn replace(path: &Path, content: &[u8]) -> Result<(), AppError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(|e| AppError::filesystem(dir, e))?;
    file.write_all(content)
        .map_err(|e| AppError::filesystem(file.path().to_path_buf(), e))?;
    file.persist(path)
        .map_err(|e| AppError::filesystem(path, e.error))?;
    Ok(())
}
