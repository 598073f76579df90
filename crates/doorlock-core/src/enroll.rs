//! Identity enrollment and removal for the admin surface.
//!
//! File write and row insert are not atomic with respect to each other.

use crate::store::{self, UserRecord};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrollError {
    #[error("name and image are required")]
    MissingField,
    #[error("name {0:?} has no usable characters")]
    EmptyName(String),
    #[error("cannot write reference image {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Keep word characters, whitespace and hyphens; trim the result.
pub fn sanitize_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Extension of the uploaded file, with its leading dot (`".jpg"`), or empty.
fn upload_extension(upload_name: &str) -> String {
    Path::new(upload_name)
        .file_name()
        .map(Path::new)
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{e}"))
        .unwrap_or_default()
}

/// Stored file name: sanitized identity name plus the upload's extension.
pub fn reference_file_name(name: &str, upload_name: &str) -> Result<String, EnrollError> {
    let clean = sanitize_name(name);
    if clean.is_empty() {
        return Err(EnrollError::EmptyName(name.to_string()));
    }
    Ok(format!("{clean}{}", upload_extension(upload_name)))
}

/// Write the reference image into `gallery_dir` and insert a `users` row.
///
/// An existing file with the same name is overwritten and a further row is
/// inserted; names are not unique.
pub fn register(
    conn: &Connection,
    gallery_dir: &Path,
    name: &str,
    upload_name: &str,
    image: &[u8],
) -> Result<UserRecord, EnrollError> {
    if name.trim().is_empty() || image.is_empty() {
        return Err(EnrollError::MissingField);
    }

    let file_name = reference_file_name(name, upload_name)?;
    let path = gallery_dir.join(&file_name);

    std::fs::create_dir_all(gallery_dir)
        .and_then(|_| std::fs::write(&path, image))
        .map_err(|source| EnrollError::Write {
            path: path.clone(),
            source,
        })?;

    let id = store::insert_user(conn, &file_name)?;
    tracing::info!(id, file = %file_name, "identity registered");

    Ok(UserRecord {
        id,
        image_path: file_name,
    })
}

/// Delete a `users` row and, best effort, its reference image.
///
/// Returns the removed record, or `None` if no such id exists. A missing or
/// undeletable file is logged and does not stop the row removal.
pub fn remove(
    conn: &Connection,
    gallery_dir: &Path,
    id: i64,
) -> Result<Option<UserRecord>, EnrollError> {
    let Some(user) = store::find_user(conn, id)? else {
        tracing::debug!(id, "remove: no such user");
        return Ok(None);
    };

    let path = gallery_dir.join(&user.image_path);
    if let Err(e) = std::fs::remove_file(&path) {
        tracing::warn!(path = %path.display(), error = %e, "could not delete reference image");
    }

    store::delete_user(conn, id)?;
    tracing::info!(id, file = %user.image_path, "identity removed");
    Ok(Some(user))
}
