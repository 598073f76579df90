//! Gallery loader — builds the in-memory identity gallery from reference images.

use crate::embedder::FaceEmbedder;
use crate::types::{Gallery, Identity};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extensions accepted as reference images (compared case-insensitively).
pub const REFERENCE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("cannot read gallery directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// True if the path carries one of the [`REFERENCE_EXTENSIONS`].
pub fn is_reference_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            REFERENCE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(e))
        })
        .unwrap_or(false)
}

/// Identity name for a reference image: its file stem.
pub fn identity_name(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
}

/// Load every reference image in `dir` and embed it.
///
/// Files are visited in file-name order. A file is skipped (with a log line)
/// when it cannot be decoded, when the embedder fails, or when no face is
/// found; the first detected face becomes the identity's embedding.
pub fn load_gallery<E: FaceEmbedder + ?Sized>(
    dir: &Path,
    embedder: &mut E,
) -> Result<Gallery, GalleryError> {
    let read_dir = std::fs::read_dir(dir).map_err(|source| GalleryError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = read_dir
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && is_reference_image(p))
        .collect();
    paths.sort();

    let mut identities = Vec::with_capacity(paths.len());

    for path in paths {
        let Some(name) = identity_name(&path) else {
            continue;
        };

        let image = match image::open(&path) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping undecodable reference image");
                continue;
            }
        };

        let embeddings = match embedder.embed(&image) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping reference image: embedding failed");
                continue;
            }
        };

        let Some(embedding) = embeddings.into_iter().next() else {
            tracing::info!(path = %path.display(), "no face in reference image; skipped");
            continue;
        };

        tracing::debug!(name = %name, dim = embedding.values.len(), "identity loaded");
        identities.push(Identity { name, embedding });
    }

    tracing::info!(dir = %dir.display(), count = identities.len(), "gallery loaded");
    Ok(Gallery::new(identities))
}
