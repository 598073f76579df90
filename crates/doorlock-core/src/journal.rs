//! Capture journal — snapshot file plus `logs` row for each evaluated face.

use crate::store;
use chrono::Local;
use image::RgbImage;
use rusqlite::Connection;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("snapshot write failed: {0}")]
    Snapshot(#[from] image::ImageError),
    #[error("log store: {0}")]
    Store(#[from] store::StoreError),
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Sink for capture events.
pub trait AccessJournal {
    fn record(&mut self, identity: &str, frame: &RgbImage) -> Result<(), JournalError>;
}

impl<J: AccessJournal + ?Sized> AccessJournal for Box<J> {
    fn record(&mut self, identity: &str, frame: &RgbImage) -> Result<(), JournalError> {
        (**self).record(identity, frame)
    }
}

/// Random unique snapshot name, e.g. `3f2a…c9.jpg`.
pub fn snapshot_file_name() -> String {
    format!("{}.jpg", uuid::Uuid::new_v4().simple())
}

/// Journal backed by the SQLite log store and a snapshot directory.
///
/// The connection is opened lazily and dropped after a failed insert, so an
/// unreachable database at startup does not disable logging for good.
pub struct SqliteJournal {
    db_path: PathBuf,
    capture_dir: PathBuf,
    conn: Option<Connection>,
}

impl SqliteJournal {
    pub fn new(db_path: impl Into<PathBuf>, capture_dir: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            capture_dir: capture_dir.into(),
            conn: None,
        }
    }

    fn connection(&mut self) -> Result<&Connection, JournalError> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => {
                let conn = store::open(&self.db_path)?;
                tracing::debug!(path = %self.db_path.display(), "log store opened");
                conn
            }
        };
        Ok(&*self.conn.insert(conn))
    }

    fn save_snapshot(&self, frame: &RgbImage) -> Result<String, JournalError> {
        std::fs::create_dir_all(&self.capture_dir).map_err(image::ImageError::IoError)?;
        let file_name = snapshot_file_name();
        frame.save(self.capture_dir.join(&file_name))?;
        Ok(file_name)
    }
}

impl AccessJournal for SqliteJournal {
    fn record(&mut self, identity: &str, frame: &RgbImage) -> Result<(), JournalError> {
        let capture = match self.save_snapshot(frame) {
            Ok(name) => Some(name),
            Err(e) => {
                tracing::warn!(error = %e, "snapshot not saved; logging without capture");
                None
            }
        };

        let result = self
            .connection()
            .and_then(|conn| Ok(store::insert_log(conn, identity, capture.as_deref(), Local::now())?));

        match result {
            Ok(id) => {
                tracing::info!(id, identity, capture = ?capture, "access logged");
                Ok(())
            }
            Err(e) => {
                self.conn = None;
                Err(e)
            }
        }
    }
}
