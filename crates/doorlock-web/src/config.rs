use std::path::PathBuf;

/// Admin app configuration. Paths share the daemon's `DOORLOCK_*` variables
/// so both processes agree on the gallery, captures and database.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Listen address (default: 127.0.0.1:5000).
    pub bind: String,
    pub known_faces_dir: PathBuf,
    pub capture_dir: PathBuf,
    pub db_path: PathBuf,
}

impl WebConfig {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("doorlock");

        Self {
            bind: std::env::var("DOORLOCK_WEB_BIND").unwrap_or_else(|_| "127.0.0.1:5000".into()),
            known_faces_dir: env_path("DOORLOCK_KNOWN_FACES_DIR", PathBuf::from("known_faces")),
            capture_dir: env_path("DOORLOCK_CAPTURE_DIR", PathBuf::from("log_capture")),
            db_path: env_path("DOORLOCK_DB_PATH", data_dir.join("doorlock.db")),
        }
    }
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or(default)
}
