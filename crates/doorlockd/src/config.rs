use doorlock_vision::ARCFACE_MATCH_THRESHOLD;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// SCRFD detector weights inside the model directory.
pub const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";
/// ArcFace encoder weights inside the model directory.
pub const ENCODER_MODEL_FILE: &str = "w600k_r50.onnx";

/// Where face detection and encoding run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbedderBackend {
    /// ONNX models loaded into the daemon.
    #[default]
    Onnx,
    /// External embedding service on a Unix socket.
    Service,
}

impl EmbedderBackend {
    /// Distance cutoff suited to the vectors this backend produces.
    pub fn default_threshold(self) -> f32 {
        match self {
            EmbedderBackend::Onnx => ARCFACE_MATCH_THRESHOLD,
            EmbedderBackend::Service => doorlock_core::types::DEFAULT_MATCH_THRESHOLD,
        }
    }
}

impl FromStr for EmbedderBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "onnx" => Ok(EmbedderBackend::Onnx),
            "service" => Ok(EmbedderBackend::Service),
            other => Err(format!("unknown embedder backend: {other}")),
        }
    }
}

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    pub camera_width: u32,
    pub camera_height: u32,
    /// Number of warmup frames to discard at startup (auto-exposure settling).
    pub warmup_frames: usize,
    /// Serial device of the lock board (default: /dev/ttyUSB0).
    pub serial_port: String,
    pub serial_baud: u32,
    /// Delay after opening the port while the board resets.
    pub serial_settle: Duration,
    /// Directory of reference images, one per identity.
    pub known_faces_dir: PathBuf,
    /// Directory receiving capture snapshots.
    pub capture_dir: PathBuf,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    pub embedder: EmbedderBackend,
    /// Directory holding the ONNX face models.
    pub model_dir: PathBuf,
    /// Unix socket of the face embedding service.
    pub embedder_socket: PathBuf,
    /// Maximum Euclidean distance for a positive match; defaults per backend.
    pub match_threshold: f32,
    /// Length of the face scan window.
    pub face_scan_timeout: Duration,
    /// Pause between showing the face screen and starting the scan.
    pub face_scan_delay: Duration,
    /// Link polling period of the idle loop.
    pub poll_interval: Duration,
}

impl Config {
    /// Load configuration from `DOORLOCK_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("doorlock");
        let embedder = env_parse("DOORLOCK_EMBEDDER", EmbedderBackend::default());

        Self {
            camera_device: env_string("DOORLOCK_CAMERA_DEVICE", "/dev/video0"),
            camera_width: env_parse("DOORLOCK_CAMERA_WIDTH", 640),
            camera_height: env_parse("DOORLOCK_CAMERA_HEIGHT", 480),
            warmup_frames: env_parse("DOORLOCK_WARMUP_FRAMES", 4),
            serial_port: env_string("DOORLOCK_SERIAL_PORT", "/dev/ttyUSB0"),
            serial_baud: env_parse("DOORLOCK_SERIAL_BAUD", 115_200),
            serial_settle: Duration::from_millis(env_parse("DOORLOCK_SERIAL_SETTLE_MS", 2000)),
            known_faces_dir: env_path("DOORLOCK_KNOWN_FACES_DIR", PathBuf::from("known_faces")),
            capture_dir: env_path("DOORLOCK_CAPTURE_DIR", PathBuf::from("log_capture")),
            db_path: env_path("DOORLOCK_DB_PATH", data_dir.join("doorlock.db")),
            embedder,
            model_dir: env_path("DOORLOCK_MODEL_DIR", data_dir.join("models")),
            embedder_socket: env_path(
                "DOORLOCK_EMBEDDER_SOCKET",
                PathBuf::from("/run/doorlock/embedder.sock"),
            ),
            match_threshold: env_parse("DOORLOCK_MATCH_THRESHOLD", embedder.default_threshold()),
            face_scan_timeout: Duration::from_secs(env_parse("DOORLOCK_FACE_SCAN_TIMEOUT_SECS", 10)),
            face_scan_delay: Duration::from_millis(env_parse("DOORLOCK_FACE_SCAN_DELAY_MS", 500)),
            poll_interval: Duration::from_millis(env_parse("DOORLOCK_POLL_INTERVAL_MS", 200)),
        }
    }

    pub fn detector_model_path(&self) -> PathBuf {
        self.model_dir.join(DETECTOR_MODEL_FILE)
    }

    pub fn encoder_model_path(&self) -> PathBuf {
        self.model_dir.join(ENCODER_MODEL_FILE)
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
