use anyhow::{Context, Result};
use doorlock_core::gallery::load_gallery;
use doorlock_core::scan::ScanSettings;
use doorlock_core::{ActuatorLink, FaceEmbedder, Gallery, NullLink, SqliteJournal};
use doorlock_hw::{Camera, SerialLink};
use doorlock_vision::OnnxEmbedder;
use tracing_subscriber::EnvFilter;

mod config;
mod console;
mod controller;
mod embedder;

use config::{Config, EmbedderBackend};
use console::ConsolePanel;
use controller::{Controller, ControllerSettings, Devices};
use embedder::ServiceEmbedder;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    tracing::info!(?config, "doorlockd starting");

    // The camera is the one resource the door cannot work without.
    let camera = Camera::open(&config.camera_device, config.camera_width, config.camera_height)
        .with_context(|| format!("cannot open camera {}", config.camera_device))?;
    camera.warm_up(config.warmup_frames);

    let link: Box<dyn ActuatorLink> =
        match SerialLink::open(&config.serial_port, config.serial_baud, config.serial_settle) {
            Ok(link) => Box::new(link),
            Err(e) => {
                tracing::error!(
                    port = %config.serial_port,
                    error = %e,
                    "serial link unavailable; lock commands will be dropped"
                );
                Box::new(NullLink)
            }
        };

    let mut embedder: Box<dyn FaceEmbedder> = match config.embedder {
        EmbedderBackend::Onnx => Box::new(
            OnnxEmbedder::load(&config.detector_model_path(), &config.encoder_model_path())
                .with_context(|| {
                    format!("cannot load face models from {}", config.model_dir.display())
                })?,
        ),
        EmbedderBackend::Service => Box::new(ServiceEmbedder::new(&config.embedder_socket)),
    };

    let gallery = match load_gallery(&config.known_faces_dir, &mut embedder) {
        Ok(g) => g,
        Err(e) => {
            tracing::error!(error = %e, "gallery not loaded; every face will be unknown");
            Gallery::default()
        }
    };
    if gallery.is_empty() {
        tracing::warn!(dir = %config.known_faces_dir.display(), "gallery is empty");
    }

    if let Err(e) = std::fs::create_dir_all(&config.capture_dir) {
        tracing::warn!(dir = %config.capture_dir.display(), error = %e, "cannot create capture directory");
    }
    let journal = SqliteJournal::new(&config.db_path, &config.capture_dir);

    let (tx, rx) = std::sync::mpsc::channel();
    console::spawn_operator_input(tx).context("cannot start operator input thread")?;

    let settings = ControllerSettings {
        scan: ScanSettings {
            timeout: config.face_scan_timeout,
            threshold: config.match_threshold,
        },
        face_scan_delay: config.face_scan_delay,
        poll_interval: config.poll_interval,
    };

    let mut controller = Controller::new(
        Devices {
            camera,
            embedder,
            link,
            journal,
        },
        gallery,
        settings,
        ConsolePanel,
    );

    tracing::info!("doorlockd ready");
    controller.run(&rx);
    tracing::info!("doorlockd shutting down");

    Ok(())
}
