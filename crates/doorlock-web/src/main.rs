use anyhow::{Context, Result};
use clap::Parser;
use doorlock_core::store;
use doorlock_web::config::WebConfig;
use doorlock_web::{router, AppState};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "doorlock-web", about = "Doorlock admin web app", version)]
struct Cli {
    /// Listen address, overrides DOORLOCK_WEB_BIND
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = WebConfig::from_env();
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    tracing::info!(?config, "doorlock-web starting");

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    for dir in [&config.known_faces_dir, &config.capture_dir] {
        std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    }

    let db = tokio_rusqlite::Connection::open(&config.db_path)
        .await
        .with_context(|| format!("cannot open database {}", config.db_path.display()))?;
    db.call(|conn| Ok(store::migrate(conn)?))
        .await
        .context("database migration failed")?;

    let app = router(AppState {
        db,
        known_faces_dir: config.known_faces_dir.clone(),
        capture_dir: config.capture_dir.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("cannot bind {}", config.bind))?;
    tracing::info!(addr = %config.bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracing::info!("doorlock-web stopped");
    Ok(())
}
