use anyhow::Context;
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use factbot::config::Settings;
use factbot::logging::init_tracing;
use storage::DedupStore;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let settings = Settings::new().context("Failed to load configuration")?;
    let log_file = init_tracing(&settings.log)?;
    if let Some(path) = log_file {
        info!("Logging to {}", path.display());
    }

    let worker_config = settings
        .worker_config()
        .context("Invalid configuration")?;

    info!("Fact-check bot starting");
    let store = DedupStore::open(&settings.bot.state_path);

    let cancel_token = CancellationToken::new();
    let mut worker = tokio::spawn(adapter::start_with_cancel_token(
        worker_config,
        store,
        cancel_token.clone(),
    ));

    tokio::select! {
        _ = shutdown_signal() => {
            cancel_token.cancel();
            worker.await.context("Mention worker panicked")??;
        }
        joined = &mut worker => {
            joined.context("Mention worker panicked")??;
            warn!("Mention worker stopped without a shutdown signal");
        }
    }

    info!("Handled mentions saved, bot stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
