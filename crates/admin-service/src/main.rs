//! 物资申请与企业库存管理服务

use suministros_admin::{AppState, build_app};
use suministros_shared::{config::AppConfig, database::Database, observability};
use tokio::net::TcpListener;
use tracing::{info, warn};

const SERVICE_NAME: &str = "suministros-admin-service";
const DEV_JWT_SECRET: &str = "suministros-dev-secret-change-me";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME)?;

    let _guard = observability::init(&config.service_name, &config.observability).await?;

    info!(
        environment = %config.environment,
        addr = %config.server_addr(),
        "Starting {}",
        SERVICE_NAME
    );

    if config.auth.jwt_secret == DEV_JWT_SECRET {
        if config.is_production() {
            anyhow::bail!("auth.jwt_secret must be set in production (SUMINISTROS_AUTH__JWT_SECRET)");
        }
        warn!("Using default JWT secret - set SUMINISTROS_AUTH__JWT_SECRET for production");
    }

    let db = Database::connect(&config.database).await?;
    if config.database.run_migrations {
        db.run_migrations().await?;
    }

    tokio::fs::create_dir_all(&config.uploads.dir).await?;

    let state = AppState::new(db.pool().clone(), &config);
    let app = build_app(state, &config);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// 监听 SIGTERM 或 Ctrl+C，触发优雅关闭
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
