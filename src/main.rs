use axum_extra::extract::cookie::Key;
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use kara_portal::{
    Config,
    backend::Backend,
    router::{PortalState, portal_router},
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn cookie_key(secret: &str) -> Key {
    match Key::try_from(secret.as_bytes()) {
        Ok(key) => key,
        Err(_) => {
            warn!("cookie_secret shorter than 64 bytes; sessions will not survive a restart");
            Key::generate()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        supabase_url = %cfg.supabase.url,
        tables = ?cfg.storage.tables,
        loglevel = %cfg.basic.loglevel,
        privileged_key = cfg.supabase.service_role_key.is_some(),
    );

    let backend = Backend::connect(&cfg).await?;
    let state = PortalState::new(backend, &cfg, cookie_key(&cfg.basic.cookie_secret));
    let app = portal_router(state);

    let listener = TcpListener::bind(&cfg.basic.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.basic.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
