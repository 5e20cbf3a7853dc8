//! Service entrypoint: tracing, configuration, optional database and
//! mailer, then serve.

use quai_api::email::Mailer;
use quai_api::repo::Repository;
use quai_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quai_api=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env();

    let repo = match quai_api::db::init_pool().await? {
        Some(pool) => Repository::with_pool(pool).await?,
        None => Repository::new(),
    };
    let mailer = Mailer::from_env();

    let state = AppState::with_parts(config.clone(), repo, mailer);
    let app = quai_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "quai-api listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
