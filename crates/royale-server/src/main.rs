use tracing_subscriber::EnvFilter;

use royale_server::build_app;
use royale_server::config::{LogFormat, ServerConfig};
use royale_server::error::ServerError;
use royale_server::game_loop::MatchCommand;

#[tokio::main]
async fn main() {
    let config = ServerConfig::load();
    init_tracing(config.log_format);

    if let Err(e) = run(config).await {
        tracing::error!("Server failed: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn run(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;
    let addr = config.listen_addr.clone();
    let (app, state) = build_app(config)?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    tracing::info!("Arena Royale server listening on {addr}");

    let commands = state.commands.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {e}");
            }
            tracing::info!("Shutting down");
            let _ = commands.send(MatchCommand::Stop).await;
        })
        .await?;
    Ok(())
}
