use arscene_server::{Cli, ServerConfig};
use clap::Parser;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arscene=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from(Cli::parse());
    if let Err(e) = arscene_server::serve(config).await {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}
