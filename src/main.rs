use tracing::error;
use tracing_subscriber::EnvFilter;

use rudis::config::ServerConfig;
use rudis::server::Server;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match ServerConfig::from_args(std::env::args()) {
        Ok(config) => config,
        Err(cli_error) => {
            eprintln!("invalid arguments: {}", cli_error);
            std::process::exit(1);
        }
    };

    if let Err(bind_error) = Server::new(config).run().await {
        error!(error = %bind_error, "server failed to start");
        std::process::exit(1);
    }
}
