use anyhow::Result;
use dwellsync::commands::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout is reserved for native-messaging frames
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dwellsync=info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    Cli::menu().await
}
