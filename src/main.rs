use sub_aggregator::config::Config;
use sub_aggregator::server;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    info!(
        "Starting subscription aggregator: {} sources, port {}",
        config.subs.len(),
        config.port
    );

    server::start_server(config).await?;
    Ok(())
}
