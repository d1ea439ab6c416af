use vitrine_api::setup;
use vitrine_core::ServerConfig;
use vitrine_infra::{init_telemetry, LogFormat};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = ServerConfig::from_env()?;
    config.validate()?;
    init_telemetry(LogFormat::from_env(), "vitrine-api")?;

    let (_state, router) = setup::initialize_app(config.clone()).await?;
    setup::server::start_server(&config, router).await?;

    Ok(())
}
