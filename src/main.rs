use microletter::configuration::get_configuration;
use microletter::startup::Application;
use microletter::telemetry::get_subscriber;
use microletter::telemetry::init_subscriber;

/// Initialise telemetry, load config, and start the server
#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // only logs at the specified level and higher are emitted; override with
    // RUST_LOG
    let subscriber = get_subscriber("microletter", "info", std::io::stdout);
    init_subscriber(subscriber);

    let cfg = get_configuration()?;
    tracing::info!(
        host = %cfg.application.host,
        port = cfg.application.port,
        store = ?cfg.store.backend,
        "starting server"
    );

    Application::build(cfg).await?.run_until_stopped().await?;
    Ok(())
}
