use pr_assign_lib::ServerSettings;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let settings = match ServerSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_filter))
        .init();

    let handle = match pr_assign_lib::run(&settings).await {
        Ok(handle) => handle,
        Err(e) => {
            log::error!("Failed to start: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
    handle.shutdown().await;
}
