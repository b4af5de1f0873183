use log::{error, info};
use service::{config::Config, logging::Logger};
use web::AppState;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    let config = match config.resolve() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    info!(
        "Starting up in {:?} mode, identity provider {}",
        config.runtime_env(),
        config.provider_url()
    );

    let app_state = match AppState::from_config(config) {
        Ok(app_state) => app_state,
        Err(e) => {
            error!("Failed to build the application state: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
