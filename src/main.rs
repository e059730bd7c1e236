use truth_or_dare::game::Registry;
use truth_or_dare::{app, config, setup_logging, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logging();

    let config_dir = config::config_dir();
    config::init(&config_dir)?;
    let server_config = config::load_server_config(&config_dir)?;
    let content = config::load_content(&config_dir)?;

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()?;

    let state = AppState {
        registry: Registry::new(server_config, content),
    };

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    tracing::info!("Truth or Dare server running on port {}", port);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
