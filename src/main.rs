use prepcoach::api::{self, app_state::AppState};
use prepcoach::config::loader::ConfigLoader;
use prepcoach::llm::create_chat_model;
use prepcoach::observability::init_tracing;
use prepcoach::storage::seed;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ConfigLoader::load()?;
    init_tracing(&config.logging)?;
    info!("Starting PrepCoach...");

    if let Err(e) = ConfigLoader::validate(&config) {
        warn!("Configuration is invalid: {}", e);
        return Err(e.into());
    }
    info!(
        "Configuration loaded successfully (environment: {}, model: {}, api key: {})",
        config.environment,
        config.llm.model,
        config.llm.masked_api_key()
    );

    let store = Arc::new(seed::load()?);
    info!(
        "Data store seeded with {} user(s) and {} question(s)",
        store.list_users().len(),
        store.questions().len()
    );

    let model = create_chat_model(&config.llm)?;
    info!("Chat model client initialized: {}", config.llm.model);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app_state = AppState::with_model(config, store, Arc::from(model));
    let router = api::create_app(app_state);
    info!("API router created with observability endpoints");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
