use std::sync::Arc;
use anyhow::anyhow;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use alma_api::{build_router, config::Config, state::AppState};
use alma_llm::mock::EchoModel;
use alma_persist::{InMemoryPersistenceClient, PersistenceClient};
use alma_session::{ModelFactory, StaticModelFactory};
use alma_types::{Provider, ProviderKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting Alma API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    let persist: Arc<dyn PersistenceClient> = Arc::new(InMemoryPersistenceClient::new());
    let factory = model_factory(&config, persist.as_ref()).await?;

    let state = Arc::new(AppState::new(config.clone(), persist, factory)?);

    let workspace = state
        .sandbox
        .ensure_active_workspace(&config.workspace.name, &config.workspace.path)?;
    tracing::info!("Active workspace: {}", workspace.path.display());

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/api/health", addr);
    tracing::info!("Push channel: ws://{}/ws", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Model backend selected by `llm.backend`
async fn model_factory(
    config: &Config,
    persist: &dyn PersistenceClient,
) -> anyhow::Result<Arc<dyn ModelFactory>> {
    match config.llm.backend.as_str() {
        "echo" => {
            let provider_id = &config.llm.default_provider;
            if persist.get_provider(provider_id).await?.is_none() {
                persist
                    .upsert_provider(Provider::new(provider_id, "Local echo", ProviderKind::OpenAI))
                    .await?;
                tracing::info!("Seeded provider '{}' for the echo backend", provider_id);
            }
            Ok(Arc::new(StaticModelFactory::new(Arc::new(EchoModel))))
        }
        other => Err(anyhow!("Unsupported llm backend: {}", other)),
    }
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
