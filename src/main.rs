use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use callagent::config::{AppConfig, LlmBackend};
use callagent::db;
use callagent::handlers;
use callagent::services::ai::ollama::OllamaProvider;
use callagent::services::ai::openai::OpenAiCompatProvider;
use callagent::services::ai::LlmProvider;
use callagent::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    config.validate()?;

    let conn = db::init_db(&config.database_url)?;

    let llm: Option<Arc<dyn LlmProvider>> = match config.llm_provider {
        LlmBackend::OpenAi => {
            tracing::info!("using OpenAI provider (model: {})", config.openai_model);
            Some(Arc::new(OpenAiCompatProvider::openai(
                config.openai_api_key.clone(),
                config.openai_model.clone(),
            )))
        }
        LlmBackend::Groq => {
            tracing::info!("using Groq provider (model: {})", config.groq_model);
            Some(Arc::new(OpenAiCompatProvider::groq(
                config.groq_api_key.clone(),
                config.groq_model.clone(),
            )))
        }
        LlmBackend::Ollama => {
            tracing::info!("using Ollama provider (url: {})", config.ollama_url);
            Some(Arc::new(OllamaProvider::new(
                config.ollama_url.clone(),
                config.ollama_model.clone(),
            )))
        }
        LlmBackend::None => {
            tracing::info!("no LLM provider configured, deterministic extraction only");
            None
        }
    };

    if config.kill_switch {
        tracing::warn!("CONVERSATION_ENGINE_KILL_SWITCH is set; v2 turns use the legacy path");
    }

    let port = config.port;
    let state = Arc::new(AppState::new(config, conn, llm)?);
    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
