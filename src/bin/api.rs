use nairasense_assistant::{
    advisor::FinancialAdvisor,
    api::start_server,
    assistant::SupportAssistant,
    config::AppConfig,
    flow::TransactionPreviewFlow,
    gemini::GeminiClient,
    llm::LanguageModel,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;
    if !config.has_api_key() {
        warn!("⚠️  GEMINI_API_KEY not set in .env, replies will use the maintenance fallback");
        warn!("📌 See .env.example for setup instructions");
    }

    info!("🚀 NairaSense Assistant - API Server");
    info!("📍 Port: {}", config.port);
    info!("🤖 Model: {}", config.gemini.model);

    // Create components
    let model: Arc<dyn LanguageModel> = Arc::new(GeminiClient::new(&config.gemini)?);
    let assistant = Arc::new(SupportAssistant::new(Arc::clone(&model)));
    let flow = Arc::new(TransactionPreviewFlow::new(assistant, config.flow.clone()));
    let advisor = Arc::new(FinancialAdvisor::new(model));

    info!("✅ Chat session initialized");
    info!("📡 Starting API server...");

    start_server(flow, advisor, config.port).await?;

    Ok(())
}
