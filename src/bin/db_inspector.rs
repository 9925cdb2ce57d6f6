use anyhow::Result;
use ecommerce_synth_queries::inspector;
use ecommerce_synth_queries::vector_store::VectorStore;
use ecommerce_synth_queries::{AppConfig, LlmManager, VectorStoreConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Inspector de la base de datos vectorial");
    println!("{}", "=".repeat(50));

    let cfg = AppConfig::from_env()?;
    let store_cfg = VectorStoreConfig::from_env()?;
    let llm = LlmManager::from_config(&cfg)?;

    let store = match VectorStore::connect(store_cfg.clone(), llm).await {
        Ok(store) => {
            println!("Conexión establecida con el vector store");
            store
        }
        Err(e) => {
            println!("Falló la conexión: {e:#}");
            return Ok(());
        }
    };

    inspector::print_configuration(store.config());
    inspector::inspect_database(&store).await;
    inspector::get_collection_stats(&store, &store_cfg).await;
    Ok(())
}
