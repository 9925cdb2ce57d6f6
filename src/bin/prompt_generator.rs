use anyhow::Result;
use ecommerce_synth_queries::data_loader;
use ecommerce_synth_queries::prompt_generator::SyntheticDataGenerator;
use ecommerce_synth_queries::{AppConfig, LlmManager};
use tracing_subscriber::EnvFilter;

const OUTPUT_FILENAME: &str = "synthetic_queries.json";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = AppConfig::from_env()?;
    let llm = LlmManager::from_config(&cfg)?;
    let dataset = data_loader::load_product_data(&cfg.reviews_csv)?;

    let generator = SyntheticDataGenerator::new(llm, &dataset);
    let queries = generator.generate_synthetic_queries(cfg.prompt_query_count).await;
    if queries.is_empty() {
        println!("No se generó ninguna consulta");
        return Ok(());
    }
    println!("\nGeneradas {} consultas", queries.len());

    let enhanced = generator.enhance_queries_with_context(queries);
    let output = data_loader::save_prompt_queries(&cfg.output_dir, OUTPUT_FILENAME, &enhanced, &dataset)?;

    println!("\nConsultas generadas de ejemplo:");
    println!("{}", "-".repeat(30));
    for (i, query) in enhanced.iter().take(5).enumerate() {
        println!("{}. {}", i + 1, query.base.query);
        if let Some(products) = &query.matched_products {
            println!("   → Productos relacionados: {}", products.join(", "));
        }
        println!();
    }
    println!("Todas las consultas guardadas en: {}", output.display());
    Ok(())
}
