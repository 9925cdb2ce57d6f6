use anyhow::Result;
use ecommerce_synth_queries::generator::DEFAULT_TESTSET_FILENAME;
use ecommerce_synth_queries::{AppConfig, LlmManager, RagasSyntheticDataGenerator};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 2. Cargar configuración y LLMs (el clasificador usa temperatura baja)
    let cfg = AppConfig::from_env()?;
    let generator_llm = LlmManager::from_config(&cfg)?;
    let classifier_llm = generator_llm.with_temperature(cfg.classifier_temperature);
    let testset_size = cfg.testset_size;

    info!("Iniciando la generación de datos sintéticos con grafo de conocimiento...");
    let mut generator = RagasSyntheticDataGenerator::new(cfg, generator_llm, classifier_llm)?;

    // 3. Generar con la escalera de respaldo
    let Some(testset) = generator.generate_synthetic_testset(testset_size).await? else {
        println!("No se generó ningún testset sintético");
        return Ok(());
    };
    info!("Generadas {} consultas sintéticas ({:?})", testset.samples.len(), testset.tier);

    // 4. Enriquecer, guardar y mostrar
    let enhanced = generator.enhance_testset_with_ecommerce_context(&testset.samples).await;
    let (json_path, csv_path) = generator.save_synthetic_testset(&enhanced, DEFAULT_TESTSET_FILENAME)?;
    generator.display_sample_queries(&enhanced, 5);

    println!("\nTestset guardado en: {}", json_path.display());
    println!("CSV guardado en: {}", csv_path.display());
    Ok(())
}
