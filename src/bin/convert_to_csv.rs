//! Convierte un JSON de consultas sintéticas a un CSV con la columna `query`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use ecommerce_synth_queries::data_loader;
use ecommerce_synth_queries::AppConfig;
use tracing_subscriber::EnvFilter;

const DEFAULT_JSON: &str = "synthetic_queries.json";
const DEFAULT_CSV: &str = "synthetic_queries_only.csv";

#[derive(Parser, Debug)]
#[command(
    name = "convert-to-csv",
    about = "Convierte un JSON de consultas sintéticas a un CSV de una columna"
)]
struct Args {
    /// JSON de entrada (por defecto `<OUTPUT_DIR>/synthetic_queries.json`)
    #[arg(value_name = "JSON")]
    input: Option<PathBuf>,

    /// CSV de salida (por defecto junto al JSON, `synthetic_queries_only.csv`)
    #[arg(value_name = "CSV")]
    output: Option<PathBuf>,
}

impl Args {
    /// Rutas efectivas, completando las que faltan.
    fn resolve(self, output_dir: PathBuf) -> (PathBuf, PathBuf) {
        let json_path = self.input.unwrap_or_else(|| output_dir.join(DEFAULT_JSON));
        let csv_path = self.output.unwrap_or_else(|| json_path.with_file_name(DEFAULT_CSV));
        (json_path, csv_path)
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let cfg = AppConfig::from_env()?;
    let (json_path, csv_path) = args.resolve(cfg.output_dir);

    let count = data_loader::json_to_csv(&json_path, &csv_path)?;
    println!("\nConvertidas {count} consultas: {}", csv_path.display());
    Ok(())
}
