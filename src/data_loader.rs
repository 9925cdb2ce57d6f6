//! Lectura del CSV de reseñas y escritura de los testsets generados
//! (JSON con metadatos + CSV aplanado).

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::dataset::ReviewDataset;
use crate::models::{
    EnhancedPromptQuery, FlatQueryRow, GeneratedQuery, ProductReview, TestsetMetadata, TestsetOutput,
};

const GENERATOR_LABEL: &str = "Ragas-based Synthetic Data Generator";
const SOURCE_DATA: &str = "product_reviews.csv";

/// Carga el CSV de reseñas. Un fichero o columna ausente es un error fatal.
pub fn load_product_data(path: &Path) -> Result<ReviewDataset> {
    let reviews = read_reviews(path).map_err(|e| {
        error!("Error cargando datos de {}: {e:#}", path.display());
        e
    })?;

    let dataset = ReviewDataset::from_reviews(reviews);
    info!("Cargadas {} reseñas de producto", dataset.reviews.len());
    info!("Encontrados {} productos únicos", dataset.unique_products.len());
    info!("Categorías: {:?}", dataset.unique_categories);
    Ok(dataset)
}

fn read_reviews(path: &Path) -> Result<Vec<ProductReview>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("No se pudo abrir el CSV de reseñas {}", path.display()))?;

    reader
        .deserialize::<ProductReview>()
        .enumerate()
        .map(|(i, row)| row.with_context(|| format!("Fila {} inválida en {}", i + 2, path.display())))
        .collect()
}

/// Nombre del CSV que acompaña a un JSON: misma base, extensión `.csv`.
fn csv_sibling(json_path: &Path) -> PathBuf {
    json_path.with_extension("csv")
}

fn write_pretty_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("No se pudo crear {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Guarda el testset enriquecido en `<dir>/<filename>` y su CSV hermano.
/// Cada ejecución sobrescribe los ficheros anteriores.
pub fn save_synthetic_testset(
    output_dir: &Path,
    filename: &str,
    testset: &[GeneratedQuery],
    dataset: &ReviewDataset,
    personas_used: &[String],
) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("No se pudo crear el directorio {}", output_dir.display()))?;

    let output = TestsetOutput {
        metadata: TestsetMetadata {
            generator: GENERATOR_LABEL.to_string(),
            total_queries: testset.len(),
            source_data: SOURCE_DATA.to_string(),
            categories: dataset.unique_categories.clone(),
            products_count: dataset.unique_products.len(),
            personas_used: personas_used.to_vec(),
            generated_at: Utc::now().to_rfc3339(),
        },
        synthetic_testset: testset.to_vec(),
    };

    let json_path = output_dir.join(filename);
    write_pretty_json(&json_path, &output)?;
    info!("Testset sintético guardado en {}", json_path.display());

    let csv_path = csv_sibling(&json_path);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&csv_path)
        .with_context(|| format!("No se pudo crear {}", csv_path.display()))?;
    // Cabecera explícita: un testset vacío también la lleva.
    writer.write_record(FlatQueryRow::HEADER)?;
    for item in testset {
        writer.serialize(FlatQueryRow::from_query(item)?)?;
    }
    writer.flush()?;
    info!("También guardado como CSV: {}", csv_path.display());

    Ok((json_path, csv_path))
}

pub fn display_sample_queries(testset: &[GeneratedQuery], num_samples: usize) {
    println!("\nConsultas generadas de ejemplo (mostrando {num_samples}):");
    println!("{}", "=".repeat(60));

    for (i, item) in testset.iter().take(num_samples).enumerate() {
        println!("\n{}. Query: {}", i + 1, item.query);
        println!("   Category: {}", item.category);
        println!("   Type: {}", item.query_type);
        if !item.related_products.is_empty() {
            println!("   Related Products: {}", item.related_products.join(", "));
        }
        if !item.product_properties.is_empty() {
            let props = serde_json::to_string_pretty(&item.product_properties).unwrap_or_default();
            println!("   Properties: {props}");
        }
        println!("{}", "-".repeat(40));
    }
}

/// Guarda las consultas del generador de prompt único y un CSV con sólo la
/// columna `query`. Devuelve la ruta del JSON.
pub fn save_prompt_queries(
    output_dir: &Path,
    filename: &str,
    queries: &[EnhancedPromptQuery],
    dataset: &ReviewDataset,
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("No se pudo crear el directorio {}", output_dir.display()))?;

    let output = json!({
        "metadata": {
            "total_queries": queries.len(),
            "generated_from": SOURCE_DATA,
            "categories_available": dataset.unique_categories,
            "products_count": dataset.unique_products.len(),
        },
        "synthetic_queries": queries,
    });

    let json_path = output_dir.join(filename);
    write_pretty_json(&json_path, &output)?;
    info!("Guardadas {} consultas sintéticas en {}", queries.len(), json_path.display());

    let csv_path = csv_sibling(&json_path);
    write_query_column(&csv_path, queries.iter().map(|q| q.base.query.as_str()))?;
    info!("También guardado como CSV: {}", csv_path.display());

    Ok(json_path)
}

fn write_query_column<'a>(path: &Path, queries: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("No se pudo crear {}", path.display()))?;
    writer.write_record(["query"])?;
    for query in queries {
        writer.write_record([query])?;
    }
    writer.flush()?;
    Ok(())
}

/// Extrae las consultas de cualquiera de los dos formatos de salida
/// (`synthetic_queries` o `synthetic_testset`).
pub fn read_queries_from_json(json_path: &Path) -> Result<Vec<String>> {
    let file = File::open(json_path).with_context(|| format!("No se pudo abrir {}", json_path.display()))?;
    let data: Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("JSON inválido en {}", json_path.display()))?;

    let items = ["synthetic_queries", "synthetic_testset"]
        .iter()
        .find_map(|key| data.get(key).and_then(Value::as_array))
        .ok_or_else(|| anyhow!("{} no contiene 'synthetic_queries' ni 'synthetic_testset'", json_path.display()))?;

    items
        .iter()
        .map(|item| {
            item.get("query")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| anyhow!("Elemento sin campo 'query' en {}", json_path.display()))
        })
        .collect()
}

/// Convierte un JSON de consultas a un CSV de una sola columna y muestra
/// las cinco primeras. Devuelve el número de consultas escritas.
pub fn json_to_csv(json_path: &Path, csv_path: &Path) -> Result<usize> {
    let queries = read_queries_from_json(json_path)?;
    write_query_column(csv_path, queries.iter().map(String::as_str))?;

    info!("Convertidas {} consultas a CSV en {}", queries.len(), csv_path.display());
    println!("\nVista previa del CSV generado:");
    println!("{}", "-".repeat(50));
    for (i, query) in queries.iter().take(5).enumerate() {
        println!("{}. {}", i + 1, query);
    }
    if queries.len() > 5 {
        println!("... y {} consultas más", queries.len() - 5);
    }

    Ok(queries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::sample_dataset;
    use crate::models::{PromptQuery, PropertyBag, QueryType};
    use crate::query_classifier::match_ecommerce_context;

    const HEADER: &str = "product,category,review_text,feature_mentioned,attribute_mentioned,rating,sentiment\n";

    fn write_csv(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("reviews.csv");
        fs::write(&path, body).unwrap();
        path
    }

    fn query(text: &str) -> GeneratedQuery {
        let ds = sample_dataset();
        let m = match_ecommerce_context(text, "", &ds);
        GeneratedQuery {
            query: text.to_string(),
            context: String::new(),
            category: m.category,
            related_products: m.related_products,
            query_type: QueryType::FeatureQueries,
            product_properties: m.product_properties,
            synthesizer: "single_hop_specific_query_synthesizer".into(),
            persona: None,
        }
    }

    #[test]
    fn loads_rows_with_quoted_commas_and_missing_ratings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            &format!(
                "{HEADER}EchoBuds Pro,Audio,\"Great bass, long battery\",battery,long,4,positive\n\
                 EchoBuds Pro,Audio,Meh,fit,loose,,neutral\n"
            ),
        );

        let ds = load_product_data(&path).unwrap();
        assert_eq!(ds.reviews.len(), 2);
        assert_eq!(ds.reviews[0].review_text, "Great bass, long battery");
        assert_eq!(ds.reviews[0].rating, Some(4.0));
        assert_eq!(ds.reviews[1].rating, None);
        assert_eq!(ds.unique_products, vec!["EchoBuds Pro"]);
    }

    #[test]
    fn missing_file_or_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_product_data(&dir.path().join("nope.csv")).is_err());

        let path = write_csv(dir.path(), "product,category\nEchoBuds Pro,Audio\n");
        assert!(load_product_data(&path).is_err());
    }

    #[test]
    fn empty_testset_writes_zero_total_and_header_only_csv() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let (json_path, csv_path) =
            save_synthetic_testset(&out, "testset.json", &[], &sample_dataset(), &["Tech Enthusiast".into()]).unwrap();

        let data: Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(data["metadata"]["total_queries"], 0);
        assert_eq!(data["metadata"]["products_count"], 3);
        assert_eq!(data["synthetic_testset"], json!([]));

        assert_eq!(csv_path, out.join("testset.csv"));
        assert_eq!(
            fs::read_to_string(&csv_path).unwrap(),
            "query,category,query_type,related_products,product_properties\n"
        );
    }

    fn to_json<T: Serialize>(value: &T) -> Value {
        serde_json::to_value(value).unwrap()
    }

    #[test]
    fn csv_rows_mirror_json_entries() {
        let dir = tempfile::tempdir().unwrap();
        let testset = vec![
            query("How's the battery on EchoBuds Pro, really?"),
            query("Is the AeroBook Air keyboard good?"),
            query("Do you ship to Iceland?"),
        ];
        let (json_path, csv_path) =
            save_synthetic_testset(dir.path(), "t.json", &testset, &sample_dataset(), &[]).unwrap();

        let saved: TestsetOutput = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        // NaN != NaN: se compara por su forma JSON.
        assert_eq!(to_json(&saved.synthetic_testset), to_json(&testset));

        // El producto sin valoraciones sigue siendo un producto al releerlo.
        match &saved.synthetic_testset[1].product_properties {
            PropertyBag::Product(p) => {
                assert_eq!(p.product_name, "AeroBook Air");
                assert!(p.average_rating.is_nan());
            }
            other => panic!("se esperaban propiedades de producto, no {other:?}"),
        }

        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        let rows: Vec<FlatQueryRow> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);

        for (row, item) in rows.iter().zip(&saved.synthetic_testset) {
            assert_eq!(row.query, item.query);
            assert_eq!(row.category, item.category);
            assert_eq!(row.query_type, item.query_type.as_str());
            assert_eq!(row.related_products, item.related_products.join(", "));
            if item.product_properties.is_empty() {
                assert_eq!(row.product_properties, "");
            } else {
                assert_eq!(row.product_properties, serde_json::to_string(&item.product_properties).unwrap());
                let bag: PropertyBag = serde_json::from_str(&row.product_properties).unwrap();
                assert_eq!(to_json(&bag), to_json(&item.product_properties));
            }
        }
    }

    #[test]
    fn prompt_queries_convert_to_single_column_csv() {
        let dir = tempfile::tempdir().unwrap();
        let queries = vec![EnhancedPromptQuery {
            base: PromptQuery {
                query: "Best earbuds, under $100?".into(),
                intent: "budget_search".into(),
                category: "Audio".into(),
            },
            matched_products: Some(vec!["EchoBuds Pro".into()]),
            expected_context: Some(vec!["EchoBuds Pro: 4.0/5".into()]),
        }];

        let json_path = save_prompt_queries(dir.path(), "synthetic_queries.json", &queries, &sample_dataset()).unwrap();
        let data: Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(data["synthetic_queries"][0]["intent"], "budget_search");
        assert_eq!(data["synthetic_queries"][0]["matched_products"][0], "EchoBuds Pro");
        assert_eq!(
            fs::read_to_string(dir.path().join("synthetic_queries.csv")).unwrap(),
            "query\n\"Best earbuds, under $100?\"\n"
        );

        let converted = dir.path().join("queries_only.csv");
        assert_eq!(json_to_csv(&json_path, &converted).unwrap(), 1);
        assert_eq!(
            fs::read_to_string(&converted).unwrap(),
            "query\n\"Best earbuds, under $100?\"\n"
        );
    }

    #[test]
    fn converter_rejects_unknown_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.json");
        fs::write(&path, r#"{"items": []}"#).unwrap();
        assert!(read_queries_from_json(&path).is_err());
    }
}
