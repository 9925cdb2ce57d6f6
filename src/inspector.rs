//! Diagnóstico del vector store: búsquedas de prueba y estadísticas de la colección.

use std::collections::BTreeSet;

use tracing::warn;

use crate::config::VectorStoreConfig;
use crate::vector_store::{SearchResult, SimilaritySearch};

pub const SAMPLE_QUERY: &str = "bluetooth headphones";
pub const TEST_QUERIES: [&str; 4] = [
    "best bass headphones",
    "budget bluetooth earbuds",
    "gaming headphones",
    "wireless earphones for sports",
];
pub const STATS_QUERIES: [&str; 5] = ["headphones", "earbuds", "bluetooth", "audio", "sound"];

const PREVIEW_CHARS: usize = 100;
const UNKNOWN_PRODUCT: &str = "Unknown";

/// Resultado de una consulta de prueba: producto principal o el error.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Top(String),
    NoResults,
    Failed(String),
}

pub fn print_configuration(cfg: &VectorStoreConfig) {
    println!("\nConfiguración de la base de datos:");
    println!("   • Endpoint: {}", cfg.uri);
    println!("   • Keyspace: {}", cfg.keyspace);
    println!("   • Colección: {}", cfg.collection);
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

fn top_product(results: &[SearchResult]) -> SearchOutcome {
    match results.first() {
        Some(hit) => SearchOutcome::Top(hit.product_name().unwrap_or(UNKNOWN_PRODUCT).to_string()),
        None => SearchOutcome::NoResults,
    }
}

/// Ejecuta la búsqueda de ejemplo y las consultas de prueba. Los fallos se
/// imprimen y no detienen el resto.
pub async fn inspect_database<S: SimilaritySearch>(store: &S) -> Vec<(&'static str, SearchOutcome)> {
    println!("\nProbando la búsqueda:");
    match store.similarity_search(SAMPLE_QUERY, 3).await {
        Ok(results) => {
            println!("   • Encontrados {} documentos similares", results.len());
            for (i, doc) in results.iter().enumerate() {
                println!("\n   Resultado {}:", i + 1);
                println!("   • Producto: {}", doc.product_name().unwrap_or(UNKNOWN_PRODUCT));
                println!("   • Vista previa: {}...", preview(&doc.page_content));
                println!("   • Metadatos: {:?}", doc.metadata);
            }
        }
        Err(e) => {
            warn!("Búsqueda de prueba fallida: {e:#}");
            println!("   Falló la búsqueda de prueba: {e}");
        }
    }

    println!("\nProbando varias búsquedas de producto:");
    let mut outcomes = Vec::with_capacity(TEST_QUERIES.len());
    for query in TEST_QUERIES {
        let outcome = match store.similarity_search(query, 1).await {
            Ok(results) => top_product(&results),
            Err(e) => SearchOutcome::Failed(e.to_string()),
        };
        match &outcome {
            SearchOutcome::Top(product) => println!("   • '{query}' → {product}"),
            SearchOutcome::NoResults => println!("   • '{query}' → Sin resultados"),
            SearchOutcome::Failed(e) => println!("   • '{query}' → Error: {e}"),
        }
        outcomes.push((query, outcome));
    }
    outcomes
}

/// Estima los productos distintos de la colección a partir de varias búsquedas.
pub async fn get_collection_stats<S: SimilaritySearch>(store: &S, cfg: &VectorStoreConfig) -> BTreeSet<String> {
    println!("\nEstadísticas de la colección:");
    println!("   • Nombre de la colección: {}", cfg.collection);
    println!("   • Dimensión del vector: {}", cfg.dimension);

    let mut unique_products = BTreeSet::new();
    for query in STATS_QUERIES {
        match store.similarity_search(query, 10).await {
            Ok(results) => {
                unique_products.extend(results.iter().filter_map(|r| r.product_name()).map(str::to_string));
            }
            Err(e) => warn!("Búsqueda '{query}' omitida: {e:#}"),
        }
    }

    let shown: Vec<&str> = unique_products.iter().take(5).map(String::as_str).collect();
    let ellipsis = if unique_products.len() > 5 { "..." } else { "" };
    println!("   • Productos únicos estimados: {}", unique_products.len());
    println!("   • Productos encontrados: {shown:?}{ellipsis}");

    unique_products
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    /// Devuelve un documento por producto cuyo nombre comparte palabra con la
    /// consulta; falla con las consultas marcadas.
    struct StubStore {
        products: Vec<&'static str>,
        failing: Vec<&'static str>,
        calls: RefCell<Vec<(String, usize)>>,
    }

    impl SimilaritySearch for StubStore {
        async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
            self.calls.borrow_mut().push((query.to_string(), k));
            if self.failing.iter().any(|f| *f == query) {
                return Err(anyhow!("timeout"));
            }
            Ok(self
                .products
                .iter()
                .filter(|p| query.split(' ').any(|w| p.to_lowercase().contains(w)))
                .take(k)
                .map(|p| SearchResult {
                    score: 0.8,
                    page_content: format!("{p} review"),
                    metadata: BTreeMap::from([("product_name".to_string(), p.to_string())]),
                })
                .collect())
        }
    }

    fn config() -> VectorStoreConfig {
        VectorStoreConfig {
            uri: "neo4j://localhost:7687".into(),
            user: "neo4j".into(),
            password: "secret".into(),
            keyspace: "neo4j".into(),
            collection: "chatbotecomm".into(),
            dimension: 1536,
        }
    }

    #[test]
    fn test_queries_report_top_product_and_skip_failures() {
        let store = StubStore {
            products: vec!["Gaming headphones X", "Bass earbuds"],
            failing: vec!["budget bluetooth earbuds"],
            calls: RefCell::new(Vec::new()),
        };
        let outcomes = tokio_test::block_on(inspect_database(&store));

        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes[0].1, SearchOutcome::Top("Gaming headphones X".into()));
        assert_eq!(outcomes[1].1, SearchOutcome::Failed("timeout".into()));
        assert_eq!(outcomes[3].1, SearchOutcome::NoResults);
        assert_eq!(store.calls.borrow()[0], (SAMPLE_QUERY.to_string(), 3));
        assert!(store.calls.borrow()[1..].iter().all(|(_, k)| *k == 1));
    }

    #[test]
    fn stats_collect_distinct_products() {
        let store = StubStore {
            products: vec!["Studio headphones", "Sport earbuds", "Sound bar"],
            failing: vec!["audio"],
            calls: RefCell::new(Vec::new()),
        };
        let products = tokio_test::block_on(get_collection_stats(&store, &config()));

        let expected: BTreeSet<String> = ["Studio headphones", "Sport earbuds", "Sound bar"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(products, expected);
        assert_eq!(store.calls.borrow().len(), 5);
    }

    #[test]
    fn preview_is_limited_to_one_hundred_chars() {
        assert_eq!(preview(&"é".repeat(150)).chars().count(), 100);
    }
}
