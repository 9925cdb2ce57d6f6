//! Búsqueda por similitud sobre un índice vectorial de Neo4j.
//!
//! API pública:
//!   - `VectorStore::connect(&VectorStoreConfig, LlmManager)`
//!   - `SimilaritySearch::similarity_search(&str, usize)`.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use neo4rs::{query, Graph};
use tracing::info;

use crate::config::VectorStoreConfig;
use crate::llm::LlmManager;
use crate::neo4j_client;

/// Propiedades del nodo que no se copian a los metadatos.
const CONTENT_PROPERTY: &str = "text";
const EMBEDDING_PROPERTY: &str = "embedding";

// Las propiedades escalares salen como dos listas paralelas de cadenas;
// `toStringOrNull` descarta listas y mapas (p. ej. el embedding).
const SEARCH_CYPHER: &str = "CALL db.index.vector.queryNodes($index_name, $k, $embedding)
     YIELD node, score
     WITH node, score,
          [key IN keys(node) WHERE toStringOrNull(node[key]) IS NOT NULL] AS scalar_keys
     RETURN score,
            node.text AS text,
            scalar_keys AS keys,
            [key IN scalar_keys | toString(node[key])] AS values
     ORDER BY score DESC";

/// Documento devuelto por una búsqueda, con su puntuación.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub score: f64,
    pub page_content: String,
    pub metadata: BTreeMap<String, String>,
}

impl SearchResult {
    pub fn product_name(&self) -> Option<&str> {
        self.metadata.get("product_name").map(String::as_str)
    }
}

#[allow(async_fn_in_trait)]
pub trait SimilaritySearch {
    /// Los `k` documentos más parecidos a `query`, de mayor a menor puntuación.
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>>;
}

pub struct VectorStore {
    graph: Graph,
    llm: LlmManager,
    config: VectorStoreConfig,
}

impl VectorStore {
    /// Conecta sin insertar datos y comprueba que el índice de la colección exista.
    pub async fn connect(config: VectorStoreConfig, llm: LlmManager) -> Result<Self> {
        let graph = neo4j_client::connect(&config).await?;

        let mut cursor = graph
            .execute(
                query("SHOW VECTOR INDEXES YIELD name WHERE name = $name RETURN name")
                    .param("name", config.collection.as_str()),
            )
            .await?;

        if cursor.next().await?.is_none() {
            return Err(anyhow!(
                "El índice vectorial '{}' no existe en la base de datos '{}'",
                config.collection,
                config.keyspace
            ));
        }
        info!("Índice vectorial '{}' encontrado.", config.collection);

        Ok(Self { graph, llm, config })
    }

    pub fn config(&self) -> &VectorStoreConfig {
        &self.config
    }
}

impl SimilaritySearch for VectorStore {
    async fn similarity_search(&self, query_text: &str, k: usize) -> Result<Vec<SearchResult>> {
        // 1) Embedding de la query
        let embedding = self.llm.embed_query(query_text).await?;
        if embedding.len() != self.config.dimension {
            return Err(anyhow!(
                "El embedding tiene {} dimensiones pero la colección espera {}",
                embedding.len(),
                self.config.dimension
            ));
        }

        // 2) Vector search en Neo4j
        let mut cursor = self
            .graph
            .execute(
                query(SEARCH_CYPHER)
                    .param("index_name", self.config.collection.as_str())
                    .param("k", k as i64)
                    .param("embedding", embedding),
            )
            .await?;

        // 3) Convertir resultados
        let mut output = Vec::new();
        while let Some(row) = cursor.next().await? {
            let score: f64 = row.get("score").ok_or_else(|| anyhow!("Falta campo 'score' en resultado de Neo4j"))?;
            let text: Option<String> = row.get("text");
            let keys: Vec<String> = row.get("keys").ok_or_else(|| anyhow!("Falta campo 'keys' en resultado de Neo4j"))?;
            let values: Vec<String> =
                row.get("values").ok_or_else(|| anyhow!("Falta campo 'values' en resultado de Neo4j"))?;
            output.push(search_result(score, text, keys, values)?);
        }

        Ok(output)
    }
}

/// Arma un `SearchResult` a partir de las columnas de una fila.
fn search_result(score: f64, text: Option<String>, keys: Vec<String>, values: Vec<String>) -> Result<SearchResult> {
    if keys.len() != values.len() {
        return Err(anyhow!(
            "Propiedades desalineadas en resultado de Neo4j: {} claves y {} valores",
            keys.len(),
            values.len()
        ));
    }

    let metadata = keys
        .into_iter()
        .zip(values)
        .filter(|(key, _)| key != CONTENT_PROPERTY && key != EMBEDDING_PROPERTY)
        .collect();

    Ok(SearchResult {
        score,
        page_content: text.unwrap_or_default(),
        metadata,
    })
}
