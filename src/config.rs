//! Carga y gestión de configuración de la aplicación (LLM, rutas y vector store).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum LlmProvider {
    OpenAI,
    Gemini,
    Ollama,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(anyhow!("Proveedor LLM no soportado: {other}")),
        }
    }
}

/// Configuración del pipeline de generación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm_provider: LlmProvider,
    pub llm_embedding_model: String,
    pub llm_chat_model: String,
    pub generator_temperature: f64,
    pub classifier_temperature: f64,

    pub reviews_csv: PathBuf,
    pub output_dir: PathBuf,
    pub testset_size: usize,
    pub prompt_query_count: usize,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env`, pero leyendo las claves de una función arbitraria.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let llm_provider = LlmProvider::from_str(&get("LLM_PROVIDER", "openai"))?;

        Ok(Self {
            llm_provider,
            llm_embedding_model: get("LLM_EMBEDDING_MODEL", "text-embedding-3-small"),
            llm_chat_model: get("LLM_CHAT_MODEL", "gpt-4o-mini"),
            generator_temperature: parse_var(&lookup, "GENERATOR_TEMPERATURE", 0.7)?,
            classifier_temperature: parse_var(&lookup, "CLASSIFIER_TEMPERATURE", 0.1)?,
            reviews_csv: PathBuf::from(get("REVIEWS_CSV", "data/product_reviews.csv")),
            output_dir: PathBuf::from(get("OUTPUT_DIR", "data-generator")),
            testset_size: parse_var(&lookup, "TESTSET_SIZE", 10)?,
            prompt_query_count: parse_var(&lookup, "PROMPT_QUERY_COUNT", 20)?,
        })
    }
}

/// Conexión al vector store (Neo4j con índice vectorial) usado por el inspector.
#[derive(Clone, Debug)]
pub struct VectorStoreConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub keyspace: String,
    pub collection: String,
    pub dimension: usize,
}

impl VectorStoreConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let uri = lookup("VECTOR_DB_URI").ok_or_else(|| anyhow!("Falta VECTOR_DB_URI en el entorno"))?;
        let user = lookup("VECTOR_DB_USER").ok_or_else(|| anyhow!("Falta VECTOR_DB_USER en el entorno"))?;
        let password = lookup("VECTOR_DB_PASSWORD")
            .ok_or_else(|| anyhow!("Falta VECTOR_DB_PASSWORD en el entorno"))?;

        Ok(Self {
            uri,
            user,
            password,
            keyspace: lookup("VECTOR_DB_KEYSPACE").unwrap_or_else(|| "neo4j".to_string()),
            collection: lookup("VECTOR_DB_COLLECTION").unwrap_or_else(|| "chatbotecomm".to_string()),
            dimension: parse_var(&lookup, "VECTOR_DB_DIMENSION", 1536)?,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Valor inválido para {key}: '{raw}'")),
        None => Ok(default),
    }
}
