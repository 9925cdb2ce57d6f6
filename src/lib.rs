//! Generación de consultas sintéticas de e-commerce a partir de reseñas de
//! producto, con grafo de conocimiento, personas y clasificación por LLM.

pub mod config;
pub mod data_loader;
pub mod dataset;
pub mod document_processor;
pub mod error;
pub mod generator;
pub mod inspector;
pub mod knowledge_graph;
pub mod llm;
pub mod models;
pub mod neo4j_client;
pub mod personas;
pub mod prompt_generator;
pub mod query_classifier;
pub mod synthesizer;
pub mod transforms;
pub mod vector_store;

pub use config::{AppConfig, LlmProvider, VectorStoreConfig};
pub use dataset::ReviewDataset;
pub use error::GenerationError;
pub use generator::RagasSyntheticDataGenerator;
pub use llm::{ChatCompletion, LlmManager};
pub use models::{GeneratedQuery, PropertyBag, QueryType};
