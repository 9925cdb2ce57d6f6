//! Generador principal: grafo de conocimiento + sintetizadores + escalera de
//! respaldo, seguido del enriquecimiento y el guardado.
//!
//! Flujo:
//!   1. Carga de reseñas y construcción de documentos y personas.
//!   2. Transformaciones del grafo (un fallo aquí es fatal).
//!   3. Generación con distribución → sin distribución → grafo simplificado.
//!   4. Enriquecimiento con contexto de e-commerce y clasificación.
//!   5. Guardado en JSON y CSV.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::data_loader;
use crate::dataset::ReviewDataset;
use crate::document_processor::DocumentProcessor;
use crate::error::GenerationError;
use crate::knowledge_graph::KnowledgeGraph;
use crate::llm::ChatCompletion;
use crate::models::{GeneratedQuery, Persona};
use crate::personas;
use crate::query_classifier::QueryClassifier;
use crate::synthesizer::{QueryDistribution, TestsetGenerator, TestsetSample, TestsetSource};

pub const DEFAULT_TESTSET_FILENAME: &str = "ragas_synthetic_testset.json";

/// Escalón de la escalera que produjo el testset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationTier {
    Full,
    Basic,
    Simplified,
}

/// Testset producido junto con los escalones que fallaron antes.
#[derive(Debug, Clone)]
pub struct GeneratedTestset {
    pub samples: Vec<TestsetSample>,
    pub tier: GenerationTier,
    pub failures: Vec<GenerationError>,
}

/// Intenta los tres escalones en orden. Sólo se construye el grafo
/// simplificado si los dos primeros fallan.
pub async fn generate_with_fallback<S, F>(
    source: &S,
    full_kg: &KnowledgeGraph,
    simplified_kg: F,
    testset_size: usize,
    distribution: &QueryDistribution,
) -> Result<GeneratedTestset, GenerationError>
where
    S: TestsetSource,
    F: FnOnce() -> KnowledgeGraph,
{
    let mut failures = Vec::new();

    match source.generate(full_kg, testset_size, Some(distribution)).await {
        Ok(samples) => {
            return Ok(GeneratedTestset {
                samples,
                tier: GenerationTier::Full,
                failures,
            })
        }
        Err(e) => {
            let failure = GenerationError::FullFailed { reason: format!("{e:#}") };
            warn!("{failure}");
            info!("Probando generación básica sin distribución de consultas...");
            failures.push(failure);
        }
    }

    match source.generate(full_kg, testset_size, None).await {
        Ok(samples) => {
            info!("Generadas {} consultas sintéticas (método básico)", samples.len());
            return Ok(GeneratedTestset {
                samples,
                tier: GenerationTier::Basic,
                failures,
            });
        }
        Err(e) => {
            let failure = GenerationError::BasicFailed { reason: format!("{e:#}") };
            warn!("{failure}");
            info!("Probando con el grafo de conocimiento simplificado...");
            failures.push(failure);
        }
    }

    let simplified = simplified_kg();
    match source.generate(&simplified, testset_size, None).await {
        Ok(samples) => {
            info!("Generadas {} consultas sintéticas (grafo simplificado)", samples.len());
            Ok(GeneratedTestset {
                samples,
                tier: GenerationTier::Simplified,
                failures,
            })
        }
        Err(e) => {
            let failure = GenerationError::SimplifiedFailed { reason: format!("{e:#}") };
            error!("Todos los métodos de generación fallaron: {failure}");
            Err(failure)
        }
    }
}

pub struct RagasSyntheticDataGenerator<M> {
    config: AppConfig,
    dataset: ReviewDataset,
    personas: Vec<Persona>,
    kg: KnowledgeGraph,
    generator_llm: M,
    classifier_llm: M,
}

impl<M: ChatCompletion> RagasSyntheticDataGenerator<M> {
    /// Carga las reseñas y construye el grafo de conocimiento inicial.
    pub fn new(config: AppConfig, generator_llm: M, classifier_llm: M) -> Result<Self> {
        let dataset = data_loader::load_product_data(&config.reviews_csv)?;
        Ok(Self::from_dataset(config, dataset, generator_llm, classifier_llm))
    }

    pub fn from_dataset(config: AppConfig, dataset: ReviewDataset, generator_llm: M, classifier_llm: M) -> Self {
        let kg = DocumentProcessor::new(&dataset).build_knowledge_graph().clone();
        let personas = personas::ecommerce_personas();
        info!("Creadas {} personas de cliente", personas.len());

        Self {
            config,
            dataset,
            personas,
            kg,
            generator_llm,
            classifier_llm,
        }
    }

    pub fn dataset(&self) -> &ReviewDataset {
        &self.dataset
    }

    pub fn knowledge_graph(&self) -> &KnowledgeGraph {
        &self.kg
    }

    /// Aplica las transformaciones y recorre la escalera de respaldo.
    ///
    /// Un error en las transformaciones se devuelve como `Err`; agotar la
    /// escalera se considera "no se generó nada" y devuelve `Ok(None)`.
    pub async fn generate_synthetic_testset(&mut self, testset_size: usize) -> Result<Option<GeneratedTestset>> {
        info!("Generando testset sintético con {testset_size} muestras...");

        let mut processor = DocumentProcessor::with_graph(&self.dataset, self.kg.clone());
        self.kg = processor.apply_knowledge_graph_transforms(&self.generator_llm).await?.clone();

        let generator = TestsetGenerator::new(&self.generator_llm, self.personas.clone());
        let distribution = QueryDistribution::headlines_and_keyphrases();

        let outcome = generate_with_fallback(
            &generator,
            &self.kg,
            || processor.create_simplified_knowledge_graph(),
            testset_size,
            &distribution,
        )
        .await;

        match outcome {
            Ok(testset) => Ok(Some(testset)),
            Err(e) => {
                warn!("No se generó ningún testset: {e}");
                Ok(None)
            }
        }
    }

    pub async fn enhance_testset_with_ecommerce_context(&self, samples: &[TestsetSample]) -> Vec<GeneratedQuery> {
        let classifier = QueryClassifier::new(&self.classifier_llm, &self.dataset.unique_categories);
        classifier
            .enhance_testset_with_ecommerce_context(samples, &self.dataset)
            .await
    }

    pub fn save_synthetic_testset(&self, testset: &[GeneratedQuery], filename: &str) -> Result<(PathBuf, PathBuf)> {
        data_loader::save_synthetic_testset(
            &self.config.output_dir,
            filename,
            testset,
            &self.dataset,
            &personas::persona_names(),
        )
    }

    pub fn display_sample_queries(&self, testset: &[GeneratedQuery], num_samples: usize) {
        data_loader::display_sample_queries(testset, num_samples);
    }
}
