//! Síntesis de consultas de un solo salto sobre el grafo de conocimiento.
//!
//! Cada escenario combina un nodo, un término de la propiedad elegida, una
//! persona, un estilo y una longitud; el LLM escribe la consulta y la
//! respuesta de referencia a partir del contenido del nodo.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::knowledge_graph::{KnowledgeGraph, Node, NodeProperty};
use crate::llm::{parse_json_reply, ChatCompletion};
use crate::models::Persona;

const SYNTHESIS_PROMPT: &str = r#"
You write realistic questions that an online shopper would ask a store assistant.
Use the persona, term, style and length given by the user, and ground both the question and its answer ONLY in the provided context.
The output MUST be a single valid JSON object with two keys: "query" (the customer question) and "answer" (the reference answer taken from the context).
No explanations, only the JSON.
"#;

/// Una muestra del testset, antes de enriquecerla.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestsetSample {
    pub user_input: String,
    pub reference_contexts: Vec<String>,
    pub reference: String,
    pub synthesizer_name: String,
    #[serde(default)]
    pub persona_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryStyle {
    PerfectGrammar,
    PoorGrammar,
    WebSearchLike,
    Misspelled,
}

impl QueryStyle {
    const ALL: [QueryStyle; 4] = [
        QueryStyle::PerfectGrammar,
        QueryStyle::WebSearchLike,
        QueryStyle::PoorGrammar,
        QueryStyle::Misspelled,
    ];

    fn describe(&self) -> &'static str {
        match self {
            QueryStyle::PerfectGrammar => "perfect grammar",
            QueryStyle::PoorGrammar => "poor grammar",
            QueryStyle::WebSearchLike => "web search like",
            QueryStyle::Misspelled => "a few misspelled words",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryLength {
    Short,
    Medium,
    Long,
}

impl QueryLength {
    const ALL: [QueryLength; 3] = [QueryLength::Short, QueryLength::Medium, QueryLength::Long];

    fn describe(&self) -> &'static str {
        match self {
            QueryLength::Short => "short",
            QueryLength::Medium => "medium",
            QueryLength::Long => "long",
        }
    }
}

#[derive(Debug, Deserialize)]
struct SynthesisReply {
    query: String,
    #[serde(default)]
    answer: String,
}

#[derive(Debug)]
struct Scenario<'a> {
    node: &'a Node,
    term: String,
    persona: &'a Persona,
    style: QueryStyle,
    length: QueryLength,
}

/// Sintetizador de consultas específicas de un salto. Sin propiedad trabaja
/// sobre el documento completo.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleHopSpecificQuerySynthesizer {
    pub property_name: Option<NodeProperty>,
}

impl SingleHopSpecificQuerySynthesizer {
    pub const NAME: &'static str = "single_hop_specific_query_synthesizer";

    pub fn new(property_name: Option<NodeProperty>) -> Self {
        Self { property_name }
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Nodos utilizables junto con sus términos.
    fn eligible_nodes<'a>(&self, kg: &'a KnowledgeGraph) -> Vec<(&'a Node, Vec<String>)> {
        kg.nodes
            .iter()
            .filter_map(|node| match self.property_name {
                Some(property) => node
                    .property(property)
                    .filter(|terms| !terms.is_empty())
                    .map(|terms| (node, terms.to_vec())),
                None if !node.page_content.trim().is_empty() => Some((node, vec![node.topic().to_string()])),
                None => None,
            })
            .collect()
    }

    /// Recorre nodos, términos, personas, estilos y longitudes de forma
    /// rotatoria hasta reunir `count` escenarios.
    fn generate_scenarios<'a>(
        &self,
        kg: &'a KnowledgeGraph,
        personas: &'a [Persona],
        count: usize,
    ) -> Result<Vec<Scenario<'a>>> {
        let eligible = self.eligible_nodes(kg);
        if eligible.is_empty() {
            let property = self.property_name.map(|p| p.as_str()).unwrap_or("page_content");
            return Err(anyhow!("No hay nodos con la propiedad '{property}' en el grafo de conocimiento"));
        }
        if personas.is_empty() {
            return Err(anyhow!("Se necesita al menos una persona para sintetizar consultas"));
        }

        let scenarios = (0..count)
            .map(|i| {
                let (node, terms) = &eligible[i % eligible.len()];
                let round = i / eligible.len();
                Scenario {
                    node: *node,
                    term: terms[round % terms.len()].clone(),
                    persona: &personas[i % personas.len()],
                    style: QueryStyle::ALL[i % QueryStyle::ALL.len()],
                    length: QueryLength::ALL[i % QueryLength::ALL.len()],
                }
            })
            .collect();

        Ok(scenarios)
    }

    pub async fn generate<M: ChatCompletion>(
        &self,
        kg: &KnowledgeGraph,
        personas: &[Persona],
        count: usize,
        llm: &M,
    ) -> Result<Vec<TestsetSample>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut samples = Vec::with_capacity(count);
        for scenario in self.generate_scenarios(kg, personas, count)? {
            let user = format!(
                "Persona: {} - {}\nTerm: {}\nQuery style: {}\nQuery length: {}\n\nContext:\n{}",
                scenario.persona.name,
                scenario.persona.role_description,
                scenario.term,
                scenario.style.describe(),
                scenario.length.describe(),
                scenario.node.page_content
            );
            let response = llm.chat(SYNTHESIS_PROMPT, &user).await?;

            match parse_json_reply::<SynthesisReply>(&response) {
                Ok(reply) if !reply.query.trim().is_empty() => samples.push(TestsetSample {
                    user_input: reply.query.trim().to_string(),
                    reference_contexts: vec![scenario.node.page_content.clone()],
                    reference: reply.answer,
                    synthesizer_name: self.name().to_string(),
                    persona_name: Some(scenario.persona.name.clone()),
                }),
                Ok(_) => warn!("El LLM devolvió una consulta vacía para '{}'", scenario.term),
                Err(e) => warn!("No se pudo parsear la consulta sintetizada para '{}'. Error: {}", scenario.term, e),
            }
        }

        if samples.is_empty() {
            return Err(anyhow!("El sintetizador no produjo ninguna consulta válida"));
        }
        Ok(samples)
    }
}

/// Reparto del tamaño del testset entre sintetizadores.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDistribution(pub Vec<(SingleHopSpecificQuerySynthesizer, f64)>);

impl QueryDistribution {
    /// Titulares y palabras clave a partes iguales.
    pub fn headlines_and_keyphrases() -> Self {
        Self(vec![
            (SingleHopSpecificQuerySynthesizer::new(Some(NodeProperty::Headlines)), 0.5),
            (SingleHopSpecificQuerySynthesizer::new(Some(NodeProperty::Keyphrases)), 0.5),
        ])
    }

    /// Un único sintetizador sobre el documento completo.
    pub fn whole_document() -> Self {
        Self(vec![(SingleHopSpecificQuerySynthesizer::new(None), 1.0)])
    }

    /// Parte entera de `size × peso / Σpeso`; el resto se reparte en orden.
    pub fn split_counts(&self, size: usize) -> Vec<usize> {
        let total: f64 = self.0.iter().map(|(_, w)| w.max(0.0)).sum();
        if self.0.is_empty() || total <= 0.0 {
            return vec![0; self.0.len()];
        }

        let mut counts: Vec<usize> = self
            .0
            .iter()
            .map(|(_, w)| ((size as f64) * w.max(0.0) / total).floor() as usize)
            .collect();

        let mut remainder = size.saturating_sub(counts.iter().sum());
        let slots = counts.len();
        let mut i = 0;
        while remainder > 0 {
            counts[i % slots] += 1;
            remainder -= 1;
            i += 1;
        }
        counts
    }
}

/// Origen de testsets sobre el que se apoya la escalera de respaldo.
#[allow(async_fn_in_trait)]
pub trait TestsetSource {
    async fn generate(
        &self,
        kg: &KnowledgeGraph,
        testset_size: usize,
        distribution: Option<&QueryDistribution>,
    ) -> Result<Vec<TestsetSample>>;
}

/// Generador de testsets: personas + LLM sobre un grafo dado.
pub struct TestsetGenerator<M> {
    llm: M,
    personas: Vec<Persona>,
}

impl<M: ChatCompletion> TestsetGenerator<M> {
    pub fn new(llm: M, personas: Vec<Persona>) -> Self {
        Self { llm, personas }
    }
}

impl<M: ChatCompletion> TestsetSource for TestsetGenerator<M> {
    async fn generate(
        &self,
        kg: &KnowledgeGraph,
        testset_size: usize,
        distribution: Option<&QueryDistribution>,
    ) -> Result<Vec<TestsetSample>> {
        let default_distribution = QueryDistribution::whole_document();
        let distribution = distribution.unwrap_or(&default_distribution);

        let mut samples = Vec::with_capacity(testset_size);
        for ((synthesizer, _), count) in distribution.0.iter().zip(distribution.split_counts(testset_size)) {
            let batch = synthesizer.generate(kg, &self.personas, count, &self.llm).await?;
            samples.extend(batch);
        }

        info!("Generadas {} consultas sintéticas", samples.len());
        Ok(samples)
    }
}
