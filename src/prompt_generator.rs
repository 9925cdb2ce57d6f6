//! Generador de consultas con un único prompt (sin grafo de conocimiento).
//!
//! Se pide al LLM un lote de consultas en JSON; si la respuesta no es JSON
//! válido se rescatan las líneas que parecen preguntas.

use rand::seq::SliceRandom;
use rand::Rng;
use schemars::schema_for;
use tracing::{info, warn};

use crate::dataset::{mean_rating, ReviewDataset};
use crate::llm::{parse_json_reply, ChatCompletion};
use crate::models::{EnhancedPromptQuery, PromptQuery, PromptQueryBatch};

const MAX_SAMPLE_PRODUCTS: usize = 10;
const MAX_SAMPLE_FEATURES: usize = 15;
const MAX_EXTRACTED_QUERIES: usize = 20;
const MAX_MATCHED_PRODUCTS: usize = 3;
const MIN_MATCH_WORD_LEN: usize = 3;

const SYSTEM_PROMPT: &str = "You are generating realistic customer queries for an e-commerce chatbot. \
Always answer with the JSON object requested by the user.";

pub struct SyntheticDataGenerator<'a, M> {
    llm: M,
    dataset: &'a ReviewDataset,
}

impl<'a, M: ChatCompletion> SyntheticDataGenerator<'a, M> {
    pub fn new(llm: M, dataset: &'a ReviewDataset) -> Self {
        Self { llm, dataset }
    }

    /// Construye el prompt con una muestra de productos y características.
    pub fn create_query_generation_prompt(
        &self,
        products: &[&str],
        features: &[&str],
        num_queries: usize,
    ) -> String {
        let schema = serde_json::to_string_pretty(&schema_for!(PromptQueryBatch)).unwrap_or_default();

        format!(
            "Based on the following product information, generate diverse, human-like questions that real customers would ask:

AVAILABLE PRODUCTS: {products}
CATEGORIES: {categories}
COMMON FEATURES: {features}

Generate queries that include:
- Specific product inquiries
- Comparison requests
- Feature-based searches
- Budget-conscious questions
- Use case specific needs
- Problem-solving queries

Make the queries sound natural and conversational, like real customers would ask.
Vary the language style (formal, casual, detailed, brief).

Generate exactly {num_queries} unique queries as a JSON object matching this schema:
{schema}

Example:
{{\"queries\": [
  {{\"query\": \"What's the best smartphone under $500?\", \"intent\": \"budget_search\", \"category\": \"Smartphones\"}},
  {{\"query\": \"I need headphones for gaming, any recommendations?\", \"intent\": \"use_case_specific\", \"category\": \"Audio\"}}
]}}

GENERATE {num_queries} DIVERSE QUERIES NOW:",
            products = products.join(", "),
            categories = self.dataset.unique_categories.join(", "),
            features = features.join(", "),
        )
    }

    pub async fn generate_synthetic_queries(&self, num_queries: usize) -> Vec<PromptQuery> {
        self.generate_with_rng(num_queries, &mut rand::thread_rng()).await
    }

    /// Igual que [`generate_synthetic_queries`](Self::generate_synthetic_queries)
    /// pero con la fuente de aleatoriedad explícita.
    pub async fn generate_with_rng<R: Rng + ?Sized>(&self, num_queries: usize, rng: &mut R) -> Vec<PromptQuery> {
        info!("Generando {num_queries} consultas sintéticas...");

        let products = sample(&self.dataset.unique_products, MAX_SAMPLE_PRODUCTS, rng);
        let features = sample(&self.dataset.features, MAX_SAMPLE_FEATURES, rng);
        let prompt = self.create_query_generation_prompt(&products, &features, num_queries);

        let response = match self.llm.chat(SYSTEM_PROMPT, &prompt).await {
            Ok(r) => r,
            Err(e) => {
                warn!("Error generando consultas: {e:#}");
                return Vec::new();
            }
        };

        match parse_json_reply::<PromptQueryBatch>(&response) {
            Ok(batch) => batch.queries,
            Err(e) => {
                warn!("La respuesta no es JSON válido ({e}); extrayendo consultas del texto");
                extract_queries_from_text(&response)
            }
        }
    }

    /// Añade los productos que comparten alguna palabra con la consulta y su
    /// valoración media como contexto esperado.
    pub fn enhance_queries_with_context(&self, queries: Vec<PromptQuery>) -> Vec<EnhancedPromptQuery> {
        queries
            .into_iter()
            .map(|base| {
                let matched = matching_products(&base.query, &self.dataset.unique_products);
                if matched.is_empty() {
                    return EnhancedPromptQuery {
                        base,
                        matched_products: None,
                        expected_context: None,
                    };
                }

                let expected = matched
                    .iter()
                    .map(|p| format!("{p}: {:.1}/5", mean_rating(self.dataset.reviews_for_product(p))))
                    .collect();

                EnhancedPromptQuery {
                    base,
                    matched_products: Some(matched),
                    expected_context: Some(expected),
                }
            })
            .collect()
    }
}

fn sample<'s, R: Rng + ?Sized>(values: &'s [String], amount: usize, rng: &mut R) -> Vec<&'s str> {
    values
        .choose_multiple(rng, amount.min(values.len()))
        .map(String::as_str)
        .collect()
}

/// Productos (máx. 3, en orden del catálogo) que contienen alguna palabra de
/// la consulta de al menos tres caracteres.
fn matching_products(query: &str, products: &[String]) -> Vec<String> {
    let words: Vec<String> = query
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| w.chars().count() >= MIN_MATCH_WORD_LEN)
        .collect();

    products
        .iter()
        .filter(|p| {
            let name = p.to_lowercase();
            words.iter().any(|w| name.contains(w.as_str()))
        })
        .take(MAX_MATCHED_PRODUCTS)
        .cloned()
        .collect()
}

/// Rescata consultas de una respuesta en texto libre.
pub fn extract_queries_from_text(text: &str) -> Vec<PromptQuery> {
    text.lines()
        .map(str::trim)
        .filter(|line| {
            let lower = line.to_lowercase();
            line.contains('?') || lower.contains("recommend") || lower.contains("best")
        })
        .map(|line| line.replace('"', "").replace("- ", "").trim().to_string())
        .filter(|query| query.chars().count() > 10)
        .take(MAX_EXTRACTED_QUERIES)
        .map(|query| PromptQuery {
            query,
            intent: "general".to_string(),
            category: "Unknown".to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::sample_dataset;
    use crate::llm::testing::ScriptedLlm;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn prompt_query(text: &str) -> PromptQuery {
        PromptQuery {
            query: text.into(),
            intent: "general".into(),
            category: "Audio".into(),
        }
    }

    #[test]
    fn prompt_lists_sample_and_schema() {
        let ds = sample_dataset();
        let generator = SyntheticDataGenerator::new(ScriptedLlm::failing(), &ds);
        let prompt = generator.create_query_generation_prompt(&["EchoBuds Pro"], &["battery", "fit"], 7);

        assert!(prompt.contains("AVAILABLE PRODUCTS: EchoBuds Pro"));
        assert!(prompt.contains("CATEGORIES: Audio, Smartphones, Laptops"));
        assert!(prompt.contains("COMMON FEATURES: battery, fit"));
        assert!(prompt.contains("Generate exactly 7 unique queries"));
        assert!(prompt.contains("\"queries\""));
        assert!(prompt.contains("\"intent\""));
    }

    #[test]
    fn json_reply_is_parsed() {
        let ds = sample_dataset();
        let reply = r#"```json
{"queries": [{"query": "Is EchoBuds Pro good for running?", "intent": "use_case_specific", "category": "Audio"}]}
```"#;
        let generator = SyntheticDataGenerator::new(ScriptedLlm::replying(&[reply]), &ds);
        let queries = tokio_test::block_on(generator.generate_with_rng(1, &mut StdRng::seed_from_u64(7)));

        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].intent, "use_case_specific");
    }

    #[test]
    fn text_reply_falls_back_to_extraction() {
        let ds = sample_dataset();
        let reply = "Here you go:\n- \"Which laptop is best for travel?\"\nThanks\n- Why?\n";
        let generator = SyntheticDataGenerator::new(ScriptedLlm::replying(&[reply]), &ds);
        let queries = tokio_test::block_on(generator.generate_with_rng(3, &mut StdRng::seed_from_u64(7)));

        assert_eq!(queries, vec![PromptQuery {
            query: "Which laptop is best for travel?".into(),
            intent: "general".into(),
            category: "Unknown".into(),
        }]);
    }

    #[test]
    fn llm_failure_yields_no_queries() {
        let ds = sample_dataset();
        let generator = SyntheticDataGenerator::new(ScriptedLlm::failing(), &ds);
        assert!(tokio_test::block_on(generator.generate_synthetic_queries(5)).is_empty());
    }

    #[test]
    fn extraction_caps_at_twenty() {
        let text: String = (0..30).map(|i| format!("Question number {i}?\n")).collect();
        let queries = extract_queries_from_text(&text);
        assert_eq!(queries.len(), 20);
        assert_eq!(queries[0].query, "Question number 0?");
    }

    #[test]
    fn extraction_keeps_recommend_lines_without_question_mark() {
        let queries = extract_queries_from_text("Please RECOMMEND a quiet keyboard\nok?\n");
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].query, "Please RECOMMEND a quiet keyboard");
    }

    #[test]
    fn enhancement_adds_ratings_for_matched_products() {
        let ds = sample_dataset();
        let generator = SyntheticDataGenerator::new(ScriptedLlm::failing(), &ds);
        let out = generator.enhance_queries_with_context(vec![
            prompt_query("Are the echobuds comfortable?"),
            prompt_query("Do you ship to Iceland?"),
        ]);

        assert_eq!(out[0].matched_products.as_deref(), Some(&["EchoBuds Pro".to_string()][..]));
        assert_eq!(out[0].expected_context.as_deref(), Some(&["EchoBuds Pro: 4.0/5".to_string()][..]));
        assert_eq!(out[1].matched_products, None);

        let json = serde_json::to_value(&out[1]).unwrap();
        assert!(json.get("matched_products").is_none());
        assert_eq!(json["query"], "Do you ship to Iceland?");
    }

    #[test]
    fn short_words_do_not_match() {
        let products = vec!["AeroBook Air".to_string(), "PixelWave 8".to_string()];
        assert!(matching_products("is it ok", &products).is_empty());
        assert_eq!(matching_products("Pixel or Aero?", &products), products);
    }
}
