//! Clasificación de intención de las consultas y enriquecimiento con el
//! contexto de e-commerce (productos, categoría y propiedades).

use tracing::warn;

use crate::dataset::ReviewDataset;
use crate::llm::ChatCompletion;
use crate::models::{GeneratedQuery, PropertyBag, QueryType};
use crate::synthesizer::TestsetSample;

const CLASSIFICATION_PROMPT: &str = r#"You are an expert e-commerce query classifier. Classify the following query into one of these categories:

1. "category_queries" - Questions about product categories, general recommendations, or browsing multiple products
   Examples: "What are the best laptops?", "Show me smartphones", "Which category should I choose?"

2. "feature_queries" - Questions about specific product features, specifications, or capabilities
   Examples: "How's the battery life?", "What about the camera quality?", "Is the microphone good?"

3. "product_queries" - Questions about specific products, reviews, opinions, or individual product details
   Examples: "What do people think about iPhone?", "Is this product worth it?", "Tell me about this laptop"

Respond with ONLY the category name (category_queries, feature_queries, or product_queries)."#;

const RECOMMENDATION_WORDS: [&str; 5] = ["what", "which", "best", "good", "recommend"];
const CATEGORY_WORDS: [&str; 5] = ["laptops", "smartphones", "audio", "wearables", "category"];
const FEATURE_WORDS: [&str; 6] = ["how", "quality", "feature", "performance", "battery", "camera"];

pub const GENERAL_CATEGORY: &str = "General";
const MAX_RELATED_PRODUCTS: usize = 3;

pub struct QueryClassifier<M> {
    llm: M,
    category_keywords: Vec<String>,
}

impl<M: ChatCompletion> QueryClassifier<M> {
    /// `categories` amplía las palabras clave de categoría del clasificador
    /// de respaldo con las categorías del conjunto de datos.
    pub fn new(llm: M, categories: &[String]) -> Self {
        let mut category_keywords: Vec<String> = CATEGORY_WORDS.iter().map(|w| w.to_string()).collect();
        for category in categories {
            let keyword = category.to_lowercase();
            if !keyword.is_empty() && !category_keywords.contains(&keyword) {
                category_keywords.push(keyword);
            }
        }

        Self { llm, category_keywords }
    }

    /// Pide la etiqueta al LLM. Una respuesta que no sea una de las tres
    /// etiquetas o un fallo de la llamada caen en la heurística local.
    pub async fn classify_query_type(&self, query: &str) -> QueryType {
        let user = format!("Classify this query: '{query}'");

        match self.llm.chat(CLASSIFICATION_PROMPT, &user).await {
            Ok(response) => {
                let label = normalize_label(&response);
                QueryType::from_label(&label).unwrap_or_else(|| {
                    warn!("Etiqueta de clasificación no reconocida: '{}'", response.trim());
                    self.simple_fallback_classification(query)
                })
            }
            Err(e) => {
                warn!("Error en la clasificación con LLM: {e}");
                self.simple_fallback_classification(query)
            }
        }
    }

    /// Heurística por palabras clave; total sobre cualquier cadena.
    pub fn simple_fallback_classification(&self, query: &str) -> QueryType {
        let query_lower = query.to_lowercase();

        if contains_any(&query_lower, RECOMMENDATION_WORDS)
            && contains_any(&query_lower, self.category_keywords.iter().map(String::as_str))
        {
            return QueryType::CategoryQueries;
        }

        if contains_any(&query_lower, FEATURE_WORDS) {
            return QueryType::FeatureQueries;
        }

        QueryType::ProductQueries
    }

    /// Enriquece cada muestra generada. Los fallos de clasificación se
    /// recuperan por fila, así que todas las filas se procesan.
    pub async fn enhance_testset_with_ecommerce_context(
        &self,
        samples: &[TestsetSample],
        dataset: &ReviewDataset,
    ) -> Vec<GeneratedQuery> {
        let mut enhanced = Vec::with_capacity(samples.len());

        for sample in samples {
            let context = sample.reference_contexts.first().cloned().unwrap_or_default();
            let matched = match_ecommerce_context(&sample.user_input, &context, dataset);
            let query_type = self.classify_query_type(&sample.user_input).await;

            enhanced.push(GeneratedQuery {
                query: sample.user_input.clone(),
                context,
                category: matched.category,
                related_products: matched.related_products,
                query_type,
                product_properties: matched.product_properties,
                synthesizer: sample.synthesizer_name.clone(),
                persona: sample.persona_name.clone(),
            });
        }

        enhanced
    }
}

fn contains_any<'a>(haystack: &str, words: impl IntoIterator<Item = &'a str>) -> bool {
    words.into_iter().any(|w| haystack.contains(w))
}

fn normalize_label(response: &str) -> String {
    response
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.')
        .trim()
        .to_lowercase()
}

/// Productos, categoría y propiedades que corresponden a una consulta.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextMatch {
    pub category: String,
    pub related_products: Vec<String>,
    pub product_properties: PropertyBag,
}

/// Busca, sin distinguir mayúsculas, cada producto y categoría conocidos en
/// la consulta y en su contexto.
///
/// Los productos nombrados en la consulta van antes que los que sólo aparecen
/// en el contexto, y se conservan como mucho tres. La categoría es la del
/// producto principal; sin producto, la categoría que aparece antes en la
/// consulta (después en el contexto), y si hay empate en posición gana el
/// nombre más largo.
pub fn match_ecommerce_context(query: &str, context: &str, dataset: &ReviewDataset) -> ContextMatch {
    let query_lower = query.to_lowercase();
    let context_lower = context.to_lowercase();

    let mut in_query = Vec::new();
    let mut in_context = Vec::new();
    for product in &dataset.unique_products {
        let needle = product.to_lowercase();
        if needle.is_empty() {
            continue;
        }
        if query_lower.contains(&needle) {
            in_query.push(product.clone());
        } else if context_lower.contains(&needle) {
            in_context.push(product.clone());
        }
    }
    let mut related_products = in_query;
    related_products.extend(in_context);
    related_products.truncate(MAX_RELATED_PRODUCTS);

    if let Some(primary) = related_products.first() {
        if let Some(properties) = dataset.product_properties(primary) {
            return ContextMatch {
                category: properties.category.clone(),
                related_products,
                product_properties: PropertyBag::Product(properties),
            };
        }
    }

    let category = earliest_category(&query_lower, &dataset.unique_categories)
        .or_else(|| earliest_category(&context_lower, &dataset.unique_categories));

    match category.and_then(|c| dataset.category_properties(c)) {
        Some(properties) => ContextMatch {
            category: properties.category.clone(),
            related_products,
            product_properties: PropertyBag::Category(properties),
        },
        None => ContextMatch {
            category: GENERAL_CATEGORY.to_string(),
            related_products,
            product_properties: PropertyBag::default(),
        },
    }
}

fn earliest_category<'a>(haystack: &str, categories: &'a [String]) -> Option<&'a str> {
    categories
        .iter()
        .filter(|c| !c.is_empty())
        .filter_map(|c| haystack.find(&c.to_lowercase()).map(|pos| (pos, c)))
        // min_by_key devuelve el primero entre iguales: se conserva el orden del CSV.
        .min_by_key(|(pos, c)| (*pos, std::cmp::Reverse(c.len())))
        .map(|(_, c)| c.as_str())
}
