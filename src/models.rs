//! Modelos de dominio: filas de reseñas, personas, consultas generadas y
//! los envoltorios que se escriben a disco.

use serde::{Deserialize, Deserializer, Serialize};

/// Una fila del CSV de reseñas de producto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductReview {
    pub product: String,
    pub category: String,
    pub review_text: String,
    pub feature_mentioned: String,
    pub attribute_mentioned: String,
    /// Celdas vacías o no numéricas se cargan como `None`.
    #[serde(deserialize_with = "csv::invalid_option")]
    pub rating: Option<f64>,
    pub sentiment: String,
}

/// Persona de cliente usada para orientar el estilo de las consultas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub role_description: String,
}

/// Intención de una consulta. Se serializa con la etiqueta literal que
/// devuelve el clasificador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    CategoryQueries,
    FeatureQueries,
    ProductQueries,
}

impl QueryType {
    pub const ALL: [QueryType; 3] = [
        QueryType::CategoryQueries,
        QueryType::FeatureQueries,
        QueryType::ProductQueries,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::CategoryQueries => "category_queries",
            QueryType::FeatureQueries => "feature_queries",
            QueryType::ProductQueries => "product_queries",
        }
    }

    /// Reconoce una de las tres etiquetas exactas; cualquier otra cosa es `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == label)
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductProperties {
    pub product_name: String,
    pub category: String,
    /// `NaN` sin valoraciones; se escribe como `null` y se relee como `NaN`.
    #[serde(deserialize_with = "nan_if_null")]
    pub average_rating: f64,
    pub total_reviews: usize,
    pub features: Vec<String>,
    pub attributes: Vec<String>,
    pub sentiment_distribution: SentimentDistribution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryProperties {
    pub category: String,
    pub products_in_category: Vec<String>,
    #[serde(deserialize_with = "nan_if_null")]
    pub average_category_rating: f64,
    pub total_category_reviews: usize,
    pub common_features: Vec<String>,
    pub common_attributes: Vec<String>,
}

fn nan_if_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Objeto `{}` estricto: cualquier clave lo invalida.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmptyBag {}

/// Metadatos anidados de una consulta. `Empty` se serializa como `{}` y debe
/// ir el último para que la deserialización sin etiqueta pruebe antes las
/// variantes con campos; un mapa que no encaja en ninguna es un error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyBag {
    Product(ProductProperties),
    Category(CategoryProperties),
    Empty(EmptyBag),
}

impl Default for PropertyBag {
    fn default() -> Self {
        PropertyBag::Empty(EmptyBag {})
    }
}

impl PropertyBag {
    pub fn is_empty(&self) -> bool {
        matches!(self, PropertyBag::Empty(_))
    }
}

/// Consulta sintética enriquecida con contexto de e-commerce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuery {
    pub query: String,
    pub context: String,
    pub category: String,
    pub related_products: Vec<String>,
    pub query_type: QueryType,
    pub product_properties: PropertyBag,
    pub synthesizer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestsetMetadata {
    pub generator: String,
    pub total_queries: usize,
    pub source_data: String,
    pub categories: Vec<String>,
    pub products_count: usize,
    pub personas_used: Vec<String>,
    pub generated_at: String,
}

/// Documento JSON completo que produce cada ejecución del generador.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestsetOutput {
    pub metadata: TestsetMetadata,
    pub synthetic_testset: Vec<GeneratedQuery>,
}

/// Fila del CSV aplanado. El `PropertyBag` viaja como JSON compacto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatQueryRow {
    pub query: String,
    pub category: String,
    pub query_type: String,
    pub related_products: String,
    pub product_properties: String,
}

impl FlatQueryRow {
    pub const HEADER: [&'static str; 5] = [
        "query",
        "category",
        "query_type",
        "related_products",
        "product_properties",
    ];

    pub fn from_query(item: &GeneratedQuery) -> serde_json::Result<Self> {
        let product_properties = if item.product_properties.is_empty() {
            String::new()
        } else {
            serde_json::to_string(&item.product_properties)?
        };

        Ok(Self {
            query: item.query.clone(),
            category: item.category.clone(),
            query_type: item.query_type.to_string(),
            related_products: item.related_products.join(", "),
            product_properties,
        })
    }
}

/// Consulta producida por el generador de prompt único.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PromptQuery {
    /// Pregunta tal y como la escribiría un cliente.
    pub query: String,
    /// Intención corta, p. ej. `budget_search` o `use_case_specific`.
    pub intent: String,
    /// Categoría del catálogo a la que se refiere.
    pub category: String,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct PromptQueryBatch {
    pub queries: Vec<PromptQuery>,
}

/// `PromptQuery` con el contexto de producto añadido tras la generación.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancedPromptQuery {
    #[serde(flatten)]
    pub base: PromptQuery,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_products: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_context: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_bag() -> PropertyBag {
        PropertyBag::Product(ProductProperties {
            product_name: "EchoBuds Pro".into(),
            category: "Audio".into(),
            average_rating: 4.0,
            total_reviews: 1,
            features: vec!["battery".into()],
            attributes: vec!["long".into()],
            sentiment_distribution: SentimentDistribution {
                positive: 1,
                neutral: 0,
                negative: 0,
            },
        })
    }

    #[test]
    fn query_type_labels_round_trip() {
        for t in QueryType::ALL {
            assert_eq!(QueryType::from_label(t.as_str()), Some(t));
            assert_eq!(serde_json::to_string(&t).unwrap(), format!("\"{}\"", t.as_str()));
        }
        assert_eq!(QueryType::from_label("shopping_queries"), None);
    }

    #[test]
    fn empty_bag_serializes_as_empty_object() {
        assert_eq!(serde_json::to_string(&PropertyBag::default()).unwrap(), "{}");
        let back: PropertyBag = serde_json::from_str("{}").unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn product_bag_keeps_its_variant_when_read_back() {
        let json = serde_json::to_string(&product_bag()).unwrap();
        let back: PropertyBag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, product_bag());
    }

    #[test]
    fn unrated_product_bag_reads_back_as_product() {
        let mut bag = product_bag();
        if let PropertyBag::Product(p) = &mut bag {
            p.average_rating = f64::NAN;
        }
        let json = serde_json::to_string(&bag).unwrap();
        assert!(json.contains("\"average_rating\":null"));

        match serde_json::from_str::<PropertyBag>(&json).unwrap() {
            PropertyBag::Product(p) => {
                assert_eq!(p.product_name, "EchoBuds Pro");
                assert!(p.average_rating.is_nan());
            }
            other => panic!("se esperaba un producto, no {other:?}"),
        }
    }

    #[test]
    fn unrated_category_bag_reads_back_as_category() {
        let json = r#"{"category": "Laptops", "products_in_category": ["AeroBook Air"],
            "average_category_rating": null, "total_category_reviews": 1,
            "common_features": [], "common_attributes": []}"#;
        match serde_json::from_str::<PropertyBag>(json).unwrap() {
            PropertyBag::Category(c) => assert!(c.average_category_rating.is_nan()),
            other => panic!("se esperaba una categoría, no {other:?}"),
        }
    }

    #[test]
    fn malformed_bag_is_rejected() {
        assert!(serde_json::from_str::<PropertyBag>(r#"{"product_name": "EchoBuds Pro"}"#).is_err());
        assert!(serde_json::from_str::<PropertyBag>(r#"{"unexpected": 1}"#).is_err());
    }

    #[test]
    fn flat_row_encodes_bag_as_compact_json() {
        let item = GeneratedQuery {
            query: "How's the battery on EchoBuds Pro?".into(),
            context: String::new(),
            category: "Audio".into(),
            related_products: vec!["EchoBuds Pro".into(), "SoundMax".into()],
            query_type: QueryType::FeatureQueries,
            product_properties: product_bag(),
            synthesizer: "single_hop_specific_query_synthesizer".into(),
            persona: None,
        };

        let row = FlatQueryRow::from_query(&item).unwrap();
        assert_eq!(row.related_products, "EchoBuds Pro, SoundMax");
        assert_eq!(row.query_type, "feature_queries");
        assert_eq!(row.product_properties, serde_json::to_string(&product_bag()).unwrap());
    }
}
