//! Construcción de documentos de producto y de categoría y del grafo de
//! conocimiento a partir de las reseñas.

use anyhow::Result;
use serde_json::json;
use tracing::info;

use crate::dataset::{CategoryDocument, ProductDocument, ReviewDataset};
use crate::knowledge_graph::{KnowledgeGraph, Node, NodeType};
use crate::llm::ChatCompletion;
use crate::transforms::{self, HeadlineSplitter, HeadlinesExtractor, KeyphrasesExtractor};

/// Número de productos del grafo reducido que se usa como último recurso.
const SIMPLIFIED_PRODUCT_LIMIT: usize = 10;

pub struct DocumentProcessor<'a> {
    dataset: &'a ReviewDataset,
    kg: KnowledgeGraph,
}

impl<'a> DocumentProcessor<'a> {
    pub fn new(dataset: &'a ReviewDataset) -> Self {
        Self {
            dataset,
            kg: KnowledgeGraph::new(),
        }
    }

    /// Continúa trabajando sobre un grafo ya construido.
    pub fn with_graph(dataset: &'a ReviewDataset, kg: KnowledgeGraph) -> Self {
        Self { dataset, kg }
    }

    pub fn knowledge_graph(&self) -> &KnowledgeGraph {
        &self.kg
    }

    pub fn create_product_documents(&mut self) {
        info!("Creando documentos de producto para el grafo de conocimiento...");
        for doc in self.dataset.product_documents() {
            let content = render_product_document(&doc);
            let metadata = json!({
                "product": doc.product,
                "category": doc.category,
                "rating": doc.average_rating,
                "review_count": doc.review_count,
                "features": doc.features,
                "attributes": doc.attributes,
            });
            self.kg.add_node(Node::new(NodeType::Document, content, metadata));
        }
    }

    pub fn create_category_documents(&mut self) {
        info!("Creando documentos de categoría para el grafo de conocimiento...");
        for doc in self.dataset.category_documents() {
            let content = render_category_document(&doc);
            let metadata = json!({
                "type": "category_overview",
                "category": doc.category,
                "product_count": doc.products.len(),
                "features": doc.features,
            });
            self.kg.add_node(Node::new(NodeType::Document, content, metadata));
        }
    }

    /// Un nodo por producto más uno por categoría.
    pub fn build_knowledge_graph(&mut self) -> &KnowledgeGraph {
        self.create_product_documents();
        self.create_category_documents();
        info!("Creados {} documentos en el grafo de conocimiento", self.kg.len());
        &self.kg
    }

    /// Titulares → troceado → palabras clave. Los fallos del LLM no se
    /// capturan aquí.
    pub async fn apply_knowledge_graph_transforms<M: ChatCompletion>(
        &mut self,
        llm: &M,
    ) -> Result<&KnowledgeGraph> {
        info!("Aplicando transformaciones al grafo de conocimiento...");
        transforms::apply_transforms(
            &mut self.kg,
            llm,
            &HeadlinesExtractor { max_num: 20 },
            &HeadlineSplitter { max_tokens: 1500 },
            &KeyphrasesExtractor,
        )
        .await?;
        Ok(&self.kg)
    }

    /// Grafo mínimo con los diez primeros productos, para cuando el grafo
    /// completo hace fallar la generación.
    pub fn create_simplified_knowledge_graph(&self) -> KnowledgeGraph {
        info!("Creando grafo de conocimiento simplificado...");
        let mut simplified = KnowledgeGraph::new();

        for product in self.dataset.unique_products.iter().take(SIMPLIFIED_PRODUCT_LIMIT) {
            let Some(doc) = self.dataset.product_document(product) else { continue };
            let content = format!(
                "Product: {}\nCategory: {}\nRating: {:.1}/5\nThis is a {} product with good customer reviews.",
                doc.product,
                doc.category,
                doc.average_rating,
                doc.category.to_lowercase()
            );
            let metadata = json!({
                "product": doc.product,
                "category": doc.category,
                "rating": doc.average_rating,
            });
            simplified.add_node(Node::new(NodeType::Document, content, metadata));
        }

        info!("Grafo simplificado creado con {} nodos", simplified.len());
        simplified
    }
}

pub fn render_product_document(doc: &ProductDocument) -> String {
    let reviews: Vec<String> = doc.reviews.iter().take(5).map(|r| format!("- {r}")).collect();
    let top_features: Vec<&str> = doc.features.iter().take(3).map(String::as_str).collect();
    let top_attributes: Vec<&str> = doc.attributes.iter().take(3).map(String::as_str).collect();

    format!(
        "Product: {product}\n\
         Category: {category}\n\
         Average Rating: {rating:.1}/5\n\
         Total Reviews: {count}\n\
         \n\
         Key Features: {features}\n\
         Key Attributes: {attributes}\n\
         \n\
         Customer Reviews:\n\
         {reviews}\n\
         \n\
         Product Summary:\n\
         This {category_lower} product has received {count} reviews with an average rating of {rating:.1} stars. \
         Customers frequently mention features like {top_features} and appreciate attributes such as {top_attributes}.",
        product = doc.product,
        category = doc.category,
        rating = doc.average_rating,
        count = doc.review_count,
        features = doc.features.join(", "),
        attributes = doc.attributes.join(", "),
        reviews = reviews.join("\n"),
        category_lower = doc.category.to_lowercase(),
        top_features = top_features.join(", "),
        top_attributes = top_attributes.join(", "),
    )
}

pub fn render_category_document(doc: &CategoryDocument) -> String {
    let popular: Vec<&str> = doc.features.iter().take(5).map(String::as_str).collect();

    format!(
        "Category Overview: {category}\n\
         Available Products: {products}\n\
         Common Features: {features}\n\
         Average Category Rating: {rating:.1}/5\n\
         \n\
         {category} products in our catalog offer various features and capabilities to meet different customer needs.\n\
         Popular features in this category include {popular}.",
        category = doc.category,
        products = doc.products.join(", "),
        features = doc.features.join(", "),
        rating = doc.average_rating,
        popular = popular.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::{review, sample_dataset};
    use crate::llm::testing::ScriptedLlm;

    #[test]
    fn one_node_per_product_and_category() {
        let ds = sample_dataset();
        let mut processor = DocumentProcessor::new(&ds);
        let kg = processor.build_knowledge_graph();

        assert_eq!(kg.len(), 3 + 3);
        assert_eq!(kg.nodes[0].topic(), "AeroBook Air");
        assert_eq!(kg.nodes[3].document_metadata["type"], "category_overview");
        assert_eq!(kg.nodes[3].topic(), "Audio");
    }

    #[test]
    fn product_document_has_fixed_layout() {
        let doc = sample_dataset().product_document("EchoBuds Pro").unwrap();
        let text = render_product_document(&doc);

        assert!(text.starts_with("Product: EchoBuds Pro\nCategory: Audio\nAverage Rating: 4.0/5\nTotal Reviews: 3"));
        assert!(text.contains("Key Features: battery life, sound quality"));
        assert!(text.contains("- EchoBuds Pro review about sound quality"));
        assert!(text.contains("This audio product has received 3 reviews"));
    }

    #[test]
    fn nan_rating_renders_as_nan() {
        let doc = sample_dataset().product_document("AeroBook Air").unwrap();
        assert!(render_product_document(&doc).contains("Average Rating: NaN/5"));
    }

    #[test]
    fn simplified_graph_is_capped_at_ten_products() {
        let reviews = (0..15)
            .map(|i| review(&format!("Gadget {i:02}"), "Wearables", "fit", Some(4.0), "positive"))
            .collect();
        let ds = ReviewDataset::from_reviews(reviews);
        let processor = DocumentProcessor::new(&ds);

        let simplified = processor.create_simplified_knowledge_graph();
        assert_eq!(simplified.len(), 10);
        assert!(simplified.nodes[0].page_content.contains("This is a wearables product"));
        assert!(processor.knowledge_graph().is_empty());
    }

    #[test]
    fn transform_failure_reaches_the_caller() {
        let ds = sample_dataset();
        let mut processor = DocumentProcessor::new(&ds);
        processor.build_knowledge_graph();

        let llm = ScriptedLlm::failing();
        assert!(tokio_test::block_on(processor.apply_knowledge_graph_transforms(&llm)).is_err());
    }
}
