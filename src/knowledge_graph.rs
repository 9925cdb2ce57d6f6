//! Grafo de conocimiento en memoria que alimenta la síntesis de consultas.
//!
//! Los nodos `Document` se crean a partir de las reseñas; las
//! transformaciones añaden titulares, palabras clave y nodos `Chunk` hijos.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Document,
    Chunk,
}

/// Propiedad de lista sobre la que puede trabajar un sintetizador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeProperty {
    Headlines,
    Keyphrases,
}

impl NodeProperty {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeProperty::Headlines => "headlines",
            NodeProperty::Keyphrases => "keyphrases",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: Uuid,
    pub node_type: NodeType,
    pub page_content: String,
    pub document_metadata: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headlines: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyphrases: Option<Vec<String>>,
}

impl Node {
    pub fn new(node_type: NodeType, page_content: impl Into<String>, document_metadata: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            node_type,
            page_content: page_content.into(),
            document_metadata,
            headlines: None,
            keyphrases: None,
        }
    }

    pub fn property(&self, property: NodeProperty) -> Option<&[String]> {
        match property {
            NodeProperty::Headlines => self.headlines.as_deref(),
            NodeProperty::Keyphrases => self.keyphrases.as_deref(),
        }
    }

    /// Nombre con el que se presenta el nodo en los prompts: producto,
    /// categoría o cadena vacía.
    pub fn topic(&self) -> &str {
        ["product", "category"]
            .iter()
            .find_map(|key| self.document_metadata.get(key).and_then(Value::as_str))
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub source: Uuid,
    pub target: Uuid,
    pub kind: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub nodes: Vec<Node>,
    pub relationships: Vec<Relationship>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) -> Uuid {
        let id = node.id;
        self.nodes.push(node);
        id
    }

    pub fn add_relationship(&mut self, source: Uuid, target: Uuid, kind: &str) {
        self.relationships.push(Relationship {
            source,
            target,
            kind: kind.to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children_of(&self, id: Uuid) -> impl Iterator<Item = &Node> + '_ {
        self.relationships
            .iter()
            .filter(move |r| r.source == id && r.kind == "child")
            .filter_map(move |r| self.nodes.iter().find(|n| n.id == r.target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn topic_prefers_product_over_category() {
        let node = Node::new(NodeType::Document, "x", json!({"product": "EchoBuds Pro", "category": "Audio"}));
        assert_eq!(node.topic(), "EchoBuds Pro");

        let node = Node::new(NodeType::Document, "x", json!({"type": "category_overview", "category": "Audio"}));
        assert_eq!(node.topic(), "Audio");

        let node = Node::new(NodeType::Chunk, "x", Value::Null);
        assert_eq!(node.topic(), "");
    }

    #[test]
    fn children_follow_child_relationships() {
        let mut kg = KnowledgeGraph::new();
        let parent = kg.add_node(Node::new(NodeType::Document, "parent", Value::Null));
        let child = kg.add_node(Node::new(NodeType::Chunk, "child", Value::Null));
        kg.add_relationship(parent, child, "child");

        let children: Vec<&str> = kg.children_of(parent).map(|n| n.page_content.as_str()).collect();
        assert_eq!(children, vec!["child"]);
        assert_eq!(kg.children_of(child).count(), 0);
    }
}
