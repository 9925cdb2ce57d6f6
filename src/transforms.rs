//! Transformaciones del grafo de conocimiento: extracción de titulares,
//! troceado por titulares y extracción de palabras clave.
//!
//! Los errores de llamada al LLM se propagan; una respuesta que no se puede
//! interpretar deja la propiedad vacía y sólo genera un aviso.

use anyhow::Result;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::knowledge_graph::{KnowledgeGraph, Node, NodeType};
use crate::llm::{parse_json_reply, ChatCompletion};

const HEADLINES_PROMPT: &str = r#"
Extract the most important section headlines from the given text.
Only return headlines that appear verbatim in the text, in the order they appear.
The output MUST be a single valid JSON object with one key, "headlines", holding a list of strings.
No explanations, only the JSON.
"#;

const KEYPHRASES_PROMPT: &str = r#"
Extract the top keyphrases from the given text: product names, features, attributes and opinions a customer could ask about.
The output MUST be a single valid JSON object with one key, "keyphrases", holding a list of strings.
No explanations, only the JSON.
"#;

#[derive(Debug, Default, Deserialize)]
struct HeadlinesReply {
    #[serde(default)]
    headlines: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct KeyphrasesReply {
    #[serde(default)]
    keyphrases: Vec<String>,
}

/// Añade la propiedad `headlines` a los nodos `Document`.
#[derive(Debug, Clone)]
pub struct HeadlinesExtractor {
    pub max_num: usize,
}

impl Default for HeadlinesExtractor {
    fn default() -> Self {
        Self { max_num: 20 }
    }
}

impl HeadlinesExtractor {
    pub async fn apply<M: ChatCompletion>(&self, kg: &mut KnowledgeGraph, llm: &M) -> Result<()> {
        for node in kg.nodes.iter_mut().filter(|n| n.node_type == NodeType::Document) {
            let user = format!("Max headlines: {}\n\nText:\n{}", self.max_num, node.page_content);
            let response = llm.chat(HEADLINES_PROMPT, &user).await?;

            let mut reply = parse_json_reply::<HeadlinesReply>(&response).unwrap_or_else(|e| {
                warn!("No se pudo parsear la respuesta de titulares para '{}'. Error: {}", node.topic(), e);
                HeadlinesReply::default()
            });
            reply.headlines.truncate(self.max_num);
            node.headlines = Some(reply.headlines);
        }
        Ok(())
    }
}

/// Trocea cada documento por sus titulares y crea nodos `Chunk` hijos.
#[derive(Debug, Clone)]
pub struct HeadlineSplitter {
    pub max_tokens: usize,
}

impl Default for HeadlineSplitter {
    fn default() -> Self {
        Self { max_tokens: 1500 }
    }
}

impl HeadlineSplitter {
    pub fn apply(&self, kg: &mut KnowledgeGraph) {
        let mut new_chunks: Vec<(Uuid, Node)> = Vec::new();

        for node in kg.nodes.iter().filter(|n| n.node_type == NodeType::Document) {
            let Some(headlines) = node.headlines.as_deref() else { continue };
            if headlines.is_empty() {
                continue;
            }

            for section in split_by_headlines(&node.page_content, headlines) {
                for piece in split_by_tokens(&section, self.max_tokens) {
                    let chunk = Node::new(NodeType::Chunk, piece, node.document_metadata.clone());
                    new_chunks.push((node.id, chunk));
                }
            }
        }

        for (parent, chunk) in new_chunks {
            let child = kg.add_node(chunk);
            kg.add_relationship(parent, child, "child");
        }
    }
}

/// Añade la propiedad `keyphrases` a los chunks y a los documentos que no se
/// trocearon.
#[derive(Debug, Clone, Default)]
pub struct KeyphrasesExtractor;

impl KeyphrasesExtractor {
    pub async fn apply<M: ChatCompletion>(&self, kg: &mut KnowledgeGraph, llm: &M) -> Result<()> {
        let targets: Vec<Uuid> = kg
            .nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Chunk || kg.children_of(n.id).next().is_none())
            .map(|n| n.id)
            .collect();

        for node in kg.nodes.iter_mut().filter(|n| targets.contains(&n.id)) {
            let response = llm.chat(KEYPHRASES_PROMPT, &node.page_content).await?;
            let reply = parse_json_reply::<KeyphrasesReply>(&response).unwrap_or_else(|e| {
                warn!("No se pudo parsear la respuesta de palabras clave para '{}'. Error: {}", node.topic(), e);
                KeyphrasesReply::default()
            });
            node.keyphrases = Some(reply.keyphrases);
        }
        Ok(())
    }
}

/// Aplica titulares → troceado → palabras clave, en ese orden.
pub async fn apply_transforms<M: ChatCompletion>(
    kg: &mut KnowledgeGraph,
    llm: &M,
    headlines: &HeadlinesExtractor,
    splitter: &HeadlineSplitter,
    keyphrases: &KeyphrasesExtractor,
) -> Result<()> {
    headlines.apply(kg, llm).await?;
    splitter.apply(kg);
    keyphrases.apply(kg, llm).await?;
    info!("El grafo tiene ahora {} nodos tras las transformaciones", kg.len());
    Ok(())
}

/// Corta el texto en cada titular encontrado, respetando el orden de
/// aparición. El texto previo al primer titular forma su propia sección.
fn split_by_headlines(text: &str, headlines: &[String]) -> Vec<String> {
    let mut cuts: Vec<usize> = Vec::new();
    let mut cursor = 0;
    for headline in headlines {
        let headline = headline.trim();
        if headline.is_empty() {
            continue;
        }
        if let Some(pos) = text[cursor..].find(headline) {
            cuts.push(cursor + pos);
            cursor += pos + headline.len();
        }
    }

    if cuts.is_empty() {
        return vec![text.trim().to_string()];
    }

    let mut bounds = vec![0];
    bounds.extend(cuts.iter().copied().filter(|&c| c > 0));
    bounds.push(text.len());

    bounds
        .windows(2)
        .map(|w| text[w[0]..w[1]].trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn split_by_tokens(section: &str, max_tokens: usize) -> Vec<String> {
    let words: Vec<&str> = section.split_whitespace().collect();
    if words.len() <= max_tokens || max_tokens == 0 {
        return vec![section.to_string()];
    }
    words.chunks(max_tokens).map(|c| c.join(" ")).collect()
}
