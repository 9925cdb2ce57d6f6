//! Abstracción sobre Rig para trabajar con distintos proveedores de LLM.
//! De momento se implementa OpenAI; Gemini/Ollama quedan preparados para el futuro.

use crate::config::{AppConfig, LlmProvider};
use anyhow::{anyhow, Result};
use rig::completion::Prompt;
use rig::embeddings::EmbeddingModel; // <- para .embed_texts
use serde::de::DeserializeOwned;

/// Punto de entrada de todas las llamadas de chat del pipeline.
///
/// Existe como trait para que el clasificador, las transformaciones y los
/// sintetizadores puedan probarse con respuestas fijas.
#[allow(async_fn_in_trait)]
pub trait ChatCompletion {
    /// Envía un prompt de sistema y un mensaje de usuario y devuelve el texto
    /// de la respuesta.
    async fn chat(&self, system_prompt: &str, user_message: &str) -> Result<String>;
}

impl<T: ChatCompletion + ?Sized> ChatCompletion for &T {
    async fn chat(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        (**self).chat(system_prompt, user_message).await
    }
}

/// Gestor de LLMs y embeddings.
#[derive(Debug, Clone)]
pub struct LlmManager {
    pub provider: LlmProvider,
    pub embedding_model: String,
    pub chat_model: String,
    pub temperature: f64,
}

impl LlmManager {
    /// Construye el manager a partir de la configuración, con la temperatura
    /// del generador.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        Ok(Self {
            provider: cfg.llm_provider.clone(),
            embedding_model: cfg.llm_embedding_model.clone(),
            chat_model: cfg.llm_chat_model.clone(),
            temperature: cfg.generator_temperature,
        })
    }

    /// Copia del manager con otra temperatura (el clasificador usa una baja).
    pub fn with_temperature(&self, temperature: f64) -> Self {
        Self {
            temperature,
            ..self.clone()
        }
    }

    fn chat_model_name(&self) -> &str {
        if self.chat_model.is_empty() {
            "gpt-4o-mini"
        } else {
            self.chat_model.as_str()
        }
    }

    // ---------------------------------------------------------------------
    // EMBEDDINGS
    // ---------------------------------------------------------------------

    /// Calcula el embedding de un único texto.
    ///
    /// Nota: sólo implementado para OpenAI.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f64>> {
        match self.provider {
            LlmProvider::OpenAI => self.embed_with_openai(text).await,
            ref other => Err(anyhow!(
                "Proveedor LLM {:?} aún no implementado para embeddings",
                other
            )),
        }
    }

    async fn embed_with_openai(&self, text: &str) -> Result<Vec<f64>> {
        use rig::providers::openai::{self, TEXT_EMBEDDING_3_SMALL};
        // Trait para client.embedding_model(...)
        use rig::client::EmbeddingsClient as _;

        let client = openai::Client::from_env();

        let model_name = if self.embedding_model.is_empty() {
            TEXT_EMBEDDING_3_SMALL
        } else {
            self.embedding_model.as_str()
        };

        let embedding_model = client.embedding_model(model_name);
        let embeddings = embedding_model.embed_texts(vec![text.to_string()]).await?;

        embeddings
            .into_iter()
            .next()
            .map(|e| e.vec)
            .ok_or_else(|| anyhow!("No se pudo generar embedding de la consulta"))
    }

    // ---------------------------------------------------------------------
    // CHAT / COMPLETION
    // ---------------------------------------------------------------------

    async fn chat_with_openai(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        use rig::providers::openai;
        // Trait para client.agent(...)
        use rig::client::CompletionClient as _;

        let client = openai::Client::from_env();

        let agent = client
            .agent(self.chat_model_name())
            .preamble(system_prompt)
            .temperature(self.temperature)
            .build();

        let answer = agent.prompt(user_message).await?;
        Ok(answer)
    }
}

impl ChatCompletion for LlmManager {
    async fn chat(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        match self.provider {
            LlmProvider::OpenAI => self.chat_with_openai(system_prompt, user_message).await,
            ref other => Err(anyhow!(
                "Proveedor LLM {:?} aún no implementado para chat",
                other
            )),
        }
    }
}

/// Quita las vallas de markdown que a veces envuelven el JSON del LLM.
pub fn strip_code_fences(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Interpreta la respuesta del LLM como JSON de tipo `T`.
pub fn parse_json_reply<T: DeserializeOwned>(response: &str) -> serde_json::Result<T> {
    serde_json::from_str(strip_code_fences(response))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn parses_fenced_reply() {
        #[derive(serde::Deserialize)]
        struct Reply {
            headlines: Vec<String>,
        }
        let reply: Reply = parse_json_reply("```json\n{\"headlines\": [\"Intro\"]}\n```").unwrap();
        assert_eq!(reply.headlines, vec!["Intro"]);
    }

    #[test]
    fn unimplemented_provider_fails_to_chat() {
        let manager = LlmManager {
            provider: LlmProvider::Gemini,
            embedding_model: String::new(),
            chat_model: String::new(),
            temperature: 0.1,
        };
        let err = tokio_test::block_on(manager.chat("system", "hola")).unwrap_err();
        assert!(err.to_string().contains("Gemini"));
    }
}
