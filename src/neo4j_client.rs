use crate::config::VectorStoreConfig;
use anyhow::{anyhow, Result};
use neo4rs::{Config, ConfigBuilder, Graph};
use tracing::info;
use url::Url;

/// Dirección `host:port` a partir de la URI configurada (7687 por defecto).
pub fn bolt_address(uri: &str) -> Result<String> {
    let url = Url::parse(uri).map_err(|e| anyhow!("URI del vector store inválida '{uri}': {e}"))?;
    let host = url.host_str().unwrap_or("localhost");
    let port = url.port().unwrap_or(7687);
    Ok(format!("{host}:{port}"))
}

/// Configuración de neo4rs apuntando a la base de datos del keyspace.
pub fn neo4j_config(cfg: &VectorStoreConfig) -> Result<Config> {
    let addr = bolt_address(&cfg.uri)?;
    let config = ConfigBuilder::default()
        .uri(&addr)
        .user(&cfg.user)
        .password(&cfg.password)
        .db(cfg.keyspace.as_str())
        .build()?;
    Ok(config)
}

/// Abre la conexión con la base de datos indicada por el keyspace.
pub async fn connect(cfg: &VectorStoreConfig) -> Result<Graph> {
    info!("Conectando a Neo4j en {} (base de datos '{}')...", cfg.uri, cfg.keyspace);
    let graph = Graph::connect(neo4j_config(cfg)?).await?;
    info!("Conexión a Neo4j OK");
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_defaults_to_bolt_port() {
        assert_eq!(bolt_address("neo4j://db.local").unwrap(), "db.local:7687");
        assert_eq!(bolt_address("bolt://10.0.0.2:7999").unwrap(), "10.0.0.2:7999");
        assert!(bolt_address("not a uri").is_err());
    }

    fn store_config(uri: &str) -> VectorStoreConfig {
        VectorStoreConfig {
            uri: uri.into(),
            user: "neo4j".into(),
            password: "secret".into(),
            keyspace: "reviews".into(),
            collection: "chatbotecomm".into(),
            dimension: 1536,
        }
    }

    #[test]
    fn config_builds_for_keyspace_database() {
        assert!(neo4j_config(&store_config("neo4j://db.local:7687")).is_ok());
        assert!(neo4j_config(&store_config("sin esquema")).is_err());
    }
}
