/// Fallos de cada escalón de la escalera de generación.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error("la generación con distribución de consultas falló: {reason}")]
    FullFailed { reason: String },

    #[error("la generación básica sin distribución falló: {reason}")]
    BasicFailed { reason: String },

    #[error("la generación con el grafo simplificado falló: {reason}")]
    SimplifiedFailed { reason: String },
}

impl GenerationError {
    pub fn reason(&self) -> &str {
        match self {
            GenerationError::FullFailed { reason }
            | GenerationError::BasicFailed { reason }
            | GenerationError::SimplifiedFailed { reason } => reason,
        }
    }
}
