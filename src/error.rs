//! Taxonomía única de errores del análisis por lotes.

use std::path::PathBuf;
use thiserror::Error;

/// Cualquier fallo que aborta la ejecución. Todos se propagan hasta `main`.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Configuración inválida: {0}")]
    Configuration(String),

    #[error("No se encontró la carpeta: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// Fallo remoto: autenticación, throttling, documento rechazado, red...
    #[error("Error del servicio en '{operation}': {message}")]
    Service {
        operation: &'static str,
        message: String,
    },

    #[error(
        "El documento {} tiene {chars} caracteres (máximo permitido: {max})",
        file.display()
    )]
    DocumentTooLong {
        file: PathBuf,
        chars: usize,
        max: usize,
    },

    #[error("Error de E/S ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No se pudo escribir la hoja de cálculo {}: {source}", path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
}

impl AnalysisError {
    pub fn service(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Service {
            operation,
            message: message.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
