//! Carga y gestión de configuración de la aplicación (credenciales del
//! servicio de Text Analytics + rutas de entrada/salida).

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{AnalysisError, Result};

pub const ENDPOINT_VAR: &str = "AI_SERVICE_ENDPOINT";
pub const KEY_VAR: &str = "AI_SERVICE_KEY";

/// Carpeta de reseñas, relativa al directorio del ejecutable.
pub const DEFAULT_INPUT_DIR: &str = "reviewsADV";
pub const DEFAULT_OUTPUT_FILE: &str = "resultados_text_analytics.xlsx";

/// Límite de caracteres por documento de la API síncrona.
pub const DEFAULT_MAX_DOCUMENT_CHARS: usize = 5120;

/// Endpoint y clave del recurso de Azure AI Language.
#[derive(Clone)]
pub struct ServiceCredentials {
    pub endpoint: Url,
    pub api_key: String,
}

impl fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCredentials")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"***")
            .finish()
    }
}

impl ServiceCredentials {
    /// Lee las credenciales con una función de búsqueda arbitraria.
    /// `AppConfig::from_env` la usa con `std::env::var`; los tests con un mapa.
    pub fn from_source<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = required(&lookup, ENDPOINT_VAR)?;
        let api_key = required(&lookup, KEY_VAR)?;

        Ok(Self {
            endpoint: parse_endpoint(&endpoint)?,
            api_key,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(AnalysisError::Configuration(format!(
            "No se encontró {ENDPOINT_VAR} o {KEY_VAR} en el entorno (falta {key})"
        ))),
    }
}

/// Valida la URL y garantiza que la ruta base acabe en `/`, de modo que
/// `Url::join` añada las rutas de la API en lugar de sustituir el último tramo.
fn parse_endpoint(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).map_err(|e| {
        AnalysisError::Configuration(format!("{ENDPOINT_VAR} no es una URL válida ({raw}): {e}"))
    })?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(AnalysisError::Configuration(format!(
            "{ENDPOINT_VAR} debe usar http o https, no '{}'",
            url.scheme()
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Valores opcionales que llegan por línea de comandos.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input_dir: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub max_document_chars: Option<usize>,
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub credentials: ServiceCredentials,
    pub input_dir: PathBuf,
    pub output_path: PathBuf,
    pub max_document_chars: usize,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    /// Las credenciales se validan antes de tocar el sistema de archivos.
    pub fn from_env(overrides: Overrides) -> Result<Self> {
        Self::load_with(|key| env::var(key).ok(), program_dir, overrides)
    }

    /// `base_dir` sólo se consulta si las credenciales son válidas.
    pub fn load_with<F, D>(lookup: F, base_dir: D, overrides: Overrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
        D: FnOnce() -> Result<PathBuf>,
    {
        let credentials = ServiceCredentials::from_source(lookup)?;
        let base_dir = base_dir()?;
        Ok(Self::resolve(credentials, &base_dir, overrides))
    }

    pub fn resolve(credentials: ServiceCredentials, base_dir: &Path, overrides: Overrides) -> Self {
        Self {
            credentials,
            input_dir: overrides
                .input_dir
                .unwrap_or_else(|| base_dir.join(DEFAULT_INPUT_DIR)),
            output_path: overrides
                .output_path
                .unwrap_or_else(|| base_dir.join(DEFAULT_OUTPUT_FILE)),
            max_document_chars: overrides
                .max_document_chars
                .unwrap_or(DEFAULT_MAX_DOCUMENT_CHARS),
        }
    }
}

/// Directorio donde vive el ejecutable.
pub fn program_dir() -> Result<PathBuf> {
    let exe = env::current_exe()
        .map_err(|e| AnalysisError::io("localizando el ejecutable", e))?;
    Ok(exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")))
}
