//! Cliente REST para Azure AI Language (Text Analytics v3.1).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::analytics::{
    DetectedLanguage, Entity, LinkedEntity, SentimentAnalysis, TextAnalytics,
};
use crate::config::ServiceCredentials;
use crate::error::{AnalysisError, Result};

const API_PATH: &str = "text/analytics/v3.1/";
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const TIMEOUT_SECS: u64 = 120;

/// Operaciones soportadas y su ruta relativa a `API_PATH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Languages,
    Sentiment,
    KeyPhrases,
    Entities,
    EntityLinking,
}

impl Operation {
    fn route(self) -> &'static str {
        match self {
            Self::Languages => "languages",
            Self::Sentiment => "sentiment",
            Self::KeyPhrases => "keyPhrases",
            Self::Entities => "entities/recognition/general",
            Self::EntityLinking => "entities/linking",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Languages => "detect_language",
            Self::Sentiment => "analyze_sentiment",
            Self::KeyPhrases => "extract_key_phrases",
            Self::Entities => "recognize_entities",
            Self::EntityLinking => "recognize_linked_entities",
        }
    }
}

// --- Formato de la petición ---

#[derive(Serialize)]
struct RequestBody<'a> {
    documents: [InputDocument<'a>; 1],
}

#[derive(Serialize)]
struct InputDocument<'a> {
    id: &'static str,
    text: &'a str,
}

// --- Formato de la respuesta ---

#[derive(Deserialize)]
struct BatchResponse<T> {
    #[serde(default = "Vec::new")]
    documents: Vec<T>,
    #[serde(default)]
    errors: Vec<DocumentError>,
}

#[derive(Deserialize)]
struct DocumentError {
    #[serde(default)]
    id: String,
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default, rename = "innererror")]
    inner_error: Option<Box<ErrorBody>>,
}

impl ErrorBody {
    /// El error más interno suele ser el más descriptivo.
    fn describe(&self) -> String {
        match &self.inner_error {
            Some(inner) => format!("{} ({})", self.summary(), inner.describe()),
            None => self.summary(),
        }
    }

    fn summary(&self) -> String {
        match (self.code.is_empty(), self.message.is_empty()) {
            (false, false) => format!("{}: {}", self.code, self.message),
            (true, false) => self.message.clone(),
            (false, true) => self.code.clone(),
            (true, true) => "error sin descripción".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LanguageDocument {
    detected_language: DetectedLanguage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyPhrasesDocument {
    #[serde(default)]
    key_phrases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EntitiesDocument<T> {
    #[serde(default = "Vec::new")]
    entities: Vec<T>,
}

/// Cliente autenticado con la clave del recurso.
pub struct AzureTextAnalyticsClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl AzureTextAnalyticsClient {
    pub fn new(credentials: &ServiceCredentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                AnalysisError::Configuration(format!("No se pudo crear el cliente HTTP: {e}"))
            })?;

        let base_url = credentials.endpoint.join(API_PATH).map_err(|e| {
            AnalysisError::Configuration(format!("Endpoint inválido para la API: {e}"))
        })?;

        Ok(Self {
            http,
            base_url,
            api_key: credentials.api_key.clone(),
        })
    }

    fn operation_url(&self, op: Operation) -> Result<Url> {
        self.base_url
            .join(op.route())
            .map_err(|e| AnalysisError::service(op.name(), format!("URL inválida: {e}")))
    }

    /// Envía un único documento y devuelve su resultado ya deserializado.
    async fn post_document<T: DeserializeOwned>(&self, op: Operation, text: &str) -> Result<T> {
        let url = self.operation_url(op)?;
        debug!("POST {url}");

        let body = RequestBody {
            documents: [InputDocument { id: "1", text }],
        };

        let response = self
            .http
            .post(url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::service(op.name(), format!("La petición falló: {e}")))?;

        let status = response.status();
        let payload = response.text().await.map_err(|e| {
            AnalysisError::service(op.name(), format!("No se pudo leer la respuesta: {e}"))
        })?;

        decode_single(op, status, &payload)
    }
}

/// Interpreta la respuesta de un lote de un solo documento.
fn decode_single<T: DeserializeOwned>(op: Operation, status: StatusCode, payload: &str) -> Result<T> {
    if !status.is_success() {
        let detail = match serde_json::from_str::<ErrorEnvelope>(payload) {
            Ok(envelope) => envelope.error.describe(),
            Err(_) if payload.trim().is_empty() => "sin cuerpo".to_string(),
            Err(_) => payload.trim().to_string(),
        };
        return Err(AnalysisError::service(
            op.name(),
            format!("HTTP {status}: {detail}"),
        ));
    }

    let batch: BatchResponse<T> = serde_json::from_str(payload).map_err(|e| {
        AnalysisError::service(op.name(), format!("Respuesta JSON inesperada: {e}"))
    })?;

    if let Some(doc_error) = batch.errors.into_iter().next() {
        return Err(AnalysisError::service(
            op.name(),
            format!(
                "el documento {} fue rechazado: {}",
                doc_error.id,
                doc_error.error.describe()
            ),
        ));
    }

    batch
        .documents
        .into_iter()
        .next()
        .ok_or_else(|| AnalysisError::service(op.name(), "la respuesta no contiene documentos"))
}

#[async_trait]
impl TextAnalytics for AzureTextAnalyticsClient {
    async fn detect_language(&self, text: &str) -> Result<DetectedLanguage> {
        let doc: LanguageDocument = self.post_document(Operation::Languages, text).await?;
        Ok(doc.detected_language)
    }

    async fn analyze_sentiment(&self, text: &str) -> Result<SentimentAnalysis> {
        self.post_document(Operation::Sentiment, text).await
    }

    async fn extract_key_phrases(&self, text: &str) -> Result<Vec<String>> {
        let doc: KeyPhrasesDocument = self.post_document(Operation::KeyPhrases, text).await?;
        Ok(doc.key_phrases)
    }

    async fn recognize_entities(&self, text: &str) -> Result<Vec<Entity>> {
        let doc: EntitiesDocument<Entity> = self.post_document(Operation::Entities, text).await?;
        Ok(doc.entities)
    }

    async fn recognize_linked_entities(&self, text: &str) -> Result<Vec<LinkedEntity>> {
        let doc: EntitiesDocument<LinkedEntity> =
            self.post_document(Operation::EntityLinking, text).await?;
        Ok(doc.entities)
    }
}
