//! Abstracción sobre el servicio de Text Analytics: las cinco operaciones
//! que se aplican a cada documento y los tipos que devuelven.

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;

/// Idioma principal detectado en un documento.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedLanguage {
    pub name: String,
    pub iso6391_name: String,
    pub confidence_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct SentimentScores {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

/// Sentimiento global del documento.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentAnalysis {
    pub sentiment: SentimentLabel,
    #[serde(default)]
    pub confidence_scores: SentimentScores,
}

/// Entidad con nombre reconocida (persona, lugar, organización...).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub text: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub confidence_score: f64,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.text, self.category)
    }
}

/// Entidad enlazada a una base de conocimiento (normalmente Wikipedia).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedEntity {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub data_source: String,
}

impl fmt::Display for LinkedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

/// Las cinco operaciones remotas. Cada llamada recibe un único documento y
/// cualquier fallo se devuelve como `AnalysisError::Service`.
#[async_trait]
pub trait TextAnalytics: Send + Sync {
    async fn detect_language(&self, text: &str) -> Result<DetectedLanguage>;
    async fn analyze_sentiment(&self, text: &str) -> Result<SentimentAnalysis>;
    async fn extract_key_phrases(&self, text: &str) -> Result<Vec<String>>;
    async fn recognize_entities(&self, text: &str) -> Result<Vec<Entity>>;
    async fn recognize_linked_entities(&self, text: &str) -> Result<Vec<LinkedEntity>>;
}
