//! Modelos de dominio: el análisis completo de un documento y la fila que
//! termina en la hoja de cálculo.

use crate::analytics::{DetectedLanguage, Entity, LinkedEntity, SentimentAnalysis};

/// Separador de las listas en las columnas de texto.
pub const LIST_SEPARATOR: &str = ", ";

/// Resultado de las cinco operaciones remotas sobre un fichero.
#[derive(Debug, Clone)]
pub struct DocumentAnalysis {
    pub file_name: String,
    pub language: DetectedLanguage,
    pub sentiment: SentimentAnalysis,
    pub key_phrases: Vec<String>,
    pub entities: Vec<Entity>,
    pub linked_entities: Vec<LinkedEntity>,
}

impl DocumentAnalysis {
    /// Líneas de cada sección del informe por consola; son exactamente los
    /// elementos que `to_row` une con `LIST_SEPARATOR`.
    pub fn key_phrase_items(&self) -> Vec<String> {
        self.key_phrases.clone()
    }

    pub fn entity_items(&self) -> Vec<String> {
        self.entities.iter().map(ToString::to_string).collect()
    }

    pub fn link_items(&self) -> Vec<String> {
        self.linked_entities.iter().map(ToString::to_string).collect()
    }

    pub fn to_row(&self) -> ResultRow {
        ResultRow {
            archivo: self.file_name.clone(),
            idioma: self.language.name.clone(),
            sentimiento: self.sentiment.sentiment.to_string(),
            key_phrases: self.key_phrase_items().join(LIST_SEPARATOR),
            entities: self.entity_items().join(LIST_SEPARATOR),
            links: self.link_items().join(LIST_SEPARATOR),
        }
    }
}

/// Una fila de la hoja de resultados. Inmutable una vez creada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub archivo: String,
    pub idioma: String,
    pub sentimiento: String,
    pub key_phrases: String,
    pub entities: String,
    pub links: String,
}

impl ResultRow {
    pub const HEADERS: [&'static str; 6] = [
        "Archivo",
        "Idioma",
        "Sentimiento",
        "Key_Phrases",
        "Entities",
        "Links",
    ];

    /// Valores en el mismo orden que `HEADERS`.
    pub fn cells(&self) -> [&str; 6] {
        [
            &self.archivo,
            &self.idioma,
            &self.sentimiento,
            &self.key_phrases,
            &self.entities,
            &self.links,
        ]
    }
}
