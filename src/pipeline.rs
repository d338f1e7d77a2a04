//! Análisis secuencial de una carpeta de reseñas: cada fichero pasa por las
//! cinco operaciones del servicio, se imprime su informe y se acumula su fila.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::{
    analytics::TextAnalytics,
    error::{AnalysisError, Result},
    models::{DocumentAnalysis, ResultRow},
    report, walker,
};

const SEPARATOR: &str = "-------------";

/// Parámetros de una ejecución.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input_dir: PathBuf,
    pub output_path: PathBuf,
    pub max_document_chars: usize,
}

/// Resumen de una ejecución completada.
#[derive(Debug)]
pub struct RunSummary {
    pub rows: Vec<ResultRow>,
    pub output_path: PathBuf,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Resumen: {} ficheros analizados, resultados en {}",
            self.rows.len(),
            self.output_path.display()
        )
    }
}

/// Fallo a mitad de carpeta: el error y las filas ya completadas.
#[derive(Debug)]
pub struct RunFailure {
    pub error: AnalysisError,
    pub completed: Vec<ResultRow>,
}

impl From<AnalysisError> for RunFailure {
    fn from(error: AnalysisError) -> Self {
        Self {
            error,
            completed: Vec::new(),
        }
    }
}

/// Ejecuta el lote completo y escribe la hoja de resultados.
///
/// Si algún fichero falla, la hoja principal no se escribe; las filas ya
/// completadas se guardan en `<salida>.partial.xlsx` y se devuelve el error.
pub async fn run<A, W>(client: &A, options: &RunOptions, out: &mut W) -> Result<RunSummary>
where
    A: TextAnalytics + ?Sized,
    W: Write,
{
    match analyze_directory(client, &options.input_dir, options.max_document_chars, out).await {
        Ok(rows) => {
            report::write_report(&rows, &options.output_path)?;
            discard_stale_partial(&options.output_path);
            let summary = RunSummary {
                rows,
                output_path: options.output_path.clone(),
            };
            info!("{summary}");
            Ok(summary)
        }
        Err(RunFailure { error, completed }) => {
            error!("Análisis interrumpido: {error}");
            if !completed.is_empty() {
                save_partial(&completed, &options.output_path, out);
            }
            Err(error)
        }
    }
}

/// El error del análisis tiene prioridad: un fallo al guardar el parcial sólo se registra.
fn save_partial<W: Write>(rows: &[ResultRow], output_path: &Path, out: &mut W) {
    let partial_path = report::partial_report_path(output_path);
    match report::write_report(rows, &partial_path) {
        Ok(()) => {
            warn!(
                "{} filas completadas guardadas en {}",
                rows.len(),
                partial_path.display()
            );
            if let Err(err) = writeln!(
                out,
                "\n Resultados parciales guardados en: {}",
                partial_path.display()
            ) {
                warn!("No se pudo avisar por consola del fichero parcial: {err}");
            }
        }
        Err(err) => error!("No se pudieron guardar los resultados parciales: {err}"),
    }
}

/// Tras una ejecución completa, un parcial de una ejecución fallida anterior
/// ya no describe el estado en disco.
fn discard_stale_partial(output_path: &Path) {
    let partial_path = report::partial_report_path(output_path);
    if !partial_path.exists() {
        return;
    }
    match fs::remove_file(&partial_path) {
        Ok(()) => info!("Eliminado el parcial anterior {}", partial_path.display()),
        Err(err) => warn!(
            "No se pudo eliminar el parcial anterior {}: {err}",
            partial_path.display()
        ),
    }
}

/// Recorre la carpeta y devuelve una fila por fichero, en orden de enumeración.
pub async fn analyze_directory<A, W>(
    client: &A,
    dir: &Path,
    max_document_chars: usize,
    out: &mut W,
) -> std::result::Result<Vec<ResultRow>, RunFailure>
where
    A: TextAnalytics + ?Sized,
    W: Write,
{
    let documents = walker::list_documents(dir)?;
    let mut rows = Vec::new();

    for entry in documents {
        let outcome = match entry {
            Ok(path) => analyze_document(client, &path, max_document_chars, out).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(analysis) => rows.push(analysis.to_row()),
            Err(error) => {
                return Err(RunFailure {
                    error,
                    completed: rows,
                })
            }
        }
    }

    info!("Carpeta {} analizada: {} ficheros", dir.display(), rows.len());
    Ok(rows)
}

/// Lee un fichero, lo envía a las cinco operaciones en orden e imprime su informe.
pub async fn analyze_document<A, W>(
    client: &A,
    path: &Path,
    max_document_chars: usize,
    out: &mut W,
) -> Result<DocumentAnalysis>
where
    A: TextAnalytics + ?Sized,
    W: Write,
{
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let text = fs::read_to_string(path)
        .map_err(|e| AnalysisError::io(format!("leyendo {}", path.display()), e))?;

    let chars = text.chars().count();
    if chars > max_document_chars {
        return Err(AnalysisError::DocumentTooLong {
            file: path.to_path_buf(),
            chars,
            max: max_document_chars,
        });
    }

    info!("Analizando {file_name} ({chars} caracteres)");
    write_header(out, &file_name, &text).map_err(console_error)?;

    let language = client.detect_language(&text).await?;
    debug!("{file_name}: idioma {}", language.name);
    let sentiment = client.analyze_sentiment(&text).await?;
    debug!("{file_name}: sentimiento {}", sentiment.sentiment);
    let key_phrases = client.extract_key_phrases(&text).await?;
    let entities = client.recognize_entities(&text).await?;
    let linked_entities = client.recognize_linked_entities(&text).await?;

    let analysis = DocumentAnalysis {
        file_name,
        language,
        sentiment,
        key_phrases,
        entities,
        linked_entities,
    };
    write_findings(out, &analysis).map_err(console_error)?;

    Ok(analysis)
}

fn console_error(err: std::io::Error) -> AnalysisError {
    AnalysisError::io("escribiendo el informe por consola", err)
}

fn write_header<W: Write>(out: &mut W, file_name: &str, text: &str) -> std::io::Result<()> {
    writeln!(out, "\n{SEPARATOR}")?;
    writeln!(out, "{file_name}")?;
    writeln!(out, "\n{text}")
}

/// Las secciones con lista vacía no se imprimen.
fn write_findings<W: Write>(out: &mut W, analysis: &DocumentAnalysis) -> std::io::Result<()> {
    writeln!(out, "\nLanguage: {}", analysis.language.name)?;
    writeln!(out, "\nSentiment: {}", analysis.sentiment.sentiment)?;
    write_section(out, "Key Phrases:", &analysis.key_phrase_items())?;
    write_section(out, "Entities", &analysis.entity_items())?;
    write_section(out, "Links", &analysis.link_items())?;
    out.flush()
}

fn write_section<W: Write>(out: &mut W, title: &str, items: &[String]) -> std::io::Result<()> {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(out, "\n{title}")?;
    for item in items {
        writeln!(out, "\t{item}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{
        DetectedLanguage, Entity, LinkedEntity, SentimentAnalysis, SentimentLabel, SentimentScores,
    };
    use crate::models::LIST_SEPARATOR;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};

    /// Servicio falso: responde en función del texto y registra cada llamada.
    #[derive(Default)]
    struct FakeAnalytics {
        fail_sentiment_on: Option<String>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeAnalytics {
        fn failing_sentiment_on(text: &str) -> Self {
            Self {
                fail_sentiment_on: Some(text.to_string()),
                ..Self::default()
            }
        }

        fn record(&self, op: &'static str) {
            self.calls.lock().unwrap().push(op);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextAnalytics for FakeAnalytics {
        async fn detect_language(&self, text: &str) -> Result<DetectedLanguage> {
            self.record("detect_language");
            let (name, code) = if text.contains("hotel") {
                ("English", "en")
            } else {
                ("Spanish", "es")
            };
            Ok(DetectedLanguage {
                name: name.into(),
                iso6391_name: code.into(),
                confidence_score: 0.99,
            })
        }

        async fn analyze_sentiment(&self, text: &str) -> Result<SentimentAnalysis> {
            self.record("analyze_sentiment");
            if self.fail_sentiment_on.as_deref() == Some(text) {
                return Err(AnalysisError::service("analyze_sentiment", "429 Too Many Requests"));
            }
            let sentiment = if text.to_lowercase().contains("terrible") {
                SentimentLabel::Negative
            } else {
                SentimentLabel::Positive
            };
            Ok(SentimentAnalysis {
                sentiment,
                confidence_scores: SentimentScores::default(),
            })
        }

        async fn extract_key_phrases(&self, text: &str) -> Result<Vec<String>> {
            self.record("extract_key_phrases");
            if text.contains("hotel") {
                Ok(vec!["great hotel".into(), "friendly staff".into()])
            } else {
                Ok(Vec::new())
            }
        }

        async fn recognize_entities(&self, text: &str) -> Result<Vec<Entity>> {
            self.record("recognize_entities");
            if text.contains("London") {
                Ok(vec![Entity {
                    text: "London".into(),
                    category: "Location".into(),
                    subcategory: Some("GPE".into()),
                    confidence_score: 0.97,
                }])
            } else {
                Ok(Vec::new())
            }
        }

        async fn recognize_linked_entities(&self, text: &str) -> Result<Vec<LinkedEntity>> {
            self.record("recognize_linked_entities");
            if text.contains("London") {
                Ok(vec![LinkedEntity {
                    name: "London".into(),
                    url: "https://en.wikipedia.org/wiki/London".into(),
                    data_source: "Wikipedia".into(),
                }])
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn reviews_dir(files: &[(&str, &str)]) -> (TempDir, RunOptions) {
        let tmp = tempdir().unwrap();
        let input_dir = tmp.path().join("reviewsADV");
        fs::create_dir(&input_dir).unwrap();
        for (name, text) in files {
            fs::write(input_dir.join(name), text).unwrap();
        }
        let options = RunOptions {
            input_dir,
            output_path: tmp.path().join("resultados_text_analytics.xlsx"),
            max_document_chars: 5120,
        };
        (tmp, options)
    }

    /// Extrae los elementos tabulados de una sección del informe.
    fn section_items(transcript: &str, title: &str) -> Option<Vec<String>> {
        let mut lines = transcript.lines().skip_while(|line| *line != title);
        lines.next()?;
        Some(
            lines
                .take_while(|line| line.starts_with('\t'))
                .map(|line| line.trim_start_matches('\t').to_string())
                .collect(),
        )
    }

    #[tokio::test]
    async fn one_row_per_file_in_enumeration_order() {
        let (_tmp, options) = reviews_dir(&[
            ("review2.txt", "Terrible hotel in London."),
            ("review1.txt", "Great hotel near London."),
            ("review3.txt", "Todo correcto."),
        ]);
        let client = FakeAnalytics::default();
        let mut out = Vec::new();

        let summary = run(&client, &options, &mut out).await.unwrap();

        let names: Vec<&str> = summary.rows.iter().map(|r| r.archivo.as_str()).collect();
        assert_eq!(names, vec!["review1.txt", "review2.txt", "review3.txt"]);
        assert_eq!(summary.rows[1].sentimiento, "negative");
        assert_eq!(summary.rows[2].idioma, "Spanish");
        assert!(options.output_path.exists());
        assert!(!report::partial_report_path(&options.output_path).exists());
        assert_eq!(client.calls().len(), 15);
    }

    #[tokio::test]
    async fn calls_the_five_operations_in_order() {
        let (_tmp, options) = reviews_dir(&[("review1.txt", "Great hotel near London.")]);
        let client = FakeAnalytics::default();

        analyze_directory(&client, &options.input_dir, 5120, &mut Vec::new())
            .await
            .unwrap();

        assert_eq!(
            client.calls(),
            vec![
                "detect_language",
                "analyze_sentiment",
                "extract_key_phrases",
                "recognize_entities",
                "recognize_linked_entities",
            ]
        );
    }

    #[tokio::test]
    async fn empty_sections_are_omitted_and_columns_left_empty() {
        let (_tmp, options) = reviews_dir(&[("review1.txt", "Todo correcto.")]);
        let client = FakeAnalytics::default();
        let mut out = Vec::new();

        let rows = analyze_directory(&client, &options.input_dir, 5120, &mut out)
            .await
            .unwrap();
        let transcript = String::from_utf8(out).unwrap();

        assert_eq!(rows[0].key_phrases, "");
        assert_eq!(rows[0].entities, "");
        assert_eq!(rows[0].links, "");
        assert!(transcript.contains("Language: Spanish"));
        assert!(transcript.contains("Sentiment: positive"));
        assert!(!transcript.contains("Key Phrases:"));
        assert!(!transcript.contains("Entities"));
        assert!(!transcript.contains("Links"));
    }

    #[tokio::test]
    async fn printed_values_match_the_row() {
        let (_tmp, options) = reviews_dir(&[("review1.txt", "Great hotel near London.")]);
        let client = FakeAnalytics::default();
        let mut out = Vec::new();

        let rows = analyze_directory(&client, &options.input_dir, 5120, &mut out)
            .await
            .unwrap();
        let transcript = String::from_utf8(out).unwrap();
        let row = &rows[0];

        assert!(transcript.contains(SEPARATOR));
        assert!(transcript.contains(&format!("\n{}\n", row.archivo)));
        assert!(transcript.contains("Great hotel near London."));
        assert!(transcript.contains(&format!("Language: {}", row.idioma)));
        assert!(transcript.contains(&format!("Sentiment: {}", row.sentimiento)));
        assert_eq!(
            section_items(&transcript, "Key Phrases:").unwrap().join(LIST_SEPARATOR),
            row.key_phrases
        );
        assert_eq!(
            section_items(&transcript, "Entities").unwrap().join(LIST_SEPARATOR),
            row.entities
        );
        assert_eq!(
            section_items(&transcript, "Links").unwrap().join(LIST_SEPARATOR),
            row.links
        );
    }

    #[tokio::test]
    async fn service_failure_skips_main_output_but_keeps_partial_rows() {
        let (_tmp, options) = reviews_dir(&[
            ("review1.txt", "Great hotel near London."),
            ("review2.txt", "Esta falla."),
            ("review3.txt", "Nunca se analiza."),
        ]);
        let client = FakeAnalytics::failing_sentiment_on("Esta falla.");
        let mut out = Vec::new();

        let err = run(&client, &options, &mut out).await.unwrap_err();

        assert!(matches!(err, AnalysisError::Service { operation: "analyze_sentiment", .. }));
        assert!(!options.output_path.exists());
        assert!(report::partial_report_path(&options.output_path).exists());
        // review3 nunca llega a enviarse
        assert_eq!(client.calls().len(), 5 + 2);
    }

    #[tokio::test]
    async fn failure_reports_completed_rows() {
        let (_tmp, options) = reviews_dir(&[
            ("review1.txt", "Great hotel near London."),
            ("review2.txt", "Esta falla."),
        ]);
        let client = FakeAnalytics::failing_sentiment_on("Esta falla.");

        let failure = analyze_directory(&client, &options.input_dir, 5120, &mut Vec::new())
            .await
            .unwrap_err();

        assert_eq!(failure.completed.len(), 1);
        assert_eq!(failure.completed[0].archivo, "review1.txt");
    }

    #[tokio::test]
    async fn successful_run_removes_stale_partial() {
        let (_tmp, options) = reviews_dir(&[
            ("review1.txt", "Great hotel near London."),
            ("review2.txt", "Esta falla."),
        ]);
        let partial = report::partial_report_path(&options.output_path);

        let failing = FakeAnalytics::failing_sentiment_on("Esta falla.");
        run(&failing, &options, &mut Vec::new()).await.unwrap_err();
        assert!(partial.exists());

        let healthy = FakeAnalytics::default();
        run(&healthy, &options, &mut Vec::new()).await.unwrap();

        assert!(options.output_path.exists());
        assert!(!partial.exists());
    }

    /// Consola que rechaza cualquier escritura.
    struct BrokenConsole;

    impl Write for BrokenConsole {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "consola cerrada"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn partial_is_saved_even_if_console_is_gone() {
        let tmp = tempdir().unwrap();
        let output = tmp.path().join("resultados.xlsx");
        let rows = vec![ResultRow {
            archivo: "review1.txt".into(),
            idioma: "English".into(),
            sentimiento: "positive".into(),
            key_phrases: String::new(),
            entities: String::new(),
            links: String::new(),
        }];

        save_partial(&rows, &output, &mut BrokenConsole);

        assert!(report::partial_report_path(&output).exists());
    }

    #[tokio::test]
    async fn first_file_failure_writes_nothing() {
        let (_tmp, options) = reviews_dir(&[("review1.txt", "Esta falla.")]);
        let client = FakeAnalytics::failing_sentiment_on("Esta falla.");

        run(&client, &options, &mut Vec::new()).await.unwrap_err();

        assert!(!options.output_path.exists());
        assert!(!report::partial_report_path(&options.output_path).exists());
    }

    #[tokio::test]
    async fn missing_directory_writes_no_output() {
        let (_tmp, mut options) = reviews_dir(&[]);
        options.input_dir = options.input_dir.join("no-existe");
        let client = FakeAnalytics::default();

        let err = run(&client, &options, &mut Vec::new()).await.unwrap_err();

        assert!(matches!(err, AnalysisError::DirectoryNotFound(_)));
        assert!(!options.output_path.exists());
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn overlong_document_is_rejected_before_any_request() {
        let (_tmp, options) = reviews_dir(&[("review1.txt", "ñandú ñandú")]);
        let client = FakeAnalytics::default();

        let err = analyze_document(&client, &options.input_dir.join("review1.txt"), 5, &mut Vec::new())
            .await
            .unwrap_err();

        match err {
            AnalysisError::DocumentTooLong { chars, max, .. } => {
                assert_eq!(chars, 11);
                assert_eq!(max, 5);
            }
            other => panic!("error inesperado: {other:?}"),
        }
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn non_utf8_file_is_an_io_error() {
        let (_tmp, options) = reviews_dir(&[]);
        let path = options.input_dir.join("binario.txt");
        fs::write(&path, [0xff, 0xfe, 0x00, 0xc3]).unwrap();
        let client = FakeAnalytics::default();

        let err = analyze_document(&client, &path, 5120, &mut Vec::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Io { .. }));
    }

    #[tokio::test]
    async fn empty_directory_produces_header_only_report() {
        let (_tmp, options) = reviews_dir(&[]);
        let client = FakeAnalytics::default();

        let summary = run(&client, &options, &mut Vec::new()).await.unwrap();

        assert!(summary.rows.is_empty());
        assert!(options.output_path.exists());
    }
}
