// Módulos de la aplicación
mod analytics;
mod azure;
mod config;
mod error;
mod models;
mod pipeline;
mod report;
mod walker;

use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::azure::AzureTextAnalyticsClient;
use crate::config::{AppConfig, Overrides};
use crate::pipeline::RunOptions;

/// Analiza con Azure AI Language cada reseña de una carpeta y exporta los
/// resultados a Excel.
#[derive(Parser, Debug)]
#[command(name = "resenas_text_analytics", version)]
struct Cli {
    /// Carpeta de reseñas (por defecto `reviewsADV` junto al ejecutable)
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    /// Libro de salida (por defecto `resultados_text_analytics.xlsx` junto al ejecutable)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Máximo de caracteres por documento
    #[arg(long)]
    max_chars: Option<usize>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Cargar .env e inicializar logging (a stderr, la consola es para el informe)
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(output_path) => {
            println!("\n Resultados guardados en: {}", output_path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            println!("\n Error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<PathBuf> {
    let overrides = Overrides {
        input_dir: cli.input_dir,
        output_path: cli.output,
        max_document_chars: cli.max_chars,
    };
    let mut stdout = std::io::stdout().lock();
    startup(|key| env::var(key).ok(), config::program_dir, overrides, &mut stdout).await
}

/// Configuración → cliente → análisis. Si la configuración falla no se toca
/// la carpeta de entrada ni se escribe ninguna hoja.
async fn startup<F, D, W>(
    lookup: F,
    base_dir: D,
    overrides: Overrides,
    out: &mut W,
) -> anyhow::Result<PathBuf>
where
    F: Fn(&str) -> Option<String>,
    D: FnOnce() -> crate::error::Result<PathBuf>,
    W: Write,
{
    // 2. Cargar configuración
    let cfg = AppConfig::load_with(lookup, base_dir, overrides)?;
    info!("Configuración cargada: {:?}", cfg);

    // 3. Crear cliente del servicio
    let client = AzureTextAnalyticsClient::new(&cfg.credentials)?;

    // 4. Analizar la carpeta y escribir la hoja
    let options = RunOptions {
        input_dir: cfg.input_dir,
        output_path: cfg.output_path,
        max_document_chars: cfg.max_document_chars,
    };
    let summary = pipeline::run(&client, &options, out).await?;

    Ok(summary.output_path)
}
