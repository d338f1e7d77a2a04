//! Enumeración de los ficheros de la carpeta de entrada.

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::error::{AnalysisError, Result};

/// Devuelve un iterador perezoso sobre los ficheros regulares de `dir`
/// (sin recursión), ordenados por nombre. Falla si la carpeta no existe.
pub fn list_documents(dir: &Path) -> Result<impl Iterator<Item = Result<PathBuf>>> {
    if !dir.is_dir() {
        return Err(AnalysisError::DirectoryNotFound(dir.to_path_buf()));
    }

    let entries = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_dir() => {
                warn!("Saltando subcarpeta: {}", entry.path().display());
                None
            }
            Ok(entry) => Some(Ok(entry.into_path())),
            Err(err) => {
                let context = err
                    .path()
                    .map(|p| format!("listando {}", p.display()))
                    .unwrap_or_else(|| "listando la carpeta de entrada".to_string());
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("bucle de enlaces simbólicos"));
                Some(Err(AnalysisError::io(context, source)))
            }
        });

    Ok(entries)
}
