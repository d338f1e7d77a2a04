//! Exportación de las filas de resultados a un libro de Excel.

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use tracing::info;

use crate::error::{AnalysisError, Result};
use crate::models::ResultRow;

const SHEET_NAME: &str = "Sheet1";

/// Escribe una hoja con cabecera y una fila por resultado, sin columna de
/// índice. Sobrescribe el fichero si ya existe.
pub fn write_report(rows: &[ResultRow], path: &Path) -> Result<()> {
    build_workbook(rows, path).map_err(|source| AnalysisError::Report {
        path: path.to_path_buf(),
        source,
    })?;

    info!("Hoja de resultados escrita en {} ({} filas)", path.display(), rows.len());
    Ok(())
}

fn build_workbook(rows: &[ResultRow], path: &Path) -> std::result::Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, header) in ResultRow::HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (index, row) in rows.iter().enumerate() {
        let excel_row = (index + 1) as u32;
        for (col, value) in row.cells().iter().enumerate() {
            // Excel no guarda cadenas vacías: la celda queda en blanco.
            if !value.is_empty() {
                worksheet.write_string(excel_row, col as u16, *value)?;
            }
        }
    }

    workbook.save(path)
}

/// Ruta del libro parcial que se guarda cuando la ejecución falla a mitad:
/// `resultados.xlsx` → `resultados.partial.xlsx`.
pub fn partial_report_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "resultados".to_string());
    output.with_file_name(format!("{stem}.partial.xlsx"))
}
