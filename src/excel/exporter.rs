//! Workbook exporter - in-memory [`Workbook`] → new xlsx file
//!
//! Used for workbooks that have no source package to patch, such as the first
//! save of a created workbook.

use crate::error::{ExcellentError, ExcellentResult};
use crate::excel::workbook::{Cell, Workbook as Book, Worksheet as Sheet};
use crate::types::{datetime_to_serial, CellValue};
use rust_xlsxwriter::{Format, Formula, Workbook, Worksheet};
use std::path::Path;
use tracing::{debug, warn};

/// Format applied to date cells written without an explicit number format.
pub const DEFAULT_DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Writes a workbook to disk.
pub struct WorkbookExporter<'a> {
    book: &'a Book,
}

impl<'a> WorkbookExporter<'a> {
    pub fn new(book: &'a Book) -> Self {
        Self { book }
    }

    /// Write every sheet, keeping sheet order and the active sheet.
    pub fn export(&self, output_path: &Path) -> ExcellentResult<()> {
        let mut workbook = Workbook::new();

        for (idx, sheet) in self.book.sheets().iter().enumerate() {
            let worksheet = workbook.add_worksheet();
            self.export_sheet(worksheet, sheet)?;
            if idx == self.book.active_index() {
                worksheet.set_active(true);
            }
        }

        if self.book.has_vba_project() {
            warn!(
                path = %output_path.display(),
                "source package is gone; the VBA project is not written"
            );
        }

        workbook
            .save(output_path)
            .map_err(|e| ExcellentError::Export(format!("Failed to save Excel file: {}", e)))?;

        debug!(path = %output_path.display(), sheets = self.book.sheets().len(), "workbook saved");
        Ok(())
    }

    /// Export a single worksheet
    fn export_sheet(&self, worksheet: &mut Worksheet, sheet: &Sheet) -> ExcellentResult<()> {
        worksheet
            .set_name(sheet.name())
            .map_err(|e| ExcellentError::Export(format!("Failed to set worksheet name: {}", e)))?;

        for ((row, col), cell) in sheet.cells() {
            // Worksheet API is 0-indexed
            self.write_cell(worksheet, row - 1, (col - 1) as u16, cell)
                .map_err(|e| {
                    ExcellentError::Export(format!(
                        "Failed to write cell {}!{}: {}",
                        sheet.name(),
                        crate::locator::CellLocator::new(row, col),
                        e
                    ))
                })?;
        }
        Ok(())
    }

    fn write_cell(
        &self,
        worksheet: &mut Worksheet,
        row: u32,
        col: u16,
        cell: &Cell,
    ) -> Result<(), rust_xlsxwriter::XlsxError> {
        let format = match (&cell.number_format, &cell.value) {
            (Some(num_format), _) => Some(Format::new().set_num_format(num_format)),
            (None, CellValue::DateTime(_)) => {
                Some(Format::new().set_num_format(DEFAULT_DATETIME_FORMAT))
            }
            (None, _) => None,
        };

        if let Some(formula) = &cell.formula {
            let formula = Formula::new(formula).set_result(cell.value.to_string());
            match &format {
                Some(format) => worksheet.write_formula_with_format(row, col, formula, format)?,
                None => worksheet.write_formula(row, col, formula)?,
            };
            return Ok(());
        }

        match (&cell.value, &format) {
            (CellValue::Empty, Some(format)) => {
                worksheet.write_blank(row, col, format)?;
            }
            (CellValue::Empty, None) => {}
            (CellValue::Bool(b), Some(format)) => {
                worksheet.write_boolean_with_format(row, col, *b, format)?;
            }
            (CellValue::Bool(b), None) => {
                worksheet.write_boolean(row, col, *b)?;
            }
            (CellValue::Int(i), Some(format)) => {
                worksheet.write_number_with_format(row, col, *i as f64, format)?;
            }
            (CellValue::Int(i), None) => {
                worksheet.write_number(row, col, *i as f64)?;
            }
            (CellValue::Float(n), Some(format)) => {
                worksheet.write_number_with_format(row, col, *n, format)?;
            }
            (CellValue::Float(n), None) => {
                worksheet.write_number(row, col, *n)?;
            }
            (CellValue::DateTime(dt), Some(format)) => {
                worksheet.write_number_with_format(row, col, datetime_to_serial(dt), format)?;
            }
            (CellValue::DateTime(dt), None) => {
                worksheet.write_number(row, col, datetime_to_serial(dt))?;
            }
            (CellValue::Text(s), Some(format)) | (CellValue::Error(s), Some(format)) => {
                worksheet.write_string_with_format(row, col, s, format)?;
            }
            (CellValue::Text(s), None) | (CellValue::Error(s), None) => {
                worksheet.write_string(row, col, s)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::{OpenOptions, WorkbookImporter};
    use tempfile::TempDir;

    #[test]
    fn test_export_then_import_keeps_sheets_and_active() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("book.xlsx");

        let mut book = Book::new();
        book.create_sheet("Orders").unwrap();
        book.set_active_sheet("Orders").unwrap();
        book.active_sheet_mut()
            .set_value(2, 3, CellValue::from("x"), None);

        WorkbookExporter::new(&book).export(&path).unwrap();
        let loaded = WorkbookImporter::new(&path, OpenOptions::default())
            .import()
            .unwrap();

        assert_eq!(loaded.sheet_names(), vec!["Sheet", "Orders"]);
        assert_eq!(loaded.active_sheet().name(), "Orders");
        assert_eq!(loaded.active_sheet().value(2, 3), &CellValue::from("x"));
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("book.xlsx");

        let result = WorkbookExporter::new(&Book::new()).export(&path);
        assert!(matches!(result, Err(ExcellentError::Export(_))));
    }
}
