//! Workbook updater - patches the source xlsx/xlsm package with session edits
//!
//! The exporter rebuilds a file from the model, which only knows values,
//! number formats and formulas. When the workbook came from a file, saving
//! goes through here instead: the source package is read with umya, only
//! the cells written this session are replaced, and everything else (styles,
//! merges, column widths, comments, the VBA project) is written back as read.

use crate::error::{ExcellentError, ExcellentResult};
use crate::excel::exporter::DEFAULT_DATETIME_FORMAT;
use crate::excel::workbook::{Cell, Workbook as Book, Worksheet as Sheet};
use crate::locator::CellLocator;
use crate::types::{datetime_to_serial, CellValue};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;
use umya_spreadsheet::{Spreadsheet, Worksheet};

/// Writes a workbook by patching the package it was loaded from.
pub struct WorkbookUpdater<'a> {
    book: &'a Book,
    source: &'a Path,
}

impl<'a> WorkbookUpdater<'a> {
    pub fn new(book: &'a Book, source: &'a Path) -> Self {
        Self { book, source }
    }

    /// Read the source package, apply the session's sheet and cell changes,
    /// and write the result to `output_path`.
    pub fn update(&self, output_path: &Path) -> ExcellentResult<()> {
        let mut package = umya_spreadsheet::reader::xlsx::read(self.source).map_err(|e| {
            ExcellentError::Export(format!(
                "Failed to read {} for saving: {}",
                self.source.display(),
                e
            ))
        })?;

        self.sync_sheets(&mut package)?;
        package.set_active_sheet(self.book.active_index() as u32);
        if !self.book.has_vba_project() {
            package.remove_macros_code();
        }

        umya_spreadsheet::writer::xlsx::write(&package, output_path)
            .map_err(|e| ExcellentError::Export(format!("Failed to save Excel file: {}", e)))?;

        debug!(
            source = %self.source.display(),
            path = %output_path.display(),
            sheets = self.book.sheets().len(),
            "workbook patched"
        );
        Ok(())
    }

    /// Make the package's sheets match the model: sheets removed in the
    /// session are dropped, new ones are added in full, surviving ones get
    /// their edited cells, and the order follows the model.
    fn sync_sheets(&self, package: &mut Spreadsheet) -> ExcellentResult<()> {
        let kept: HashSet<&str> = self
            .book
            .sheets()
            .iter()
            .filter(|sheet| sheet.is_saved())
            .map(Sheet::name)
            .collect();
        package
            .get_sheet_collection_mut()
            .retain(|ws| kept.contains(ws.get_name()));

        for sheet in self.book.sheets() {
            match package.get_sheet_by_name_mut(sheet.name()) {
                Some(worksheet) => {
                    for (row, col) in sheet.edited() {
                        match sheet.cell(row, col) {
                            Some(cell) => write_cell(worksheet, row, col, cell),
                            None => {
                                worksheet.remove_cell((col, row));
                            }
                        }
                    }
                }
                None => {
                    let worksheet = package.new_sheet(sheet.name()).map_err(|e| {
                        ExcellentError::Export(format!(
                            "Failed to add worksheet '{}': {}",
                            sheet.name(),
                            e
                        ))
                    })?;
                    for ((row, col), cell) in sheet.cells() {
                        write_cell(worksheet, row, col, cell);
                    }
                }
            }
        }

        let order: Vec<&str> = self.book.sheet_names();
        package
            .get_sheet_collection_mut()
            .sort_by_key(|ws| order.iter().position(|name| *name == ws.get_name()));
        Ok(())
    }
}

/// Replace one cell's value, formula and (when set) number format. Styles
/// already on the cell are kept.
fn write_cell(worksheet: &mut Worksheet, row: u32, col: u32, cell: &Cell) {
    let coord = CellLocator::new(row, col).to_string();

    let number_format = match (&cell.number_format, &cell.value) {
        (Some(format), _) => Some(format.as_str()),
        (None, CellValue::DateTime(_)) => Some(DEFAULT_DATETIME_FORMAT),
        (None, _) => None,
    };
    if let Some(format) = number_format {
        worksheet
            .get_style_mut(coord.as_str())
            .get_number_format_mut()
            .set_format_code(format);
    }

    let target = worksheet.get_cell_mut(coord.as_str());
    match &cell.value {
        CellValue::Empty => {
            target.set_blank();
        }
        CellValue::Bool(b) => {
            target.set_value_bool(*b);
        }
        CellValue::Int(i) => {
            target.set_value_number(*i as f64);
        }
        CellValue::Float(n) => {
            target.set_value_number(*n);
        }
        CellValue::DateTime(dt) => {
            target.set_value_number(datetime_to_serial(dt));
        }
        CellValue::Text(s) | CellValue::Error(s) => {
            target.set_value_string(s.as_str());
        }
    }
    if let Some(formula) = &cell.formula {
        target.set_formula(formula.as_str());
    }
}
