//! Spreadsheet engine
//!
//! The registry works on an in-memory workbook model:
//! - Import: xlsx/xlsm → [`Workbook`] via calamine
//! - Save, loaded workbooks: source package patched with the session's edits via umya
//! - Save, new workbooks: [`Workbook`] → xlsx via rust_xlsxwriter

mod exporter;
mod importer;
mod updater;
mod workbook;

pub use exporter::{WorkbookExporter, DEFAULT_DATETIME_FORMAT};
pub use importer::{OpenOptions, WorkbookImporter};
pub use updater::WorkbookUpdater;
pub use workbook::{Cell, CellRef, Rows, Workbook, Worksheet, DEFAULT_SHEET_NAME};

use crate::error::ExcellentResult;
use std::path::Path;

/// Load a workbook from disk.
pub fn open<P: AsRef<Path>>(path: P, options: OpenOptions) -> ExcellentResult<Workbook> {
    WorkbookImporter::new(path, options).import()
}

impl Workbook {
    /// Write this workbook to `path`.
    ///
    /// A workbook whose source file still exists is saved by patching that
    /// file, so formatting the model does not carry survives. Afterwards
    /// `path` becomes the source.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> ExcellentResult<()> {
        let path = path.as_ref();
        match self.source().filter(|source| source.is_file()) {
            Some(source) => WorkbookUpdater::new(self, source).update(path)?,
            None => WorkbookExporter::new(self).export(path)?,
        }
        self.mark_saved(path);
        Ok(())
    }
}
