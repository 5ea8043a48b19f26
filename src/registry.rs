//! Workbook registry
//!
//! Tracks every open workbook under a unique alias, which one is active, and
//! provides the cell- and sheet-level operations that act on the active
//! workbook's active sheet.
//!
//! # Example
//!
//! ```no_run
//! use excellent::registry::Registry;
//! use excellent::types::CellValue;
//!
//! let mut registry = Registry::new();
//! registry.create_workbook("wb.xlsx", Some("wb"), true)?;
//! registry.write_cell("B1", "Hello", None)?;
//! registry.save(false)?;
//! assert_eq!(registry.read_cell("B1", false)?, CellValue::from("Hello"));
//! # Ok::<(), excellent::error::ExcellentError>(())
//! ```

use crate::error::{ExcellentError, ExcellentResult};
use crate::excel::{self, CellRef, OpenOptions, Rows, Workbook, Worksheet};
use crate::locator::{self, Bounds, CellRange};
use crate::types::{CellValue, SheetRow};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One open workbook.
#[derive(Debug)]
pub struct WorkbookHandle {
    alias: String,
    file_path: PathBuf,
    workbook: Workbook,
}

impl WorkbookHandle {
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Absolute path the workbook was opened from and saves to.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn workbook_mut(&mut self) -> &mut Workbook {
        &mut self.workbook
    }
}

/// Options for [`Registry::read_sheet`].
#[derive(Debug, Clone, Default)]
pub struct ReadSheetOptions {
    /// Names for the columns, in order. Takes precedence over
    /// `use_header_row`.
    pub column_names: Option<Vec<String>>,
    /// Take the column names from row 1 and leave the first row of the read
    /// out of the data.
    pub use_header_row: bool,
    /// Restrict the read to a range such as `A1:B3`.
    pub range: Option<CellRange>,
    /// Trim surrounding whitespace from text values.
    pub trim: bool,
}

/// Open workbooks, in the order they were opened, plus the active alias.
#[derive(Debug, Default)]
pub struct Registry {
    workbooks: Vec<WorkbookHandle>,
    active_alias: Option<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    //--------------------------------------------------------------------------
    // Lifecycle
    //--------------------------------------------------------------------------

    /// Open the workbook at `path` and make it the active one.
    ///
    /// The alias defaults to the absolute file path. Returns the alias used.
    pub fn open_workbook<P: AsRef<Path>>(
        &mut self,
        path: P,
        alias: Option<&str>,
        options: OpenOptions,
    ) -> ExcellentResult<String> {
        let path = path.as_ref();
        let workbook = excel::open(path, options)?;
        let file_path = absolute_path(path)?;
        let alias = self.check_available(&file_path, alias)?;

        info!(alias = %alias, path = %file_path.display(), "workbook opened");
        self.register(alias, file_path, workbook)
    }

    /// Create a new workbook, save it to `path`, and make it the active one.
    ///
    /// An existing file is only replaced when `overwrite` is set.
    pub fn create_workbook<P: AsRef<Path>>(
        &mut self,
        path: P,
        alias: Option<&str>,
        overwrite: bool,
    ) -> ExcellentResult<String> {
        let path = path.as_ref();
        if path.is_file() && !overwrite {
            return Err(ExcellentError::FileAlreadyExists(path.to_path_buf()));
        }

        let file_path = absolute_path(path)?;
        let alias = self.check_available(&file_path, alias)?;

        let mut workbook = Workbook::new();
        workbook.save(&file_path)?;

        info!(alias = %alias, path = %file_path.display(), "workbook created");
        self.register(alias, file_path, workbook)
    }

    /// Close a workbook without saving it. Defaults to the active workbook.
    ///
    /// Closing an alias that is not open only logs a warning. Returns whether
    /// a workbook was closed. When the active workbook is closed, the
    /// earliest-opened remaining workbook becomes active.
    pub fn close_workbook(&mut self, alias: Option<&str>) -> bool {
        let alias = match alias
            .filter(|alias| !alias.is_empty())
            .map(str::to_string)
            .or_else(|| self.active_alias.clone())
        {
            Some(alias) => alias,
            None => {
                warn!("Cannot close workbook: no workbook is opened.");
                return false;
            }
        };

        let Some(idx) = self.position(&alias) else {
            warn!("Cannot close workbook with alias `{}': workbook not opened.", alias);
            return false;
        };

        let handle = self.workbooks.remove(idx);
        info!(alias = %handle.alias, "workbook closed");

        if self.active_alias.as_deref() == Some(alias.as_str()) {
            self.active_alias = self.workbooks.first().map(|h| h.alias.clone());
            if let Some(next) = &self.active_alias {
                debug!(alias = %next, "active workbook changed");
            }
        }
        true
    }

    /// Close every open workbook.
    pub fn close_all_workbooks(&mut self) {
        let aliases: Vec<String> = self.aliases().map(str::to_string).collect();
        for alias in aliases {
            self.close_workbook(Some(&alias));
        }
    }

    /// Make the workbook known as `alias` the active one.
    pub fn switch_workbook(&mut self, alias: &str) -> ExcellentResult<()> {
        self.set_active(alias).map_err(|e| match e {
            ExcellentError::UnknownAlias(alias) => ExcellentError::UnopenedWorkbook(alias),
            other => other,
        })
    }

    /// Save the active workbook to its file.
    ///
    /// With `reopen_after_save` the workbook is then reloaded from disk with
    /// its VBA project kept. The reloaded copy replaces the in-memory one in
    /// place, so the alias keeps its position; if the reload fails the
    /// session copy stays open. Saving a macro-enabled workbook more than once
    /// in the same session can corrupt it otherwise.
    pub fn save(&mut self, reopen_after_save: bool) -> ExcellentResult<()> {
        let idx = self.active_index()?;
        let handle = &mut self.workbooks[idx];
        handle.workbook.save(&handle.file_path)?;
        info!(alias = %handle.alias, path = %handle.file_path.display(), "workbook saved");

        if reopen_after_save {
            let reloaded = excel::open(&handle.file_path, OpenOptions { keep_vba: true })?;
            handle.workbook = reloaded;
            debug!(alias = %handle.alias, "workbook reloaded after save");
        }
        Ok(())
    }

    //--------------------------------------------------------------------------
    // Sheets
    //--------------------------------------------------------------------------

    /// Switch the active workbook's active sheet. Other workbooks keep theirs.
    pub fn switch_sheet(&mut self, name: &str) -> ExcellentResult<()> {
        self.active_workbook_mut()?.set_active_sheet(name)?;
        debug!(sheet = name, "switched sheet");
        Ok(())
    }

    /// Add an empty sheet to the active workbook.
    pub fn create_sheet(&mut self, name: &str) -> ExcellentResult<()> {
        self.active_workbook_mut()?.create_sheet(name)?;
        debug!(sheet = name, "sheet created");
        Ok(())
    }

    /// Remove a sheet from the active workbook.
    pub fn remove_sheet(&mut self, name: &str) -> ExcellentResult<()> {
        self.active_workbook_mut()?.remove_sheet(name)?;
        debug!(sheet = name, "sheet removed");
        Ok(())
    }

    //--------------------------------------------------------------------------
    // Cells
    //--------------------------------------------------------------------------

    /// Read the cell at `locator` in the active sheet.
    pub fn read_cell(&self, locator: &str, trim: bool) -> ExcellentResult<CellValue> {
        let cell = locator::resolve(locator)?;
        let sheet = self.active_sheet()?;
        let value = sheet.value(cell.row, cell.column).clone();
        Ok(if trim { value.trimmed() } else { value })
    }

    /// Bulk-read path: the cell is already in hand.
    fn read_cell_ref(cell: &CellRef<'_>, trim: bool) -> CellValue {
        let value = cell.value().clone();
        if trim {
            value.trimmed()
        } else {
            value
        }
    }

    /// Write `value` to the cell at `locator` in the active sheet, applying
    /// `number_format` first when given.
    pub fn write_cell(
        &mut self,
        locator: &str,
        value: impl Into<CellValue>,
        number_format: Option<&str>,
    ) -> ExcellentResult<()> {
        let cell = locator::resolve(locator)?;
        self.active_workbook_mut()?
            .active_sheet_mut()
            .set_value(cell.row, cell.column, value.into(), number_format);
        Ok(())
    }

    /// Read the active sheet into rows.
    ///
    /// Rows come back named when column names are supplied or taken from the
    /// header row, positional otherwise. Rows whose cells are all empty are
    /// left out.
    pub fn read_sheet(&self, options: &ReadSheetOptions) -> ExcellentResult<Vec<SheetRow>> {
        let sheet = self.active_sheet()?;

        let explicit_names = options
            .column_names
            .as_ref()
            .filter(|names| !names.is_empty());
        let mut skip_header = false;
        let mut column_names = explicit_names.cloned();

        if options.use_header_row {
            if column_names.is_some() {
                warn!(
                    "Both the `column_names' and `get_column_names_from_header_row' \
                     parameters were supplied. Using `column_names' and ignoring the other."
                );
            } else {
                skip_header = true;
                column_names = Some(header_row(sheet));
            }
        }

        let bounds = match &options.range {
            Some(range) => {
                let bounds = range.bounded(sheet.max_row(), sheet.max_column());
                if let Some(names) = column_names.as_mut() {
                    let start = (bounds.min_col as usize - 1).min(names.len());
                    let end = (bounds.max_col as usize).min(names.len());
                    *names = names[start..end].to_vec();
                }
                bounds
            }
            None => Bounds {
                min_row: 1,
                min_col: 1,
                max_row: sheet.max_row(),
                max_col: sheet.max_column(),
            },
        };

        // The header option consumes the first row of the window, whichever
        // sheet row that is.
        let mut sheet_data = Vec::new();
        for row in sheet.rows_in(bounds).skip(usize::from(skip_header)) {
            let row_nr = row.first().map(|c| c.row).unwrap_or(bounds.min_row);

            let row_data = match &column_names {
                Some(names) => {
                    if row.len() > names.len() {
                        return Err(ExcellentError::TooFewColumnNames {
                            row: row_nr,
                            names: names.len(),
                        });
                    }
                    SheetRow::named(
                        names
                            .iter()
                            .cloned()
                            .zip(row.iter().map(|cell| Self::read_cell_ref(cell, options.trim))),
                    )
                }
                None => SheetRow::Positional(
                    row.iter()
                        .map(|cell| Self::read_cell_ref(cell, options.trim))
                        .collect(),
                ),
            };

            if !row_data.is_blank() {
                sheet_data.push(row_data);
            }
        }

        Ok(sheet_data)
    }

    /// Iterate the active sheet row by row. Each row holds one handle per
    /// column, vacant cells included.
    pub fn row_iterator(&self) -> ExcellentResult<Rows<'_>> {
        Ok(self.active_sheet()?.rows())
    }

    /// Highest used row of the active sheet.
    pub fn row_count(&self) -> ExcellentResult<u32> {
        Ok(self.active_sheet()?.max_row())
    }

    /// Highest used column of the active sheet.
    pub fn column_count(&self) -> ExcellentResult<u32> {
        Ok(self.active_sheet()?.max_column())
    }

    //--------------------------------------------------------------------------
    // Introspection
    //--------------------------------------------------------------------------

    pub fn active_alias(&self) -> Option<&str> {
        self.active_alias.as_deref()
    }

    /// Aliases in the order the workbooks were opened.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.workbooks.iter().map(|h| h.alias.as_str())
    }

    pub fn handle(&self, alias: &str) -> Option<&WorkbookHandle> {
        self.position(alias).map(|idx| &self.workbooks[idx])
    }

    pub fn len(&self) -> usize {
        self.workbooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workbooks.is_empty()
    }

    pub fn active_sheet_name(&self) -> ExcellentResult<&str> {
        Ok(self.active_sheet()?.name())
    }

    /// Alias → file path of every open workbook.
    pub fn opened_workbooks(&self) -> BTreeMap<String, PathBuf> {
        self.workbooks
            .iter()
            .map(|h| (h.alias.clone(), h.file_path.clone()))
            .collect()
    }

    //--------------------------------------------------------------------------
    // Internals
    //--------------------------------------------------------------------------

    fn position(&self, alias: &str) -> Option<usize> {
        self.workbooks.iter().position(|h| h.alias == alias)
    }

    /// Pick the alias for a new handle and make sure neither it nor the file
    /// is already taken.
    fn check_available(&self, file_path: &Path, alias: Option<&str>) -> ExcellentResult<String> {
        let alias = match alias {
            Some(alias) if !alias.is_empty() => alias.to_string(),
            _ => file_path.display().to_string(),
        };

        if self.position(&alias).is_some() {
            return Err(ExcellentError::AliasInUse(alias));
        }

        if let Some(existing) = self.workbooks.iter().find(|h| h.file_path == file_path) {
            return Err(ExcellentError::FileAlreadyOpen {
                file_path: file_path.to_path_buf(),
                alias: existing.alias.clone(),
            });
        }

        Ok(alias)
    }

    fn register(
        &mut self,
        alias: String,
        file_path: PathBuf,
        workbook: Workbook,
    ) -> ExcellentResult<String> {
        self.workbooks.push(WorkbookHandle {
            alias: alias.clone(),
            file_path,
            workbook,
        });
        self.set_active(&alias)?;
        Ok(alias)
    }

    fn set_active(&mut self, alias: &str) -> ExcellentResult<()> {
        if self.position(alias).is_none() {
            return Err(ExcellentError::UnknownAlias(alias.to_string()));
        }
        self.active_alias = Some(alias.to_string());
        Ok(())
    }

    fn active_handle(&self) -> ExcellentResult<&WorkbookHandle> {
        self.active_alias
            .as_deref()
            .and_then(|alias| self.handle(alias))
            .ok_or(ExcellentError::NoActiveWorkbook)
    }

    fn active_index(&self) -> ExcellentResult<usize> {
        self.active_alias
            .as_deref()
            .and_then(|alias| self.position(alias))
            .ok_or(ExcellentError::NoActiveWorkbook)
    }

    fn active_workbook_mut(&mut self) -> ExcellentResult<&mut Workbook> {
        let idx = self.active_index()?;
        Ok(&mut self.workbooks[idx].workbook)
    }

    fn active_sheet(&self) -> ExcellentResult<&Worksheet> {
        Ok(self.active_handle()?.workbook.active_sheet())
    }
}

/// Display strings of row 1, across every used column.
fn header_row(sheet: &Worksheet) -> Vec<String> {
    (1..=sheet.max_column())
        .map(|col| sheet.value(1, col).to_string())
        .collect()
}

/// Absolute form of `path` with symlinks resolved. Files that do not exist
/// yet are resolved through their parent directory.
fn absolute_path(path: &Path) -> ExcellentResult<PathBuf> {
    if path.exists() {
        return Ok(path.canonicalize()?);
    }

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.canonicalize()?,
        _ => std::env::current_dir()?,
    };
    match path.file_name() {
        Some(name) => Ok(parent.join(name)),
        None => Err(ExcellentError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("not a file path: {}", path.display()),
        ))),
    }
}
