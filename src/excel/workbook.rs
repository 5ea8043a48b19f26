//! In-memory workbook model
//!
//! Workbooks are loaded whole by [`super::WorkbookImporter`]. Between load and
//! save, cells live in a sparse map per worksheet, and each sheet remembers
//! which positions were written so a save can patch the source file instead of
//! rebuilding it.

use crate::error::{ExcellentError, ExcellentResult};
use crate::locator::Bounds;
use crate::types::CellValue;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Name given to the only sheet of a freshly created workbook.
pub const DEFAULT_SHEET_NAME: &str = "Sheet";

const MAX_SHEET_NAME_LEN: usize = 31;
const INVALID_SHEET_NAME_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

static EMPTY: CellValue = CellValue::Empty;

/// A single stored cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub value: CellValue,
    pub number_format: Option<String>,
    /// Formula text without the leading `=`; `value` holds its cached result.
    pub formula: Option<String>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    fn is_vacant(&self) -> bool {
        self.value.is_empty() && self.number_format.is_none() && self.formula.is_none()
    }
}

/// A worksheet: name plus sparse cells keyed by 1-based (row, column).
#[derive(Debug, Clone, PartialEq)]
pub struct Worksheet {
    name: String,
    cells: BTreeMap<(u32, u32), Cell>,
    /// Present in the file the workbook was last loaded from or saved to.
    saved: bool,
    /// Positions written since the last load or save.
    edited: BTreeSet<(u32, u32)>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            saved: false,
            edited: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cell(&self, row: u32, column: u32) -> Option<&Cell> {
        self.cells.get(&(row, column))
    }

    /// Value at a position; `Empty` when nothing is stored there.
    pub fn value(&self, row: u32, column: u32) -> &CellValue {
        self.cell(row, column).map(|c| &c.value).unwrap_or(&EMPTY)
    }

    /// Set the number format (when given), then the value. Any formula on the
    /// cell is dropped.
    pub fn set_value(
        &mut self,
        row: u32,
        column: u32,
        value: CellValue,
        number_format: Option<&str>,
    ) {
        self.edited.insert((row, column));
        let cell = self.cells.entry((row, column)).or_default();
        if let Some(format) = number_format {
            cell.number_format = Some(format.to_string());
        }
        cell.value = value;
        cell.formula = None;

        if cell.is_vacant() {
            self.cells.remove(&(row, column));
        }
    }

    /// Store a cell as loaded from disk.
    pub(crate) fn insert(&mut self, row: u32, column: u32, cell: Cell) {
        if !cell.is_vacant() {
            self.cells.insert((row, column), cell);
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = ((u32, u32), &Cell)> {
        self.cells.iter().map(|(pos, cell)| (*pos, cell))
    }

    /// Whether this sheet exists in the workbook's source file.
    pub fn is_saved(&self) -> bool {
        self.saved
    }

    /// Positions written since the last load or save, vacated ones included.
    pub fn edited(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edited.iter().copied()
    }

    pub(crate) fn mark_saved(&mut self) {
        self.saved = true;
        self.edited.clear();
    }

    /// Highest used row; 1 for an empty sheet.
    pub fn max_row(&self) -> u32 {
        self.cells.keys().map(|(row, _)| *row).max().unwrap_or(1)
    }

    /// Highest used column; 1 for an empty sheet.
    pub fn max_column(&self) -> u32 {
        self.cells.keys().map(|(_, col)| *col).max().unwrap_or(1)
    }

    /// All rows from 1 to `max_row`, each spanning columns 1 to `max_column`.
    pub fn rows(&self) -> Rows<'_> {
        self.rows_in(Bounds {
            min_row: 1,
            min_col: 1,
            max_row: self.max_row(),
            max_col: self.max_column(),
        })
    }

    /// Rows restricted to a rectangular region.
    pub fn rows_in(&self, bounds: Bounds) -> Rows<'_> {
        Rows {
            sheet: self,
            next_row: bounds.min_row,
            bounds,
        }
    }
}

/// Handle to a position in a worksheet, vacant or not.
#[derive(Debug, Clone, Copy)]
pub struct CellRef<'a> {
    pub row: u32,
    pub column: u32,
    cell: Option<&'a Cell>,
}

impl<'a> CellRef<'a> {
    pub fn value(&self) -> &'a CellValue {
        self.cell.map(|c| &c.value).unwrap_or(&EMPTY)
    }

    pub fn number_format(&self) -> Option<&'a str> {
        self.cell.and_then(|c| c.number_format.as_deref())
    }

    pub fn formula(&self) -> Option<&'a str> {
        self.cell.and_then(|c| c.formula.as_deref())
    }
}

/// Forward-only iterator over worksheet rows.
pub struct Rows<'a> {
    sheet: &'a Worksheet,
    next_row: u32,
    bounds: Bounds,
}

impl<'a> Iterator for Rows<'a> {
    type Item = Vec<CellRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_row > self.bounds.max_row || self.bounds.min_col > self.bounds.max_col {
            return None;
        }
        let row = self.next_row;
        self.next_row += 1;

        let cells = (self.bounds.min_col..=self.bounds.max_col)
            .map(|column| CellRef {
                row,
                column,
                cell: self.sheet.cell(row, column),
            })
            .collect();
        Some(cells)
    }
}

/// An open workbook: ordered worksheets, the active sheet, an optional VBA
/// project carried through from an `.xlsm` file, and the file it was last
/// loaded from or saved to.
#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
    active: usize,
    vba_project: Option<Vec<u8>>,
    source: Option<PathBuf>,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    /// A new workbook holding one empty sheet.
    pub fn new() -> Self {
        Self {
            sheets: vec![Worksheet::new(DEFAULT_SHEET_NAME)],
            active: 0,
            vba_project: None,
            source: None,
        }
    }

    /// Build a workbook from sheets loaded out of `source`. An empty list
    /// yields the default single sheet; an out-of-range active index falls
    /// back to the first.
    pub(crate) fn from_sheets(
        source: &Path,
        sheets: Vec<Worksheet>,
        active: usize,
        vba_project: Option<Vec<u8>>,
    ) -> Self {
        let mut book = if sheets.is_empty() {
            Self {
                vba_project,
                ..Self::new()
            }
        } else {
            let active = if active < sheets.len() { active } else { 0 };
            Self {
                sheets,
                active,
                vba_project,
                source: None,
            }
        };
        book.mark_saved(source);
        book
    }

    /// File the workbook was last loaded from or saved to.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub(crate) fn mark_saved(&mut self, path: &Path) {
        self.source = Some(path.to_path_buf());
        for sheet in &mut self.sheets {
            sheet.mark_saved();
        }
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name()).collect()
    }

    pub fn sheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.name == name)
    }

    pub fn contains_sheet(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn sheet(&self, name: &str) -> ExcellentResult<&Worksheet> {
        self.position(name)
            .map(|idx| &self.sheets[idx])
            .ok_or_else(|| ExcellentError::SheetNotFound(name.to_string()))
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_sheet(&self) -> &Worksheet {
        &self.sheets[self.active]
    }

    pub fn active_sheet_mut(&mut self) -> &mut Worksheet {
        &mut self.sheets[self.active]
    }

    pub fn set_active_sheet(&mut self, name: &str) -> ExcellentResult<()> {
        let idx = self
            .position(name)
            .ok_or_else(|| ExcellentError::SheetNotFound(name.to_string()))?;
        self.active = idx;
        Ok(())
    }

    /// Append a new, empty sheet. The active sheet does not change.
    pub fn create_sheet(&mut self, name: &str) -> ExcellentResult<&mut Worksheet> {
        validate_sheet_name(name)?;
        // Excel compares sheet names case-insensitively.
        if self
            .sheets
            .iter()
            .any(|s| s.name.to_lowercase() == name.to_lowercase())
        {
            return Err(ExcellentError::SheetExists(name.to_string()));
        }
        self.sheets.push(Worksheet::new(name));
        let last = self.sheets.len() - 1;
        Ok(&mut self.sheets[last])
    }

    /// Remove a sheet, keeping the active sheet pointed at the same sheet when
    /// it survives, or at its left neighbour (the new first sheet when there is
    /// none) when it was the one removed.
    pub fn remove_sheet(&mut self, name: &str) -> ExcellentResult<Worksheet> {
        let idx = self
            .position(name)
            .ok_or_else(|| ExcellentError::SheetNotFound(name.to_string()))?;
        if self.sheets.len() == 1 {
            return Err(ExcellentError::LastSheet(name.to_string()));
        }

        let removed = self.sheets.remove(idx);
        if self.active > idx || (self.active == idx && idx > 0) {
            self.active -= 1;
        }
        Ok(removed)
    }

    pub fn vba_project(&self) -> Option<&[u8]> {
        self.vba_project.as_deref()
    }

    pub fn has_vba_project(&self) -> bool {
        self.vba_project.is_some()
    }
}

fn validate_sheet_name(name: &str) -> ExcellentResult<()> {
    let invalid = name.is_empty()
        || name.chars().count() > MAX_SHEET_NAME_LEN
        || name.contains(INVALID_SHEET_NAME_CHARS)
        || name.starts_with('\'')
        || name.ends_with('\'');
    if invalid {
        return Err(ExcellentError::InvalidSheetName(name.to_string()));
    }
    Ok(())
}
