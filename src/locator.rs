//! Cell locator resolution
//!
//! A locator identifies a single cell in one of two notations:
//! - Coordinates: `coords:(col, row)`. The prefix and the parentheses are
//!   optional, and the column comes first.
//! - A1 notation: `a1:B4`. The prefix is optional.
//!
//! Ranges for bulk reads use A1 notation on both corners: `A1:B3`.

use crate::error::{ExcellentError, ExcellentResult};
use std::fmt;
use std::str::FromStr;

/// Last row of an xlsx worksheet.
pub const MAX_ROW: u32 = 1_048_576;
/// Last column of an xlsx worksheet (`XFD`).
pub const MAX_COLUMN: u32 = 16_384;

const COORDS_PREFIX: &str = "coords:";
const A1_PREFIX: &str = "a1:";

/// A resolved, 1-based cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellLocator {
    pub row: u32,
    pub column: u32,
}

impl CellLocator {
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for CellLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letter(self.column), self.row)
    }
}

impl FromStr for CellLocator {
    type Err = ExcellentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        resolve(s)
    }
}

/// Resolve a locator string into a 1-based row/column pair.
///
/// A string containing a comma is read as coordinates, anything else as A1
/// notation. In A1 notation digits feed the row and every other character
/// feeds the column label, whatever their relative order, so `1A` resolves
/// the same as `A1`.
pub fn resolve(locator: &str) -> ExcellentResult<CellLocator> {
    let locator = locator.trim();

    let (row, column) = if locator.contains(',') {
        resolve_coordinates(locator)?
    } else {
        resolve_a1(locator)?
    };

    check_bounds(locator, row, column)?;
    Ok(CellLocator { row, column })
}

fn resolve_coordinates(locator: &str) -> ExcellentResult<(u32, u32)> {
    let invalid = || ExcellentError::InvalidLocator(locator.to_string());

    let body = locator.strip_prefix(COORDS_PREFIX).unwrap_or(locator);
    let body = body.trim_start_matches('(').trim_end_matches(')');

    let parts: Vec<&str> = body.split(',').collect();
    if parts.len() != 2 {
        return Err(invalid());
    }

    // Column first, row second.
    let column = parts[0].trim().parse::<u32>().map_err(|_| invalid())?;
    let row = parts[1].trim().parse::<u32>().map_err(|_| invalid())?;
    Ok((row, column))
}

fn resolve_a1(locator: &str) -> ExcellentResult<(u32, u32)> {
    let body = locator.strip_prefix(A1_PREFIX).unwrap_or(locator);

    let mut column_label = String::new();
    let mut row_digits = String::new();
    for c in body.chars() {
        if c.is_ascii_digit() {
            row_digits.push(c);
        } else {
            column_label.push(c);
        }
    }

    let column = column_index_from_string(&column_label)
        .map_err(|_| ExcellentError::InvalidLocator(locator.to_string()))?;
    let row = row_digits
        .parse::<u32>()
        .map_err(|_| ExcellentError::InvalidLocator(locator.to_string()))?;
    Ok((row, column))
}

fn check_bounds(locator: &str, row: u32, column: u32) -> ExcellentResult<()> {
    if row == 0 || row > MAX_ROW || column == 0 || column > MAX_COLUMN {
        return Err(ExcellentError::InvalidLocator(locator.to_string()));
    }
    Ok(())
}

/// Convert a column label to its 1-based index (A→1, Z→26, AA→27).
///
/// Labels are case-insensitive and at most three letters long.
pub fn column_index_from_string(label: &str) -> ExcellentResult<u32> {
    let invalid = || ExcellentError::InvalidLocator(label.to_string());

    if label.is_empty() || label.len() > 3 {
        return Err(invalid());
    }

    let mut index: u32 = 0;
    for c in label.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(invalid());
        }
        let value = (c.to_ascii_uppercase() as u8 - b'A' + 1) as u32;
        index = index * 26 + value;
    }
    Ok(index)
}

/// Convert a 1-based column index to its label (1→A, 26→Z, 27→AA).
pub fn column_letter(index: u32) -> String {
    let mut label = String::new();
    let mut n = index;

    while n > 0 {
        let remainder = (n - 1) % 26;
        label.insert(0, (b'A' + remainder as u8) as char);
        n = (n - 1) / 26;
    }

    label
}

/// Bounds of a rectangular range, 1-based and inclusive.
///
/// `A:C` leaves the rows open and `2:5` leaves the columns open. Open bounds
/// are closed against the sheet's used area by [`CellRange::bounded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub min_row: Option<u32>,
    pub min_col: Option<u32>,
    pub max_row: Option<u32>,
    pub max_col: Option<u32>,
}

/// A range with every bound filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_row: u32,
    pub min_col: u32,
    pub max_row: u32,
    pub max_col: u32,
}

impl Bounds {
    pub fn width(&self) -> u32 {
        self.max_col + 1 - self.min_col
    }
}

impl CellRange {
    /// Parse a range in A1 notation: `A1:B3`, `B2`, `A:C` or `2:5`.
    pub fn parse(range: &str) -> ExcellentResult<Self> {
        let trimmed = range.trim();
        let invalid = || ExcellentError::InvalidRange(range.to_string());

        let (start, end) = match trimmed.split_once(':') {
            Some((start, end)) => (start, end),
            None => (trimmed, trimmed),
        };
        if end.contains(':') {
            return Err(invalid());
        }

        let (start_col, start_row) = parse_corner(start).ok_or_else(invalid)?;
        let (end_col, end_row) = parse_corner(end).ok_or_else(invalid)?;

        // A corner may omit its column or its row, but both corners must
        // omit the same part.
        if start_col.is_some() != end_col.is_some() || start_row.is_some() != end_row.is_some() {
            return Err(invalid());
        }

        let (min_col, max_col) = ordered(start_col, end_col);
        let (min_row, max_row) = ordered(start_row, end_row);

        Ok(Self {
            min_row,
            min_col,
            max_row,
            max_col,
        })
    }

    /// Fill open bounds from the used area of a sheet.
    pub fn bounded(&self, max_row: u32, max_col: u32) -> Bounds {
        Bounds {
            min_row: self.min_row.unwrap_or(1),
            min_col: self.min_col.unwrap_or(1),
            max_row: self.max_row.unwrap_or(max_row),
            max_col: self.max_col.unwrap_or(max_col),
        }
    }
}

impl FromStr for CellRange {
    type Err = ExcellentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellRange::parse(s)
    }
}

fn ordered(a: Option<u32>, b: Option<u32>) -> (Option<u32>, Option<u32>) {
    match (a, b) {
        (Some(a), Some(b)) => (Some(a.min(b)), Some(a.max(b))),
        _ => (a, b),
    }
}

/// Strict A1 corner: letters, then digits. Either part may be absent but
/// not both.
fn parse_corner(corner: &str) -> Option<(Option<u32>, Option<u32>)> {
    let corner = corner.trim().trim_start_matches('$');
    let split = corner
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(corner.len());
    let (letters, digits) = corner.split_at(split);
    let digits = digits.trim_start_matches('$');

    if letters.is_empty() && digits.is_empty() {
        return None;
    }

    let column = if letters.is_empty() {
        None
    } else {
        let index = column_index_from_string(letters).ok()?;
        if index > MAX_COLUMN {
            return None;
        }
        Some(index)
    };

    let row = if digits.is_empty() {
        None
    } else {
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let row = digits.parse::<u32>().ok()?;
        if row == 0 || row > MAX_ROW {
            return None;
        }
        Some(row)
    };

    Some((column, row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a1_notation() {
        assert_eq!(resolve("B4").unwrap(), CellLocator::new(4, 2));
        assert_eq!(resolve("a1:CC2").unwrap(), CellLocator::new(2, 81));
        assert_eq!(resolve("  A1  ").unwrap(), CellLocator::new(1, 1));
        assert_eq!(resolve("aa10").unwrap(), CellLocator::new(10, 27));
    }

    #[test]
    fn test_a1_order_insensitive() {
        assert_eq!(resolve("1A").unwrap(), resolve("A1").unwrap());
        assert_eq!(resolve("A1A").unwrap(), CellLocator::new(1, 27));
        assert_eq!(resolve("1A2B").unwrap(), CellLocator::new(12, 28));
    }

    #[test]
    fn test_coordinates_are_column_then_row() {
        assert_eq!(resolve("1, 2").unwrap(), CellLocator::new(2, 1));
        assert_eq!(resolve("coords:1,3").unwrap(), CellLocator::new(3, 1));
        assert_eq!(resolve("(1,4)").unwrap(), CellLocator::new(4, 1));
        assert_eq!(resolve("coords:(5, 1)").unwrap(), CellLocator::new(1, 5));
    }

    #[test]
    fn test_invalid_locators() {
        for bad in ["", "B", "12", "A0", "1,x", "1,2,3", "0,1", "AAAA1", "A-1", "coords:(,)"] {
            let err = resolve(bad).unwrap_err();
            assert!(
                matches!(err, ExcellentError::InvalidLocator(_)),
                "expected InvalidLocator for {:?}, got {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_out_of_sheet_bounds() {
        assert!(resolve("XFD1048576").is_ok());
        assert!(resolve("XFE1").is_err());
        assert!(resolve("A1048577").is_err());
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_index_from_string("A").unwrap(), 1);
        assert_eq!(column_index_from_string("z").unwrap(), 26);
        assert_eq!(column_index_from_string("AA").unwrap(), 27);
        assert_eq!(column_index_from_string("XFD").unwrap(), MAX_COLUMN);

        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn test_display_locator() {
        assert_eq!(CellLocator::new(3, 28).to_string(), "AB3");
    }

    #[test]
    fn test_parse_range() {
        let range = CellRange::parse("A1:B3").unwrap();
        assert_eq!(range.bounded(100, 100), Bounds { min_row: 1, min_col: 1, max_row: 3, max_col: 2 });

        let single = CellRange::parse("C2").unwrap();
        assert_eq!(single.bounded(9, 9), Bounds { min_row: 2, min_col: 3, max_row: 2, max_col: 3 });

        let reversed = CellRange::parse("B3:A1").unwrap();
        assert_eq!(reversed, range);

        let absolute = CellRange::parse("$A$1:$B$3").unwrap();
        assert_eq!(absolute, range);
    }

    #[test]
    fn test_parse_open_ranges() {
        let columns = CellRange::parse("B:C").unwrap();
        assert_eq!(columns.bounded(7, 9), Bounds { min_row: 1, min_col: 2, max_row: 7, max_col: 3 });

        let rows = CellRange::parse("2:5").unwrap();
        assert_eq!(rows.bounded(7, 9), Bounds { min_row: 2, min_col: 1, max_row: 5, max_col: 9 });
    }

    #[test]
    fn test_parse_invalid_ranges() {
        for bad in ["", ":", "A1:", "1A:B2", "A1:B", "A1:B2:C3", "A0:B2"] {
            assert!(CellRange::parse(bad).is_err(), "{:?} should not parse", bad);
        }
    }
}
