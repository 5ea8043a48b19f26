use chrono::{DateTime, NaiveDateTime};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// Days between the Excel epoch (1899-12-30) and the Unix epoch.
const EXCEL_UNIX_EPOCH_DAYS: f64 = 25_569.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

//==============================================================================
// Cell values
//==============================================================================

/// The value held by a single cell.
///
/// Equality is numeric across `Int` and `Float`: xlsx stores every number as
/// a double, so `Float(4.0)` written to a file reads back as `Int(4)` and the
/// two compare equal.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
    /// Cached error result such as `#DIV/0!`.
    Error(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            CellValue::DateTime(dt) => Some(datetime_to_serial(dt)),
            _ => None,
        }
    }

    /// Surrounding whitespace removed from text; other values unchanged.
    pub fn trimmed(self) -> CellValue {
        match self {
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.len() == s.len() {
                    CellValue::Text(s)
                } else {
                    CellValue::Text(trimmed.to_string())
                }
            }
            other => other,
        }
    }

    /// Numbers with no fractional part become `Int`, the way xlsx readers
    /// surface whole numbers stored as `<v>42</v>`.
    pub fn from_number(n: f64) -> CellValue {
        if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
            CellValue::Int(n as i64)
        } else {
            CellValue::Float(n)
        }
    }

    /// Build a value from JSON: null, bool, number or string.
    pub fn from_json(value: &serde_json::Value) -> Option<CellValue> {
        match value {
            serde_json::Value::Null => Some(CellValue::Empty),
            serde_json::Value::Bool(b) => Some(CellValue::Bool(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(CellValue::Int(i)),
                None => n.as_f64().map(CellValue::Float),
            },
            serde_json::Value::String(s) => Some(CellValue::Text(s.clone())),
            _ => None,
        }
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Empty, CellValue::Empty) => true,
            (CellValue::Bool(a), CellValue::Bool(b)) => a == b,
            (CellValue::Int(a), CellValue::Int(b)) => a == b,
            (CellValue::Float(a), CellValue::Float(b)) => a == b,
            (CellValue::Int(i), CellValue::Float(f)) | (CellValue::Float(f), CellValue::Int(i)) => {
                *i as f64 == *f
            }
            (CellValue::Text(a), CellValue::Text(b)) => a == b,
            (CellValue::DateTime(a), CellValue::DateTime(b)) => a == b,
            (CellValue::Error(a), CellValue::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Error(e) => f.write_str(e),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<i32> for CellValue {
    fn from(i: i32) -> Self {
        CellValue::Int(i as i64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Float(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::DateTime(dt)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

/// Excel serial date (1900 date system) for a timestamp.
pub fn datetime_to_serial(dt: &NaiveDateTime) -> f64 {
    dt.and_utc().timestamp_millis() as f64 / MILLIS_PER_DAY + EXCEL_UNIX_EPOCH_DAYS
}

/// Timestamp for an Excel serial date, rounded to the millisecond.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    let millis = ((serial - EXCEL_UNIX_EPOCH_DAYS) * MILLIS_PER_DAY).round() as i64;
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

//==============================================================================
// Bulk reads
//==============================================================================

/// One row of a bulk sheet read.
///
/// Named rows keep column order and serialize as a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetRow {
    /// Cell values in column order.
    Positional(Vec<CellValue>),
    /// Cell values keyed by column name, in column order.
    Named(Vec<(String, CellValue)>),
}

impl SheetRow {
    /// Pair names with values in order. A repeated name keeps its first
    /// position and takes the later value.
    pub fn named<I>(pairs: I) -> SheetRow
    where
        I: IntoIterator<Item = (String, CellValue)>,
    {
        let mut row: Vec<(String, CellValue)> = Vec::new();
        for (name, value) in pairs {
            match row.iter_mut().find(|(existing, _)| *existing == name) {
                Some(slot) => slot.1 = value,
                None => row.push((name, value)),
            }
        }
        SheetRow::Named(row)
    }

    /// True when every value in the row is empty.
    pub fn is_blank(&self) -> bool {
        match self {
            SheetRow::Positional(values) => values.iter().all(CellValue::is_empty),
            SheetRow::Named(values) => values.iter().all(|(_, v)| v.is_empty()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SheetRow::Positional(values) => values.len(),
            SheetRow::Named(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value by column name; only named rows have names.
    pub fn get(&self, name: &str) -> Option<&CellValue> {
        match self {
            SheetRow::Named(values) => values.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            SheetRow::Positional(_) => None,
        }
    }

    /// Value by 0-based position; only positional rows have positions.
    pub fn at(&self, index: usize) -> Option<&CellValue> {
        match self {
            SheetRow::Positional(values) => values.get(index),
            SheetRow::Named(_) => None,
        }
    }
}

impl Serialize for SheetRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SheetRow::Positional(values) => values.serialize(serializer),
            SheetRow::Named(values) => {
                let mut map = serializer.serialize_map(Some(values.len()))?;
                for (name, value) in values {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }
    }
}
