//! Workbook importer - xlsx/xlsm file → in-memory [`Workbook`]

use crate::error::{ExcellentError, ExcellentResult};
use crate::excel::workbook::{Cell, Workbook, Worksheet};
use crate::types::{serial_to_datetime, CellValue};
use calamine::{Data, Range, Reader, Xlsx};
use chrono::NaiveDateTime;
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

const VBA_PROJECT_PART: &str = "xl/vbaProject.bin";
const WORKBOOK_PART: &str = "xl/workbook.xml";

/// Options applied when a workbook is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenOptions {
    /// Keep the workbook's VBA project so that saving writes it back.
    pub keep_vba: bool,
}

/// Loads a workbook file into memory.
pub struct WorkbookImporter {
    path: PathBuf,
    options: OpenOptions,
}

impl WorkbookImporter {
    pub fn new<P: AsRef<Path>>(path: P, options: OpenOptions) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options,
        }
    }

    /// Read every sheet of the file.
    ///
    /// A missing file is reported as [`ExcellentError::FileNotFound`]; other
    /// I/O failures pass through unchanged.
    pub fn import(&self) -> ExcellentResult<Workbook> {
        let file = self.open_file()?;
        let mut reader: Xlsx<_> = Xlsx::new(BufReader::new(file)).map_err(|e| {
            ExcellentError::Import(format!(
                "Failed to open Excel file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let mut sheets = Vec::new();
        for sheet_name in reader.sheet_names().to_vec() {
            let range = reader.worksheet_range(&sheet_name).map_err(|e| {
                ExcellentError::Import(format!("Failed to read sheet '{}': {}", sheet_name, e))
            })?;
            // Formulas are optional: a sheet without any still loads.
            let formulas = reader.worksheet_formula(&sheet_name).ok();
            sheets.push(self.process_sheet(&sheet_name, &range, formulas.as_ref()));
        }

        let (active, vba_project) = self.read_package_parts()?;
        debug!(
            path = %self.path.display(),
            sheets = sheets.len(),
            active,
            vba = vba_project.is_some(),
            "workbook loaded"
        );
        Ok(Workbook::from_sheets(&self.path, sheets, active, vba_project))
    }

    fn open_file(&self) -> ExcellentResult<File> {
        File::open(&self.path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ExcellentError::FileNotFound(self.path.clone())
            } else {
                ExcellentError::Io(e)
            }
        })
    }

    /// Convert one calamine range (plus its formulas) into a worksheet.
    fn process_sheet(
        &self,
        sheet_name: &str,
        range: &Range<Data>,
        formulas: Option<&Range<String>>,
    ) -> Worksheet {
        let mut sheet = Worksheet::new(sheet_name);

        if let Some((start_row, start_col)) = range.start() {
            for (row, col, data) in range.used_cells() {
                let value = convert_data(data);
                let abs_row = start_row + row as u32 + 1;
                let abs_col = start_col + col as u32 + 1;
                sheet.insert(abs_row, abs_col, Cell::new(value));
            }
        }

        if let Some(formulas) = formulas {
            if let Some((start_row, start_col)) = formulas.start() {
                for (row, col, formula) in formulas.used_cells() {
                    let abs_row = start_row + row as u32 + 1;
                    let abs_col = start_col + col as u32 + 1;
                    let value = sheet.value(abs_row, abs_col).clone();
                    sheet.insert(
                        abs_row,
                        abs_col,
                        Cell {
                            value,
                            number_format: None,
                            formula: Some(formula.trim_start_matches('=').to_string()),
                        },
                    );
                }
            }
        }

        sheet
    }

    /// Active sheet index and (when kept) the raw VBA project, both read from
    /// the zip package directly since calamine exposes neither.
    fn read_package_parts(&self) -> ExcellentResult<(usize, Option<Vec<u8>>)> {
        let file = self.open_file()?;
        let mut archive = zip::ZipArchive::new(BufReader::new(file))
            .map_err(|e| ExcellentError::Import(format!("Invalid xlsx package: {}", e)))?;

        let active = match archive.by_name(WORKBOOK_PART) {
            Ok(part) => active_tab(BufReader::new(part)).unwrap_or(0),
            Err(_) => 0,
        };

        let vba_project = if self.options.keep_vba {
            match archive.by_name(VBA_PROJECT_PART) {
                Ok(mut part) => {
                    let mut bytes = Vec::with_capacity(part.size() as usize);
                    part.read_to_end(&mut bytes)?;
                    Some(bytes)
                }
                Err(_) => None,
            }
        } else {
            None
        };

        Ok((active, vba_project))
    }
}

/// Convert a calamine cell to a [`CellValue`].
fn convert_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::from_number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::DateTime(dt) => serial_to_datetime(dt.as_f64())
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::from_number(dt.as_f64())),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .map(CellValue::DateTime)
            .unwrap_or_else(|_| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Error(e.to_string()),
    }
}

/// `activeTab` attribute of the first `workbookView` in `xl/workbook.xml`.
fn active_tab<R: BufRead>(workbook_xml: R) -> Option<usize> {
    let mut xml = XmlReader::from_reader(workbook_xml);
    xml.trim_text(true);

    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"workbookView" {
                    return e
                        .attributes()
                        .flatten()
                        .find(|attr| attr.key.local_name().as_ref() == b"activeTab")
                        .and_then(|attr| std::str::from_utf8(&attr.value).ok()?.parse().ok());
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_tab() {
        let xml = r#"<workbook><bookViews><workbookView xWindow="240" activeTab="2"/></bookViews></workbook>"#;
        assert_eq!(active_tab(xml.as_bytes()), Some(2));

        let no_tab = r#"<workbook><bookViews><workbookView xWindow="240"/></bookViews><sheets activeTab="9"/></workbook>"#;
        assert_eq!(active_tab(no_tab.as_bytes()), None);

        assert_eq!(active_tab("<workbook/>".as_bytes()), None);
    }

    #[test]
    fn test_active_tab_reads_markup_not_text() {
        // Prefixed elements, single quotes, and look-alike text before the view
        let xml = r#"<?xml version="1.0"?>
<x:workbook xmlns:x="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <x:fileVersion appName="&lt;workbookView activeTab=&quot;7&quot;&gt;"/>
  <!-- <workbookView activeTab="5"/> -->
  <x:bookViews>
    <x:workbookView
        activeTab='3'
        xWindow="0"></x:workbookView>
  </x:bookViews>
</x:workbook>"#;
        assert_eq!(active_tab(xml.as_bytes()), Some(3));
    }

    #[test]
    fn test_convert_data() {
        assert_eq!(convert_data(&Data::Float(42.0)), CellValue::Int(42));
        assert_eq!(convert_data(&Data::Float(4.5)), CellValue::Float(4.5));
        assert_eq!(convert_data(&Data::Int(7)), CellValue::Int(7));
        assert_eq!(
            convert_data(&Data::String("Hello".to_string())),
            CellValue::Text("Hello".to_string())
        );
        assert_eq!(convert_data(&Data::Bool(true)), CellValue::Bool(true));
        assert_eq!(convert_data(&Data::Empty), CellValue::Empty);
    }

    #[test]
    fn test_missing_file() {
        let importer = WorkbookImporter::new("does/not/exist.xlsx", OpenOptions::default());
        assert!(matches!(
            importer.import(),
            Err(ExcellentError::FileNotFound(_))
        ));
    }
}
