//! Registry lifecycle tests against real files on disk

use excellent::excel::{self, OpenOptions};
use excellent::{CellValue, ExcellentError, Registry};
use pretty_assertions::assert_eq;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ═══════════════════════════════════════════════════════════════════════════
// FIXTURES
// ═══════════════════════════════════════════════════════════════════════════

/// Two-sheet workbook written without going through the registry.
fn orders_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("orders.xlsx");
    let mut workbook = rust_xlsxwriter::Workbook::new();

    let orders = workbook.add_worksheet();
    orders.set_name("Orders").unwrap();
    orders.write_string(0, 0, "item").unwrap();
    orders.write_string(0, 1, "qty").unwrap();
    orders.write_string(1, 0, "apple").unwrap();
    orders.write_number(1, 1, 3).unwrap();
    orders.write_string(2, 0, "pear").unwrap();
    orders.write_number(2, 1, 5.5).unwrap();

    let stock = workbook.add_worksheet();
    stock.set_name("Stock").unwrap();
    stock.write_boolean(0, 0, true).unwrap();

    workbook.save(&path).unwrap();
    path
}

/// Workbook with a custom number format and a merged range, both of which the
/// in-memory model does not carry.
fn styled_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("styled.xlsx");
    let mut workbook = rust_xlsxwriter::Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Report").unwrap();
    sheet
        .write_number_with_format(
            0,
            0,
            1234.5,
            &rust_xlsxwriter::Format::new().set_num_format("#,##0.000"),
        )
        .unwrap();
    sheet
        .merge_range(0, 2, 1, 3, "merged", &rust_xlsxwriter::Format::new())
        .unwrap();
    sheet.set_column_width(0, 30).unwrap();

    workbook.save(&path).unwrap();
    path
}

/// Concatenated text of every xlsx package part whose name starts with `prefix`.
fn package_text(path: &Path, prefix: &str) -> String {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let names: Vec<String> = archive
        .file_names()
        .filter(|name| name.starts_with(prefix))
        .map(str::to_string)
        .collect();

    let mut text = String::new();
    for name in names {
        archive.by_name(&name).unwrap().read_to_string(&mut text).unwrap();
    }
    text
}

// ═══════════════════════════════════════════════════════════════════════════
// OPEN / CREATE / SAVE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_create_write_save_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("new.xlsx");

    let mut registry = Registry::new();
    let alias = registry.create_workbook(&path, None, false).unwrap();
    assert!(path.is_file());
    assert_eq!(alias, path.canonicalize().unwrap().display().to_string());

    registry.write_cell("B1", "Hello", None).unwrap();
    registry.write_cell("coords:(1,1)", 42, None).unwrap();
    registry.save(false).unwrap();
    assert!(registry.close_workbook(None));
    assert!(registry.is_empty());

    registry
        .open_workbook(&path, Some("x"), OpenOptions::default())
        .unwrap();
    assert_eq!(registry.active_alias(), Some("x"));
    assert_eq!(registry.read_cell("A1", false).unwrap(), CellValue::Int(42));
    assert_eq!(
        registry.read_cell("2, 1", false).unwrap(),
        CellValue::from("Hello")
    );
    assert_eq!(registry.read_cell("C9", false).unwrap(), CellValue::Empty);
}

#[test]
fn test_open_reads_external_workbook() {
    let temp_dir = TempDir::new().unwrap();
    let path = orders_fixture(temp_dir.path());

    let mut registry = Registry::new();
    registry
        .open_workbook(&path, Some("orders"), OpenOptions::default())
        .unwrap();

    assert_eq!(registry.active_sheet_name().unwrap(), "Orders");
    assert_eq!(registry.read_cell("A2", false).unwrap(), CellValue::from("apple"));
    assert_eq!(registry.read_cell("B2", false).unwrap(), CellValue::Int(3));
    assert_eq!(registry.read_cell("B3", false).unwrap(), CellValue::Float(5.5));
    assert_eq!(registry.row_count().unwrap(), 3);
    assert_eq!(registry.column_count().unwrap(), 2);

    registry.switch_sheet("Stock").unwrap();
    assert_eq!(registry.read_cell("A1", false).unwrap(), CellValue::Bool(true));
}

#[test]
fn test_open_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let mut registry = Registry::new();

    let result = registry.open_workbook(
        temp_dir.path().join("missing.xlsx"),
        None,
        OpenOptions::default(),
    );
    assert!(matches!(result, Err(ExcellentError::FileNotFound(_))));
    assert!(registry.is_empty());
}

#[test]
fn test_create_refuses_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = orders_fixture(temp_dir.path());
    let mut registry = Registry::new();

    let result = registry.create_workbook(&path, Some("o"), false);
    assert!(matches!(result, Err(ExcellentError::FileAlreadyExists(_))));

    registry.create_workbook(&path, Some("o"), true).unwrap();
    assert_eq!(registry.active_sheet_name().unwrap(), excel::DEFAULT_SHEET_NAME);
}

#[test]
fn test_same_file_cannot_be_opened_twice() {
    let temp_dir = TempDir::new().unwrap();
    let path = orders_fixture(temp_dir.path());
    let mut registry = Registry::new();

    registry
        .open_workbook(&path, Some("first"), OpenOptions::default())
        .unwrap();

    // A different spelling of the same path is still the same file
    let dotted = temp_dir.path().join(".").join("orders.xlsx");
    let result = registry.open_workbook(&dotted, Some("second"), OpenOptions::default());
    match result {
        Err(ExcellentError::FileAlreadyOpen { alias, .. }) => assert_eq!(alias, "first"),
        other => panic!("expected FileAlreadyOpen, got {:?}", other),
    }
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_alias_cannot_be_reused() {
    let temp_dir = TempDir::new().unwrap();
    let mut registry = Registry::new();

    registry
        .create_workbook(temp_dir.path().join("a.xlsx"), Some("book"), false)
        .unwrap();
    let result = registry.create_workbook(temp_dir.path().join("b.xlsx"), Some("book"), false);

    assert!(matches!(result, Err(ExcellentError::AliasInUse(alias)) if alias == "book"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_save_with_reopen_keeps_alias() {
    let temp_dir = TempDir::new().unwrap();
    let mut registry = Registry::new();

    registry
        .create_workbook(temp_dir.path().join("a.xlsx"), Some("a"), false)
        .unwrap();
    registry.write_cell("A1", "kept", None).unwrap();
    registry.save(true).unwrap();

    assert_eq!(registry.active_alias(), Some("a"));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.read_cell("A1", false).unwrap(), CellValue::from("kept"));
}

#[test]
fn test_save_with_reopen_keeps_open_order() {
    let temp_dir = TempDir::new().unwrap();
    let mut registry = Registry::new();

    for alias in ["a", "b", "c"] {
        registry
            .create_workbook(temp_dir.path().join(format!("{}.xlsx", alias)), Some(alias), false)
            .unwrap();
    }
    registry.switch_workbook("a").unwrap();
    registry.write_cell("A1", "first", None).unwrap();
    registry.save(true).unwrap();

    assert_eq!(registry.aliases().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    assert_eq!(registry.active_alias(), Some("a"));
    assert_eq!(registry.read_cell("A1", false).unwrap(), CellValue::from("first"));

    // Closing the active workbook still elects the earliest remaining one
    registry.switch_workbook("c").unwrap();
    registry.close_workbook(None);
    assert_eq!(registry.active_alias(), Some("a"));
}

#[test]
fn test_save_keeps_formatting_the_model_does_not_carry() {
    let temp_dir = TempDir::new().unwrap();
    let path = styled_fixture(temp_dir.path());
    let mut registry = Registry::new();

    registry
        .open_workbook(&path, Some("styled"), OpenOptions::default())
        .unwrap();
    registry.write_cell("B1", "note", None).unwrap();
    registry.save(false).unwrap();

    assert!(package_text(&path, "xl/styles.xml").contains("#,##0.000"));
    let sheets = package_text(&path, "xl/worksheets/");
    assert!(sheets.contains("C1:D2"), "merge lost: {}", sheets);

    let reopened = excel::open(&path, OpenOptions::default()).unwrap();
    let report = reopened.sheet("Report").unwrap();
    assert_eq!(report.value(1, 1), &CellValue::Float(1234.5));
    assert_eq!(report.value(1, 2), &CellValue::from("note"));
    assert_eq!(report.value(1, 3), &CellValue::from("merged"));
}

#[test]
fn test_whole_number_float_reads_back_equal() {
    let temp_dir = TempDir::new().unwrap();
    let mut registry = Registry::new();
    registry
        .create_workbook(temp_dir.path().join("floats.xlsx"), None, false)
        .unwrap();

    registry.write_cell("A1", 4.0, None).unwrap();
    registry.write_cell("A2", 4.5, None).unwrap();
    registry.save(true).unwrap();

    assert_eq!(registry.read_cell("A1", false).unwrap(), CellValue::Float(4.0));
    assert_ne!(registry.read_cell("A1", false).unwrap(), CellValue::Float(4.5));
    assert_eq!(registry.read_cell("A2", false).unwrap(), CellValue::Float(4.5));
}

// ═══════════════════════════════════════════════════════════════════════════
// CLOSE / SWITCH
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_close_active_elects_earliest_remaining() {
    let temp_dir = TempDir::new().unwrap();
    let mut registry = Registry::new();

    for alias in ["a", "b", "c"] {
        registry
            .create_workbook(temp_dir.path().join(format!("{}.xlsx", alias)), Some(alias), false)
            .unwrap();
    }
    assert_eq!(registry.active_alias(), Some("c"));

    assert!(registry.close_workbook(None));
    assert_eq!(registry.active_alias(), Some("a"));

    // Closing a non-active workbook leaves the active one alone
    registry.switch_workbook("b").unwrap();
    assert!(registry.close_workbook(Some("a")));
    assert_eq!(registry.active_alias(), Some("b"));

    assert!(registry.close_workbook(None));
    assert_eq!(registry.active_alias(), None);
    assert!(registry.is_empty());
}

#[test]
fn test_close_unknown_alias_is_not_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let mut registry = Registry::new();
    registry
        .create_workbook(temp_dir.path().join("a.xlsx"), Some("a"), false)
        .unwrap();

    assert!(!registry.close_workbook(Some("ghost")));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.active_alias(), Some("a"));

    registry.close_all_workbooks();
    assert!(!registry.close_workbook(None));
}

#[test]
fn test_close_with_empty_alias_closes_active() {
    let temp_dir = TempDir::new().unwrap();
    let mut registry = Registry::new();
    for alias in ["a", "b"] {
        registry
            .create_workbook(temp_dir.path().join(format!("{}.xlsx", alias)), Some(alias), false)
            .unwrap();
    }

    assert!(registry.close_workbook(Some("")));
    assert_eq!(registry.aliases().collect::<Vec<_>>(), vec!["a"]);
    assert_eq!(registry.active_alias(), Some("a"));
}

#[test]
fn test_switch_to_unopened_workbook() {
    let mut registry = Registry::new();
    let result = registry.switch_workbook("nope");
    assert!(matches!(result, Err(ExcellentError::UnopenedWorkbook(alias)) if alias == "nope"));
}

#[test]
fn test_active_sheet_is_per_workbook() {
    let temp_dir = TempDir::new().unwrap();
    let path = orders_fixture(temp_dir.path());
    let mut registry = Registry::new();

    registry
        .open_workbook(&path, Some("orders"), OpenOptions::default())
        .unwrap();
    registry.switch_sheet("Stock").unwrap();

    registry
        .create_workbook(temp_dir.path().join("other.xlsx"), Some("other"), false)
        .unwrap();
    assert_eq!(registry.active_sheet_name().unwrap(), "Sheet");

    registry.switch_workbook("orders").unwrap();
    assert_eq!(registry.active_sheet_name().unwrap(), "Stock");
}

#[test]
fn test_opened_workbooks() {
    let temp_dir = TempDir::new().unwrap();
    let mut registry = Registry::new();
    let path = temp_dir.path().join("a.xlsx");

    registry.create_workbook(&path, Some("a"), false).unwrap();

    let opened = registry.opened_workbooks();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened["a"], path.canonicalize().unwrap());
    assert_eq!(registry.aliases().collect::<Vec<_>>(), vec!["a"]);
}

// ═══════════════════════════════════════════════════════════════════════════
// SHEETS / CELLS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_sheet_operations() {
    let temp_dir = TempDir::new().unwrap();
    let mut registry = Registry::new();
    registry
        .create_workbook(temp_dir.path().join("a.xlsx"), None, false)
        .unwrap();

    registry.create_sheet("Data").unwrap();
    assert!(matches!(
        registry.create_sheet("data"),
        Err(ExcellentError::SheetExists(_))
    ));
    assert!(matches!(
        registry.switch_sheet("Missing"),
        Err(ExcellentError::SheetNotFound(_))
    ));
    assert!(matches!(
        registry.remove_sheet("Missing"),
        Err(ExcellentError::SheetNotFound(_))
    ));

    registry.remove_sheet("Sheet").unwrap();
    assert_eq!(registry.active_sheet_name().unwrap(), "Data");
    assert!(matches!(
        registry.remove_sheet("Data"),
        Err(ExcellentError::LastSheet(_))
    ));
}

#[test]
fn test_invalid_locators() {
    let temp_dir = TempDir::new().unwrap();
    let mut registry = Registry::new();
    registry
        .create_workbook(temp_dir.path().join("a.xlsx"), None, false)
        .unwrap();

    for locator in ["", "A", "1", "A0", "1,2,3", "x,1", "0,1", "coords:(1)"] {
        assert!(
            matches!(
                registry.read_cell(locator, false),
                Err(ExcellentError::InvalidLocator(_))
            ),
            "locator {:?} should be rejected",
            locator
        );
    }
    assert!(matches!(
        registry.write_cell("nonsense", 1, None),
        Err(ExcellentError::InvalidLocator(_))
    ));
}

#[test]
fn test_read_cell_trim() {
    let temp_dir = TempDir::new().unwrap();
    let mut registry = Registry::new();
    registry
        .create_workbook(temp_dir.path().join("a.xlsx"), None, false)
        .unwrap();

    registry.write_cell("A1", "  padded  ", None).unwrap();
    registry.write_cell("A2", 7.25, None).unwrap();

    assert_eq!(registry.read_cell("A1", true).unwrap(), CellValue::from("padded"));
    assert_eq!(
        registry.read_cell("A1", false).unwrap(),
        CellValue::from("  padded  ")
    );
    assert_eq!(registry.read_cell("A2", true).unwrap(), CellValue::Float(7.25));
}

#[test]
fn test_number_format_survives_save() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fmt.xlsx");
    let mut registry = Registry::new();

    registry.create_workbook(&path, Some("fmt"), false).unwrap();
    registry.write_cell("A1", 0.5, Some("#,##0.000")).unwrap();
    registry.save(true).unwrap();

    assert!(package_text(&path, "xl/styles.xml").contains("#,##0.000"));
    assert_eq!(registry.read_cell("A1", false).unwrap(), CellValue::Float(0.5));

    // A second save of the reloaded workbook keeps it too
    registry.write_cell("A2", "other", None).unwrap();
    registry.save(false).unwrap();
    assert!(package_text(&path, "xl/styles.xml").contains("#,##0.000"));
}

#[test]
fn test_keep_vba_carries_project() {
    let temp_dir = TempDir::new().unwrap();
    let vba_bin = temp_dir.path().join("vbaProject.bin");
    let vba_bytes: Vec<u8> = (0u8..=255).collect();
    std::fs::write(&vba_bin, &vba_bytes).unwrap();

    let path = temp_dir.path().join("macros.xlsm");
    let mut workbook = rust_xlsxwriter::Workbook::new();
    workbook.add_worksheet().write_string(0, 0, "macro").unwrap();
    workbook.add_vba_project(&vba_bin).unwrap();
    workbook.save(&path).unwrap();

    let dropped = excel::open(&path, OpenOptions::default()).unwrap();
    assert!(!dropped.has_vba_project());

    let mut registry = Registry::new();
    registry
        .open_workbook(&path, Some("m"), OpenOptions { keep_vba: true })
        .unwrap();
    assert_eq!(
        registry.handle("m").unwrap().workbook().vba_project(),
        Some(vba_bytes.as_slice())
    );

    // Saving writes the project back out
    registry.write_cell("A2", "more", None).unwrap();
    registry.save(true).unwrap();
    assert_eq!(
        registry.handle("m").unwrap().workbook().vba_project(),
        Some(vba_bytes.as_slice())
    );
    assert_eq!(registry.read_cell("A2", false).unwrap(), CellValue::from("more"));
}
