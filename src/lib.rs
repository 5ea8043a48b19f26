//! Excellent - Excel workbooks as keyword-driven test fixtures
//!
//! This library keeps a registry of opened workbooks, each known by an alias,
//! and reads and writes cells addressed by A1 (`B3`) or coordinate
//! (`coords:(2,3)`, column first) locators.
//!
//! # Features
//!
//! - Open, create, save and close `.xlsx`/`.xlsm` workbooks by alias
//! - Switch, create and remove sheets of the active workbook
//! - Read whole sheets as lists or as header-keyed maps
//! - Keyword front-end and YAML suites for test automation
//!
//! # Example
//!
//! ```no_run
//! use excellent::{OpenOptions, ReadSheetOptions, Registry};
//!
//! let mut registry = Registry::new();
//! registry.open_workbook("orders.xlsx", Some("orders"), OpenOptions::default())?;
//!
//! // Column 3, row 2: the same cell as `C2`
//! let total = registry.read_cell("coords:(3,2)", false)?;
//! println!("Total: {}", total);
//!
//! let rows = registry.read_sheet(&ReadSheetOptions {
//!     use_header_row: true,
//!     ..Default::default()
//! })?;
//! println!("Rows: {}", rows.len());
//! # Ok::<(), excellent::ExcellentError>(())
//! ```

pub mod cli;
pub mod error;
pub mod excel;
pub mod keywords;
pub mod locator;
pub mod registry;
pub mod suite;
pub mod types;

// Re-export commonly used types
pub use error::{ExcellentError, ExcellentResult};
pub use excel::OpenOptions;
pub use keywords::ExcellentLibrary;
pub use locator::{CellLocator, CellRange};
pub use registry::{ReadSheetOptions, Registry};
pub use types::{CellValue, SheetRow};
