use std::path::PathBuf;
use thiserror::Error;

pub type ExcellentResult<T> = Result<T, ExcellentError>;

#[derive(Error, Debug)]
pub enum ExcellentError {
    #[error("The alias `{0}' is already in use by another workbook.")]
    AliasInUse(String),

    #[error("file `{}' does not exist.", .0.display())]
    FileNotFound(PathBuf),

    #[error("The file `{}' already exists.", .0.display())]
    FileAlreadyExists(PathBuf),

    #[error("The workbook with file_path `{}' is already opened with alias `{alias}'.", .file_path.display())]
    FileAlreadyOpen { file_path: PathBuf, alias: String },

    #[error("Please supply sufficient coordinates for identifying a cell: `{0}'")]
    InvalidLocator(String),

    #[error("Invalid cell range: `{0}'")]
    InvalidRange(String),

    #[error("sheet `{0}' already exists.")]
    SheetExists(String),

    #[error("Could not find sheet `{0}'.")]
    SheetNotFound(String),

    #[error("Cannot remove `{0}': a workbook must keep at least one sheet.")]
    LastSheet(String),

    #[error("Invalid sheet name: `{0}'")]
    InvalidSheetName(String),

    #[error("The amount of column names supplied ({names}) is smaller than the amount of columns in row {row}.")]
    TooFewColumnNames { row: u32, names: usize },

    #[error("No opened workbook found with alias `{0}'.")]
    UnknownAlias(String),

    #[error("workbook with alias `{0}' is unknown, please open it before using it.")]
    UnopenedWorkbook(String),

    #[error("No workbook is opened; open or create one first.")]
    NoActiveWorkbook,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Keyword error: {0}")]
    Keyword(String),

    #[error("Suite error: {0}")]
    Suite(String),
}

impl ExcellentError {
    /// Stable variant name, used by suites to match expected failures.
    pub fn kind(&self) -> &'static str {
        match self {
            ExcellentError::AliasInUse(_) => "AliasInUse",
            ExcellentError::FileNotFound(_) => "FileNotFound",
            ExcellentError::FileAlreadyExists(_) => "FileAlreadyExists",
            ExcellentError::FileAlreadyOpen { .. } => "FileAlreadyOpen",
            ExcellentError::InvalidLocator(_) => "InvalidLocator",
            ExcellentError::InvalidRange(_) => "InvalidRange",
            ExcellentError::SheetExists(_) => "SheetExists",
            ExcellentError::SheetNotFound(_) => "SheetNotFound",
            ExcellentError::LastSheet(_) => "LastSheet",
            ExcellentError::InvalidSheetName(_) => "InvalidSheetName",
            ExcellentError::TooFewColumnNames { .. } => "TooFewColumnNames",
            ExcellentError::UnknownAlias(_) => "UnknownAlias",
            ExcellentError::UnopenedWorkbook(_) => "UnopenedWorkbook",
            ExcellentError::NoActiveWorkbook => "NoActiveWorkbook",
            ExcellentError::Io(_) => "Io",
            ExcellentError::Import(_) => "Import",
            ExcellentError::Export(_) => "Export",
            ExcellentError::Yaml(_) => "Yaml",
            ExcellentError::Json(_) => "Json",
            ExcellentError::Keyword(_) => "Keyword",
            ExcellentError::Suite(_) => "Suite",
        }
    }
}
