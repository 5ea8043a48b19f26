//! Keyword library
//!
//! Exposes the registry as named keywords, the way a test-automation host
//! calls into a library: `Open Workbook`, `Read From Cell`, and so on.
//! Keyword names match case-insensitively and ignore spaces and underscores.
//! Arguments arrive as JSON, either positional (an array) or named (an
//! object); results go back as JSON.

use crate::error::{ExcellentError, ExcellentResult};
use crate::excel::OpenOptions;
use crate::locator::CellRange;
use crate::registry::{ReadSheetOptions, Registry};
use crate::types::CellValue;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::info;

/// Name, argument names and a one-line description of a keyword.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct KeywordSpec {
    pub name: &'static str,
    pub args: &'static [&'static str],
    pub doc: &'static str,
}

pub const KEYWORDS: &[KeywordSpec] = &[
    KeywordSpec {
        name: "Open Workbook",
        args: &["file_path", "alias", "keep_vba"],
        doc: "Open the workbook at file_path and make it the active one.",
    },
    KeywordSpec {
        name: "Create Workbook",
        args: &["file_path", "overwrite_file_if_exists", "alias"],
        doc: "Create a new workbook, save it to file_path and make it the active one.",
    },
    KeywordSpec {
        name: "Close Workbook",
        args: &["alias"],
        doc: "Close the workbook known as alias, or the active one. Changes are not saved.",
    },
    KeywordSpec {
        name: "Close All Workbooks",
        args: &[],
        doc: "Close every opened workbook.",
    },
    KeywordSpec {
        name: "Switch Workbook",
        args: &["alias"],
        doc: "Make the opened workbook known as alias the active one.",
    },
    KeywordSpec {
        name: "Switch Sheet",
        args: &["sheet_name"],
        doc: "Switch to the named sheet within the active workbook.",
    },
    KeywordSpec {
        name: "Create Sheet",
        args: &["name"],
        doc: "Create a sheet in the active workbook.",
    },
    KeywordSpec {
        name: "Remove Sheet",
        args: &["name"],
        doc: "Remove a sheet from the active workbook.",
    },
    KeywordSpec {
        name: "Save",
        args: &["reopen_after_save"],
        doc: "Save the active workbook to its file.",
    },
    KeywordSpec {
        name: "Read From Cell",
        args: &["cell", "trim"],
        doc: "Read the cell identified by an A1 or coordinates locator.",
    },
    KeywordSpec {
        name: "Write To Cell",
        args: &["cell", "value", "number_format"],
        doc: "Write a value to the cell identified by an A1 or coordinates locator.",
    },
    KeywordSpec {
        name: "Read Sheet Data",
        args: &[
            "column_names",
            "get_column_names_from_header_row",
            "cell_range",
            "trim",
        ],
        doc: "Read the active sheet into a list of rows (lists, or dictionaries when columns are named).",
    },
    KeywordSpec {
        name: "Get Row Count",
        args: &[],
        doc: "Highest used row of the active sheet.",
    },
    KeywordSpec {
        name: "Get Column Count",
        args: &[],
        doc: "Highest used column of the active sheet.",
    },
    KeywordSpec {
        name: "Log Opened Workbooks",
        args: &["to_log", "to_console"],
        doc: "Log the alias and file path of every opened workbook.",
    },
];

/// Lowercase with spaces and underscores removed.
pub fn normalize_keyword(name: &str) -> String {
    name.chars()
        .filter(|c| *c != ' ' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Look up a keyword by any spelling of its name.
pub fn find_keyword(name: &str) -> Option<&'static KeywordSpec> {
    let wanted = normalize_keyword(name);
    KEYWORDS.iter().find(|k| normalize_keyword(k.name) == wanted)
}

/// Keyword front-end over a [`Registry`].
#[derive(Debug, Default)]
pub struct ExcellentLibrary {
    registry: Registry,
    base_dir: Option<PathBuf>,
}

impl ExcellentLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative `file_path` arguments against `dir`.
    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            registry: Registry::new(),
            base_dir: Some(dir.into()),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn keywords() -> &'static [KeywordSpec] {
        KEYWORDS
    }

    /// Run a keyword by name.
    pub fn run_keyword(&mut self, name: &str, args: &Value) -> ExcellentResult<Value> {
        let def = find_keyword(name)
            .ok_or_else(|| ExcellentError::Keyword(format!("No keyword with name '{}' found.", name)))?;
        let args = KeywordArgs::bind(def, args)?;

        match def.name {
            "Open Workbook" => {
                let file_path = self.file_path(args.required_str("file_path")?);
                let alias = args.str("alias")?;
                let options = OpenOptions {
                    keep_vba: args.bool("keep_vba", false)?,
                };
                self.registry
                    .open_workbook(file_path, alias.as_deref(), options)?;
                Ok(Value::Null)
            }
            "Create Workbook" => {
                let file_path = self.file_path(args.required_str("file_path")?);
                let overwrite = args.bool("overwrite_file_if_exists", false)?;
                let alias = args.str("alias")?;
                self.registry
                    .create_workbook(file_path, alias.as_deref(), overwrite)?;
                Ok(Value::Null)
            }
            "Close Workbook" => {
                let alias = args.str("alias")?;
                self.registry.close_workbook(alias.as_deref());
                Ok(Value::Null)
            }
            "Close All Workbooks" => {
                self.registry.close_all_workbooks();
                Ok(Value::Null)
            }
            "Switch Workbook" => {
                self.registry.switch_workbook(&args.required_str("alias")?)?;
                Ok(Value::Null)
            }
            "Switch Sheet" => {
                self.registry
                    .switch_sheet(&args.required_str("sheet_name")?)?;
                Ok(Value::Null)
            }
            "Create Sheet" => {
                self.registry.create_sheet(&args.required_str("name")?)?;
                Ok(Value::Null)
            }
            "Remove Sheet" => {
                self.registry.remove_sheet(&args.required_str("name")?)?;
                Ok(Value::Null)
            }
            "Save" => {
                self.registry.save(args.bool("reopen_after_save", false)?)?;
                Ok(Value::Null)
            }
            "Read From Cell" => {
                let value = self
                    .registry
                    .read_cell(&args.required_str("cell")?, args.bool("trim", false)?)?;
                Ok(serde_json::to_value(value)?)
            }
            "Write To Cell" => {
                let cell = args.required_str("cell")?;
                let value = args.cell_value("value")?;
                let number_format = args.str("number_format")?;
                self.registry
                    .write_cell(&cell, value, number_format.as_deref())?;
                Ok(Value::Null)
            }
            "Read Sheet Data" => {
                let range = match args.str("cell_range")? {
                    Some(range) => Some(CellRange::parse(&range)?),
                    None => None,
                };
                let options = ReadSheetOptions {
                    column_names: args.string_list("column_names")?,
                    use_header_row: args.bool("get_column_names_from_header_row", false)?,
                    range,
                    trim: args.bool("trim", false)?,
                };
                let rows = self.registry.read_sheet(&options)?;
                Ok(serde_json::to_value(rows)?)
            }
            "Get Row Count" => Ok(Value::from(self.registry.row_count()?)),
            "Get Column Count" => Ok(Value::from(self.registry.column_count()?)),
            "Log Opened Workbooks" => {
                let workbooks = serde_json::to_value(self.registry.opened_workbooks())?;
                if args.bool("to_log", true)? {
                    info!(workbooks = %workbooks, "opened workbooks");
                }
                if args.bool("to_console", false)? {
                    println!("{}", workbooks);
                }
                Ok(Value::Null)
            }
            other => Err(ExcellentError::Keyword(format!(
                "Keyword '{}' is not implemented.",
                other
            ))),
        }
    }

    fn file_path(&self, file_path: String) -> PathBuf {
        let path = PathBuf::from(file_path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }
}

/// Arguments bound to a keyword's argument names.
struct KeywordArgs {
    keyword: &'static str,
    named: Map<String, Value>,
}

impl KeywordArgs {
    fn bind(def: &'static KeywordSpec, args: &Value) -> ExcellentResult<Self> {
        let named = match args {
            Value::Null => Map::new(),
            Value::Array(values) => {
                if values.len() > def.args.len() {
                    return Err(ExcellentError::Keyword(format!(
                        "Keyword '{}' expected at most {} arguments, got {}.",
                        def.name,
                        def.args.len(),
                        values.len()
                    )));
                }
                def.args
                    .iter()
                    .map(|name| name.to_string())
                    .zip(values.iter().cloned())
                    .collect()
            }
            Value::Object(map) => {
                if let Some(unknown) = map.keys().find(|k| !def.args.contains(&k.as_str())) {
                    return Err(ExcellentError::Keyword(format!(
                        "Keyword '{}' got unexpected named argument '{}'.",
                        def.name, unknown
                    )));
                }
                map.clone()
            }
            // A bare scalar is the first positional argument.
            scalar => match def.args.first() {
                Some(first) => {
                    let mut map = Map::new();
                    map.insert(first.to_string(), scalar.clone());
                    map
                }
                None => {
                    return Err(ExcellentError::Keyword(format!(
                        "Keyword '{}' takes no arguments.",
                        def.name
                    )))
                }
            },
        };

        Ok(Self {
            keyword: def.name,
            named,
        })
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.named.get(name).filter(|v| !v.is_null())
    }

    fn invalid(&self, name: &str, expected: &str) -> ExcellentError {
        ExcellentError::Keyword(format!(
            "Argument '{}' of keyword '{}' must be {}.",
            name, self.keyword, expected
        ))
    }

    fn str(&self, name: &str) -> ExcellentResult<Option<String>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(self.invalid(name, "a string")),
        }
    }

    fn required_str(&self, name: &str) -> ExcellentResult<String> {
        self.str(name)?.ok_or_else(|| {
            ExcellentError::Keyword(format!(
                "Keyword '{}' missing value for argument '{}'.",
                self.keyword, name
            ))
        })
    }

    /// Booleans may also be given as the strings `true`/`false`.
    fn bool(&self, name: &str, default: bool) -> ExcellentResult<bool> {
        match self.get(name) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(true),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(false),
            Some(_) => Err(self.invalid(name, "a boolean")),
        }
    }

    fn string_list(&self, name: &str) -> ExcellentResult<Option<Vec<String>>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    Value::Number(n) => Ok(n.to_string()),
                    _ => Err(self.invalid(name, "a list of strings")),
                })
                .collect::<ExcellentResult<Vec<_>>>()
                .map(Some),
            Some(_) => Err(self.invalid(name, "a list of strings")),
        }
    }

    fn cell_value(&self, name: &str) -> ExcellentResult<CellValue> {
        match self.named.get(name) {
            None => Err(ExcellentError::Keyword(format!(
                "Keyword '{}' missing value for argument '{}'.",
                self.keyword, name
            ))),
            Some(value) => {
                CellValue::from_json(value).ok_or_else(|| self.invalid(name, "a scalar value"))
            }
        }
    }
}
