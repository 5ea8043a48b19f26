//! Keyword suites
//!
//! A suite is a YAML file listing keyword steps:
//!
//! ```yaml
//! name: Orders
//! steps:
//!   - keyword: Open Workbook
//!     args: [orders.xlsx, orders]
//!   - keyword: Read From Cell
//!     args: { cell: B2, trim: true }
//!     expect: 42
//!   - keyword: Switch Sheet
//!     args: [Missing]
//!     expect_error: SheetNotFound
//! ```
//!
//! Steps run in order against one [`ExcellentLibrary`]; the first failing
//! step ends the run. Relative file paths resolve against the suite file's
//! directory. All workbooks are closed when the run ends.

use crate::error::{ExcellentError, ExcellentResult};
use crate::keywords::ExcellentLibrary;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct Suite {
    #[serde(default)]
    pub name: Option<String>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub keyword: String,
    #[serde(default)]
    pub args: serde_yaml::Value,
    /// Expected result. `expect: null` expects an empty value, which is
    /// different from leaving `expect` out.
    #[serde(default, deserialize_with = "present")]
    pub expect: Option<serde_yaml::Value>,
    /// Error kind the keyword must fail with, e.g. `SheetNotFound`.
    #[serde(default)]
    pub expect_error: Option<String>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<serde_yaml::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_yaml::Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepStatus {
    Passed(Value),
    /// Failed with the error kind the step expected.
    ExpectedError(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub index: usize,
    pub keyword: String,
    pub status: StepStatus,
}

impl StepOutcome {
    pub fn passed(&self) -> bool {
        !matches!(self.status, StepStatus::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuiteReport {
    pub name: String,
    pub total_steps: usize,
    pub outcomes: Vec<StepOutcome>,
}

impl SuiteReport {
    /// True when every step ran and passed.
    pub fn passed(&self) -> bool {
        self.outcomes.len() == self.total_steps && self.outcomes.iter().all(StepOutcome::passed)
    }

    pub fn failure(&self) -> Option<&StepOutcome> {
        self.outcomes.iter().find(|o| !o.passed())
    }
}

/// Parse a suite from YAML text.
pub fn parse_suite(content: &str) -> ExcellentResult<Suite> {
    let suite: Suite = serde_yaml::from_str(content)?;
    if suite.steps.is_empty() {
        return Err(ExcellentError::Suite("Suite has no steps".to_string()));
    }
    Ok(suite)
}

/// Load and run the suite at `path`.
pub fn run_suite(path: &Path) -> ExcellentResult<SuiteReport> {
    let content = std::fs::read_to_string(path)?;
    let mut suite = parse_suite(&content)?;
    if suite.name.is_none() {
        suite.name = path.file_stem().map(|s| s.to_string_lossy().into_owned());
    }

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut library = ExcellentLibrary::with_base_dir(base_dir);
    run_steps(&mut library, &suite)
}

/// Run a parsed suite against `library`, closing every workbook afterwards.
pub fn run_steps(library: &mut ExcellentLibrary, suite: &Suite) -> ExcellentResult<SuiteReport> {
    let mut outcomes = Vec::with_capacity(suite.steps.len());

    for (index, step) in suite.steps.iter().enumerate() {
        let status = run_step(library, step)?;
        debug!(step = index + 1, keyword = %step.keyword, ?status, "step finished");
        let failed = matches!(status, StepStatus::Failed(_));
        outcomes.push(StepOutcome {
            index,
            keyword: step.keyword.clone(),
            status,
        });
        if failed {
            break;
        }
    }

    library.registry_mut().close_all_workbooks();

    Ok(SuiteReport {
        name: suite.name.clone().unwrap_or_else(|| "suite".to_string()),
        total_steps: suite.steps.len(),
        outcomes,
    })
}

fn run_step(library: &mut ExcellentLibrary, step: &Step) -> ExcellentResult<StepStatus> {
    let args = serde_json::to_value(&step.args)?;

    let status = match (library.run_keyword(&step.keyword, &args), &step.expect_error) {
        (Ok(_), Some(kind)) => StepStatus::Failed(format!(
            "Expected error {} but the keyword succeeded",
            kind
        )),
        (Ok(result), None) => match &step.expect {
            Some(expected) => {
                let expected = serde_json::to_value(expected)?;
                if values_match(&expected, &result) {
                    StepStatus::Passed(result)
                } else {
                    StepStatus::Failed(format!("Expected {} but got {}", expected, result))
                }
            }
            None => StepStatus::Passed(result),
        },
        (Err(e), Some(kind)) if e.kind() == kind => StepStatus::ExpectedError(e.to_string()),
        (Err(e), Some(kind)) => {
            StepStatus::Failed(format!("Expected error {} but got {}: {}", kind, e.kind(), e))
        }
        (Err(e), None) => StepStatus::Failed(format!("{}: {}", e.kind(), e)),
    };
    Ok(status)
}

/// Structural equality, except that numbers compare by value (`42 == 42.0`).
fn values_match(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_match(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, x)| b.get(k).is_some_and(|y| values_match(x, y)))
        }
        _ => expected == actual,
    }
}
