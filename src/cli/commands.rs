use crate::error::{ExcellentError, ExcellentResult};
use crate::excel::OpenOptions;
use crate::keywords::ExcellentLibrary;
use crate::locator::CellRange;
use crate::registry::{ReadSheetOptions, Registry};
use crate::suite::{self, StepStatus};
use colored::Colorize;
use std::path::PathBuf;

/// Execute the run command
pub fn run(suite_path: PathBuf, verbose: bool) -> ExcellentResult<()> {
    println!("{}", "Excellent - Running keyword suite".bold().green());
    println!("   Suite: {}\n", suite_path.display());

    let report = suite::run_suite(&suite_path)?;

    for outcome in &report.outcomes {
        let label = format!("[{}] {}", outcome.index + 1, outcome.keyword);
        match &outcome.status {
            StepStatus::Passed(result) => {
                if verbose && !result.is_null() {
                    println!("   {} {} → {}", "PASS".green(), label, result);
                } else {
                    println!("   {} {}", "PASS".green(), label);
                }
            }
            StepStatus::ExpectedError(message) => {
                if verbose {
                    println!("   {} {} ({})", "PASS".green(), label, message.dimmed());
                } else {
                    println!("   {} {}", "PASS".green(), label);
                }
            }
            StepStatus::Failed(message) => {
                println!("   {} {}", "FAIL".red().bold(), label);
                println!("        {}", message.red());
            }
        }
    }

    let skipped = report.total_steps - report.outcomes.len();
    println!();
    if report.passed() {
        println!(
            "{}",
            format!("✅ {}: {} steps passed", report.name, report.total_steps)
                .bold()
                .green()
        );
        Ok(())
    } else {
        if skipped > 0 {
            println!("   {} steps not run", skipped.to_string().yellow());
        }
        println!("{}", format!("❌ {}: failed", report.name).bold().red());
        let step = report.failure().map(|o| o.index + 1).unwrap_or(0);
        Err(ExcellentError::Suite(format!(
            "Suite '{}' failed at step {}",
            report.name, step
        )))
    }
}

/// Execute the dump command
pub fn dump(
    file: PathBuf,
    sheet: Option<String>,
    header: bool,
    range: Option<String>,
    trim: bool,
) -> ExcellentResult<()> {
    let range = range.as_deref().map(CellRange::parse).transpose()?;

    let mut registry = Registry::new();
    registry.open_workbook(&file, None, OpenOptions::default())?;
    if let Some(sheet) = &sheet {
        registry.switch_sheet(sheet)?;
    }

    let rows = registry.read_sheet(&ReadSheetOptions {
        column_names: None,
        use_header_row: header,
        range,
        trim,
    })?;
    registry.close_all_workbooks();

    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

/// Execute the keywords command
pub fn keywords() -> ExcellentResult<()> {
    println!("{}", "Excellent - Keywords".bold().green());
    println!();
    for keyword in ExcellentLibrary::keywords() {
        println!(
            "   {}({})",
            keyword.name.bright_blue().bold(),
            keyword.args.join(", ").cyan()
        );
        println!("      {}", keyword.doc);
    }
    println!();
    Ok(())
}
