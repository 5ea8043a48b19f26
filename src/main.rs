use clap::{Parser, Subcommand};
use excellent::cli;
use excellent::error::ExcellentResult;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "excellent")]
#[command(about = "Drive Excel workbooks through named keywords.")]
#[command(long_about = "Excellent - Excel workbooks as keyword-driven test fixtures

COMMANDS:
  run       - Run a YAML keyword suite against real workbooks
  dump      - Print a sheet's data as JSON
  keywords  - List the available keywords

EXAMPLES:
  excellent run orders_suite.yaml -v
  excellent dump orders.xlsx --sheet Orders --header
  excellent dump orders.xlsx --range A1:C10 --trim

LOGGING:
  Set EXCELLENT_LOG to a tracing filter, e.g. EXCELLENT_LOG=excellent=info")]
#[command(version)]
struct Cli {
    /// Tracing filter for log output
    #[arg(long, global = true, env = "EXCELLENT_LOG")]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Run a YAML keyword suite.

Each step names a keyword and its arguments. A step may declare the result it
expects, or the error kind it expects:

  name: Orders
  steps:
    - keyword: Open Workbook
      args: [orders.xlsx, orders]
    - keyword: Read From Cell
      args: { cell: B2 }
      expect: 42
    - keyword: Switch Sheet
      args: [Missing]
      expect_error: SheetNotFound

Relative file paths resolve against the suite's directory. The run stops at
the first failing step and exits non-zero.")]
    /// Run a YAML keyword suite
    Run {
        /// Path to the suite file
        suite: PathBuf,

        /// Show step results and debug logs
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print a sheet's data as JSON
    Dump {
        /// Path to the workbook (.xlsx, .xlsm)
        file: PathBuf,

        /// Sheet to read (default: the active sheet)
        #[arg(short, long)]
        sheet: Option<String>,

        /// Use row 1 as column names
        #[arg(long)]
        header: bool,

        /// Restrict to a range such as A1:C10
        #[arg(short, long)]
        range: Option<String>,

        /// Trim whitespace around text values
        #[arg(long)]
        trim: bool,
    },

    /// List the available keywords
    Keywords,
}

fn init_tracing(filter: Option<&str>, verbose: bool) {
    let filter = match (filter, verbose) {
        (Some(filter), _) => EnvFilter::new(filter),
        (None, true) => EnvFilter::new("excellent=debug"),
        (None, false) => EnvFilter::new("excellent=warn"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExcellentResult<()> {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Run { verbose: true, .. });
    init_tracing(cli.log.as_deref(), verbose);

    match cli.command {
        Commands::Run { suite, verbose } => cli::run(suite, verbose),

        Commands::Dump {
            file,
            sheet,
            header,
            range,
            trim,
        } => cli::dump(file, sheet, header, range, trim),

        Commands::Keywords => cli::keywords(),
    }
}
