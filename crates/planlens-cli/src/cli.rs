//! PlanLens command line
//!
//! Reads one showplan XML document, parses and lays it out, and prints the
//! statements, operator trees, missing indexes and warnings it found.
//!
//! ```text
//! planlens query.sqlplan
//! planlens --format json --layout-config layout.toml query.sqlplan
//! cat query.sqlplan | planlens -v -
//! ```

mod logging;
mod report;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use planlens_showplan::{LayoutConfig, LayoutEngine, parse_showplan};

use crate::logging::LogFormat;
use crate::report::JsonReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum OutputFormat {
    /// Terminal tables
    #[default]
    Table,
    /// The laid-out plan as JSON
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "planlens", version, about = "Inspect SQL Server execution plans")]
struct Cli {
    /// Showplan XML file, or `-` to read stdin
    input: PathBuf,

    /// TOML file with layout metrics
    #[arg(long, env = "PLANLENS_LAYOUT_CONFIG")]
    layout_config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Most expensive operators to list per statement
    #[arg(long, default_value_t = 5)]
    top: usize,

    /// More log output (-v, -vv); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "PLANLENS_LOG_FORMAT")]
    log_format: LogFormat,
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut xml = String::new();
        std::io::stdin()
            .read_to_string(&mut xml)
            .context("Failed to read showplan from stdin")?;
        Ok(xml)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read showplan from {:?}", path))
    }
}

fn load_layout_config(path: Option<&Path>) -> Result<LayoutConfig> {
    let Some(path) = path else {
        return Ok(LayoutConfig::default());
    };
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read layout config from {:?}", path))?;
    LayoutConfig::from_toml(&source)
        .with_context(|| format!("Failed to parse layout config {:?}", path))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format);

    let layout = load_layout_config(cli.layout_config.as_deref())?;
    let xml = read_input(&cli.input)?;

    let mut plan = parse_showplan(&xml)
        .with_context(|| format!("Failed to parse showplan {:?}", cli.input))?;
    let canvases = LayoutEngine::new(layout).layout_plan(&mut plan);

    match cli.format {
        OutputFormat::Json => {
            let report = JsonReport {
                plan: &plan,
                canvases: &canvases,
            };
            let json =
                serde_json::to_string_pretty(&report).context("Failed to serialize plan")?;
            println!("{json}");
        }
        OutputFormat::Table => {
            println!("{}", report::statements_table(&plan, &canvases));
            let skipped = plan.skipped_statement_count();
            if skipped > 0 {
                println!("{skipped} statement(s) without an operator tree were skipped");
            }

            for (index, statement) in plan.statements().enumerate() {
                for (heading, tree) in report::statement_trees(index, statement) {
                    println!();
                    println!("{heading}");
                    println!("{}", report::operators_table(tree));
                    if cli.top > 0 {
                        println!("{}", report::hotspots_table(tree, cli.top));
                    }
                }
            }

            if !plan.all_missing_indexes().is_empty() {
                println!();
                println!("Missing indexes");
                println!("{}", report::missing_indexes_table(&plan));
            }

            if !plan.all_warnings().is_empty() {
                println!();
                println!("Warnings");
                println!("{}", report::warnings_table(&plan));
            }
        }
    }

    Ok(())
}
