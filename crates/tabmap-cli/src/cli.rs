//! CLI argument definitions for the tabmap binary.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use tabmap_model::FieldDomain;

#[derive(Parser)]
#[command(
    name = "tabmap",
    version,
    about = "tabmap - complexity-aware column mapping for tabular business files",
    long_about = "Maps columns of uploaded tabular files (inventory counts, order exports,\n\
                  supplier lists) onto a standard field catalog, routing each file to a\n\
                  cheap or deep model tier based on structural complexity, then drives\n\
                  the staged ingestion pipeline through validation, processing, quality\n\
                  scoring, and dashboard sync."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ingest one or more tabular files through the full pipeline.
    Run(RunArgs),

    /// Report file complexity and the tier decision without executing.
    Route(RouteArgs),

    /// Summarize model API spend from the usage ledger.
    Usage(UsageArgs),

    /// Print the standard field catalog.
    Fields(FieldsArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Tabular files (CSV with a header row) to ingest.
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Company scope for learned mappings.
    #[arg(long = "company", value_name = "ID", default_value = "default")]
    pub company: String,

    /// Directory holding the object store, usage ledger, and learned mappings.
    #[arg(long = "data-dir", value_name = "DIR", default_value = ".tabmap")]
    pub data_dir: PathBuf,

    /// Skip auto-confirming suggestions above the auto-map threshold.
    #[arg(long = "no-auto-map")]
    pub no_auto_map: bool,

    /// Halt for review when any suggestion falls below the auto-map threshold.
    #[arg(long = "require-confirmation")]
    pub require_confirmation: bool,

    /// Skip the model-backed validation stage.
    #[arg(long = "no-validate")]
    pub no_validate: bool,

    /// Skip dashboard sync after processing.
    #[arg(long = "no-auto-sync")]
    pub no_auto_sync: bool,

    /// Report the run unsuccessful below this quality score (0-100).
    #[arg(long = "quality-threshold", value_name = "SCORE")]
    pub quality_threshold: Option<f64>,

    /// Run without a model API; mapping uses the deterministic fallback.
    #[arg(long = "offline")]
    pub offline: bool,
}

#[derive(Parser)]
pub struct RouteArgs {
    /// Tabular file (CSV with a header row) to analyze.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Directory holding the usage ledger (for the cost estimate).
    #[arg(long = "data-dir", value_name = "DIR", default_value = ".tabmap")]
    pub data_dir: PathBuf,

    /// Show the decision as if the deep tier had been forced.
    #[arg(long = "force-deep")]
    pub force_deep: bool,
}

#[derive(Parser)]
pub struct UsageArgs {
    /// Start date (YYYY-MM-DD); defaults to 30 days ago.
    #[arg(long = "start", value_name = "DATE")]
    pub start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD), inclusive; defaults to today.
    #[arg(long = "end", value_name = "DATE")]
    pub end: Option<NaiveDate>,

    /// Directory holding the usage ledger.
    #[arg(long = "data-dir", value_name = "DIR", default_value = ".tabmap")]
    pub data_dir: PathBuf,
}

#[derive(Parser)]
pub struct FieldsArgs {
    /// Restrict the listing to one target domain.
    #[arg(long = "domain", value_enum, value_name = "DOMAIN")]
    pub domain: Option<FieldDomainArg>,
}

/// CLI domain choices, mirroring [`FieldDomain`].
#[derive(Clone, Copy, ValueEnum)]
pub enum FieldDomainArg {
    Inventory,
    Orders,
    Suppliers,
    Products,
    Recipes,
    Customers,
}

impl From<FieldDomainArg> for FieldDomain {
    fn from(arg: FieldDomainArg) -> Self {
        match arg {
            FieldDomainArg::Inventory => Self::Inventory,
            FieldDomainArg::Orders => Self::Orders,
            FieldDomainArg::Suppliers => Self::Suppliers,
            FieldDomainArg::Products => Self::Products,
            FieldDomainArg::Recipes => Self::Recipes,
            FieldDomainArg::Customers => Self::Customers,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
