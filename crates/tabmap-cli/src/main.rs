//! The tabmap command-line interface.

use clap::{ColorChoice, Parser};
use std::io::{self, IsTerminal};
use tracing::level_filters::LevelFilter;

use tabmap_cli::logging::{LogConfig, LogFormat, init_logging};
use tabmap_model::{FileStatus, Thresholds};

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{run_fields, run_files, run_route, run_usage};
use crate::summary::{print_fields, print_route_report, print_run_summary, print_usage_report};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match cli.command {
        Command::Run(args) => match run_files(&args) {
            Ok(reports) => {
                let thresholds = Thresholds::default();
                for report in &reports {
                    print_run_summary(report, &thresholds);
                }
                // Failures outrank halts; a halt still exits non-zero so
                // scripts notice the file needs review.
                if reports.iter().any(|r| r.outcome.status == FileStatus::Failed) {
                    1
                } else if reports
                    .iter()
                    .any(|r| r.outcome.status == FileStatus::MappingRequired)
                {
                    2
                } else if reports.iter().all(|r| r.outcome.success) {
                    0
                } else {
                    1
                }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
        Command::Route(args) => match run_route(&args) {
            Ok(report) => {
                print_route_report(&report);
                0
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
        Command::Usage(args) => match run_usage(&args) {
            Ok((start, end, report)) => {
                print_usage_report(&start.to_string(), &end.to_string(), &report);
                0
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                1
            }
        },
        Command::Fields(args) => {
            print_fields(&run_fields(&args));
            0
        }
    };
    std::process::exit(exit_code);
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
