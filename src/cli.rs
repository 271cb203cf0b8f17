//! CLI argument parsing for Covscope

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for module verdicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "covscope")]
#[command(version)]
#[command(
    about = "Discover the modules an entry module pulls in and decide which are in coverage scope",
    long_about = None
)]
pub struct Cli {
    /// TOML configuration file with filter and discovery settings
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Coverage rule (e.g., -f '+[lib*]*' -f '-[libtest*]*')
    #[arg(
        short = 'f',
        long = "filter",
        value_name = "RULE",
        allow_hyphen_values = true
    )]
    pub filters: Vec<String>,

    /// Exclude modules whose file name matches PATTERN
    #[arg(long = "exclude-by-file", value_name = "PATTERN")]
    pub exclude_by_file: Vec<String>,

    /// Exclude code carrying an attribute matching PATTERN
    #[arg(long = "exclude-by-attribute", value_name = "PATTERN")]
    pub exclude_by_attribute: Vec<String>,

    /// Do not add the built-in platform runtime exclusions
    #[arg(long = "no-default-filters")]
    pub no_default_filters: bool,

    /// Maximum concurrent module reads (default: available parallelism - 1)
    #[arg(
        short = 'j',
        long = "max-concurrency",
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_concurrency: Option<u32>,

    /// Extra directory searched for referenced modules
    #[arg(short = 'L', long = "search-path", value_name = "DIR")]
    pub search_paths: Vec<PathBuf>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,

    /// Entry module to start discovery from
    #[arg(value_name = "SEED")]
    pub seed: PathBuf,
}
