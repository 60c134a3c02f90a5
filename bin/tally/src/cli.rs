use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Clone, Debug, Parser)]
#[command(about)]
pub struct Cli {
    /// Path to the configuration file.
    ///
    /// Files ending in `.json` are read as JSON, everything else as YAML. Settings can also be given as `TALLY_`
    /// environment variables, which take precedence over the file.
    #[arg(short = 'c', long = "config")]
    pub config_file: Option<PathBuf>,

    /// Path to a JSON file holding an array of resource metrics, or `-` to read from standard input.
    ///
    /// May be given more than once. Files are serialized in order and share delta state, so cumulative sums are
    /// converted to deltas across files.
    #[arg(short = 'i', long = "input", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output format, overriding the configured one.
    #[arg(short = 'f', long = "format")]
    pub format: Option<Format>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Format {
    /// Compact JSON, one document per line.
    Json,

    /// Line protocol.
    Line,
}

impl Format {
    /// Returns the value of the `format` setting that selects this format.
    pub fn config_value(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Line => "line",
        }
    }
}
