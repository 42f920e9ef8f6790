use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use keno_engine::{ExportFormat, TriggerSettings, DEFAULT_ENDPOINT};
use log::LevelFilter;

use crate::logging::LogDestination;

/// Fetch the Keno draw archive and export it as JSON or CSV.
#[derive(Debug, Parser)]
#[command(name = "keno-archive", version)]
pub struct Cli {
    /// Job endpoint that streams the archive.
    #[arg(long, env = "KENO_ENDPOINT", default_value = DEFAULT_ENDPOINT, value_parser = parse_endpoint)]
    pub endpoint: String,

    /// Directory that receives the export files.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Export format; repeat for several. Defaults to all formats.
    #[arg(long = "format", value_enum)]
    pub formats: Vec<FormatArg>,

    /// Only print the results, write no files.
    #[arg(long, conflicts_with = "formats")]
    pub no_export: bool,

    /// Also write logs to ./keno.log.
    #[arg(long)]
    pub log_file: bool,

    /// Seconds to wait for the job to accept the request.
    #[arg(long, default_value_t = 30)]
    pub response_timeout: u64,

    /// Seconds of stream silence before the run is failed.
    #[arg(long, default_value_t = 60)]
    pub read_timeout: u64,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Json,
    Csv,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Csv => ExportFormat::Csv,
        }
    }
}

impl Cli {
    pub fn trigger_settings(&self) -> TriggerSettings {
        TriggerSettings {
            endpoint: self.endpoint.clone(),
            response_timeout: Duration::from_secs(self.response_timeout),
            read_timeout: Duration::from_secs(self.read_timeout),
            ..TriggerSettings::default()
        }
    }

    /// Requested formats in first-mention order, without repeats.
    pub fn export_formats(&self) -> Vec<ExportFormat> {
        if self.no_export {
            return Vec::new();
        }
        if self.formats.is_empty() {
            return ExportFormat::ALL.to_vec();
        }
        let mut formats: Vec<ExportFormat> = Vec::with_capacity(self.formats.len());
        for format in self.formats.iter().copied().map(ExportFormat::from) {
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        formats
    }

    pub fn log_destination(&self) -> LogDestination {
        if self.log_file {
            LogDestination::Both
        } else {
            LogDestination::Terminal
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn parse_endpoint(raw: &str) -> Result<String, String> {
    url::Url::parse(raw)
        .map(|_| raw.to_string())
        .map_err(|err| format!("invalid endpoint url: {err}"))
}
