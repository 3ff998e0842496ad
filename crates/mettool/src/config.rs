//! Application configuration from CLI flags and environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use mettool_core::AnalysisKind;
use mettool_orchestration::ControllerConfig;

/// Invalid configuration detected after argument parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid timeout \"{0}\" (expected e.g. 30s, 5m, 500ms or none)")]
    InvalidTimeout(String),
    #[error("no input file: pass --file or set METTOOL_FILE")]
    MissingFile,
}

/// Which analyses a batch run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AnalysisChoice {
    Correlation,
    Cusum,
    Control,
    All,
}

/// mettool: correlation, CUSUM and control charts for spreadsheet data.
#[derive(Parser, Debug)]
#[command(name = "mettool", version, about)]
#[allow(clippy::struct_excessive_bools)]
pub struct AppConfig {
    /// Spreadsheet to analyse (.xlsx, .xlsm, .xls or .ods).
    #[arg(short, long, env = "METTOOL_FILE")]
    pub file: Option<PathBuf>,

    /// Sheet to load; defaults to the first sheet of the workbook.
    #[arg(short, long, env = "METTOOL_SHEET")]
    pub sheet: Option<String>,

    /// Column holding the observation dates.
    #[arg(long, env = "METTOOL_DATE_COLUMN")]
    pub date_column: Option<String>,

    /// Value columns, comma separated.
    #[arg(short, long, value_delimiter = ',', env = "METTOOL_COLUMNS")]
    pub columns: Vec<String>,

    /// First day of the analysed window (YYYY-MM-DD).
    #[arg(long, env = "METTOOL_START")]
    pub start: Option<String>,

    /// Last day of the analysed window (YYYY-MM-DD).
    #[arg(long, env = "METTOOL_END")]
    pub end: Option<String>,

    /// Control chart period as START:END; repeat for several.
    #[arg(long = "period", value_name = "START:END", value_parser = parse_period)]
    pub periods: Vec<(String, String)>,

    /// Confidence level of the control limits, in percent.
    #[arg(long, default_value = "95", env = "METTOOL_CONFIDENCE")]
    pub confidence: String,

    /// Hide the control limits.
    #[arg(long)]
    pub no_limits: bool,

    /// Hide the period average.
    #[arg(long)]
    pub no_average: bool,

    /// Analyses to run in batch mode.
    #[arg(short, long, value_enum, default_value = "all", env = "METTOOL_ANALYSIS")]
    pub analysis: AnalysisChoice,

    /// Directory receiving exported workbooks; nothing is exported without it.
    #[arg(short, long, env = "METTOOL_EXPORT_DIR")]
    pub export_dir: Option<PathBuf>,

    /// Per-request timeout (e.g. "30s", "5m") or "none".
    #[arg(long, default_value = "none", env = "METTOOL_TIMEOUT")]
    pub timeout: String,

    /// Forget the periods whenever a new dataset is loaded.
    #[arg(long, env = "METTOOL_RESET_PERIODS_ON_LOAD")]
    pub reset_periods_on_load: bool,

    /// Launch the interactive TUI.
    #[arg(long)]
    pub tui: bool,

    /// Generate shell completion.
    #[arg(long, value_enum)]
    pub completion: Option<clap_complete::Shell>,

    /// Verbose output (debug logging).
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode: only errors are printed.
    #[arg(short, long)]
    pub quiet: bool,
}

impl AppConfig {
    /// Parse CLI arguments.
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// `None` when requests may take as long as they need.
    pub fn timeout_duration(&self) -> Result<Option<Duration>, ConfigError> {
        if self.timeout.trim().eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        parse_duration(&self.timeout)
            .map(Some)
            .ok_or_else(|| ConfigError::InvalidTimeout(self.timeout.clone()))
    }

    pub fn controller_config(&self) -> Result<ControllerConfig, ConfigError> {
        Ok(ControllerConfig {
            timeout: self.timeout_duration()?,
            reset_periods_on_load: self.reset_periods_on_load,
        })
    }

    /// Analyses selected by `--analysis`, in dashboard order.
    #[must_use]
    pub fn analyses(&self) -> Vec<AnalysisKind> {
        match self.analysis {
            AnalysisChoice::Correlation => vec![AnalysisKind::Correlation],
            AnalysisChoice::Cusum => vec![AnalysisKind::Cusum],
            AnalysisChoice::Control => vec![AnalysisKind::ControlChart],
            AnalysisChoice::All => AnalysisKind::ALL.to_vec(),
        }
    }
}

/// Parse a duration string like "5m", "1h", "30s", "250ms"; a bare number
/// is seconds.
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        Some(Duration::from_millis(ms.parse().ok()?))
    } else if let Some(mins) = s.strip_suffix('m') {
        let n: u64 = mins.parse().ok()?;
        Some(Duration::from_secs(n.checked_mul(60)?))
    } else if let Some(hours) = s.strip_suffix('h') {
        let n: u64 = hours.parse().ok()?;
        Some(Duration::from_secs(n.checked_mul(3600)?))
    } else if let Some(secs) = s.strip_suffix('s') {
        Some(Duration::from_secs(secs.parse().ok()?))
    } else {
        Some(Duration::from_secs(s.parse().ok()?))
    }
}

/// `START:END` into its two halves; both must be present.
fn parse_period(s: &str) -> Result<(String, String), String> {
    match s.split_once(':') {
        Some((start, end)) if !start.trim().is_empty() && !end.trim().is_empty() => {
            Ok((start.trim().to_string(), end.trim().to_string()))
        }
        _ => Err(format!("expected START:END, got \"{s}\"")),
    }
}
