//! Constants shared across the workspace.

use std::time::Duration;

/// Column name preferred as the default date column after a load.
pub const DATE_COLUMN: &str = "Date";

/// Format of dates typed by the user and of chart axes.
pub const INPUT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Format of dates transmitted to the engine inside period records.
pub const WIRE_DATE_FORMAT: &str = "%d/%m/%Y";

/// How long a notification stays visible.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(4);

/// Confidence (percent) used when none is configured.
pub const DEFAULT_CONFIDENCE: f64 = 95.0;

/// Columns whose missing + zero fraction reaches this value are dropped at load.
pub const JUNK_COLUMN_THRESHOLD: f64 = 0.8;

/// Exit codes for the CLI.
pub mod exit_codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// Generic error.
    pub const ERROR_GENERIC: i32 = 1;
    /// A request exceeded the configured timeout.
    pub const ERROR_TIMEOUT: i32 = 2;
    /// Invalid configuration or a rejected local validation.
    pub const ERROR_CONFIG: i32 = 4;
    /// The engine failed to initialise.
    pub const ERROR_ENGINE_UNAVAILABLE: i32 = 5;
}
