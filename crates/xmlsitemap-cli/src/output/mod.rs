//! # Output Formatting
//!
//! Commands print either human-readable text or a single JSON document,
//! selected with `--format`. Logs always go to stderr so stdout stays
//! parseable.

use anyhow::Result;
use serde::Serialize;

/// Output format for CLI results.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted text (default)
    #[default]
    Text,
    /// JSON for machine consumption
    Json,
}

impl OutputFormat {
    /// Check if this format is machine-readable.
    pub const fn is_machine_readable(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render a unix timestamp for text output.
pub fn format_timestamp(timestamp: i64) -> String {
    if timestamp <= 0 {
        return "never".to_string();
    }
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map_or_else(|| timestamp.to_string(), |dt| dt.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "never");
        assert_eq!(format_timestamp(86_400), "1970-01-02T00:00:00+00:00");
    }

    #[test]
    fn test_machine_readable() {
        assert!(OutputFormat::Json.is_machine_readable());
        assert!(!OutputFormat::Text.is_machine_readable());
    }
}
