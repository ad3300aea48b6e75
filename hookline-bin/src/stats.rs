use std::fmt::{self, Display};

use hookline_lib::ErrorKind;
use serde::Serialize;

use crate::options::StatsFormat;

// Maximum padding for each entry in the final statistics output
const MAX_PADDING: usize = 20;

/// A message which could not be delivered
#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct Failure {
    /// Position of the message, starting at 1
    index: usize,
    message: String,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
}

impl Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} | {}", self.index, self.message, self.error)
    }
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct DeliveryStats {
    total: usize,
    delivered: usize,
    failed: usize,
    failures: Vec<Failure>,
}

impl DeliveryStats {
    #[inline]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of the message at position `index` (1-based)
    pub(crate) fn add(&mut self, index: usize, message: &str, result: Result<(), ErrorKind>) {
        self.total += 1;
        match result {
            Ok(()) => self.delivered += 1,
            Err(error) => {
                self.failed += 1;
                self.failures.push(Failure {
                    index,
                    message: message.to_string(),
                    status: error.status().map(|status| status.as_u16()),
                    error: error.to_string(),
                });
            }
        }
    }

    #[inline]
    pub(crate) const fn is_success(&self) -> bool {
        self.total == self.delivered
    }

    pub(crate) fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Render the report in the given format
    pub(crate) fn render(&self, format: &StatsFormat) -> anyhow::Result<String> {
        Ok(match format {
            StatsFormat::Compact => self.to_string(),
            StatsFormat::Json => serde_json::to_string_pretty(self)?,
        })
    }
}

fn write_stat(f: &mut fmt::Formatter, title: &str, stat: usize, newline: bool) -> fmt::Result {
    let fill = title.chars().count();
    write!(f, "{title}{stat:.>width$}", width = MAX_PADDING.saturating_sub(fill))?;
    if newline {
        f.write_str("\n")?;
    }
    Ok(())
}

impl Display for DeliveryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = "-".repeat(MAX_PADDING + 1);

        writeln!(f, "Summary")?;
        writeln!(f, "{separator}")?;
        write_stat(f, "Total", self.total, true)?;
        write_stat(f, "Delivered", self.delivered, true)?;
        write_stat(f, "Failed", self.failed, false)?;

        for failure in &self.failures {
            // Leading newlines avoid a trailing one after the last entry
            write!(f, "\n{failure}")?;
        }
        Ok(())
    }
}
