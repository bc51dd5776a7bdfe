use std::fmt;

/// Severity of a message sent to a [`ReportSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Info,
    Error,
}

impl fmt::Display for ReportLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.write_str("INFO"),
            Self::Error => f.write_str("ERROR"),
        }
    }
}

/// Receives user-facing progress and error messages.
///
/// Reporting is observational; nothing a sink does changes how a message
/// is processed.
pub trait ReportSink {
    fn report(&mut self, level: ReportLevel, message: &str);
}

/// Forwards reports to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn report(&mut self, level: ReportLevel, message: &str) {
        match level {
            ReportLevel::Info => tracing::info!("{message}"),
            ReportLevel::Error => tracing::error!("{message}"),
        }
    }
}

/// Keeps every report in memory, in arrival order.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub reports: Vec<(ReportLevel, String)>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the messages reported at `level`.
    pub fn messages(&self, level: ReportLevel) -> impl Iterator<Item = &str> {
        self.reports
            .iter()
            .filter(move |(l, _)| *l == level)
            .map(|(_, message)| message.as_str())
    }
}

impl ReportSink for CollectingSink {
    fn report(&mut self, level: ReportLevel, message: &str) {
        self.reports.push((level, message.to_owned()));
    }
}
