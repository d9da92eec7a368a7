//! Run log: the warning sink shared by every analysis command.
//!
//! Commands never abort a batch because of one bad region, shape or row.
//! Instead they record a [`LogEntry`] here and continue. Every warning is
//! also forwarded to the `log` facade, so a binary that installs a logger
//! sees them as they happen. Recording never influences computed results.

use serde::Serialize;
use std::fmt;

/// The accumulated log of one invocation.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunLog {
    /// All entries, in the order they were recorded.
    pub entries: Vec<LogEntry>,
}

impl RunLog {
    /// Creates a new empty log.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds an entry to the log.
    pub fn add(&mut self, entry: LogEntry) {
        match entry.severity {
            Severity::Warning => log::warn!("{entry}"),
            Severity::Info => log::info!("{entry}"),
        }
        self.entries.push(entry);
    }

    /// Records a warning.
    pub fn warn(&mut self, code: LogCode, message: impl Into<String>, context: LogContext) {
        self.add(LogEntry::warning(code, message, context));
    }

    /// Records an informational note.
    pub fn info(&mut self, code: LogCode, message: impl Into<String>, context: LogContext) {
        self.add(LogEntry::info(code, message, context));
    }

    /// Returns the number of warnings in the log.
    pub fn warning_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.severity == Severity::Warning)
            .count()
    }

    /// Returns the number of entries carrying the given code.
    pub fn count_code(&self, code: LogCode) -> usize {
        self.entries.iter().filter(|e| e.code == code).count()
    }

    /// Returns true if nothing was recorded.
    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends every entry of `other`, keeping order.
    pub fn extend(&mut self, other: RunLog) {
        self.entries.extend(other.entries);
    }
}

impl fmt::Display for RunLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return writeln!(f, "Run completed: no warnings");
        }

        writeln!(
            f,
            "Run completed with {} warning(s) and {} note(s):",
            self.warning_count(),
            self.entries.len() - self.warning_count()
        )?;
        writeln!(f)?;

        for entry in &self.entries {
            writeln!(f, "  {}", entry)?;
        }

        Ok(())
    }
}

/// A single log line.
#[derive(Clone, Debug, Serialize)]
pub struct LogEntry {
    /// The severity of the entry.
    pub severity: Severity,

    /// A stable code for the kind of event.
    pub code: LogCode,

    /// A human-readable description.
    pub message: String,

    /// Where the event occurred.
    pub context: LogContext,
}

impl LogEntry {
    /// Creates a new entry.
    pub fn new(
        severity: Severity,
        code: LogCode,
        message: impl Into<String>,
        context: LogContext,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            context,
        }
    }

    /// Creates a new warning.
    pub fn warning(code: LogCode, message: impl Into<String>, context: LogContext) -> Self {
        Self::new(Severity::Warning, code, message, context)
    }

    /// Creates a new informational entry.
    pub fn info(code: LogCode, message: impl Into<String>, context: LogContext) -> Self {
        Self::new(Severity::Info, code, message, context)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

/// The severity of a log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Severity {
    /// Progress or policy notes.
    Info,
    /// Something was skipped; results are partial.
    Warning,
}

/// A stable code identifying the kind of log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum LogCode {
    // Data availability
    /// A file referenced by a table cell could not be found or read.
    DataUnavailable,
    /// A row was skipped.
    RowSkipped,

    // Malformed data
    /// An SVG node could not be converted and was skipped.
    SvgNodeSkipped,
    /// A region could not be processed and was skipped.
    RegionSkipped,
    /// A region kind has no length definition.
    UnsupportedLength,
    /// A region has a different dimensionality than its partner.
    DimensionMismatch,

    // Progress
    /// A row finished.
    RowCompleted,
    /// Blobs were discarded by the size window.
    BlobsDiscarded,
    /// An automatic threshold was computed.
    ThresholdChosen,
}

/// Context about where a log entry originated.
#[derive(Clone, Debug, Serialize)]
pub enum LogContext {
    /// The run as a whole.
    Run,
    /// A table row.
    Row { row: usize },
    /// A region, by position in its set.
    Region { index: usize },
    /// A region paired with a partner (bin, mask, second set).
    RegionPair { index: usize, partner: usize },
    /// An SVG element, by tag name and document position.
    Node { tag: String, position: usize },
    /// An image channel.
    Channel { channel: usize },
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogContext::Run => write!(f, "run"),
            LogContext::Row { row } => write!(f, "row {}", row),
            LogContext::Region { index } => write!(f, "region {}", index),
            LogContext::RegionPair { index, partner } => {
                write!(f, "region {} / partner {}", index, partner)
            }
            LogContext::Node { tag, position } => write!(f, "<{}> #{}", tag, position),
            LogContext::Channel { channel } => write!(f, "channel {}", channel),
        }
    }
}
