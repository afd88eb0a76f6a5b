//! # Error Types
//!
//! This module defines all error and diagnostic types for the Cadence
//! interpreter.
//!
//! Unlike a one-shot compiler, the evaluator favors local degradation over
//! abort: most problems downgrade a note-stream element to a rest or clamp
//! a value and keep going, recording a [`Diagnostic`] instead of failing
//! the whole program. Only [`CadenceError`] variants that are genuinely
//! fatal (unparseable source, unresolved names, ambiguous overloads) stop
//! evaluation of the *current* statement; the next top-level statement
//! still runs so more diagnostics can be collected.

use std::fmt;
use thiserror::Error;

/// A location in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// All ways a Cadence program can fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CadenceError {
    /// Unterminated string, unknown character sequence.
    #[error("{location}: lex error: {message}")]
    Lex { location: Location, message: String },

    /// Unexpected token, missing delimiter.
    #[error("{location}: parse error: {message}")]
    Parse { location: Location, message: String },

    /// Assignment, function argument, or operation not defined for the
    /// given types.
    #[error("{location}: type mismatch: {message}")]
    TypeMismatch { location: Location, message: String },

    /// Undefined identifier or undefined section reference.
    #[error("{location}: unresolved name '{name}'")]
    NameResolution { location: Location, name: String },

    /// Multiple overload candidates tie on specificity.
    #[error("{location}: ambiguous overload for '{name}'")]
    OverloadAmbiguity { location: Location, name: String },

    /// Pitch out of range, invalid time signature, swing out of [0,1],
    /// tempo <= 0, filter cutoff >= Nyquist, compressor ratio < 1, delay
    /// feedback > 1, bar duration overflow/underflow, etc.
    #[error("{location}: out of range: {message}")]
    Range { location: Location, message: String },

    /// Divide by zero, index out of range, invalid note parse.
    #[error("{location}: runtime error: {message}")]
    Runtime { location: Location, message: String },
}

impl CadenceError {
    pub fn location(&self) -> Location {
        match self {
            CadenceError::Lex { location, .. }
            | CadenceError::Parse { location, .. }
            | CadenceError::TypeMismatch { location, .. }
            | CadenceError::NameResolution { location, .. }
            | CadenceError::OverloadAmbiguity { location, .. }
            | CadenceError::Range { location, .. }
            | CadenceError::Runtime { location, .. } => *location,
        }
    }
}

/// Severity of a recorded diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// One reported problem, rendered as `file:line:column: level: message`.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub file: String,
    pub location: Location,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.file, self.location.line, self.location.column, self.severity, self.message
        )
    }
}

/// Accumulates diagnostics across a whole evaluation run.
///
/// The evaluator pushes a diagnostic instead of aborting whenever local
/// degradation is allowed (invalid note -> rest, clamped transpose, unknown
/// stream variable -> rest). [`Diagnostics::has_errors`] drives the process
/// exit code (non-zero iff at least one `Error`-severity entry was
/// recorded).
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    file: String,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            entries: Vec::new(),
        }
    }

    pub fn warn(&mut self, location: Location, message: impl Into<String>) {
        self.push(Severity::Warning, location, message);
    }

    pub fn error(&mut self, location: Location, message: impl Into<String>) {
        self.push(Severity::Error, location, message);
    }

    pub fn info(&mut self, location: Location, message: impl Into<String>) {
        self.push(Severity::Info, location, message);
    }

    pub fn push(&mut self, severity: Severity, location: Location, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Error => log::error!("{}:{location}: {message}", self.file),
            Severity::Warning => log::warn!("{}:{location}: {message}", self.file),
            Severity::Info => log::info!("{}:{location}: {message}", self.file),
        }
        self.entries.push(Diagnostic {
            file: self.file.clone(),
            location,
            severity,
            message,
        });
    }

    pub fn record_error(&mut self, err: &CadenceError) {
        self.error(err.location(), err.to_string());
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub type CadenceResult<T> = Result<T, CadenceError>;
