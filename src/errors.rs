//! Error sink shared by the checker and the code generator: accumulated
//! diagnostics, fatal errors and an indented debug trace.

use std::error::Error;
use std::fmt::Display;

use colored::Colorize;
use log::debug;
use serde::Serialize;

use crate::ast::Location;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub location: Location,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error at {}: {}", self.location, self.message)
    }
}

/// A broken invariant between checker and generator. Unlike ordinary
/// diagnostics this aborts compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalError {
    pub message: String,
    pub location: Location,
}

impl Display for FatalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fatal error at {}: {}", self.location, self.message)
    }
}

impl Error for FatalError {}

/// The checker reports and keeps going; the generator reports fatally and
/// propagates. The sink is the single place both talk to.
#[derive(Debug, Default)]
pub struct ErrorSink {
    diagnostics: Vec<Diagnostic>,
    debug_indent: usize,
}

impl ErrorSink {
    pub fn new() -> ErrorSink {
        ErrorSink::default()
    }

    pub fn error(&mut self, message: impl Into<String>, location: Location) {
        self.diagnostics.push(Diagnostic {
            message: message.into(),
            location,
        });
    }

    /// Record an irrecoverable error and hand it back for propagation.
    pub fn fatal(&mut self, message: impl Into<String>, location: Location) -> FatalError {
        let fatal = FatalError {
            message: message.into(),
            location,
        };
        self.diagnostics.push(Diagnostic {
            message: format!("fatal: {}", fatal.message),
            location,
        });
        fatal
    }

    pub fn had_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// All diagnostics rendered in source order.
    pub fn report(&self) -> String {
        let mut diagnostics = self.diagnostics.clone();
        diagnostics.sort_by_key(|diagnostic| diagnostic.location);
        diagnostics
            .iter()
            .map(|diagnostic| {
                format!(
                    "{}: {} at {}",
                    "error".red(),
                    diagnostic.message,
                    diagnostic.location
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn debug_message(&self, message: impl Display) {
        debug!("{:indent$}{message}", "", indent = self.debug_indent * 2);
    }

    pub fn inc_debug(&mut self) {
        self.debug_indent += 1;
    }

    pub fn dec_debug(&mut self) {
        self.debug_indent = self.debug_indent.saturating_sub(1);
    }
}
