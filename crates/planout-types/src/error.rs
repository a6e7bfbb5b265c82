use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single compile-time error: the line it was detected on plus a message.
///
/// Lexer errors arrive through the token stream and keep the line the lexer
/// recorded; parser errors use the line of the offending token.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{line}: {message}")]
pub struct CompileError {
    /// 1-based source line.
    pub line: u32,
    /// Human-readable error message.
    pub message: String,
}

impl CompileError {
    /// Create a new error.
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// All errors collected during a compilation run.
///
/// The compiler returns no ops tree when this is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileErrors {
    pub errors: Vec<CompileError>,
}

impl CompileErrors {
    /// Create an empty collection.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` if any error was recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Record an error.
    pub fn push(&mut self, error: CompileError) {
        self.errors.push(error);
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for err in &self.errors {
            writeln!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileErrors {}
