// src/compiler/mod.rs

//! Contract for source-to-artifact translation backends.
//!
//! No backend ships with this crate. A backend reads sources through a
//! [`ResourceReader`], writes artifacts into a [`ResourceStore`], and reports
//! problems instead of failing.

use std::fmt;

use crate::store::{ResourceReader, ResourceStore};

/// One diagnostic produced while compiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationProblem {
    /// Source resource name the problem refers to.
    pub file: String,
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub is_error: bool,
}

impl CompilationProblem {
    pub fn error(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            message: message.into(),
            line: None,
            column: None,
            is_error: true,
        }
    }

    pub fn warning(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            is_error: false,
            ..Self::error(file, message)
        }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for CompilationProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_error { "error" } else { "warning" };
        match (self.line, self.column) {
            (Some(line), Some(column)) => {
                write!(f, "{}:{}:{}: {}: {}", self.file, line, column, kind, self.message)
            }
            (Some(line), None) => write!(f, "{}:{}: {}: {}", self.file, line, kind, self.message),
            _ => write!(f, "{}: {}: {}", self.file, kind, self.message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilationResult {
    pub errors: Vec<CompilationProblem>,
    pub warnings: Vec<CompilationProblem>,
}

impl CompilationResult {
    /// Split a flat problem list by severity.
    pub fn from_problems(problems: impl IntoIterator<Item = CompilationProblem>) -> Self {
        let (errors, warnings) = problems.into_iter().partition(|p| p.is_error);
        Self { errors, warnings }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A source-to-artifact translation backend.
pub trait Compiler: Send + Sync {
    /// Compile `names` (source resource names, in order) read from `reader`,
    /// writing artifacts into `store`.
    fn compile(
        &self,
        names: &[String],
        reader: &dyn ResourceReader,
        store: &dyn ResourceStore,
    ) -> CompilationResult;
}
