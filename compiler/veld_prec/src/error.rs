//! Precedence declaration errors.

use std::fmt;

use veld_diagnostic::{Diagnostic, ErrorCode};
use veld_ir::Span;

/// A precedence declaration or resolution error.
///
/// Level names are stored as owned strings: these errors are cold-path data
/// that outlives the registry which produced them.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum PrecedenceError {
    /// A level name was declared twice (sentinel names included).
    DuplicateLevel {
        name: String,
        span: Span,
        first_span: Span,
    },
    /// A constraint targets a level that has not been declared.
    UnknownReference { name: String, span: Span },
    /// A constraint tries to place a level above `Highest` or below
    /// `Lowest`.
    SentinelViolation {
        level: String,
        sentinel: String,
        span: Span,
    },
    /// The declared constraints form a cycle. The cycle is reported in walk
    /// order; first and last entries name the same level.
    CycleDetected { cycle: Vec<String>, span: Span },
}

impl PrecedenceError {
    /// The error code this variant reports under.
    pub fn code(&self) -> ErrorCode {
        match self {
            PrecedenceError::DuplicateLevel { .. } => ErrorCode::E0001,
            PrecedenceError::UnknownReference { .. } => ErrorCode::E0002,
            PrecedenceError::SentinelViolation { .. } => ErrorCode::E0003,
            PrecedenceError::CycleDetected { .. } => ErrorCode::E0004,
        }
    }

    /// Convert to a full diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            PrecedenceError::DuplicateLevel {
                name,
                span,
                first_span,
            } => Diagnostic::error(self.code())
                .with_message(format!("duplicate precedence level `{name}`"))
                .with_label(*span, "redeclared here")
                .with_label(*first_span, "first declared here"),
            PrecedenceError::UnknownReference { name, span } => Diagnostic::error(self.code())
                .with_message(format!(
                    "constraint references undeclared precedence level `{name}`"
                ))
                .with_label(*span, "unknown level"),
            PrecedenceError::SentinelViolation {
                level,
                sentinel,
                span,
            } => Diagnostic::error(self.code())
                .with_message(format!(
                    "level `{level}` cannot be placed beyond the `{sentinel}` bound"
                ))
                .with_label(*span, "invalid constraint"),
            PrecedenceError::CycleDetected { cycle, span } => Diagnostic::error(self.code())
                .with_message(format!(
                    "precedence constraints form a cycle: {}",
                    cycle.join(" -> ")
                ))
                .with_label(*span, "part of the cycle"),
        }
    }
}

impl fmt::Display for PrecedenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrecedenceError::DuplicateLevel { name, .. } => {
                write!(f, "duplicate precedence level `{name}`")
            }
            PrecedenceError::UnknownReference { name, .. } => {
                write!(f, "constraint references undeclared precedence level `{name}`")
            }
            PrecedenceError::SentinelViolation {
                level, sentinel, ..
            } => {
                write!(
                    f,
                    "level `{level}` cannot be placed beyond the `{sentinel}` bound"
                )
            }
            PrecedenceError::CycleDetected { cycle, .. } => {
                write!(
                    f,
                    "precedence constraints form a cycle: {}",
                    cycle.join(" -> ")
                )
            }
        }
    }
}

impl std::error::Error for PrecedenceError {}
