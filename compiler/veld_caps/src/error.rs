//! Capability declaration and binding query errors.

use std::fmt;

use smallvec::SmallVec;
use veld_diagnostic::{Diagnostic, ErrorCode};
use veld_ir::{CapabilityId, Name, Span, TypeId};

/// A capability declaration error.
///
/// Declaration errors are cold-path data that outlives the registry, so
/// names are stored as owned strings.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum CapabilityError {
    /// A capability name was declared twice.
    DuplicateCapability {
        name: String,
        span: Span,
        first_span: Span,
    },
    /// An operand type name was declared twice.
    DuplicateType {
        name: String,
        span: Span,
        first_span: Span,
    },
    /// A declaration references an unknown capability, level, operator, or
    /// operation.
    UnknownReference { name: String, span: Span },
    /// A capability claims a sentinel level as its owning level.
    SentinelLevel {
        capability: String,
        level: String,
        span: Span,
    },
    /// An operator symbol was added twice to the same capability.
    DuplicateMember {
        capability: String,
        symbol: String,
        span: Span,
    },
    /// An operator symbol was specialized twice in the same capability.
    ///
    /// Hard error, never "last wins": the registry refuses to guess which
    /// body was intended.
    DuplicateSpecialization {
        capability: String,
        symbol: String,
        span: Span,
    },
    /// Unreconciled default bodies inherited from multiple parents.
    ///
    /// The child is required to resolve the conflict explicitly with its own
    /// specialization or member.
    DiamondConflict {
        capability: String,
        symbol: String,
        origins: Vec<String>,
        span: Span,
    },
}

impl CapabilityError {
    /// The error code this variant reports under.
    pub fn code(&self) -> ErrorCode {
        match self {
            CapabilityError::DuplicateCapability { .. } => ErrorCode::E1005,
            CapabilityError::DuplicateType { .. } => ErrorCode::E1007,
            CapabilityError::UnknownReference { .. } => ErrorCode::E1004,
            CapabilityError::SentinelLevel { .. } => ErrorCode::E0003,
            CapabilityError::DuplicateMember { .. } => ErrorCode::E1001,
            CapabilityError::DuplicateSpecialization { .. } => ErrorCode::E1002,
            CapabilityError::DiamondConflict { .. } => ErrorCode::E1003,
        }
    }

    /// Convert to a full diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            CapabilityError::DuplicateCapability {
                name,
                span,
                first_span,
            } => Diagnostic::error(self.code())
                .with_message(format!("duplicate capability `{name}`"))
                .with_label(*span, "redeclared here")
                .with_label(*first_span, "first declared here"),
            CapabilityError::DuplicateType {
                name,
                span,
                first_span,
            } => Diagnostic::error(self.code())
                .with_message(format!("duplicate operand type `{name}`"))
                .with_label(*span, "redeclared here")
                .with_label(*first_span, "first declared here"),
            CapabilityError::UnknownReference { name, span } => Diagnostic::error(self.code())
                .with_message(format!("reference to undeclared name `{name}`"))
                .with_label(*span, "unknown name"),
            CapabilityError::SentinelLevel {
                capability,
                level,
                span,
            } => Diagnostic::error(self.code())
                .with_message(format!(
                    "capability `{capability}` cannot own the sentinel level `{level}`"
                ))
                .with_label(*span, "reserved level"),
            CapabilityError::DuplicateMember {
                capability,
                symbol,
                span,
            } => Diagnostic::error(self.code())
                .with_message(format!(
                    "operator `{symbol}` is already a member of capability `{capability}`"
                ))
                .with_label(*span, "added twice"),
            CapabilityError::DuplicateSpecialization {
                capability,
                symbol,
                span,
            } => Diagnostic::error(self.code())
                .with_message(format!(
                    "operator `{symbol}` is specialized twice in capability `{capability}`"
                ))
                .with_label(*span, "second specialization"),
            CapabilityError::DiamondConflict {
                capability,
                symbol,
                origins,
                span,
            } => Diagnostic::error(self.code())
                .with_message(format!(
                    "capability `{capability}` inherits conflicting defaults for `{symbol}` \
                     from {}; resolve the conflict with a local specialization",
                    origins
                        .iter()
                        .map(|o| format!("`{o}`"))
                        .collect::<Vec<_>>()
                        .join(" and ")
                ))
                .with_label(*span, "conflicting inheritance"),
        }
    }
}

impl fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityError::DuplicateCapability { name, .. } => {
                write!(f, "duplicate capability `{name}`")
            }
            CapabilityError::DuplicateType { name, .. } => {
                write!(f, "duplicate operand type `{name}`")
            }
            CapabilityError::UnknownReference { name, .. } => {
                write!(f, "reference to undeclared name `{name}`")
            }
            CapabilityError::SentinelLevel {
                capability, level, ..
            } => {
                write!(
                    f,
                    "capability `{capability}` cannot own the sentinel level `{level}`"
                )
            }
            CapabilityError::DuplicateMember {
                capability, symbol, ..
            } => {
                write!(
                    f,
                    "operator `{symbol}` is already a member of capability `{capability}`"
                )
            }
            CapabilityError::DuplicateSpecialization {
                capability, symbol, ..
            } => {
                write!(
                    f,
                    "operator `{symbol}` is specialized twice in capability `{capability}`"
                )
            }
            CapabilityError::DiamondConflict {
                capability, symbol, ..
            } => {
                write!(
                    f,
                    "capability `{capability}` inherits conflicting defaults for `{symbol}`"
                )
            }
        }
    }
}

impl std::error::Error for CapabilityError {}

/// A binding query error.
///
/// Query errors sit on the parser's hot path and stay `Name`/ID based; the
/// parser formats them against the interner when building its own
/// diagnostics.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum BindingError {
    /// No capability in the operand type's set defines the symbol.
    UnknownOperator { symbol: Name, ty: TypeId },
    /// Multiple unrelated, un-overridden definitions of the symbol exist
    /// across the operand type's capability set.
    DiamondConflict {
        symbol: Name,
        origins: SmallVec<[CapabilityId; 2]>,
    },
}
