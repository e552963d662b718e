//! Declaration and expression nodes.
//!
//! Declarations are collected from source units by an external loader and
//! handed to the resolvers as plain data. Nothing here is validated: names
//! may be unknown, constraints may form cycles, parents may conflict. The
//! registries in `veld_prec` and `veld_caps` own all of that checking and
//! report every violation with the spans stored on these nodes.

mod expr;

pub use expr::{Expr, ExprKind};

use crate::{Fixity, Name, Span};

/// Associativity of a precedence level.
///
/// Applies to every operator owned by the level; chains mixing levels never
/// consult associativity, only the resolved order.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Assoc {
    /// Same-level chains fold left: `a - b - c` is `(a - b) - c`.
    Left,
    /// Same-level chains fold right: `a = b = c` is `a = (b = c)`.
    Right,
    /// Same-level chaining is an error: `a < b < c` is rejected.
    None,
}

impl std::fmt::Display for Assoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Assoc::Left => write!(f, "left"),
            Assoc::Right => write!(f, "right"),
            Assoc::None => write!(f, "none"),
        }
    }
}

/// Direction of a raw ordering constraint.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ConstraintKind {
    /// The declared level binds looser than the target.
    LowerThan,
    /// The declared level binds tighter than the target.
    HigherThan,
}

/// One raw ordering constraint on a declared level.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct LevelConstraint {
    pub kind: ConstraintKind,
    /// Previously declared level or sentinel this constraint targets.
    pub target: Name,
    pub span: Span,
}

/// A declared precedence level.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct LevelDecl {
    pub name: Name,
    pub assoc: Assoc,
    pub constraints: Vec<LevelConstraint>,
    pub span: Span,
}

/// A declared operator capability.
///
/// A capability bundles operator members, default bodies, specializations,
/// and invariants, and is attached to concrete operand types by
/// [`TypeDecl`]s. Parents must be declared before their children; the
/// loader's declaration order is the registry's processing order.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct CapabilityDecl {
    pub name: Name,
    /// Owning precedence level for every member of this capability.
    pub level: Name,
    pub level_span: Span,
    pub parents: Vec<ParentRef>,
    pub members: Vec<MemberDecl>,
    pub specializations: Vec<SpecializationDecl>,
    pub invariants: Vec<InvariantDecl>,
    pub span: Span,
}

/// Reference to a parent capability.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ParentRef {
    pub name: Name,
    pub span: Span,
}

/// An operator member of a capability.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct MemberDecl {
    /// Operator symbol as it appears in source, e.g. `<=`.
    pub symbol: Name,
    pub fixity: Fixity,
    /// Operation name the symbol binds to, e.g. `less_equal`.
    pub binding: Name,
    /// Optional default body referencing sibling operations.
    pub default_body: Option<OpExpr>,
    pub span: Span,
}

/// A capability-local override of an inherited default.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct SpecializationDecl {
    pub symbol: Name,
    pub body: OpExpr,
    pub span: Span,
}

/// A boolean contract over `self`/`other` values of an implementing type.
///
/// Never proven statically; carried through flattening and surfaced as an
/// advisory diagnostic plus data for downstream property-test generation.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct InvariantDecl {
    pub body: OpExpr,
    pub span: Span,
}

/// A concrete operand type and the capabilities it implements.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypeDecl {
    pub name: Name,
    pub capabilities: Vec<ParentRef>,
    pub span: Span,
}

/// Body mini-AST for default bodies, specializations, and invariants.
///
/// Bodies reference sibling operations by *binding name* and are bound
/// against the final flattened member table of the capability, so a body may
/// refer to an operation declared later in the same capability. They are
/// data, never textually inlined.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum OpExpr {
    /// The receiving value.
    SelfArg { span: Span },
    /// The second operand.
    OtherArg { span: Span },
    /// Application of a sibling operation: `less(other, self)`.
    Apply {
        op: Name,
        args: Vec<OpExpr>,
        span: Span,
    },
    /// Boolean negation.
    Not { inner: Box<OpExpr>, span: Span },
    /// Boolean conjunction.
    And {
        left: Box<OpExpr>,
        right: Box<OpExpr>,
        span: Span,
    },
    /// Boolean disjunction.
    Or {
        left: Box<OpExpr>,
        right: Box<OpExpr>,
        span: Span,
    },
}

impl OpExpr {
    /// Span of this body expression.
    pub fn span(&self) -> Span {
        match self {
            OpExpr::SelfArg { span }
            | OpExpr::OtherArg { span }
            | OpExpr::Apply { span, .. }
            | OpExpr::Not { span, .. }
            | OpExpr::And { span, .. }
            | OpExpr::Or { span, .. } => *span,
        }
    }

    /// Visit every operation referenced by this body.
    pub fn for_each_op(&self, f: &mut impl FnMut(Name, Span)) {
        match self {
            OpExpr::SelfArg { .. } | OpExpr::OtherArg { .. } => {}
            OpExpr::Apply { op, args, span } => {
                f(*op, *span);
                for arg in args {
                    arg.for_each_op(f);
                }
            }
            OpExpr::Not { inner, .. } => inner.for_each_op(f),
            OpExpr::And { left, right, .. } | OpExpr::Or { left, right, .. } => {
                left.for_each_op(f);
                right.for_each_op(f);
            }
        }
    }
}
