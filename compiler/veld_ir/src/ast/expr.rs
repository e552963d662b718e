//! Expression nodes.
//!
//! Flat AST: every edge is an [`ExprId`] into the parse's `ExprArena`.
//! Operator applications record both the surface symbol and the resolved
//! [`BindingId`], so downstream stages never re-run binding resolution.

use std::fmt;

use crate::{BindingId, ExprId, Name, Span, TypeId};

/// Expression node.
///
/// `ty` is the static operand type the parser threads through the climb:
/// atoms carry their own type, operator applications take the type of their
/// left (or only) operand.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeId,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: TypeId, span: Span) -> Self {
        Expr { kind, ty, span }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} : {:?} @ {:?}", self.kind, self.ty, self.span)
    }
}

/// Expression variants.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ExprKind {
    /// Literal or identifier atom.
    Atom { name: Name },
    /// Prefix operator application.
    Prefix {
        op: Name,
        binding: BindingId,
        operand: ExprId,
    },
    /// Infix operator application.
    Infix {
        op: Name,
        binding: BindingId,
        left: ExprId,
        right: ExprId,
    },
    /// Assignment-form operator application.
    Assign {
        op: Name,
        binding: BindingId,
        target: ExprId,
        value: ExprId,
    },
}
