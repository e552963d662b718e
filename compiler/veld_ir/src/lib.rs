//! Veld IR - shared representation types.
//!
//! This crate contains the data structures every other stage works on:
//! - Spans for source locations
//! - `Name` for interned identifiers, plus the `StringInterner`
//! - Tokens and `TokenList` as produced by an external lexer
//! - Declaration nodes collected by an external loader (precedence levels,
//!   capabilities, operand types)
//! - Expression nodes and the flat `ExprArena`
//!
//! # Design Philosophy
//!
//! - **Intern everything**: strings become `Name(u32)`, operand types become
//!   `TypeId(u32)`
//! - **Flatten everything**: no `Box<Expr>`; expressions live in an arena and
//!   reference each other through `ExprId(u32)`
//! - Resolved artifacts built from these types are immutable and shared
//!   read-only across concurrent parses, so everything here is `Send + Sync`
//!   once construction finishes.

mod arena;
pub mod ast;
mod expr_id;
mod ids;
mod interner;
mod name;
mod span;
mod token;

pub use arena::ExprArena;
pub use ast::{
    Assoc, CapabilityDecl, ConstraintKind, Expr, ExprKind, InvariantDecl, LevelConstraint,
    LevelDecl, MemberDecl, OpExpr, ParentRef, SpecializationDecl, TypeDecl,
};
pub use expr_id::ExprId;
pub use ids::{BindingId, BodyId, CapabilityId, LevelId, TypeId};
pub use interner::StringInterner;
pub use name::Name;
pub use span::Span;
pub use token::{Fixity, Token, TokenKind, TokenList, TokenTag};
