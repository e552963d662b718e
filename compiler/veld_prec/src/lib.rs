//! Precedence registry and partial-order resolver.
//!
//! A language front end declares named precedence levels related only
//! partially: "lower than X", "higher than Y", plus an associativity tag.
//! This crate stores those declarations, validates them exhaustively, and
//! resolves them into an immutable [`ResolvedOrder`] the expression parser
//! queries through [`ResolvedOrder::relation`].
//!
//! Two levels with no constraint path between them compare as
//! [`Relation::Undetermined`]. That is deliberate: unrelated precedence
//! families stay independently extensible, and the ambiguity only becomes an
//! error if a parse actually has to compare the two levels (lazy policy).

mod error;
mod order;
mod registry;


pub use error::PrecedenceError;
pub use order::{Relation, ResolvedLevel, ResolvedOrder};
pub use registry::{PrecedenceRegistry, HIGHEST, LOWEST};

use veld_ir::{LevelDecl, StringInterner};

/// Resolve a batch of level declarations.
///
/// Collects every declaration error before giving up; resolution runs only
/// on a clean batch. This is the whole-unit-set entry point an external
/// loader calls once per compilation.
pub fn resolve_precedence(
    decls: &[LevelDecl],
    interner: &StringInterner,
) -> Result<ResolvedOrder, Vec<PrecedenceError>> {
    let mut registry = PrecedenceRegistry::new(interner);
    let mut errors = Vec::new();
    for decl in decls {
        if let Err(errs) = registry.declare_level(decl) {
            errors.extend(errs);
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }
    registry.resolve().map_err(|e| vec![e])
}
