//! Operator capability registry and binding resolution engine.
//!
//! A capability is a named, composable bundle of operator members, default
//! bodies, specializations, and invariants, attachable to concrete operand
//! types. Capabilities inherit from any number of parents; the registry
//! flattens the inheritance DAG once, at declare time, into a member table
//! carrying provenance per operator symbol. Diamonds whose defaults the
//! child does not reconcile are declaration errors, not runtime surprises.
//!
//! [`CapabilityRegistry::finish`] turns the registered capabilities plus the
//! operand type declarations into an immutable [`CapabilityIndex`]: every
//! `(type, symbol)` pair the declarations define gets a precomputed
//! [`Binding`], and [`CapabilityIndex::lookup_binding`] is a pure read the
//! expression parser performs once per operator token.

mod error;
mod index;
mod registry;

#[cfg(test)]
mod tests;

pub use error::{BindingError, CapabilityError};
pub use index::{Binding, BindingSource, CapabilityIndex};
pub use registry::{CapabilityData, CapabilityRegistry, DefaultState, Invariant, MemberEntry};

use veld_ir::{CapabilityDecl, StringInterner, TypeDecl};
use veld_prec::ResolvedOrder;

/// The capability and type declarations of one compilation unit set.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct CapabilityDecls {
    pub capabilities: Vec<CapabilityDecl>,
    pub types: Vec<TypeDecl>,
}

/// Resolve a batch of capability and type declarations.
///
/// Returns the flattened capabilities with their binding tables alongside an
/// exhaustive error list. A capability with errors is skipped; declarations
/// referencing it report their own `UnknownReference` rather than cascading.
/// A batch with a non-empty error list is failed - the index is returned for
/// inspection, not for parsing.
pub fn resolve_capabilities(
    decls: &CapabilityDecls,
    order: &ResolvedOrder,
    interner: &StringInterner,
) -> (CapabilityIndex, Vec<CapabilityError>) {
    let mut registry = CapabilityRegistry::new(interner, order);
    let mut errors = Vec::new();
    for decl in &decls.capabilities {
        if let Err(errs) = registry.declare_capability(decl) {
            errors.extend(errs);
        }
    }
    let (index, type_errors) = registry.finish(&decls.types);
    errors.extend(type_errors);
    (index, errors)
}
