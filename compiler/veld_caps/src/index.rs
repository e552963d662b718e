//! The immutable capability index.
//!
//! [`CapabilityRegistry::finish`] consumes the registry together with the
//! operand type declarations and precomputes, for every registered type and
//! every operator symbol its capability set defines, the binding outcome.
//! [`CapabilityIndex::lookup_binding`] is then a pure table read: no locks,
//! no caches, identical inputs always return the identical binding.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::debug;
use veld_diagnostic::{Diagnostic, ErrorCode};
use veld_ir::{
    BindingId, BodyId, CapabilityId, Fixity, LevelId, Name, OpExpr, Span, TypeDecl, TypeId,
};

use crate::registry::{CapabilityData, CapabilityRegistry, DefaultState};
use crate::{BindingError, CapabilityError};

/// Where a resolved binding's implementation comes from.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BindingSource {
    /// A capability-local specialization body.
    Specialization(CapabilityId),
    /// An inherited (or locally declared) default body.
    Default(CapabilityId),
    /// No body in the capability graph; the implementing type supplies the
    /// operation.
    Required,
}

/// A resolved operator binding: the implementation reference the parser
/// records in the AST, with full provenance.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Binding {
    pub id: BindingId,
    pub symbol: Name,
    pub fixity: Fixity,
    /// Operation name the symbol binds to.
    pub operation: Name,
    /// Capability whose member table supplied the binding.
    pub capability: CapabilityId,
    /// Owning precedence level of that capability.
    pub level: LevelId,
    pub source: BindingSource,
    /// The default or specialization body, if the source carries one.
    pub body: Option<BodyId>,
}

/// Precomputed outcome for one `(type, symbol)` pair.
enum Outcome {
    Bound(BindingId),
    Ambiguous(SmallVec<[CapabilityId; 2]>),
}

/// A registered operand type.
struct TypeInfo {
    name: Name,
    span: Span,
    capabilities: SmallVec<[CapabilityId; 4]>,
}

/// Immutable flattened capabilities plus per-type binding tables.
///
/// Shared read-only across concurrent parses; nothing here mutates after
/// construction. Incremental re-declaration means building a fresh index and
/// swapping it in whole.
pub struct CapabilityIndex {
    caps: Vec<CapabilityData>,
    cap_by_name: FxHashMap<Name, CapabilityId>,
    bodies: Vec<OpExpr>,
    types: Vec<TypeInfo>,
    type_by_name: FxHashMap<Name, TypeId>,
    bindings: Vec<Binding>,
    table: FxHashMap<(TypeId, Name), Outcome>,
}

impl CapabilityIndex {
    /// Resolve a binding for an operator occurrence.
    ///
    /// `ty` is the static type of the left (or only) operand; its declared
    /// capability set is the search space. Pure and deterministic.
    pub fn lookup_binding(&self, ty: TypeId, symbol: Name) -> Result<&Binding, BindingError> {
        match self.table.get(&(ty, symbol)) {
            Some(Outcome::Bound(id)) => Ok(&self.bindings[id.index()]),
            Some(Outcome::Ambiguous(origins)) => Err(BindingError::DiamondConflict {
                symbol,
                origins: origins.clone(),
            }),
            None => Err(BindingError::UnknownOperator { symbol, ty }),
        }
    }

    /// Get a binding by ID.
    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id.index()]
    }

    /// Look up a capability by name.
    pub fn capability_id(&self, name: Name) -> Option<CapabilityId> {
        self.cap_by_name.get(&name).copied()
    }

    /// Get a flattened capability.
    pub fn capability(&self, id: CapabilityId) -> &CapabilityData {
        &self.caps[id.index()]
    }

    /// Name of a capability.
    pub fn capability_name(&self, id: CapabilityId) -> Name {
        self.caps[id.index()].name
    }

    /// Look up an operand type by name.
    pub fn type_id(&self, name: Name) -> Option<TypeId> {
        self.type_by_name.get(&name).copied()
    }

    /// Name of an operand type.
    pub fn type_name(&self, id: TypeId) -> Name {
        self.types[id.index()].name
    }

    /// Capability set of an operand type, in declaration order.
    pub fn type_capabilities(&self, id: TypeId) -> &[CapabilityId] {
        &self.types[id.index()].capabilities
    }

    /// Get a default/specialization/invariant body.
    pub fn body(&self, id: BodyId) -> &OpExpr {
        &self.bodies[id.index()]
    }

    /// Advisory diagnostics for every capability invariant.
    ///
    /// Invariants are contracts over `self`/`other` that this core cannot
    /// prove statically. They are surfaced as notes - never dropped, never
    /// hard failures - for downstream tooling to turn into property tests at
    /// the implementing types.
    pub fn advisories(&self, interner: &veld_ir::StringInterner) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        for (i, cap) in self.caps.iter().enumerate() {
            for invariant in &cap.invariants {
                // Inherited invariants repeat in every descendant's
                // flattened list; report each once, at its origin.
                if invariant.origin.index() != i {
                    continue;
                }
                diags.push(
                    Diagnostic::advisory(ErrorCode::E1006)
                        .with_message(format!(
                            "invariant on capability `{}` is not statically proven; \
                             verify it with property tests at each implementing type",
                            interner.lookup(cap.name)
                        ))
                        .with_label(invariant.span, "declared here"),
                );
            }
        }
        diags
    }
}

impl<'a> CapabilityRegistry<'a> {
    /// Consume the registry, register operand types, and precompute every
    /// binding table.
    ///
    /// Type errors are collected exhaustively; a type with errors is skipped
    /// but the remaining types still resolve.
    pub fn finish(self, types: &[TypeDecl]) -> (CapabilityIndex, Vec<CapabilityError>) {
        let mut errors = Vec::new();
        let mut index = CapabilityIndex {
            caps: self.caps,
            cap_by_name: self.by_name,
            bodies: self.bodies,
            types: Vec::new(),
            type_by_name: FxHashMap::default(),
            bindings: Vec::new(),
            table: FxHashMap::default(),
        };

        // Interning identical outcomes keeps the implementation reference
        // stable across types that share a capability.
        let mut binding_keys: FxHashMap<(CapabilityId, Name), BindingId> = FxHashMap::default();

        for decl in types {
            if let Some(&prev) = index.type_by_name.get(&decl.name) {
                errors.push(CapabilityError::DuplicateType {
                    name: self.interner.lookup(decl.name).to_owned(),
                    span: decl.span,
                    first_span: index.types[prev.index()].span,
                });
                continue;
            }

            let mut capabilities: SmallVec<[CapabilityId; 4]> = SmallVec::new();
            let mut unknown = false;
            for cap_ref in &decl.capabilities {
                match index.cap_by_name.get(&cap_ref.name) {
                    Some(&id) => capabilities.push(id),
                    None => {
                        errors.push(CapabilityError::UnknownReference {
                            name: self.interner.lookup(cap_ref.name).to_owned(),
                            span: cap_ref.span,
                        });
                        unknown = true;
                    }
                }
            }
            if unknown {
                continue;
            }

            let ty = TypeId::new(index.types.len() as u32);
            index.type_by_name.insert(decl.name, ty);

            // Union of member symbols across the set, in capability
            // declaration order, resolved one symbol at a time.
            let mut seen: FxHashSet<Name> = FxHashSet::default();
            for &cap in &capabilities {
                let symbols = index.caps[cap.index()].symbols.clone();
                for symbol in symbols {
                    if !seen.insert(symbol) {
                        continue;
                    }
                    let outcome =
                        resolve_symbol(&index.caps, &capabilities, symbol, &mut binding_keys, &mut index.bindings);
                    index.table.insert((ty, symbol), outcome);
                }
            }

            index.types.push(TypeInfo {
                name: decl.name,
                span: decl.span,
                capabilities,
            });
        }

        debug!(
            types = index.types.len(),
            bindings = index.bindings.len(),
            "precomputed binding tables"
        );

        (index, errors)
    }
}

/// Resolve one symbol against a capability set.
///
/// Candidates whose capability is an ancestor of another candidate's
/// capability are pruned first - the descendant's flattened table already
/// linearized them. Distinct survivors mean the set carries unrelated,
/// un-overridden definitions: a diamond the implementing type cannot
/// disambiguate, reported at query time.
fn resolve_symbol(
    caps: &[CapabilityData],
    set: &[CapabilityId],
    symbol: Name,
    binding_keys: &mut FxHashMap<(CapabilityId, Name), BindingId>,
    bindings: &mut Vec<Binding>,
) -> Outcome {
    let mut candidates: SmallVec<[CapabilityId; 4]> = SmallVec::new();
    for &cap in set {
        if caps[cap.index()].member(symbol).is_some() {
            candidates.push(cap);
        }
    }

    // Prune ancestors of other candidates.
    let pruned: SmallVec<[CapabilityId; 4]> = candidates
        .iter()
        .copied()
        .filter(|&cap| {
            !candidates
                .iter()
                .any(|&other| other != cap && caps[other.index()].ancestors.binary_search(&cap).is_ok())
        })
        .collect();

    // All survivors must agree on one entry: same declaring capability and
    // same body provenance.
    let first = pruned[0];
    let first_entry = &caps[first.index()].table[&symbol];
    let agree = pruned.iter().all(|&cap| {
        let entry = &caps[cap.index()].table[&symbol];
        entry.declared_in == first_entry.declared_in && entry.default == first_entry.default
    });

    if !agree {
        let mut origins: SmallVec<[CapabilityId; 2]> = SmallVec::new();
        for &cap in &pruned {
            let entry = &caps[cap.index()].table[&symbol];
            let origin = match entry.default {
                DefaultState::Default { origin, .. }
                | DefaultState::Specialized { origin, .. } => origin,
                DefaultState::Required | DefaultState::Conflict(_) => entry.declared_in,
            };
            if !origins.contains(&origin) {
                origins.push(origin);
            }
        }
        return Outcome::Ambiguous(origins);
    }

    // The binding is keyed by the table we read it from, so types sharing a
    // capability share the implementation reference.
    let key = (first_entry.declared_in, symbol);
    if let Some(&id) = binding_keys.get(&key) {
        // Same declaring capability can still carry different bodies in
        // different branches; only reuse when the stored binding matches.
        let stored = &bindings[id.index()];
        let (source, body) = source_of(first_entry);
        if stored.source == source && stored.body == body {
            return Outcome::Bound(id);
        }
    }

    let id = BindingId::new(bindings.len() as u32);
    let (source, body) = source_of(first_entry);
    bindings.push(Binding {
        id,
        symbol,
        fixity: first_entry.fixity,
        operation: first_entry.operation,
        capability: first_entry.declared_in,
        level: caps[first_entry.declared_in.index()].level,
        source,
        body,
    });
    binding_keys.insert(key, id);
    Outcome::Bound(id)
}

fn source_of(entry: &crate::registry::MemberEntry) -> (BindingSource, Option<BodyId>) {
    match entry.default {
        DefaultState::Specialized { body, origin } => {
            (BindingSource::Specialization(origin), Some(body))
        }
        DefaultState::Default { body, origin } => (BindingSource::Default(origin), Some(body)),
        DefaultState::Required | DefaultState::Conflict(_) => (BindingSource::Required, None),
    }
}
