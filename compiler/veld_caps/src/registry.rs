//! Capability registry and declare-time flattening.
//!
//! Capabilities form a DAG through their parent lists. The registry walks
//! that DAG once per declaration: each capability's member table is the
//! flattened union of its parents' tables plus its local members and
//! specializations, with provenance carried per operator symbol. Conflicts
//! are data computed here, not runtime branches later: a diamond that the
//! child does not reconcile fails the declaration.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::debug;
use veld_ir::{
    BodyId, CapabilityDecl, CapabilityId, Fixity, LevelId, Name, OpExpr, Span, StringInterner,
};
use veld_prec::ResolvedOrder;

use crate::CapabilityError;

/// Where a member's current body comes from.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum DefaultState {
    /// No default body anywhere in the inheritance graph; implementing
    /// types must supply the operation themselves.
    Required,
    /// A live default body and the capability that supplied it.
    Default { body: BodyId, origin: CapabilityId },
    /// A specialization overriding an inherited default.
    Specialized { body: BodyId, origin: CapabilityId },
    /// Unreconciled defaults from multiple parents. Only exists while a
    /// declaration is being checked; a capability with a surviving conflict
    /// is never registered.
    Conflict(SmallVec<[CapabilityId; 2]>),
}

impl DefaultState {
    /// The live body and its provenance, if any.
    fn body_origin(&self) -> Option<(BodyId, CapabilityId)> {
        match self {
            DefaultState::Default { body, origin }
            | DefaultState::Specialized { body, origin } => Some((*body, *origin)),
            DefaultState::Required | DefaultState::Conflict(_) => None,
        }
    }
}

/// One entry in a capability's flattened member table.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MemberEntry {
    pub symbol: Name,
    pub fixity: Fixity,
    /// Operation name the symbol binds to.
    pub operation: Name,
    /// Capability that introduced (or locally redefined) the member.
    pub declared_in: CapabilityId,
    pub default: DefaultState,
    pub span: Span,
}

/// A flattened invariant with its provenance.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Invariant {
    pub body: BodyId,
    pub origin: CapabilityId,
    pub span: Span,
}

/// A registered capability after flattening.
pub struct CapabilityData {
    pub name: Name,
    /// Owning precedence level of every member symbol introduced here.
    pub level: LevelId,
    pub span: Span,
    pub(crate) parents: SmallVec<[CapabilityId; 2]>,
    /// All transitive ancestors, sorted, self excluded.
    pub(crate) ancestors: Vec<CapabilityId>,
    /// Member symbols in first-seen order; drives deterministic iteration.
    pub(crate) symbols: Vec<Name>,
    pub(crate) table: FxHashMap<Name, MemberEntry>,
    pub(crate) invariants: Vec<Invariant>,
}

impl CapabilityData {
    /// Look up a member by operator symbol.
    pub fn member(&self, symbol: Name) -> Option<&MemberEntry> {
        self.table.get(&symbol)
    }

    /// Iterate members in deterministic (first-seen) symbol order.
    pub fn members(&self) -> impl Iterator<Item = &MemberEntry> {
        self.symbols.iter().filter_map(|s| self.table.get(s))
    }

    /// Flattened invariants, inherited first.
    pub fn invariants(&self) -> &[Invariant] {
        &self.invariants
    }
}

/// Registry of declared capabilities.
///
/// Build-phase object: borrows the interner and the resolved precedence
/// order, validates each declaration as it arrives, and is consumed by
/// [`finish`](CapabilityRegistry::finish) into the immutable
/// [`CapabilityIndex`](crate::CapabilityIndex).
pub struct CapabilityRegistry<'a> {
    pub(crate) interner: &'a StringInterner,
    order: &'a ResolvedOrder,
    pub(crate) caps: Vec<CapabilityData>,
    pub(crate) by_name: FxHashMap<Name, CapabilityId>,
    /// Arena of default, specialization, and invariant bodies.
    pub(crate) bodies: Vec<OpExpr>,
}

impl<'a> CapabilityRegistry<'a> {
    /// Create an empty registry over a resolved precedence order.
    pub fn new(interner: &'a StringInterner, order: &'a ResolvedOrder) -> Self {
        CapabilityRegistry {
            interner,
            order,
            caps: Vec::new(),
            by_name: FxHashMap::default(),
            bodies: Vec::new(),
        }
    }

    /// Look up a capability by name.
    pub fn capability_id(&self, name: Name) -> Option<CapabilityId> {
        self.by_name.get(&name).copied()
    }

    /// Get a registered capability.
    pub fn capability(&self, id: CapabilityId) -> &CapabilityData {
        &self.caps[id.index()]
    }

    /// Declare a capability, flattening its inheritance at declare time.
    ///
    /// All problems with the declaration are collected and returned
    /// together; a capability with any error is not registered, and later
    /// declarations referencing it report their own `UnknownReference`.
    pub fn declare_capability(
        &mut self,
        decl: &CapabilityDecl,
    ) -> Result<CapabilityId, Vec<CapabilityError>> {
        let mut errors = Vec::new();

        if let Some(&prev) = self.by_name.get(&decl.name) {
            errors.push(CapabilityError::DuplicateCapability {
                name: self.name_str(decl.name),
                span: decl.span,
                first_span: self.caps[prev.index()].span,
            });
        }

        let level = match self.order.level_id(decl.level) {
            Some(level) if self.order.is_user_level(level) => level,
            Some(level) => {
                errors.push(CapabilityError::SentinelLevel {
                    capability: self.name_str(decl.name),
                    level: self.name_str(self.order.name(level)),
                    span: decl.level_span,
                });
                level
            }
            None => {
                errors.push(CapabilityError::UnknownReference {
                    name: self.name_str(decl.level),
                    span: decl.level_span,
                });
                LevelId::LOWEST
            }
        };

        let mut parents: SmallVec<[CapabilityId; 2]> = SmallVec::new();
        for parent in &decl.parents {
            match self.by_name.get(&parent.name) {
                Some(&id) => parents.push(id),
                None => errors.push(CapabilityError::UnknownReference {
                    name: self.name_str(parent.name),
                    span: parent.span,
                }),
            }
        }

        let self_id = CapabilityId::new(self.caps.len() as u32);

        // Inherit: merge every parent's flattened table, left to right.
        let mut symbols: Vec<Name> = Vec::new();
        let mut table: FxHashMap<Name, MemberEntry> = FxHashMap::default();
        let mut invariants: Vec<Invariant> = Vec::new();
        let mut seen_invariants: FxHashSet<BodyId> = FxHashSet::default();
        for &parent in &parents {
            let parent_data = &self.caps[parent.index()];
            for &symbol in &parent_data.symbols {
                let incoming = parent_data.table[&symbol].clone();
                let merged = match table.get(&symbol) {
                    None => {
                        symbols.push(symbol);
                        incoming
                    }
                    Some(existing) => self.merge_inherited(existing, &incoming),
                };
                table.insert(symbol, merged);
            }
            // Diamonds would repeat a grandparent's invariants; body IDs
            // identify them across paths.
            for invariant in &parent_data.invariants {
                if seen_invariants.insert(invariant.body) {
                    invariants.push(invariant.clone());
                }
            }
        }

        // Local members shadow inherited entries outright: a local
        // definition resolves diamonds the same way a specialization does.
        let mut local_members: FxHashSet<Name> = FxHashSet::default();
        for member in &decl.members {
            if !local_members.insert(member.symbol) {
                errors.push(CapabilityError::DuplicateMember {
                    capability: self.name_str(decl.name),
                    symbol: self.name_str(member.symbol),
                    span: member.span,
                });
                continue;
            }
            let default = match &member.default_body {
                Some(body) => DefaultState::Default {
                    body: self.alloc_body(body.clone()),
                    origin: self_id,
                },
                None => DefaultState::Required,
            };
            if table
                .insert(
                    member.symbol,
                    MemberEntry {
                        symbol: member.symbol,
                        fixity: member.fixity,
                        operation: member.binding,
                        declared_in: self_id,
                        default,
                        span: member.span,
                    },
                )
                .is_none()
            {
                symbols.push(member.symbol);
            }
        }

        let mut specialized: FxHashSet<Name> = FxHashSet::default();
        for spec in &decl.specializations {
            if !specialized.insert(spec.symbol) {
                errors.push(CapabilityError::DuplicateSpecialization {
                    capability: self.name_str(decl.name),
                    symbol: self.name_str(spec.symbol),
                    span: spec.span,
                });
                continue;
            }
            match table.get_mut(&spec.symbol) {
                Some(entry) => {
                    entry.default = DefaultState::Specialized {
                        body: self.alloc_body(spec.body.clone()),
                        origin: self_id,
                    };
                }
                None => errors.push(CapabilityError::UnknownReference {
                    name: self.name_str(spec.symbol),
                    span: spec.span,
                }),
            }
        }

        // Whatever conflicts the locals did not resolve are now final.
        for symbol in &symbols {
            if let DefaultState::Conflict(origins) = &table[symbol].default {
                errors.push(CapabilityError::DiamondConflict {
                    capability: self.name_str(decl.name),
                    symbol: self.name_str(*symbol),
                    origins: origins
                        .iter()
                        .map(|&o| self.name_str(self.caps[o.index()].name))
                        .collect(),
                    span: decl.span,
                });
            }
        }

        for invariant in &decl.invariants {
            self.check_body_references(&invariant.body, &table, &mut errors);
            let body = self.alloc_body(invariant.body.clone());
            invariants.push(Invariant {
                body,
                origin: self_id,
                span: invariant.span,
            });
        }

        // Bodies bind against the final member table of Self, so forward
        // references to later-declared operations are legal; every
        // referenced operation just has to exist somewhere in the table.
        for member in &decl.members {
            if let Some(body) = &member.default_body {
                self.check_body_references(body, &table, &mut errors);
            }
        }
        for spec in &decl.specializations {
            self.check_body_references(&spec.body, &table, &mut errors);
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let mut ancestors: Vec<CapabilityId> = parents.iter().copied().collect();
        for &parent in &parents {
            ancestors.extend_from_slice(&self.caps[parent.index()].ancestors);
        }
        ancestors.sort_unstable();
        ancestors.dedup();

        debug!(
            capability = self.interner.lookup(decl.name),
            members = symbols.len(),
            "flattened capability"
        );

        self.caps.push(CapabilityData {
            name: decl.name,
            level,
            span: decl.span,
            parents,
            ancestors,
            symbols,
            table,
            invariants,
        });
        self.by_name.insert(decl.name, self_id);
        Ok(self_id)
    }

    /// Merge two inherited entries for the same symbol.
    ///
    /// Specializations override the defaults of their ancestors; defaults of
    /// unrelated provenance conflict and must be reconciled by the child.
    fn merge_inherited(&self, a: &MemberEntry, b: &MemberEntry) -> MemberEntry {
        // Accumulated conflict: a later parent either resolves it (its body
        // descends from every conflicting origin) or joins it.
        if let DefaultState::Conflict(origins) = &a.default {
            if let Some((_, origin_b)) = b.default.body_origin() {
                if origins.iter().all(|&o| self.descends(origin_b, o)) {
                    return b.clone();
                }
                let mut origins = origins.clone();
                if !origins.contains(&origin_b) {
                    origins.push(origin_b);
                }
                let mut merged = a.clone();
                merged.default = DefaultState::Conflict(origins);
                return merged;
            }
            return a.clone();
        }

        match (a.default.body_origin(), b.default.body_origin()) {
            (_, None) => a.clone(),
            (None, Some(_)) => b.clone(),
            (Some((body_a, origin_a)), Some((body_b, origin_b))) => {
                if body_a == body_b && origin_a == origin_b {
                    return a.clone();
                }
                if self.descends(origin_b, origin_a) {
                    return b.clone();
                }
                if self.descends(origin_a, origin_b) {
                    return a.clone();
                }
                let mut merged = a.clone();
                merged.default = DefaultState::Conflict(SmallVec::from_buf([origin_a, origin_b]));
                merged
            }
        }
    }

    /// Whether `cap` is `ancestor` itself or one of its descendants.
    fn descends(&self, cap: CapabilityId, ancestor: CapabilityId) -> bool {
        cap == ancestor || self.caps[cap.index()].ancestors.binary_search(&ancestor).is_ok()
    }

    /// Every operation a body references must exist in the final table.
    fn check_body_references(
        &self,
        body: &OpExpr,
        table: &FxHashMap<Name, MemberEntry>,
        errors: &mut Vec<CapabilityError>,
    ) {
        let operations: FxHashSet<Name> = table.values().map(|entry| entry.operation).collect();
        body.for_each_op(&mut |op, span| {
            if !operations.contains(&op) {
                errors.push(CapabilityError::UnknownReference {
                    name: self.name_str(op),
                    span,
                });
            }
        });
    }

    fn alloc_body(&mut self, body: OpExpr) -> BodyId {
        let id = BodyId::new(self.bodies.len() as u32);
        self.bodies.push(body);
        id
    }

    pub(crate) fn name_str(&self, name: Name) -> String {
        self.interner.lookup(name).to_owned()
    }
}
