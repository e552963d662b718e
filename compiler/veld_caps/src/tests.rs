//! Registry, flattening, and binding resolution tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;
use veld_ir::{
    Assoc, CapabilityDecl, ConstraintKind, Fixity, InvariantDecl, LevelConstraint, LevelDecl,
    MemberDecl, OpExpr, ParentRef, Span, SpecializationDecl, StringInterner, TypeDecl,
};
use veld_prec::{resolve_precedence, ResolvedOrder};

use crate::{
    resolve_capabilities, BindingError, BindingSource, CapabilityDecls, CapabilityError,
    CapabilityRegistry,
};

fn test_order(interner: &StringInterner) -> ResolvedOrder {
    let level = |name: &str, assoc: Assoc, higher_than: Option<&str>| LevelDecl {
        name: interner.intern(name),
        assoc,
        constraints: higher_than
            .map(|target| LevelConstraint {
                kind: ConstraintKind::HigherThan,
                target: interner.intern(target),
                span: Span::DUMMY,
            })
            .into_iter()
            .collect(),
        span: Span::DUMMY,
    };
    let decls = vec![
        level("Assign", Assoc::Right, None),
        level("Compare", Assoc::None, Some("Assign")),
        level("AddSub", Assoc::Left, Some("Compare")),
        level("MulDivRem", Assoc::Left, Some("AddSub")),
    ];
    resolve_precedence(&decls, interner).unwrap()
}

fn self_arg() -> OpExpr {
    OpExpr::SelfArg { span: Span::DUMMY }
}

fn other_arg() -> OpExpr {
    OpExpr::OtherArg { span: Span::DUMMY }
}

fn apply(interner: &StringInterner, op: &str, args: Vec<OpExpr>) -> OpExpr {
    OpExpr::Apply {
        op: interner.intern(op),
        args,
        span: Span::DUMMY,
    }
}

fn not(inner: OpExpr) -> OpExpr {
    OpExpr::Not {
        inner: Box::new(inner),
        span: Span::DUMMY,
    }
}

fn member(
    interner: &StringInterner,
    symbol: &str,
    binding: &str,
    default_body: Option<OpExpr>,
) -> MemberDecl {
    MemberDecl {
        symbol: interner.intern(symbol),
        fixity: Fixity::Infix,
        binding: interner.intern(binding),
        default_body,
        span: Span::new(0, 1),
    }
}

fn capability(
    interner: &StringInterner,
    name: &str,
    level: &str,
    parents: &[&str],
    members: Vec<MemberDecl>,
) -> CapabilityDecl {
    CapabilityDecl {
        name: interner.intern(name),
        level: interner.intern(level),
        level_span: Span::DUMMY,
        parents: parents
            .iter()
            .map(|p| ParentRef {
                name: interner.intern(p),
                span: Span::new(2, 3),
            })
            .collect(),
        members,
        specializations: Vec::new(),
        invariants: Vec::new(),
        span: Span::new(0, 10),
    }
}

fn specialize(interner: &StringInterner, symbol: &str, body: OpExpr) -> SpecializationDecl {
    SpecializationDecl {
        symbol: interner.intern(symbol),
        body,
        span: Span::new(4, 5),
    }
}

fn ty(interner: &StringInterner, name: &str, caps: &[&str]) -> TypeDecl {
    TypeDecl {
        name: interner.intern(name),
        capabilities: caps
            .iter()
            .map(|c| ParentRef {
                name: interner.intern(c),
                span: Span::DUMMY,
            })
            .collect(),
        span: Span::DUMMY,
    }
}

/// `less(other, self)` - a body referencing the sibling operation `less`.
fn flipped_less(interner: &StringInterner) -> OpExpr {
    apply(interner, "less", vec![other_arg(), self_arg()])
}

#[test]
fn duplicate_member_is_rejected() {
    let interner = StringInterner::new();
    let order = test_order(&interner);
    let mut registry = CapabilityRegistry::new(&interner, &order);
    let decl = capability(
        &interner,
        "Equatable",
        "Compare",
        &[],
        vec![
            member(&interner, "==", "equal", None),
            member(&interner, "==", "equal_again", None),
        ],
    );
    let errs = registry.declare_capability(&decl).unwrap_err();
    assert!(matches!(
        errs.as_slice(),
        [CapabilityError::DuplicateMember { symbol, .. }] if symbol == "=="
    ));
}

#[test]
fn double_specialization_of_one_symbol_is_rejected() {
    let interner = StringInterner::new();
    let order = test_order(&interner);
    let mut registry = CapabilityRegistry::new(&interner, &order);

    registry
        .declare_capability(&capability(
            &interner,
            "Ordered",
            "Compare",
            &[],
            vec![
                member(&interner, "<", "less", None),
                member(&interner, "<=", "less_equal", Some(not(flipped_less(&interner)))),
            ],
        ))
        .unwrap();

    // The same comparison operator specialized twice with differing bodies:
    // a hard error, not "last wins".
    let mut decl = capability(&interner, "DenseOrdered", "Compare", &["Ordered"], vec![]);
    decl.specializations = vec![
        specialize(&interner, "<=", flipped_less(&interner)),
        specialize(&interner, "<=", not(apply(&interner, "less", vec![self_arg(), other_arg()]))),
    ];
    let errs = registry.declare_capability(&decl).unwrap_err();
    assert!(matches!(
        errs.as_slice(),
        [CapabilityError::DuplicateSpecialization { symbol, .. }] if symbol == "<="
    ));
}

#[test]
fn unreconciled_two_parent_defaults_conflict() {
    let interner = StringInterner::new();
    let order = test_order(&interner);
    let mut registry = CapabilityRegistry::new(&interner, &order);

    for name in ["NumericOrder", "LexicalOrder"] {
        registry
            .declare_capability(&capability(
                &interner,
                name,
                "Compare",
                &[],
                vec![
                    member(&interner, "<", "less", None),
                    member(&interner, "<=", "less_equal", Some(not(flipped_less(&interner)))),
                ],
            ))
            .unwrap();
    }

    let child = capability(
        &interner,
        "TotalOrder",
        "Compare",
        &["NumericOrder", "LexicalOrder"],
        vec![],
    );
    let errs = registry.declare_capability(&child).unwrap_err();
    let conflicts: Vec<_> = errs
        .iter()
        .filter(|e| matches!(e, CapabilityError::DiamondConflict { symbol, .. } if symbol == "<="))
        .collect();
    assert_eq!(conflicts.len(), 1);
    let CapabilityError::DiamondConflict { origins, .. } = conflicts[0] else {
        unreachable!()
    };
    assert_eq!(origins, &["NumericOrder".to_owned(), "LexicalOrder".to_owned()]);
}

#[test]
fn same_provenance_through_a_diamond_is_not_a_conflict() {
    let interner = StringInterner::new();
    let order = test_order(&interner);
    let mut registry = CapabilityRegistry::new(&interner, &order);

    registry
        .declare_capability(&capability(
            &interner,
            "Base",
            "Compare",
            &[],
            vec![
                member(&interner, "<", "less", None),
                member(&interner, "<=", "less_equal", Some(not(flipped_less(&interner)))),
            ],
        ))
        .unwrap();
    registry
        .declare_capability(&capability(&interner, "LeftArm", "Compare", &["Base"], vec![]))
        .unwrap();
    registry
        .declare_capability(&capability(&interner, "RightArm", "Compare", &["Base"], vec![]))
        .unwrap();

    // Both arms carry Base's default; the provenance is identical, so the
    // join is clean.
    let join = capability(
        &interner,
        "Join",
        "Compare",
        &["LeftArm", "RightArm"],
        vec![],
    );
    assert!(registry.declare_capability(&join).is_ok());
}

#[test]
fn child_specialization_resolves_a_diamond() {
    let interner = StringInterner::new();
    let order = test_order(&interner);
    let mut registry = CapabilityRegistry::new(&interner, &order);

    for name in ["NumericOrder", "LexicalOrder"] {
        registry
            .declare_capability(&capability(
                &interner,
                name,
                "Compare",
                &[],
                vec![
                    member(&interner, "<", "less", None),
                    member(&interner, "<=", "less_equal", Some(not(flipped_less(&interner)))),
                ],
            ))
            .unwrap();
    }

    let mut child = capability(
        &interner,
        "TotalOrder",
        "Compare",
        &["NumericOrder", "LexicalOrder"],
        vec![],
    );
    child.specializations = vec![specialize(&interner, "<=", flipped_less(&interner))];
    assert!(registry.declare_capability(&child).is_ok());
}

#[test]
fn local_member_resolves_a_diamond() {
    let interner = StringInterner::new();
    let order = test_order(&interner);
    let mut registry = CapabilityRegistry::new(&interner, &order);

    for name in ["NumericOrder", "LexicalOrder"] {
        registry
            .declare_capability(&capability(
                &interner,
                name,
                "Compare",
                &[],
                vec![member(&interner, "<=", "less_equal", Some(self_arg()))],
            ))
            .unwrap();
    }

    let child = capability(
        &interner,
        "TotalOrder",
        "Compare",
        &["NumericOrder", "LexicalOrder"],
        vec![member(&interner, "<=", "less_equal", Some(other_arg()))],
    );
    assert!(registry.declare_capability(&child).is_ok());
}

#[test]
fn specialization_in_one_arm_wins_over_ancestor_default() {
    let interner = StringInterner::new();
    let order = test_order(&interner);
    let mut registry = CapabilityRegistry::new(&interner, &order);

    registry
        .declare_capability(&capability(
            &interner,
            "Base",
            "Compare",
            &[],
            vec![
                member(&interner, "<", "less", None),
                member(&interner, "<=", "less_equal", Some(not(flipped_less(&interner)))),
            ],
        ))
        .unwrap();

    let mut arm = capability(&interner, "FastArm", "Compare", &["Base"], vec![]);
    arm.specializations = vec![specialize(&interner, "<=", flipped_less(&interner))];
    let arm_id = registry.declare_capability(&arm).unwrap();

    registry
        .declare_capability(&capability(&interner, "PlainArm", "Compare", &["Base"], vec![]))
        .unwrap();

    // FastArm's specialization descends from Base, so it overrides the
    // inherited default in the join without child involvement.
    let join = capability(
        &interner,
        "Join",
        "Compare",
        &["FastArm", "PlainArm"],
        vec![],
    );
    let join_id = registry.declare_capability(&join).unwrap();
    let entry = registry
        .capability(join_id)
        .member(interner.intern("<="))
        .unwrap();
    assert!(matches!(
        entry.default,
        crate::DefaultState::Specialized { origin, .. } if origin == arm_id
    ));
}

#[test]
fn default_bodies_may_reference_later_members() {
    let interner = StringInterner::new();
    let order = test_order(&interner);
    let mut registry = CapabilityRegistry::new(&interner, &order);

    // `<=` refers to `greater`, declared after it in the same capability;
    // bodies bind against the final member table.
    let decl = capability(
        &interner,
        "Ordered",
        "Compare",
        &[],
        vec![
            member(
                &interner,
                "<=",
                "less_equal",
                Some(not(apply(&interner, "greater", vec![self_arg(), other_arg()]))),
            ),
            member(&interner, ">", "greater", None),
        ],
    );
    assert!(registry.declare_capability(&decl).is_ok());
}

#[test]
fn body_referencing_unknown_operation_is_rejected() {
    let interner = StringInterner::new();
    let order = test_order(&interner);
    let mut registry = CapabilityRegistry::new(&interner, &order);

    let decl = capability(
        &interner,
        "Ordered",
        "Compare",
        &[],
        vec![member(
            &interner,
            "<=",
            "less_equal",
            Some(apply(&interner, "missing_op", vec![self_arg()])),
        )],
    );
    let errs = registry.declare_capability(&decl).unwrap_err();
    assert!(matches!(
        errs.as_slice(),
        [CapabilityError::UnknownReference { name, .. }] if name == "missing_op"
    ));
}

#[test]
fn unknown_parent_and_sentinel_level_are_reported_together() {
    let interner = StringInterner::new();
    let order = test_order(&interner);
    let mut registry = CapabilityRegistry::new(&interner, &order);

    let decl = capability(&interner, "Odd", "Highest", &["Missing"], vec![]);
    let errs = registry.declare_capability(&decl).unwrap_err();
    assert_eq!(errs.len(), 2);
    assert!(errs
        .iter()
        .any(|e| matches!(e, CapabilityError::SentinelLevel { .. })));
    assert!(errs
        .iter()
        .any(|e| matches!(e, CapabilityError::UnknownReference { name, .. } if name == "Missing")));
}

#[test]
fn lookup_binding_is_pure() {
    let interner = StringInterner::new();
    let order = test_order(&interner);
    let decls = CapabilityDecls {
        capabilities: vec![capability(
            &interner,
            "Additive",
            "AddSub",
            &[],
            vec![member(&interner, "+", "add", None)],
        )],
        types: vec![ty(&interner, "Int", &["Additive"])],
    };
    let (index, errors) = resolve_capabilities(&decls, &order, &interner);
    assert!(errors.is_empty());

    let int = index.type_id(interner.intern("Int")).unwrap();
    let plus = interner.intern("+");
    let first = index.lookup_binding(int, plus).unwrap().clone();
    let second = index.lookup_binding(int, plus).unwrap().clone();
    assert_eq!(first, second);
    assert_eq!(first.id, second.id);
    assert_eq!(first.source, BindingSource::Required);
}

#[test]
fn types_sharing_a_capability_share_the_binding() {
    let interner = StringInterner::new();
    let order = test_order(&interner);
    let decls = CapabilityDecls {
        capabilities: vec![capability(
            &interner,
            "Additive",
            "AddSub",
            &[],
            vec![member(&interner, "+", "add", None)],
        )],
        types: vec![
            ty(&interner, "Int", &["Additive"]),
            ty(&interner, "Float", &["Additive"]),
        ],
    };
    let (index, errors) = resolve_capabilities(&decls, &order, &interner);
    assert!(errors.is_empty());

    let plus = interner.intern("+");
    let int = index.type_id(interner.intern("Int")).unwrap();
    let float = index.type_id(interner.intern("Float")).unwrap();
    assert_eq!(
        index.lookup_binding(int, plus).unwrap().id,
        index.lookup_binding(float, plus).unwrap().id
    );
}

#[test]
fn unknown_operator_is_a_query_error() {
    let interner = StringInterner::new();
    let order = test_order(&interner);
    let decls = CapabilityDecls {
        capabilities: vec![capability(
            &interner,
            "Additive",
            "AddSub",
            &[],
            vec![member(&interner, "+", "add", None)],
        )],
        types: vec![ty(&interner, "Int", &["Additive"])],
    };
    let (index, _) = resolve_capabilities(&decls, &order, &interner);

    let int = index.type_id(interner.intern("Int")).unwrap();
    let star = interner.intern("*");
    assert!(matches!(
        index.lookup_binding(int, star),
        Err(BindingError::UnknownOperator { .. })
    ));
}

#[test]
fn unrelated_defaults_across_a_type_set_conflict_at_query_time() {
    let interner = StringInterner::new();
    let order = test_order(&interner);
    let decls = CapabilityDecls {
        capabilities: vec![
            capability(
                &interner,
                "VectorAdd",
                "AddSub",
                &[],
                vec![member(&interner, "+", "add", Some(self_arg()))],
            ),
            capability(
                &interner,
                "SetUnion",
                "AddSub",
                &[],
                vec![member(&interner, "+", "add", Some(other_arg()))],
            ),
        ],
        types: vec![ty(&interner, "Tensor", &["VectorAdd", "SetUnion"])],
    };
    let (index, errors) = resolve_capabilities(&decls, &order, &interner);
    assert!(errors.is_empty());

    let tensor = index.type_id(interner.intern("Tensor")).unwrap();
    let plus = interner.intern("+");
    let Err(BindingError::DiamondConflict { origins, .. }) = index.lookup_binding(tensor, plus)
    else {
        panic!("expected a query-time diamond conflict");
    };
    assert_eq!(origins.len(), 2);
}

#[test]
fn specialization_binding_carries_provenance() {
    let interner = StringInterner::new();
    let order = test_order(&interner);

    let mut dense = capability(&interner, "DenseOrdered", "Compare", &["Ordered"], vec![]);
    dense.specializations = vec![specialize(&interner, "<=", flipped_less(&interner))];
    let decls = CapabilityDecls {
        capabilities: vec![
            capability(
                &interner,
                "Ordered",
                "Compare",
                &[],
                vec![
                    member(&interner, "<", "less", None),
                    member(&interner, "<=", "less_equal", Some(not(flipped_less(&interner)))),
                ],
            ),
            dense,
        ],
        types: vec![ty(&interner, "Rational", &["DenseOrdered"])],
    };
    let (index, errors) = resolve_capabilities(&decls, &order, &interner);
    assert!(errors.is_empty());

    let rational = index.type_id(interner.intern("Rational")).unwrap();
    let le = interner.intern("<=");
    let binding = index.lookup_binding(rational, le).unwrap();
    let dense_id = index.capability_id(interner.intern("DenseOrdered")).unwrap();
    assert_eq!(binding.source, BindingSource::Specialization(dense_id));
    assert!(binding.body.is_some());

    // The un-specialized `<` still resolves to the inherited declaration.
    let lt = interner.intern("<");
    let lt_binding = index.lookup_binding(rational, lt).unwrap();
    let ordered_id = index.capability_id(interner.intern("Ordered")).unwrap();
    assert_eq!(lt_binding.capability, ordered_id);
    assert_eq!(lt_binding.source, BindingSource::Required);
}

#[test]
fn duplicate_types_and_unknown_capabilities_are_collected() {
    let interner = StringInterner::new();
    let order = test_order(&interner);
    let decls = CapabilityDecls {
        capabilities: vec![capability(
            &interner,
            "Additive",
            "AddSub",
            &[],
            vec![member(&interner, "+", "add", None)],
        )],
        types: vec![
            ty(&interner, "Int", &["Additive"]),
            ty(&interner, "Int", &["Additive"]),
            ty(&interner, "Str", &["Concat"]),
        ],
    };
    let (_, errors) = resolve_capabilities(&decls, &order, &interner);
    assert_eq!(errors.len(), 2);
    assert!(errors
        .iter()
        .any(|e| matches!(e, CapabilityError::DuplicateType { name, .. } if name == "Int")));
    assert!(errors
        .iter()
        .any(|e| matches!(e, CapabilityError::UnknownReference { name, .. } if name == "Concat")));
}

#[test]
fn invariants_surface_as_single_advisories() {
    let interner = StringInterner::new();
    let order = test_order(&interner);

    let mut base = capability(
        &interner,
        "Ordered",
        "Compare",
        &[],
        vec![member(&interner, "<=", "less_equal", None)],
    );
    // Totality: `less_equal(self, other) or less_equal(other, self)`.
    base.invariants = vec![InvariantDecl {
        body: OpExpr::Or {
            left: Box::new(apply(&interner, "less_equal", vec![self_arg(), other_arg()])),
            right: Box::new(apply(&interner, "less_equal", vec![other_arg(), self_arg()])),
            span: Span::DUMMY,
        },
        span: Span::new(7, 9),
    }];
    let decls = CapabilityDecls {
        capabilities: vec![
            base,
            capability(&interner, "DenseOrdered", "Compare", &["Ordered"], vec![]),
        ],
        types: Vec::new(),
    };
    let (index, errors) = resolve_capabilities(&decls, &order, &interner);
    assert!(errors.is_empty());

    // The child inherits the invariant, but the advisory is reported once,
    // at its origin.
    let advisories = index.advisories(&interner);
    assert_eq!(advisories.len(), 1);
    assert_eq!(advisories[0].code, veld_diagnostic::ErrorCode::E1006);
    assert!(!advisories[0].is_error());

    let dense = index.capability_id(interner.intern("DenseOrdered")).unwrap();
    assert_eq!(index.capability(dense).invariants().len(), 1);
}

#[test]
fn specializing_an_undeclared_symbol_is_rejected() {
    let interner = StringInterner::new();
    let order = test_order(&interner);
    let mut registry = CapabilityRegistry::new(&interner, &order);
    let mut decl = capability(&interner, "Ordered", "Compare", &[], vec![]);
    decl.specializations = vec![specialize(&interner, "<=", self_arg())];
    let errs = registry.declare_capability(&decl).unwrap_err();
    // Specializing a symbol absent from the flattened table.
    assert!(matches!(
        errs.as_slice(),
        [CapabilityError::UnknownReference { name, .. }] if name == "<="
    ));
}
