//! Parser tests.
//!
//! The fixture declares a small but complete operator world: four ordered
//! levels plus one unrelated level, capabilities for assignment, comparison,
//! arithmetic, bit operations, and prefix negation, and an `Int` type
//! implementing all of them.

#![allow(clippy::unwrap_used, clippy::expect_used)]


use veld_caps::{resolve_capabilities, CapabilityDecls, CapabilityIndex};
use veld_ir::{
    Assoc, CapabilityDecl, ConstraintKind, Fixity, LevelConstraint, LevelDecl, MemberDecl,
    ParentRef, Span, StringInterner, Token, TokenKind, TokenList, TypeDecl, TypeId,
};
use veld_prec::{resolve_precedence, ResolvedOrder};

use crate::{parse_expression, ParseResult};

pub(crate) struct Fixture {
    pub interner: StringInterner,
    pub order: ResolvedOrder,
    pub index: CapabilityIndex,
    pub int: TypeId,
}

impl Fixture {
    pub fn new() -> Self {
        let interner = StringInterner::new();

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
        let levels = vec![
            level("Assign", Assoc::Right, None),
            level("Compare", Assoc::None, Some("Assign")),
            level("AddSub", Assoc::Left, Some("Compare")),
            level("MulDivRem", Assoc::Left, Some("AddSub")),
            // Deliberately unrelated to the arithmetic family.
            level("BitOr", Assoc::Left, None),
        ];
        let order = resolve_precedence(&levels, &interner).unwrap();

        let member = |symbol: &str, fixity: Fixity, binding: &str| MemberDecl {
            symbol: interner.intern(symbol),
            fixity,
            binding: interner.intern(binding),
            default_body: None,
            span: Span::DUMMY,
        };
        let capability = |name: &str, level: &str, members: Vec<MemberDecl>| CapabilityDecl {
            name: interner.intern(name),
            level: interner.intern(level),
            level_span: Span::DUMMY,
            parents: Vec::new(),
            members,
            specializations: Vec::new(),
            invariants: Vec::new(),
            span: Span::DUMMY,
        };

        let decls = CapabilityDecls {
            capabilities: vec![
                capability(
                    "Assignable",
                    "Assign",
                    vec![member("=", Fixity::Assign, "assign")],
                ),
                capability(
                    "Comparable",
                    "Compare",
                    vec![member("<", Fixity::Infix, "less")],
                ),
                capability(
                    "Additive",
                    "AddSub",
                    vec![
                        member("+", Fixity::Infix, "add"),
                        member("-", Fixity::Infix, "sub"),
                    ],
                ),
                capability(
                    "Multiplicative",
                    "MulDivRem",
                    vec![
                        member("*", Fixity::Infix, "mul"),
                        member("/", Fixity::Infix, "div"),
                    ],
                ),
                capability("BitOps", "BitOr", vec![member("|", Fixity::Infix, "bitor")]),
                capability(
                    "Negation",
                    "MulDivRem",
                    vec![member("!", Fixity::Prefix, "not")],
                ),
            ],
            types: vec![TypeDecl {
                name: interner.intern("Int"),
                capabilities: [
                    "Assignable",
                    "Comparable",
                    "Additive",
                    "Multiplicative",
                    "BitOps",
                    "Negation",
                ]
                .iter()
                .map(|c| ParentRef {
                    name: interner.intern(c),
                    span: Span::DUMMY,
                })
                .collect(),
                span: Span::DUMMY,
            }],
        };
        let (index, errors) = resolve_capabilities(&decls, &order, &interner);
        assert!(errors.is_empty(), "fixture must resolve cleanly: {errors:?}");
        let int = index.type_id(interner.intern("Int")).unwrap();

        Fixture {
            interner,
            order,
            index,
            int,
        }
    }

    pub fn atom(&self, name: &str) -> TokenKind {
        TokenKind::Atom {
            name: self.interner.intern(name),
            ty: self.int,
        }
    }

    pub fn infix(&self, symbol: &str) -> TokenKind {
        TokenKind::Op {
            symbol: self.interner.intern(symbol),
            fixity: Fixity::Infix,
        }
    }

    pub fn assign(&self, symbol: &str) -> TokenKind {
        TokenKind::Op {
            symbol: self.interner.intern(symbol),
            fixity: Fixity::Assign,
        }
    }

    pub fn prefix(&self, symbol: &str) -> TokenKind {
        TokenKind::Op {
            symbol: self.interner.intern(symbol),
            fixity: Fixity::Prefix,
        }
    }

    /// Parse a kind sequence, assigning sequential one-byte spans.
    pub fn parse(&self, kinds: &[TokenKind]) -> ParseResult {
        let tokens: Vec<Token> = kinds
            .iter()
            .enumerate()
            .map(|(i, &kind)| Token::new(kind, Span::new(i as u32, i as u32 + 1)))
            .collect();
        let tokens = TokenList::new(tokens);
        parse_expression(&tokens, &self.order, &self.index, &self.interner)
    }
}
