//! Expression parsing.
//!
//! Precedence climbing over the resolved partial order. The climb tracks a
//! `(min_level, allow_equal)` pair instead of an integer minimum binding
//! power:
//!
//! - an operator whose level compares `Higher` than the minimum is consumed;
//! - `Lower` hands control back to the caller;
//! - `Equal` is consumed only when the caller allowed it (right-associative
//!   recursion), rejected as chaining for none-associative levels, and
//!   otherwise returned to the caller's loop so same-level chains fold left;
//! - `Undetermined` is a hard error naming both levels.
//!
//! Prefix operators bind at a fixed maximal strength: their operand is the
//! next prefix/atom unit, never an infix application.

use veld_caps::{Binding, BindingError};
use veld_diagnostic::ErrorCode;
use veld_ir::{Assoc, Expr, ExprId, ExprKind, Fixity, LevelId, Name, Span, TokenKind, TypeId};
use veld_prec::Relation;
use veld_stack::ensure_sufficient_stack;

use crate::{ParseError, Parser};

impl<'a> Parser<'a> {
    /// Parse one expression starting from no minimum level.
    pub(crate) fn parse_expr_top(&mut self) -> Result<ExprId, ParseError> {
        self.parse_expr(LevelId::LOWEST, false)
    }

    /// Parse an expression at a minimum binding level.
    ///
    /// Uses `ensure_sufficient_stack` to survive deeply nested input.
    fn parse_expr(&mut self, min_level: LevelId, allow_equal: bool) -> Result<ExprId, ParseError> {
        ensure_sufficient_stack(|| self.parse_expr_inner(min_level, allow_equal))
    }

    fn parse_expr_inner(
        &mut self,
        min_level: LevelId,
        allow_equal: bool,
    ) -> Result<ExprId, ParseError> {
        let mut left = self.parse_prefix()?;

        loop {
            let TokenKind::Op { symbol, fixity } = self.cursor.current_kind() else {
                break;
            };
            // A prefix token in operator position ends the expression; the
            // statement loop reports the stray token.
            if fixity == Fixity::Prefix {
                break;
            }

            let op_span = self.cursor.current_span();
            let left_expr = *self.arena.get_expr(left);
            let binding = self.resolve_binding(left_expr.ty, symbol, op_span)?;
            self.check_fixity(binding, fixity, symbol, op_span)?;

            let level = binding.level;
            match self.order.relation(level, min_level) {
                Relation::Undetermined => {
                    return Err(self.precedence_undetermined(level, min_level, op_span));
                }
                Relation::Lower => break,
                Relation::Higher => {}
                Relation::Equal => {
                    if !allow_equal {
                        if self.order.assoc(level) == Assoc::None {
                            return Err(self.non_associative_chaining(level, symbol, op_span));
                        }
                        break;
                    }
                }
            }

            self.cursor.advance();
            let again_on_equal = self.order.assoc(level) == Assoc::Right;
            let right = self.parse_expr(level, again_on_equal)?;

            let right_span = self.arena.get_expr(right).span;
            let span = left_expr.span.merge(right_span);
            let kind = if fixity == Fixity::Assign {
                ExprKind::Assign {
                    op: symbol,
                    binding: binding.id,
                    target: left,
                    value: right,
                }
            } else {
                ExprKind::Infix {
                    op: symbol,
                    binding: binding.id,
                    left,
                    right,
                }
            };
            left = self.arena.alloc_expr(Expr::new(kind, left_expr.ty, span));
        }

        Ok(left)
    }

    /// Parse prefix operators and the atom they apply to.
    ///
    /// The binding resolves against the operand's type, so it is looked up
    /// after the operand parses.
    fn parse_prefix(&mut self) -> Result<ExprId, ParseError> {
        ensure_sufficient_stack(|| self.parse_prefix_inner())
    }

    fn parse_prefix_inner(&mut self) -> Result<ExprId, ParseError> {
        let TokenKind::Op {
            symbol,
            fixity: Fixity::Prefix,
        } = self.cursor.current_kind()
        else {
            return self.parse_primary();
        };

        let op_span = self.cursor.current_span();
        self.cursor.advance();
        let operand = self.parse_prefix()?;
        let operand_expr = *self.arena.get_expr(operand);

        let binding = self.resolve_binding(operand_expr.ty, symbol, op_span)?;
        self.check_fixity(binding, Fixity::Prefix, symbol, op_span)?;

        let span = op_span.merge(operand_expr.span);
        Ok(self.arena.alloc_expr(Expr::new(
            ExprKind::Prefix {
                op: symbol,
                binding: binding.id,
                operand,
            },
            operand_expr.ty,
            span,
        )))
    }

    /// Parse an atom or a parenthesized group.
    fn parse_primary(&mut self) -> Result<ExprId, ParseError> {
        match self.cursor.current_kind() {
            TokenKind::Atom { name, ty } => {
                let span = self.cursor.current_span();
                self.cursor.advance();
                Ok(self
                    .arena
                    .alloc_expr(Expr::new(ExprKind::Atom { name }, ty, span)))
            }
            TokenKind::LParen => {
                self.cursor.advance();
                let inner = self.parse_expr(LevelId::LOWEST, false)?;
                if !self.cursor.check(TokenKind::RParen) {
                    return Err(ParseError::new(
                        ErrorCode::E3001,
                        format!(
                            "expected `)` to close group, found {}",
                            self.describe(self.cursor.current_kind())
                        ),
                        self.cursor.current_span(),
                    ));
                }
                self.cursor.advance();
                Ok(inner)
            }
            found => Err(ParseError::new(
                ErrorCode::E3001,
                format!("expected expression, found {}", self.describe(found)),
                self.cursor.current_span(),
            )),
        }
    }

    /// Resolve the binding for an operator occurrence against the operand's
    /// capability set, converting query errors into parse errors.
    fn resolve_binding(
        &self,
        ty: TypeId,
        symbol: Name,
        span: Span,
    ) -> Result<&'a Binding, ParseError> {
        let index = self.index;
        index.lookup_binding(ty, symbol).map_err(|err| match err {
            BindingError::UnknownOperator { .. } => ParseError::new(
                ErrorCode::E2001,
                format!(
                    "operator `{}` is not defined for type `{}`",
                    self.interner.lookup(symbol),
                    self.interner.lookup(self.index.type_name(ty)),
                ),
                span,
            ),
            BindingError::DiamondConflict { origins, .. } => {
                let origins: Vec<String> = origins
                    .iter()
                    .map(|&o| format!("`{}`", self.interner.lookup(self.index.capability_name(o))))
                    .collect();
                ParseError::new(
                    ErrorCode::E1003,
                    format!(
                        "operator `{}` is ambiguous for type `{}`: unreconciled definitions from {}",
                        self.interner.lookup(symbol),
                        self.interner.lookup(self.index.type_name(ty)),
                        origins.join(" and "),
                    ),
                    span,
                )
            }
        })
    }

    /// The member's declared fixity must match the occurrence.
    fn check_fixity(
        &self,
        binding: &Binding,
        used: Fixity,
        symbol: Name,
        span: Span,
    ) -> Result<(), ParseError> {
        if binding.fixity == used {
            return Ok(());
        }
        Err(ParseError::new(
            ErrorCode::E3001,
            format!(
                "operator `{}` is declared {} but used as {}",
                self.interner.lookup(symbol),
                binding.fixity,
                used,
            ),
            span,
        ))
    }

    fn precedence_undetermined(
        &self,
        op_level: LevelId,
        min_level: LevelId,
        span: Span,
    ) -> ParseError {
        ParseError::new(
            ErrorCode::E2002,
            format!(
                "precedence between levels `{}` and `{}` is undetermined",
                self.interner.lookup(self.order.name(op_level)),
                self.interner.lookup(self.order.name(min_level)),
            ),
            span,
        )
        .with_context("declare an ordering constraint between these levels")
    }

    fn non_associative_chaining(&self, level: LevelId, symbol: Name, span: Span) -> ParseError {
        ParseError::new(
            ErrorCode::E3002,
            format!(
                "operator `{}` of none-associative level `{}` cannot be chained",
                self.interner.lookup(symbol),
                self.interner.lookup(self.order.name(level)),
            ),
            span,
        )
    }
}
