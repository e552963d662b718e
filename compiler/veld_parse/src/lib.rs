//! Precedence-climbing expression parser.
//!
//! Consumes a token stream from an external lexer, the [`ResolvedOrder`]
//! from `veld_prec`, and the [`CapabilityIndex`] from `veld_caps`, and
//! produces a flat expression AST. The parser holds read-only references to
//! the resolved artifacts; any number of parses may run concurrently against
//! the same pair.
//!
//! Climbing works directly on the partial order: instead of integer binding
//! powers, the parser tracks a minimum level and queries
//! [`ResolvedOrder::relation`] per operator. Two levels that compare
//! [`Undetermined`](veld_prec::Relation::Undetermined) inside one expression
//! are a parse error - the declarations never ordered them, and the parser
//! refuses to guess.
//!
//! Input is a `;`-separated statement sequence. A parse error poisons only
//! the current expression; the parser resynchronizes at the next statement
//! boundary and continues, reporting every error at the end.

mod cursor;
mod error;
mod expr;
mod recovery;

#[cfg(test)]
mod tests;

pub use cursor::Cursor;
pub use error::ParseError;
pub use recovery::{synchronize, TokenSet};

use veld_caps::CapabilityIndex;
use veld_diagnostic::ErrorCode;
use veld_ir::{ExprArena, ExprId, StringInterner, TokenKind, TokenList};
use veld_prec::ResolvedOrder;

/// Parser state.
pub struct Parser<'a> {
    cursor: Cursor<'a>,
    arena: ExprArena,
    order: &'a ResolvedOrder,
    index: &'a CapabilityIndex,
    interner: &'a StringInterner,
}

impl<'a> Parser<'a> {
    /// Create a new parser over resolved artifacts.
    pub fn new(
        tokens: &'a TokenList,
        order: &'a ResolvedOrder,
        index: &'a CapabilityIndex,
        interner: &'a StringInterner,
    ) -> Self {
        Parser {
            cursor: Cursor::new(tokens),
            arena: ExprArena::new(),
            order,
            index,
            interner,
        }
    }

    /// Parse the whole statement sequence.
    pub fn parse_program(mut self) -> ParseResult {
        let mut exprs = Vec::new();
        let mut errors = Vec::new();

        while !self.cursor.is_at_end() {
            // Empty statements are legal separators.
            if self.cursor.check(TokenKind::Semi) {
                self.cursor.advance();
                continue;
            }
            match self.parse_expr_top() {
                Ok(expr) => {
                    exprs.push(expr);
                    match self.cursor.current_kind() {
                        TokenKind::Semi => self.cursor.advance(),
                        TokenKind::Eof => {}
                        found => {
                            errors.push(ParseError::new(
                                ErrorCode::E3001,
                                format!(
                                    "expected `;` or end of input, found {}",
                                    self.describe(found)
                                ),
                                self.cursor.current_span(),
                            ));
                            self.recover_to_next_statement();
                        }
                    }
                }
                Err(error) => {
                    errors.push(error);
                    self.recover_to_next_statement();
                }
            }
        }

        ParseResult {
            exprs,
            arena: self.arena,
            errors,
        }
    }

    /// Recovery: skip to the next statement boundary and step over it.
    fn recover_to_next_statement(&mut self) {
        recovery::synchronize(&mut self.cursor, TokenSet::STMT_BOUNDARY);
        if self.cursor.check(TokenKind::Semi) {
            self.cursor.advance();
        }
    }

    /// Human-readable description of a token for error messages.
    fn describe(&self, kind: TokenKind) -> String {
        match kind {
            TokenKind::Atom { name, .. } => format!("atom `{}`", self.interner.lookup(name)),
            TokenKind::Op { symbol, .. } => {
                format!("operator `{}`", self.interner.lookup(symbol))
            }
            TokenKind::LParen => "`(`".to_owned(),
            TokenKind::RParen => "`)`".to_owned(),
            TokenKind::Semi => "`;`".to_owned(),
            TokenKind::Eof => "end of input".to_owned(),
        }
    }
}

/// Parse result containing expressions, arena, and any errors.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ParseResult {
    /// Top-level expressions in statement order.
    pub exprs: Vec<ExprId>,
    pub arena: ExprArena,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Parse a token stream into expressions against resolved artifacts.
pub fn parse_expression(
    tokens: &TokenList,
    order: &ResolvedOrder,
    index: &CapabilityIndex,
    interner: &StringInterner,
) -> ParseResult {
    Parser::new(tokens, order, index, interner).parse_program()
}
