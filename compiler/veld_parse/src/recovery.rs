//! Error recovery for the parser.
//!
//! A parse error poisons only the current expression: the parser skips to
//! the next statement boundary and continues with the siblings. Membership
//! testing uses a bitset over token discriminants.

use veld_ir::{TokenKind, TokenTag};

use crate::cursor::Cursor;

// TokenSet uses a u16 bitset, so all discriminant indices must fit in 0..15.
const _: () = assert!(
    TokenTag::MAX_DISCRIMINANT <= 15,
    "TokenSet uses a u16 bitset; all discriminant indices must be < 16"
);

/// A set of token kinds using bitset representation for O(1) membership
/// testing. Each bit corresponds to a [`TokenTag`] discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenSet(u16);

impl TokenSet {
    /// Create an empty token set.
    #[inline]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Add a token tag to this set (builder pattern for const contexts).
    #[inline]
    #[must_use]
    pub const fn with(self, tag: TokenTag) -> Self {
        Self(self.0 | (1u16 << tag as u8))
    }

    /// O(1) membership test.
    #[inline]
    pub const fn contains(self, kind: &TokenKind) -> bool {
        self.0 & (1u16 << kind.tag() as u8) != 0
    }

    /// Statement boundaries: where recovery resynchronizes after an error.
    pub const STMT_BOUNDARY: TokenSet = TokenSet::new().with(TokenTag::Semi).with(TokenTag::Eof);
}

impl Default for TokenSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Skip tokens until one in `set` (or EOF) is reached.
pub fn synchronize(cursor: &mut Cursor<'_>, set: TokenSet) {
    while !cursor.is_at_end() && !set.contains(&cursor.current_kind()) {
        cursor.advance();
    }
}
