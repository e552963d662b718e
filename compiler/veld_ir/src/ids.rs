//! Index newtypes for resolved artifacts.
//!
//! Every table built by the resolvers is a contiguous array indexed by one of
//! these 32-bit handles. Comparing handles is O(1); the table that issued a
//! handle is the only place it can be dereferenced.

use std::fmt;

macro_rules! define_index {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Create a new index.
            #[inline]
            pub const fn new(index: u32) -> Self {
                $name(index)
            }

            /// Index into the owning table.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Get the raw u32 value.
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

define_index! {
    /// Index of a precedence level in a `ResolvedOrder`.
    ///
    /// The sentinels occupy fixed slots: `Lowest` is 0, `Highest` is 1, user
    /// levels follow in declaration order.
    LevelId
}

define_index! {
    /// Index of a capability in a `CapabilityRegistry`.
    CapabilityId
}

define_index! {
    /// Index of a registered operand type.
    TypeId
}

define_index! {
    /// Index of a resolved operator binding.
    ///
    /// Identical `(operand type, symbol)` queries always resolve to the same
    /// `BindingId`; the handle is the implementation reference the parser
    /// records in the AST.
    BindingId
}

define_index! {
    /// Index of a default or specialization body in the capability registry's
    /// body arena.
    BodyId
}

impl LevelId {
    /// The reserved `Lowest` sentinel level.
    pub const LOWEST: LevelId = LevelId(0);
    /// The reserved `Highest` sentinel level.
    pub const HIGHEST: LevelId = LevelId(1);
    /// Number of sentinel levels preceding user declarations.
    pub const SENTINEL_COUNT: u32 = 2;
}
