//! String interner for identifier storage.
//!
//! Provides O(1) interning and lookup with thread-safe access via a single
//! read/write lock. The declaration phase interns level names, capability
//! names, operator symbols, and binding names - a few dozen strings per
//! compilation unit set - after which the interner is only read.

use crate::Name;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Interner storage behind the lock.
struct Inner {
    /// Map from string content to index.
    map: FxHashMap<&'static str, u32>,
    /// Storage for string contents.
    strings: Vec<&'static str>,
}

/// Thread-safe string interner.
///
/// Interned strings are leaked to obtain `&'static str` handles, which keeps
/// lookups allocation-free and lets resolved artifacts hold plain references.
/// The interner lives for the whole compilation, so the leak is bounded by
/// the set of distinct identifiers in the input.
pub struct StringInterner {
    inner: RwLock<Inner>,
}

impl StringInterner {
    /// Create a new interner with the empty string pre-interned at index 0.
    pub fn new() -> Self {
        let empty: &'static str = "";
        let mut map = FxHashMap::default();
        map.insert(empty, 0);
        StringInterner {
            inner: RwLock::new(Inner {
                map,
                strings: vec![empty],
            }),
        }
    }

    /// Intern a string, returning its `Name`.
    ///
    /// Returns the existing `Name` if the string was interned before.
    pub fn intern(&self, s: &str) -> Name {
        {
            let inner = self.inner.read();
            if let Some(&idx) = inner.map.get(s) {
                return Name::from_raw(idx);
            }
        }

        let mut inner = self.inner.write();
        // Re-check under the write lock: another thread may have interned
        // the same string between the read and write sections.
        if let Some(&idx) = inner.map.get(s) {
            return Name::from_raw(idx);
        }
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let idx = u32::try_from(inner.strings.len()).unwrap_or_else(|_| {
            panic!("interner exceeded u32::MAX strings");
        });
        inner.strings.push(leaked);
        inner.map.insert(leaked, idx);
        Name::from_raw(idx)
    }

    /// Look up the text for a `Name`.
    ///
    /// # Panics
    /// Panics if the `Name` was not produced by this interner.
    pub fn lookup(&self, name: Name) -> &'static str {
        let inner = self.inner.read();
        inner.strings[name.index()]
    }

    /// Number of interned strings (including the pre-interned empty string).
    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    /// Whether only the pre-interned empty string is present.
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let interner = StringInterner::new();
        let a = interner.intern("AddSub");
        let b = interner.intern("AddSub");
        assert_eq!(a, b);
        assert_eq!(interner.lookup(a), "AddSub");
    }

    #[test]
    fn empty_string_is_pre_interned() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
    }

    #[test]
    fn distinct_strings_get_distinct_names() {
        let interner = StringInterner::new();
        let a = interner.intern("<=");
        let b = interner.intern("<");
        assert_ne!(a, b);
        assert_eq!(interner.lookup(b), "<");
    }
}
