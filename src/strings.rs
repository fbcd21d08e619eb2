//! Interned property-name table.
//!
//! Property names are interned so identical strings share one entry and name
//! comparison is handle equality. Entries carry an explicit reference count:
//! every holder of a [`StringId`] (a property record, a detached descriptor,
//! a bytecode pattern) owns one reference and must release it. The entry is
//! removed when the count reaches zero.

use rustc_hash::FxHashMap;

use crate::arena::{Arena, Id};
use crate::error::{Fatal, fatal};

/// Handle to an interned string.
pub type StringId = Id<StringEntry>;

/// One interned string plus its reference count.
pub struct StringEntry {
    text: Box<str>,
    refs: u32,
}

/// Interning table for property names.
///
/// Interning the same text twice returns the same handle, so two live
/// handles compare equal iff their text is equal.
pub struct StringTable {
    entries: Arena<StringEntry>,
    by_text: FxHashMap<Box<str>, StringId>,
}

impl StringTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: Arena::new(),
            by_text: FxHashMap::default(),
        }
    }

    /// Create a table pre-populated with common property names.
    ///
    /// The table itself holds one reference to each, pinning them for the
    /// heap's lifetime.
    pub fn with_common_names() -> Self {
        let mut table = Self::new();
        for s in COMMON_NAMES {
            table.intern(s);
        }
        table
    }

    /// Intern a string: returns the existing handle with its count
    /// incremented, or a fresh entry with count 1.
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.by_text.get(s) {
            self.ref_string(id);
            return id;
        }
        let id = self.entries.insert(StringEntry {
            text: s.into(),
            refs: 1,
        });
        self.by_text.insert(s.into(), id);
        id
    }

    /// Take an additional reference to an interned string.
    pub fn ref_string(&mut self, id: StringId) {
        match self.entries.get_mut(id) {
            Some(entry) => {
                if entry.refs == u32::MAX {
                    fatal(Fatal::RefCountLimit);
                }
                entry.refs += 1;
            }
            None => fatal(Fatal::DeadHandle),
        }
    }

    /// Release one reference. The entry is removed at zero.
    pub fn deref_string(&mut self, id: StringId) {
        let remove = match self.entries.get_mut(id) {
            Some(entry) => {
                debug_assert!(entry.refs > 0);
                entry.refs -= 1;
                entry.refs == 0
            }
            None => fatal(Fatal::DeadHandle),
        };
        if remove {
            if let Some(entry) = self.entries.remove(id) {
                self.by_text.remove(&entry.text);
            }
        }
    }

    /// The text behind a handle.
    pub fn resolve(&self, id: StringId) -> &str {
        match self.entries.get(id) {
            Some(entry) => &entry.text,
            None => fatal(Fatal::DeadHandle),
        }
    }

    /// Current reference count of an entry. Diagnostics and tests.
    pub fn ref_count(&self, id: StringId) -> u32 {
        match self.entries.get(id) {
            Some(entry) => entry.refs,
            None => fatal(Fatal::DeadHandle),
        }
    }

    /// Whether the handle still resolves.
    pub fn contains(&self, id: StringId) -> bool {
        self.entries.contains(id)
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Names that appear on almost every object graph.
const COMMON_NAMES: &[&str] = &[
    "length",
    "prototype",
    "constructor",
    "name",
    "value",
    "writable",
    "enumerable",
    "configurable",
    "get",
    "set",
    "toString",
    "valueOf",
    "arguments",
    "caller",
    "callee",
];
