//! Process-wide string interning.
//!
//! Identifiers occur everywhere in the kernel (variable, constant, and
//! type-constructor ids), so they are interned once into a global table
//! and passed around as [`Symbol`] handles. Interned strings are leaked
//! to `'static`; after the first `intern` call for a given string,
//! [`Symbol::as_str`] never takes the table lock again.

use std::cmp::Ordering;
use std::fmt;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

static GLOBAL: Lazy<RwLock<Interner>> = Lazy::new(|| RwLock::new(Interner::new()));

/// Handle to an interned string.
///
/// Equality and hashing are O(1) on the handle. Ordering is
/// lexicographic on the underlying string, so sorted output does not
/// depend on interning order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Symbol(u32);

impl Symbol {
    /// Interns `s`, returning its handle.
    pub fn intern(s: &str) -> Symbol {
        if let Some(sym) = GLOBAL.read().expect("interner poisoned").lookup(s) {
            return sym;
        }
        GLOBAL.write().expect("interner poisoned").intern(s)
    }

    /// Resolves the handle back to its string.
    pub fn as_str(self) -> &'static str {
        GLOBAL.read().expect("interner poisoned").resolve(self)
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.0 == other.0 {
            Ordering::Equal
        } else {
            self.as_str().cmp(other.as_str())
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Symbol {
        Symbol::intern(s)
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Err(D::Error::custom("empty symbol"));
        }
        Ok(Symbol::intern(&s))
    }
}

struct Interner {
    map: FxHashMap<&'static str, Symbol>,
    vec: Vec<&'static str>,
}

impl Interner {
    fn new() -> Self {
        Interner {
            map: FxHashMap::default(),
            vec: Vec::new(),
        }
    }

    fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.map.get(s) {
            return sym;
        }
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let sym = Symbol(self.vec.len() as u32);
        self.vec.push(leaked);
        self.map.insert(leaked, sym);
        sym
    }

    fn lookup(&self, s: &str) -> Option<Symbol> {
        self.map.get(s).copied()
    }

    fn resolve(&self, sym: Symbol) -> &'static str {
        self.vec[sym.0 as usize]
    }
}
