//! Process-wide string interner for node labels and contents.
//!
//! Every label and content string is unified into a [`Sym`], so equality and
//! hashing are a single integer comparison. The pool only grows; interned text
//! lives for the rest of the process.
//!
//! Ordering between symbols follows assignment order, not lexical order. It is
//! only ever used for tie-breaking, never for correctness.

use core::fmt;
use rapidhash::RapidHashMap as HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};

/// Handle to an interned string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sym(u32);

impl Sym {
    /// The reserved handle for empty (or whitespace-only) text.
    pub const EMPTY: Sym = Sym(0);

    /// Intern `text` and return its handle.
    ///
    /// Leading whitespace is stripped first; text that is empty after
    /// stripping maps to [`Sym::EMPTY`].
    pub fn intern(text: &str) -> Sym {
        let text = text.trim_start();
        if text.is_empty() {
            return Sym::EMPTY;
        }
        POOL.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .intern(text)
    }

    /// Whether this is the empty handle.
    #[inline]
    pub fn is_empty(self) -> bool {
        self == Sym::EMPTY
    }

    /// The interned text.
    pub fn as_str(self) -> &'static str {
        POOL.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .resolve(self)
    }

    /// Raw handle value (assignment order).
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl From<&str> for Sym {
    fn from(text: &str) -> Self {
        Sym::intern(text)
    }
}

impl fmt::Display for Sym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Sym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sym({}:{:?})", self.0, self.as_str())
    }
}

static POOL: LazyLock<Mutex<Pool>> = LazyLock::new(|| Mutex::new(Pool::new()));

struct Pool {
    lookup: HashMap<&'static str, Sym>,
    strings: Vec<&'static str>,
}

impl Pool {
    fn new() -> Self {
        Self {
            lookup: HashMap::default(),
            // slot 0 is Sym::EMPTY
            strings: vec![""],
        }
    }

    fn intern(&mut self, text: &str) -> Sym {
        if let Some(&sym) = self.lookup.get(text) {
            return sym;
        }
        let stored: &'static str = Box::leak(text.to_owned().into_boxed_str());
        let sym = Sym(self.strings.len() as u32);
        self.strings.push(stored);
        self.lookup.insert(stored, sym);
        sym
    }

    fn resolve(&self, sym: Sym) -> &'static str {
        self.strings.get(sym.0 as usize).copied().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn test_same_text_same_handle() {
        let a = Sym::intern("paragraph");
        let b = Sym::intern("paragraph");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "paragraph");
    }

    #[test]
    fn test_different_text_different_handle() {
        assert_ne!(Sym::intern("alpha-intern"), Sym::intern("beta-intern"));
    }

    #[test]
    fn test_leading_whitespace_is_stripped() {
        assert_eq!(Sym::intern("  \n\tword"), Sym::intern("word"));
    }

    #[test]
    fn test_blank_text_is_empty() {
        assert_eq!(Sym::intern(""), Sym::EMPTY);
        assert_eq!(Sym::intern(" \n\t "), Sym::EMPTY);
        assert!(Sym::EMPTY.is_empty());
        assert_eq!(Sym::EMPTY.as_str(), "");
    }
}
