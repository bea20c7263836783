use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use thiserror::Error;

/// A reference-counted, immutable frame name.
///
/// Wraps `Arc<str>` so that storing a name into a newly created tree node is
/// a pointer copy plus a refcount bump instead of a heap allocation. Equality
/// starts with an `Arc::ptr_eq` fast path — names canonicalized through an
/// [`Interner`] compare in one pointer comparison — and falls back to value
/// comparison, so correctness never depends on canonicalization.
#[derive(Debug, Clone, Eq)]
pub struct FrameStr(Arc<str>);

impl FrameStr {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for FrameStr {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || *self.0 == *other.0
    }
}

impl PartialEq<str> for FrameStr {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for FrameStr {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl Hash for FrameStr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (*self.0).hash(state);
    }
}

impl std::ops::Deref for FrameStr {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FrameStr {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for FrameStr {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FrameStr {
    #[inline]
    fn from(s: &str) -> Self {
        FrameStr(Arc::from(s))
    }
}

impl From<String> for FrameStr {
    #[inline]
    fn from(s: String) -> Self {
        FrameStr(Arc::from(s.as_str()))
    }
}

impl fmt::Display for FrameStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Rejected frame input. Empty names are a contract violation at the sampler
/// boundary, not something the tree will silently store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame type name must not be empty")]
    EmptyTypeName,
    #[error("frame method name must not be empty")]
    EmptyMethodName,
}

/// Canonical identity of one stack frame: a (type, method) name pair with a
/// combined hash computed once at construction.
///
/// Identity is value equality on both names. The cached hash doubles as the
/// key into the child tables, so it must stay in sync with the names — both
/// are immutable after construction.
#[derive(Debug, Clone)]
pub struct FrameId {
    type_name: FrameStr,
    method_name: FrameStr,
    hash: u64,
}

impl FrameId {
    pub fn new(type_name: &str, method_name: &str) -> Result<Self, FrameError> {
        if type_name.is_empty() {
            return Err(FrameError::EmptyTypeName);
        }
        if method_name.is_empty() {
            return Err(FrameError::EmptyMethodName);
        }
        Ok(FrameId {
            hash: Self::combined_hash(type_name, method_name),
            type_name: type_name.into(),
            method_name: method_name.into(),
        })
    }

    /// Identity of the synthetic tree root. Never reported through traversal.
    pub(crate) fn root() -> Self {
        FrameId {
            type_name: "".into(),
            method_name: "".into(),
            hash: 0,
        }
    }

    /// The hash used for child-table placement: `hash(type) XOR hash(method)`.
    pub fn combined_hash(type_name: &str, method_name: &str) -> u64 {
        hash_str(type_name) ^ hash_str(method_name)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Value comparison against raw query names.
    pub fn matches(&self, type_name: &str, method_name: &str) -> bool {
        self.type_name == type_name && self.method_name == method_name
    }
}

impl PartialEq for FrameId {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.method_name == other.method_name
    }
}

impl Eq for FrameId {}

impl Hash for FrameId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_name, self.method_name)
    }
}

fn hash_str(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Optional canonicalization cache for frame names.
///
/// Samplers that receive freshly allocated name strings on every capture can
/// intern them here so repeated frames share one allocation and hit the
/// [`FrameStr`] pointer-equality fast path. The tree itself never requires
/// interned input.
#[derive(Debug, Default)]
pub struct Interner {
    names: HashSet<FrameStr>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the canonical `FrameStr` for `name`, allocating on first sight.
    pub fn intern(&mut self, name: &str) -> FrameStr {
        if let Some(existing) = self.names.get(name) {
            return existing.clone();
        }
        let name = FrameStr::from(name);
        self.names.insert(name.clone());
        name
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_str_value_equality() {
        let a = FrameStr::from("android.os.Looper");
        let b = FrameStr::from(String::from("android.os.Looper"));
        assert_eq!(a, b);
        assert_eq!(a, "android.os.Looper");
        assert_ne!(a, FrameStr::from("android.os.Handler"));
    }

    #[test]
    fn frame_str_clone_is_equal() {
        let a = FrameStr::from("java.lang.Thread");
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(&*a, &*b);
    }

    #[test]
    fn frame_id_rejects_empty_names() {
        assert_eq!(FrameId::new("", "run"), Err(FrameError::EmptyTypeName));
        assert_eq!(
            FrameId::new("java.lang.Thread", ""),
            Err(FrameError::EmptyMethodName)
        );
    }

    #[test]
    fn frame_id_equality_ignores_allocation() {
        let a = FrameId::new("java.lang.Thread", "run").unwrap();
        let b = FrameId::new("java.lang.Thread", "run").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hash(), b.hash());
        assert!(a.matches("java.lang.Thread", "run"));
        assert!(!a.matches("java.lang.Thread", "start"));
    }

    #[test]
    fn combined_hash_is_xor_of_parts() {
        // XOR makes the combination symmetric and self-cancelling.
        assert_eq!(
            FrameId::combined_hash("a", "b"),
            FrameId::combined_hash("b", "a")
        );
        assert_eq!(FrameId::combined_hash("same", "same"), 0);
    }

    #[test]
    fn display_is_type_colon_method() {
        let id = FrameId::new("android.os.Looper", "loop").unwrap();
        assert_eq!(id.to_string(), "android.os.Looper:loop");
    }

    #[test]
    fn interner_deduplicates() {
        let mut interner = Interner::new();
        let a = interner.intern("java.lang.Thread");
        let b = interner.intern("java.lang.Thread");
        let c = interner.intern("android.os.Looper");
        assert_eq!(interner.len(), 2);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
