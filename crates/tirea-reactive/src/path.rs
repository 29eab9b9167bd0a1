//! Paths for addressing locations inside a state tree.
//!
//! A path is a sequence of keys. Each key is either string-like (an object
//! field name or an array index) or an opaque identity token that has no
//! string form at all.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// An identity-only key.
///
/// Two `Opaque` values are equal only if they were cloned from the same
/// token. The optional description is for display and never participates in
/// equality or hashing.
///
/// # Examples
///
/// ```
/// use tirea_reactive::Opaque;
///
/// let a = Opaque::with_description("session");
/// let b = Opaque::with_description("session");
///
/// assert_eq!(a, a.clone());
/// assert_ne!(a, b);
/// ```
#[derive(Clone)]
pub struct Opaque(Rc<OpaqueInner>);

struct OpaqueInner {
    description: Option<String>,
}

impl Opaque {
    /// Create a fresh token without a description.
    pub fn new() -> Self {
        Self(Rc::new(OpaqueInner { description: None }))
    }

    /// Create a fresh token carrying a description for display.
    pub fn with_description(description: impl Into<String>) -> Self {
        Self(Rc::new(OpaqueInner {
            description: Some(description.into()),
        }))
    }

    /// The description given at creation, if any.
    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    #[inline]
    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl Default for Opaque {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Opaque {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Opaque {}

impl Hash for Opaque {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({})@{:#x}", self.description().unwrap_or(""), self.addr())
    }
}

impl fmt::Display for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.description().unwrap_or("opaque"))
    }
}

/// A single key in a [`Path`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// Object field name.
    Name(Rc<str>),
    /// Array index.
    Index(usize),
    /// Identity-only token.
    Opaque(Opaque),
}

impl Key {
    /// Create a name key.
    #[inline]
    pub fn name(name: impl AsRef<str>) -> Self {
        Key::Name(Rc::from(name.as_ref()))
    }

    /// Create an index key.
    #[inline]
    pub fn index(i: usize) -> Self {
        Key::Index(i)
    }

    /// Returns true for opaque keys.
    #[inline]
    pub fn is_opaque(&self) -> bool {
        matches!(self, Key::Opaque(_))
    }

    /// Returns true for names and indices.
    #[inline]
    pub fn is_string_like(&self) -> bool {
        !self.is_opaque()
    }

    /// Get the name if this is a name key.
    #[inline]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Key::Name(n) => Some(&**n),
            _ => None,
        }
    }

    /// Interpret this key as an array index.
    ///
    /// Names qualify only when they are the canonical decimal form of an
    /// index (`"3"`, not `"03"` or `"+3"`).
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(i) => Some(*i),
            Key::Name(n) => {
                let i: usize = n.parse().ok()?;
                (i.to_string() == **n).then_some(i)
            }
            Key::Opaque(_) => None,
        }
    }

    /// Get the token if this is an opaque key.
    #[inline]
    pub fn as_opaque(&self) -> Option<&Opaque> {
        match self {
            Key::Opaque(o) => Some(o),
            _ => None,
        }
    }

    /// Whether two keys address the same slot: opaque keys by identity,
    /// names and indices by their string form.
    pub fn same_slot(&self, other: &Key) -> bool {
        match (self, other) {
            (Key::Opaque(a), Key::Opaque(b)) => a == b,
            (Key::Name(a), Key::Name(b)) => a == b,
            (Key::Index(a), Key::Index(b)) => a == b,
            (Key::Name(_), Key::Index(i)) => self.as_index() == Some(*i),
            (Key::Index(i), Key::Name(_)) => other.as_index() == Some(*i),
            _ => false,
        }
    }

    /// The key as it is stored inside an object: indices become names.
    pub fn to_field(&self) -> Key {
        match self {
            Key::Index(i) => Key::name(i.to_string()),
            other => other.clone(),
        }
    }

    /// Write the string form of this key. Returns false for opaque keys.
    pub(crate) fn write_string_form(&self, out: &mut String) -> bool {
        match self {
            Key::Name(n) => {
                out.push_str(n);
                true
            }
            Key::Index(i) => {
                use std::fmt::Write;
                let _ = write!(out, "{i}");
                true
            }
            Key::Opaque(_) => false,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(n) => write!(f, ".{}", n),
            Key::Index(i) => write!(f, "[{}]", i),
            Key::Opaque(o) => write!(f, "[{}]", o),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::name(s)
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Name(Rc::from(s))
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key::name(s)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i)
    }
}

impl From<Opaque> for Key {
    fn from(o: Opaque) -> Self {
        Key::Opaque(o)
    }
}

impl From<&Opaque> for Key {
    fn from(o: &Opaque) -> Self {
        Key::Opaque(o.clone())
    }
}

/// A location inside a state tree.
///
/// The empty path is the root. Buffered writes always carry a non-empty
/// path.
///
/// # Examples
///
/// ```
/// use tirea_reactive::Path;
///
/// let path = Path::root().key("users").index(0).key("name");
/// assert_eq!(path.len(), 3);
/// assert_eq!(path.to_string(), "$.users[0].name");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<Key>);

impl Path {
    /// Create an empty path (root).
    #[inline]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Create an empty path (alias for `new`).
    #[inline]
    pub fn root() -> Self {
        Self::new()
    }

    /// Create a path from a vector of keys.
    #[inline]
    pub fn from_keys(keys: Vec<Key>) -> Self {
        Self(keys)
    }

    /// Append a name key and return self (builder pattern).
    #[inline]
    pub fn key(mut self, k: impl AsRef<str>) -> Self {
        self.0.push(Key::name(k));
        self
    }

    /// Append an index key and return self (builder pattern).
    #[inline]
    pub fn index(mut self, i: usize) -> Self {
        self.0.push(Key::Index(i));
        self
    }

    /// Append an opaque key and return self (builder pattern).
    #[inline]
    pub fn opaque(mut self, o: &Opaque) -> Self {
        self.0.push(Key::Opaque(o.clone()));
        self
    }

    /// Push a key onto the path (mutating).
    #[inline]
    pub fn push(&mut self, key: impl Into<Key>) {
        self.0.push(key.into());
    }

    /// Pop the last key from the path.
    #[inline]
    pub fn pop(&mut self) -> Option<Key> {
        self.0.pop()
    }

    /// The keys of this path.
    #[inline]
    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    /// Check if this path is empty (root).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of keys in this path.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The last key.
    #[inline]
    pub fn last(&self) -> Option<&Key> {
        self.0.last()
    }

    /// A new path with `key` appended.
    #[inline]
    pub fn child(&self, key: impl Into<Key>) -> Path {
        let mut result = Vec::with_capacity(self.0.len() + 1);
        result.extend(self.0.iter().cloned());
        result.push(key.into());
        Path(result)
    }

    /// The path without its last key.
    #[inline]
    pub fn parent(&self) -> Option<Path> {
        let (_, init) = self.0.split_last()?;
        Some(Path(init.to_vec()))
    }

    /// Check if this path is a prefix of another path (or equal to it).
    #[inline]
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Check if this path is a strict ancestor of another path.
    #[inline]
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.len() < other.len() && self.is_prefix_of(other)
    }

    /// Returns true if any key is opaque.
    #[inline]
    pub fn has_opaque(&self) -> bool {
        self.0.iter().any(Key::is_opaque)
    }

    /// The first `len` keys as a new path.
    #[inline]
    pub fn prefix(&self, len: usize) -> Path {
        Path(self.0[..len].to_vec())
    }

    /// Iterate over the keys.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Key> {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for key in &self.0 {
            write!(f, "{}", key)?;
        }
        Ok(())
    }
}

impl FromIterator<Key> for Path {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Key;
    type IntoIter = std::slice::Iter<'a, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::ops::Index<usize> for Path {
    type Output = Key;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// Construct a `Path` from a sequence of keys.
///
/// String literals become name keys, integers become index keys, and
/// `Opaque` tokens (or references to them) become opaque keys.
///
/// # Examples
///
/// ```
/// use tirea_reactive::{path, Opaque};
///
/// let p = path!("items", 0usize, "name");
/// assert_eq!(p.len(), 3);
///
/// let token = Opaque::new();
/// let p = path!("sessions", &token);
/// assert!(p.has_opaque());
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::Path::root()
    };
    ($($key:expr),+ $(,)?) => {{
        let mut p = $crate::Path::root();
        $(
            p.push($crate::Key::from($key));
        )+
        p
    }};
}
