//! Write buffer: pending writes addressed by path.
//!
//! Two indices are kept. Paths made only of names and indices are stored
//! under a composite string key, which gives O(1) lookup. Paths containing
//! an opaque key have no string form and live in a list that is scanned
//! linearly; lookups there are O(m) in the number of opaque-keyed entries.
//!
//! The composite key joins key strings with [`KEY_SEPARATOR`]. A name that
//! itself contains the separator can collide with a different path. Such
//! names are not supported.

use crate::commit::set_in;
use crate::{Key, Path, ReactiveError, ReactiveResult, Value};
use indexmap::IndexMap;

/// Separator used to build composite keys for string-like paths.
pub const KEY_SEPARATOR: char = '\u{1f}';

/// A buffered `(path, value)` pair.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingWrite {
    pub path: Path,
    pub value: Value,
}

impl PendingWrite {
    #[inline]
    pub fn new(path: Path, value: Value) -> Self {
        Self { path, value }
    }
}

/// Staging area for writes that have not been committed yet.
#[derive(Clone, Debug, Default)]
pub struct WriteBuffer {
    keyed: IndexMap<String, PendingWrite>,
    opaque: Vec<PendingWrite>,
}

fn same_keys(a: &[Key], b: &[Key]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_slot(y))
}

fn is_ancestor(prefix: &[Key], keys: &[Key]) -> bool {
    prefix.len() < keys.len() && same_keys(prefix, &keys[..prefix.len()])
}

fn composite_key(keys: &[Key]) -> Option<String> {
    let mut out = String::new();
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            out.push(KEY_SEPARATOR);
        }
        if !key.write_string_form(&mut out) {
            return None;
        }
    }
    Some(out)
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.keyed.len() + self.opaque.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keyed.is_empty() && self.opaque.is_empty()
    }

    /// Number of entries in the linearly scanned opaque index.
    #[inline]
    pub fn opaque_len(&self) -> usize {
        self.opaque.len()
    }

    /// Look up the value buffered for exactly `keys`.
    pub fn get(&self, keys: &[Key]) -> Option<&Value> {
        if self.is_empty() {
            return None;
        }
        match composite_key(keys) {
            Some(composite) => self.keyed.get(&composite).map(|w| &w.value),
            None => self
                .opaque
                .iter()
                .find(|w| same_keys(w.path.keys(), keys))
                .map(|w| &w.value),
        }
    }

    /// Buffer `value` at `path`.
    ///
    /// A string-like path that is already buffered is overwritten and moves
    /// to the end of the drain order. An opaque-keyed path that is already
    /// buffered is overwritten in place; one that extends a buffered
    /// opaque-keyed path is folded into the deepest such entry.
    pub fn set(&mut self, path: Path, value: Value) -> ReactiveResult<()> {
        if path.is_empty() {
            return Err(ReactiveError::EmptyPath);
        }
        match composite_key(path.keys()) {
            Some(composite) => {
                let write = PendingWrite::new(path, value);
                match self.keyed.get_index_of(&composite) {
                    Some(i) if i + 1 == self.keyed.len() => self.keyed[i] = write,
                    Some(i) => {
                        self.keyed.shift_remove_index(i);
                        self.keyed.insert(composite, write);
                    }
                    None => {
                        self.keyed.insert(composite, write);
                    }
                }
            }
            None => self.set_opaque(path, value),
        }
        Ok(())
    }

    fn set_opaque(&mut self, path: Path, value: Value) {
        let keys = path.keys();
        if let Some(entry) = self.opaque.iter_mut().find(|w| same_keys(w.path.keys(), keys)) {
            entry.value = value;
            return;
        }

        let deepest = self
            .opaque
            .iter()
            .enumerate()
            .filter(|(_, w)| is_ancestor(w.path.keys(), keys))
            .max_by_key(|(_, w)| w.path.len())
            .map(|(i, _)| i);
        if let Some(i) = deepest {
            let rest = &keys[self.opaque[i].path.len()..];
            if let Ok(merged) = set_in(&self.opaque[i].value, rest, value.clone()) {
                self.opaque[i].value = merged;
                // Entries below the written path are superseded by it.
                self.opaque.retain(|w| !is_ancestor(keys, w.path.keys()));
                return;
            }
        }
        // No buffered subtree can hold this write; keep it separate so the
        // commit reports it.
        self.opaque.push(PendingWrite::new(path, value));
    }

    /// Replace the subtree at `path`, evicting every entry strictly below it.
    ///
    /// Callers must have folded the evicted entries into `value` already.
    pub fn replace_subtree(&mut self, path: Path, value: Value) -> ReactiveResult<()> {
        self.keyed.retain(|_, w| !is_ancestor(path.keys(), w.path.keys()));
        self.opaque.retain(|w| !is_ancestor(path.keys(), w.path.keys()));
        self.set(path, value)
    }

    /// Pending writes in drain order: string-like paths first, then
    /// opaque-keyed paths, each in the order they were recorded.
    ///
    /// A string-like path that was overwritten sorts by its latest write.
    pub fn pending(&self) -> impl Iterator<Item = &PendingWrite> {
        self.keyed.values().chain(self.opaque.iter())
    }

    /// Remove and return every pending write in drain order.
    pub fn drain(&mut self) -> Vec<PendingWrite> {
        let mut out: Vec<PendingWrite> = self.keyed.drain(..).map(|(_, w)| w).collect();
        out.append(&mut self.opaque);
        out
    }

    pub fn clear(&mut self) {
        self.keyed.clear();
        self.opaque.clear();
    }

    /// Resolve `keys` against `root` with buffered values taking precedence.
    ///
    /// Walking from the root, a buffered value at a prefix replaces whatever
    /// the walk reached so far. `None` means the location holds no value.
    pub fn read_through(&self, root: &Value, keys: &[Key]) -> Option<Value> {
        if self.is_empty() {
            return root.get_in(keys).cloned();
        }
        let mut current: Option<Value> = Some(root.clone());
        for depth in 1..=keys.len() {
            current = match self.get(&keys[..depth]) {
                Some(buffered) => Some(buffered.clone()),
                None => current.and_then(|node| node.child(&keys[depth - 1]).cloned()),
            };
        }
        current
    }

    /// The value currently visible at `path`: [`read_through`](Self::read_through)
    /// plus every buffered write strictly below `path`, in drain order.
    ///
    /// Writes that cannot be applied are left out; the commit reports them.
    pub fn materialize(&self, root: &Value, path: &Path) -> Option<Value> {
        let mut value = self.read_through(root, path.keys())?;
        for write in self.pending().filter(|w| is_ancestor(path.keys(), w.path.keys())) {
            let rest = &write.path.keys()[path.len()..];
            if let Ok(next) = set_in(&value, rest, write.value.clone()) {
                value = next;
            }
        }
        Some(value)
    }
}
