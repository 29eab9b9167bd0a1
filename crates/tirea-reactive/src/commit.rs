//! Commit engine.
//!
//! Folds a set of pending writes into a new snapshot. The base snapshot is
//! never modified: the draft starts as a cheap clone of the base and every
//! container on a written path is copied with `Rc::make_mut` the first time
//! the commit reaches it. Containers already copied by this commit are
//! mutated in place, and everything off the written paths stays shared.

use crate::buffer::PendingWrite;
use crate::{Key, Path, ReactiveError, ReactiveResult, Value};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// What to do with a write whose path cannot be applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// The first invalid write aborts the commit. Nothing is produced and
    /// the buffer keeps every write.
    #[default]
    AbortAll,
    /// Invalid writes are dropped and reported; the rest are committed.
    SkipInvalid,
}

/// A write dropped under [`CommitPolicy::SkipInvalid`].
#[derive(Debug)]
pub struct SkippedWrite {
    pub path: Path,
    pub error: ReactiveError,
}

/// Result of folding pending writes into a base snapshot.
#[derive(Debug)]
pub struct CommitOutcome {
    /// The new snapshot.
    pub state: Value,
    /// Number of writes applied.
    pub applied: usize,
    /// Writes dropped under [`CommitPolicy::SkipInvalid`].
    pub skipped: Vec<SkippedWrite>,
}

/// Apply `writes` to `base` in order (pure function).
///
/// # Examples
///
/// ```
/// use tirea_reactive::{commit_writes, path, CommitPolicy, PendingWrite, Value};
/// use serde_json::json;
///
/// let base = Value::from(json!({"a": {"b": 1}, "c": {"d": 2}}));
/// let writes = [PendingWrite::new(path!("a", "b"), Value::from(2))];
///
/// let outcome = commit_writes(&base, &writes, CommitPolicy::AbortAll).unwrap();
/// assert_eq!(outcome.state.to_json(), json!({"a": {"b": 2}, "c": {"d": 2}}));
///
/// // The untouched sibling is the same allocation in both snapshots.
/// let c = path!("c");
/// assert!(base.get_in(c.keys()).unwrap().ptr_eq(outcome.state.get_in(c.keys()).unwrap()));
/// ```
pub fn commit_writes<'a>(
    base: &Value,
    writes: impl IntoIterator<Item = &'a PendingWrite>,
    policy: CommitPolicy,
) -> ReactiveResult<CommitOutcome> {
    let mut draft = base.clone();
    let mut applied = 0;
    let mut skipped = Vec::new();

    for write in writes {
        match apply_write(&mut draft, &write.path, write.value.clone()) {
            Ok(()) => applied += 1,
            Err(error) => match policy {
                CommitPolicy::AbortAll => return Err(error),
                CommitPolicy::SkipInvalid => skipped.push(SkippedWrite {
                    path: write.path.clone(),
                    error,
                }),
            },
        }
    }

    Ok(CommitOutcome {
        state: draft,
        applied,
        skipped,
    })
}

/// Return a copy of `base` with `value` stored at `keys`, sharing everything
/// off that path.
pub fn set_in(base: &Value, keys: &[Key], value: Value) -> ReactiveResult<Value> {
    let path = Path::from_keys(keys.to_vec());
    let mut draft = base.clone();
    apply_write(&mut draft, &path, value)?;
    Ok(draft)
}

/// Validate, then write. Validation runs first so a rejected write leaves
/// the draft (including its sharing) exactly as it was.
fn apply_write(draft: &mut Value, path: &Path, value: Value) -> ReactiveResult<()> {
    if path.is_empty() {
        return Err(ReactiveError::EmptyPath);
    }
    validate(draft, path)?;
    write_at(draft, path, 0, value)
}

/// Check that every container along `path` exists and accepts the next key.
fn validate(root: &Value, path: &Path) -> ReactiveResult<()> {
    let last = path.len() - 1;
    let mut node = root;
    for (depth, key) in path.iter().enumerate() {
        match node {
            Value::Object(_) => {}
            Value::Array(_) => {
                if key.as_index().is_none() {
                    return Err(ReactiveError::key_mismatch(path, depth, "array"));
                }
            }
            other => return Err(ReactiveError::path_traversal(path, depth, other.type_name())),
        }
        if depth == last {
            break;
        }
        node = node
            .child(key)
            .ok_or_else(|| ReactiveError::path_traversal(path, depth + 1, "missing"))?;
    }
    Ok(())
}

fn write_at(node: &mut Value, path: &Path, depth: usize, value: Value) -> ReactiveResult<()> {
    let key = &path[depth];
    let is_leaf = depth + 1 == path.len();

    match node {
        Value::Object(map) => {
            let map = Rc::make_mut(map);
            let field = key.to_field();
            if is_leaf {
                map.insert(field, value);
                return Ok(());
            }
            let child = map
                .get_mut(&field)
                .ok_or_else(|| ReactiveError::path_traversal(path, depth + 1, "missing"))?;
            write_at(child, path, depth + 1, value)
        }
        Value::Array(items) => {
            let index = key
                .as_index()
                .ok_or_else(|| ReactiveError::key_mismatch(path, depth, "array"))?;
            let items = Rc::make_mut(items);
            if is_leaf {
                if index < items.len() {
                    items[index] = value;
                } else {
                    items.resize(index, Value::Null);
                    items.push(value);
                }
                return Ok(());
            }
            let child = items
                .get_mut(index)
                .ok_or_else(|| ReactiveError::path_traversal(path, depth + 1, "missing"))?;
            write_at(child, path, depth + 1, value)
        }
        other => Err(ReactiveError::path_traversal(path, depth, other.type_name())),
    }
}
