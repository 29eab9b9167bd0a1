//! Views: the read/write façade over a state tree.
//!
//! A view holds the state handle and its own path, never a copy of the
//! data. Every access resolves against the write buffer first and the
//! committed snapshot second, so a view stays valid across writes and
//! commits. Children are wrapped on access.

use crate::array::{self, ArrayMethod, ArrayOp, ArrayOpResult};
use crate::{Key, Path, ReactiveResult, ReactiveState, Value};
use std::cmp::Ordering;
use tracing::{trace, warn};

/// Result of reading through a view.
#[derive(Clone, Debug)]
pub enum Read {
    /// A scalar (null, bool, number, string).
    Value(Value),
    /// A nested object, wrapped.
    Object(ObjectView),
    /// A nested array, wrapped with the mutation emulation.
    Array(ArrayView),
}

impl Read {
    fn wrap(state: &ReactiveState, path: Path, value: Value) -> Self {
        match value {
            Value::Object(_) => Read::Object(ObjectView::new(state.clone(), path)),
            Value::Array(_) => Read::Array(ArrayView::new(state.clone(), path)),
            scalar => Read::Value(scalar),
        }
    }

    /// The scalar, if this read produced one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Read::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<ObjectView> {
        match self {
            Read::Object(view) => Some(view),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<ArrayView> {
        match self {
            Read::Array(view) => Some(view),
            _ => None,
        }
    }

    /// The visible value, with buffered writes folded into containers.
    pub fn to_value(&self) -> Value {
        match self {
            Read::Value(v) => v.clone(),
            Read::Object(view) => view.to_value(),
            Read::Array(view) => view.to_value(),
        }
    }
}

fn field(key: impl Into<Key>) -> Key {
    let key: Key = key.into();
    key.to_field()
}

fn resolve(state: &ReactiveState, path: Path) -> Option<Read> {
    let value = state.get(&path)?;
    Some(Read::wrap(state, path, value))
}

/// View over an object node.
#[derive(Clone, Debug)]
pub struct ObjectView {
    state: ReactiveState,
    path: Path,
}

impl ObjectView {
    pub(crate) fn new(state: ReactiveState, path: Path) -> Self {
        Self { state, path }
    }

    /// Path of this object.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read `key`. `None` when the object has no such key.
    pub fn get(&self, key: impl Into<Key>) -> Option<Read> {
        resolve(&self.state, self.path.child(field(key)))
    }

    /// Read `key` as a plain value, with buffered writes below it folded in.
    pub fn value(&self, key: impl Into<Key>) -> Option<Value> {
        self.state.materialize(&self.path.child(field(key)))
    }

    /// Read `key` if it holds an object.
    pub fn object(&self, key: impl Into<Key>) -> Option<ObjectView> {
        self.get(key)?.into_object()
    }

    /// Read `key` if it holds an array.
    pub fn array(&self, key: impl Into<Key>) -> Option<ArrayView> {
        self.get(key)?.into_array()
    }

    /// Buffer a write to `key`. The committed snapshot is not touched.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) {
        self.state.stage(self.path.child(field(key)), value.into());
    }

    pub fn contains_key(&self, key: impl Into<Key>) -> bool {
        self.get(key).is_some()
    }

    /// Visible keys, in order.
    pub fn keys(&self) -> Vec<Key> {
        match self.to_value() {
            Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// The visible object, with buffered writes folded in.
    pub fn to_value(&self) -> Value {
        self.state.materialize(&self.path).unwrap_or_default()
    }
}

/// View over an array node.
///
/// Mutating methods never touch the backing array. Each one computes its
/// effect on a copy of the visible array and buffers the whole result as a
/// single write at this array's path.
#[derive(Clone, Debug)]
pub struct ArrayView {
    state: ReactiveState,
    path: Path,
}

impl ArrayView {
    pub(crate) fn new(state: ReactiveState, path: Path) -> Self {
        Self { state, path }
    }

    /// Path of this array.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the element at `index`.
    pub fn get(&self, index: usize) -> Option<Read> {
        resolve(&self.state, self.path.child(index))
    }

    /// Buffer a write to the element at `index`.
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        self.state.stage(self.path.child(index), value.into());
    }

    pub fn len(&self) -> usize {
        self.to_vec().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The visible elements, with buffered writes folded in.
    pub fn to_vec(&self) -> Vec<Value> {
        self.visible_items().unwrap_or_default()
    }

    pub fn to_value(&self) -> Value {
        Value::from(self.to_vec())
    }

    /// Append `value`; returns the new length.
    pub fn push(&self, value: impl Into<Value>) -> usize {
        self.length_of(self.apply(ArrayOp::Push(vec![value.into()])))
    }

    /// Remove the last element.
    pub fn pop(&self) -> Option<Value> {
        self.removed(self.apply(ArrayOp::Pop))
    }

    /// Remove the first element.
    pub fn shift(&self) -> Option<Value> {
        self.removed(self.apply(ArrayOp::Shift))
    }

    /// Insert `value` at the front; returns the new length.
    pub fn unshift(&self, value: impl Into<Value>) -> usize {
        self.length_of(self.apply(ArrayOp::Unshift(vec![value.into()])))
    }

    /// Remove `delete_count` elements from `start` (everything when `None`)
    /// and insert `items` there; returns the removed elements.
    pub fn splice(&self, start: i64, delete_count: Option<usize>, items: Vec<Value>) -> Vec<Value> {
        match self.apply(ArrayOp::Splice {
            start,
            delete_count,
            items,
        }) {
            ArrayOpResult::Spliced(removed) => removed,
            other => unreachable!("splice returned {other:?}"),
        }
    }

    /// Sort with [`Value::total_cmp`]; returns this array.
    pub fn sort(&self) -> ArrayView {
        self.apply(ArrayOp::Sort);
        self.clone()
    }

    /// Sort with `compare` (stable); returns this array.
    pub fn sort_by<F>(&self, compare: F) -> ArrayView
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        if let Some(mut items) = self.visible_items() {
            array::sort_with(&mut items, compare);
            trace!(path = %self.path, method = %ArrayMethod::Sort, "array method");
            self.state.replace_subtree(self.path.clone(), Value::from(items));
        }
        self.clone()
    }

    /// Reverse; returns this array.
    pub fn reverse(&self) -> ArrayView {
        self.apply(ArrayOp::Reverse);
        self.clone()
    }

    /// Call a mutating method by name with positional arguments.
    ///
    /// Returns what the method returns: the new length, the removed element
    /// (`null` when there was none), the removed range, or the array itself.
    pub fn invoke(&self, method: &str, args: Vec<Value>) -> ReactiveResult<Value> {
        let method: ArrayMethod = method.parse()?;
        let op = ArrayOp::from_call(method, args)?;
        let result = self.apply(op);
        Ok(match result {
            ArrayOpResult::Array => self.to_value(),
            other => other.into_value(Value::Null),
        })
    }

    fn apply(&self, op: ArrayOp) -> ArrayOpResult {
        let method = op.method();
        let Some(mut items) = self.visible_items() else {
            warn!(path = %self.path, %method, "array method on a non-array ignored");
            return array::apply_op(&mut Vec::new(), op);
        };
        trace!(path = %self.path, %method, "array method");
        let result = array::apply_op(&mut items, op);
        self.state.replace_subtree(self.path.clone(), Value::from(items));
        result
    }

    fn visible_items(&self) -> Option<Vec<Value>> {
        match self.state.materialize(&self.path) {
            Some(Value::Array(items)) => Some((*items).clone()),
            _ => None,
        }
    }

    // `apply_op` returns `Length` for push/unshift and `Removed` for
    // pop/shift; any other variant is a bug in `apply_op`.

    fn length_of(&self, result: ArrayOpResult) -> usize {
        match result {
            ArrayOpResult::Length(len) => len,
            other => unreachable!("push/unshift returned {other:?}"),
        }
    }

    fn removed(&self, result: ArrayOpResult) -> Option<Value> {
        match result {
            ArrayOpResult::Removed(removed) => removed,
            other => unreachable!("pop/shift returned {other:?}"),
        }
    }
}
