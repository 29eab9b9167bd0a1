//! Array mutation emulation.
//!
//! Mutating array methods are computed against a throwaway copy of the
//! visible array. The caller buffers the resulting array as a single
//! whole-array replacement, so list layout changes never turn into
//! per-index writes.

use crate::{ReactiveError, ReactiveResult, Value};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The recognized mutating methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArrayMethod {
    /// Append to the end.
    Push,
    /// Remove from the end.
    Pop,
    /// Remove from the start.
    Shift,
    /// Insert at the start.
    Unshift,
    /// Remove and/or insert a range.
    Splice,
    /// Sort in place.
    Sort,
    /// Reverse in place.
    Reverse,
}

impl ArrayMethod {
    pub const ALL: [ArrayMethod; 7] = [
        ArrayMethod::Push,
        ArrayMethod::Pop,
        ArrayMethod::Shift,
        ArrayMethod::Unshift,
        ArrayMethod::Splice,
        ArrayMethod::Sort,
        ArrayMethod::Reverse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArrayMethod::Push => "push",
            ArrayMethod::Pop => "pop",
            ArrayMethod::Shift => "shift",
            ArrayMethod::Unshift => "unshift",
            ArrayMethod::Splice => "splice",
            ArrayMethod::Sort => "sort",
            ArrayMethod::Reverse => "reverse",
        }
    }
}

impl fmt::Display for ArrayMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArrayMethod {
    type Err = ReactiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArrayMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ReactiveError::unknown_array_method(s))
    }
}

/// A mutating call together with its arguments.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayOp {
    Push(Vec<Value>),
    Pop,
    Shift,
    Unshift(Vec<Value>),
    Splice {
        /// Negative values count from the end.
        start: i64,
        /// `None` removes everything from `start` on.
        delete_count: Option<usize>,
        items: Vec<Value>,
    },
    /// Sort with [`Value::total_cmp`].
    Sort,
    Reverse,
}

impl ArrayOp {
    pub fn method(&self) -> ArrayMethod {
        match self {
            ArrayOp::Push(_) => ArrayMethod::Push,
            ArrayOp::Pop => ArrayMethod::Pop,
            ArrayOp::Shift => ArrayMethod::Shift,
            ArrayOp::Unshift(_) => ArrayMethod::Unshift,
            ArrayOp::Splice { .. } => ArrayMethod::Splice,
            ArrayOp::Sort => ArrayMethod::Sort,
            ArrayOp::Reverse => ArrayMethod::Reverse,
        }
    }

    /// Build an op from a method and positional arguments.
    ///
    /// `splice` takes `(start, delete_count?, ...items)`; with no arguments
    /// it removes nothing. `sort` ignores its arguments.
    pub fn from_call(method: ArrayMethod, args: Vec<Value>) -> ReactiveResult<Self> {
        Ok(match method {
            ArrayMethod::Push => ArrayOp::Push(args),
            ArrayMethod::Pop => ArrayOp::Pop,
            ArrayMethod::Shift => ArrayOp::Shift,
            ArrayMethod::Unshift => ArrayOp::Unshift(args),
            ArrayMethod::Sort => ArrayOp::Sort,
            ArrayMethod::Reverse => ArrayOp::Reverse,
            ArrayMethod::Splice => {
                let mut args = args.into_iter();
                let Some(start) = args.next() else {
                    return Ok(ArrayOp::Splice {
                        start: 0,
                        delete_count: Some(0),
                        items: Vec::new(),
                    });
                };
                let start = integer_arg(&start, "splice start")?;
                let delete_count = match args.next() {
                    Some(count) => Some(integer_arg(&count, "splice delete count")?.max(0) as usize),
                    None => None,
                };
                ArrayOp::Splice {
                    start,
                    delete_count,
                    items: args.collect(),
                }
            }
        })
    }
}

fn integer_arg(value: &Value, what: &str) -> ReactiveResult<i64> {
    if let Some(i) = value.as_i64() {
        return Ok(i);
    }
    match value.as_f64() {
        Some(f) if f.is_finite() => Ok(f.trunc() as i64),
        _ => Err(ReactiveError::invalid_argument(format!(
            "{what} must be a number, got {}",
            value.type_name()
        ))),
    }
}

/// What a mutating method returns.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayOpResult {
    /// New length (`push`, `unshift`).
    Length(usize),
    /// Removed element, `None` when the array was empty (`pop`, `shift`).
    Removed(Option<Value>),
    /// Removed range (`splice`).
    Spliced(Vec<Value>),
    /// The array itself (`sort`, `reverse`).
    Array,
}

impl ArrayOpResult {
    /// The result as a value. `array` stands in for [`ArrayOpResult::Array`].
    pub fn into_value(self, array: Value) -> Value {
        match self {
            ArrayOpResult::Length(len) => Value::from(len),
            ArrayOpResult::Removed(removed) => removed.unwrap_or(Value::Null),
            ArrayOpResult::Spliced(removed) => Value::from(removed),
            ArrayOpResult::Array => array,
        }
    }
}

/// Apply `op` to `items` in place and return what the method returns.
pub fn apply_op(items: &mut Vec<Value>, op: ArrayOp) -> ArrayOpResult {
    match op {
        ArrayOp::Push(values) => {
            items.extend(values);
            ArrayOpResult::Length(items.len())
        }
        ArrayOp::Pop => ArrayOpResult::Removed(items.pop()),
        ArrayOp::Shift => {
            if items.is_empty() {
                ArrayOpResult::Removed(None)
            } else {
                ArrayOpResult::Removed(Some(items.remove(0)))
            }
        }
        ArrayOp::Unshift(values) => {
            items.splice(0..0, values);
            ArrayOpResult::Length(items.len())
        }
        ArrayOp::Splice {
            start,
            delete_count,
            items: inserted,
        } => {
            let (start, end) = splice_range(items.len(), start, delete_count);
            ArrayOpResult::Spliced(items.splice(start..end, inserted).collect())
        }
        ArrayOp::Sort => {
            items.sort_by(Value::total_cmp);
            ArrayOpResult::Array
        }
        ArrayOp::Reverse => {
            items.reverse();
            ArrayOpResult::Array
        }
    }
}

/// Sort `items` in place with a caller-provided comparator (stable).
pub fn sort_with<F>(items: &mut [Value], compare: F)
where
    F: FnMut(&Value, &Value) -> Ordering,
{
    items.sort_by(compare);
}

fn splice_range(len: usize, start: i64, delete_count: Option<usize>) -> (usize, usize) {
    // Offsets beyond `usize` saturate, then clamp to the array bounds.
    let start = if start < 0 {
        len.saturating_sub(usize::try_from(start.unsigned_abs()).unwrap_or(usize::MAX))
    } else {
        usize::try_from(start).unwrap_or(usize::MAX).min(len)
    };
    let available = len - start;
    let count = delete_count.map_or(available, |c| c.min(available));
    (start, start + count)
}
