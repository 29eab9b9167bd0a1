//! End-to-end tests for buffered reactive state.
//!
//! These tests verify that:
//! 1. Reads observe buffered writes before any commit
//! 2. Commits produce new snapshots and never modify old ones
//! 3. Untouched subtrees are shared between snapshots
//! 4. Array methods behave like their in-place counterparts
//! 5. Opaque keys are addressed by identity
//! 6. The commit callback runs once per non-empty checkpoint

use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use tirea_reactive::{
    path, CommitPolicy, Key, Opaque, Path, ReactiveError, ReactiveState, StateConfig, Value,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn at(value: &Value, path: &Path) -> Value {
    value.get_in(path.keys()).cloned().unwrap_or_default()
}

// ============================================================================
// Read-your-writes
// ============================================================================

#[test]
fn test_read_sees_buffered_write() {
    init_tracing();
    let state = ReactiveState::new(json!({"a": {"b": 1}}));

    state.write(path!("a", "b"), 2).unwrap();

    assert_eq!(state.get(&path!("a", "b")), Some(Value::from(2)));
    let a = state.read().object("a").unwrap();
    assert_eq!(a.value("b"), Some(Value::from(2)));
    assert_eq!(state.snapshot().to_json(), json!({"a": {"b": 1}}));
}

#[test]
fn test_nested_write_through_views() {
    let state = ReactiveState::new(json!({"a": {"b": 1}}));

    state.read().object("a").unwrap().set("b", 2);
    assert_eq!(
        state.read().object("a").unwrap().get("b").unwrap().to_value(),
        Value::from(2)
    );

    state.checkpoint().unwrap();
    assert_eq!(state.snapshot().to_json(), json!({"a": {"b": 2}}));
}

#[test]
fn test_new_key_visible_before_commit() {
    let state = ReactiveState::new(json!({}));
    let root = state.read();

    root.set("user", Value::from(json!({"name": "ada"})));
    let user = root.object("user").unwrap();
    user.set("age", 36);

    assert_eq!(user.to_value().to_json(), json!({"name": "ada", "age": 36}));
    state.checkpoint().unwrap();
    assert_eq!(state.snapshot().to_json(), json!({"user": {"name": "ada", "age": 36}}));
}

#[test]
fn test_redundant_writes_collapse() {
    let state = ReactiveState::new(json!({"x": 0}));

    state.write(path!("x"), 5).unwrap();
    state.write(path!("x"), 5).unwrap();

    assert_eq!(state.pending_writes().len(), 1);
    let report = state.checkpoint().unwrap().unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(state.snapshot().to_json(), json!({"x": 5}));
}

#[test]
fn test_index_and_name_keys_address_same_slot() {
    let state = ReactiveState::new(json!({"list": [0, 0]}));

    state.write(path!("list", 1usize), 1).unwrap();
    state.write(path!("list", "1"), 2).unwrap();

    assert_eq!(state.pending_writes().len(), 1);
    assert_eq!(state.get(&path!("list", 1usize)), Some(Value::from(2)));
}

// ============================================================================
// Commit
// ============================================================================

#[test]
fn test_commit_shares_untouched_subtrees() {
    let state = ReactiveState::new(json!({
        "a": {"b": 1},
        "c": {"d": [1, 2, 3]}
    }));
    let old = state.snapshot();

    state.write(path!("a", "b"), 2).unwrap();
    state.checkpoint().unwrap();
    let new = state.snapshot();

    assert!(at(&old, &path!("c")).ptr_eq(&at(&new, &path!("c"))));
    assert!(!at(&old, &path!("a")).ptr_eq(&at(&new, &path!("a"))));
    assert!(!old.ptr_eq(&new));
    assert_eq!(old.to_json(), json!({"a": {"b": 1}, "c": {"d": [1, 2, 3]}}));
}

#[test]
fn test_empty_checkpoint_is_noop() {
    let state = ReactiveState::new(json!({"a": 1}));
    let before = state.snapshot();

    assert!(state.checkpoint().unwrap().is_none());
    assert_eq!(state.revision(), 0);
    assert!(before.ptr_eq(&state.snapshot()));
}

#[test]
fn test_revision_advances_per_commit() {
    let state = ReactiveState::new(json!({"n": 0}));
    for n in 1..=3 {
        state.write(path!("n"), n).unwrap();
        let report = state.checkpoint().unwrap().unwrap();
        assert_eq!(report.revision, n as u64);
    }
    assert_eq!(state.revision(), 3);
}

#[test]
fn test_invalid_write_aborts_and_keeps_buffer() {
    init_tracing();
    let state = ReactiveState::new(json!({"a": 1, "b": 1}));

    state.write(path!("b"), 2).unwrap();
    state.write(path!("a", "x"), 1).unwrap();

    let err = state.checkpoint().unwrap_err();
    assert!(matches!(err, ReactiveError::PathTraversal { .. }));
    assert!(state.is_dirty());
    assert_eq!(state.pending_writes().len(), 2);
    assert_eq!(state.snapshot().to_json(), json!({"a": 1, "b": 1}));
    assert_eq!(state.revision(), 0);
}

#[test]
fn test_skip_invalid_commits_the_rest() {
    let config = StateConfig::default().with_commit_policy(CommitPolicy::SkipInvalid);
    let state = ReactiveState::with_config(json!({"a": 1, "b": 1}), config);

    state.write(path!("b"), 2).unwrap();
    state.write(path!("a", "x"), 1).unwrap();

    let report = state.checkpoint().unwrap().unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].path, path!("a", "x"));
    assert!(!state.is_dirty());
    assert_eq!(state.snapshot().to_json(), json!({"a": 1, "b": 2}));
}

#[test]
fn test_write_past_array_end_pads_with_null() {
    let state = ReactiveState::new(json!({"list": [1]}));
    state.write(path!("list", 3usize), 4).unwrap();
    state.checkpoint().unwrap();
    assert_eq!(state.snapshot().to_json(), json!({"list": [1, null, null, 4]}));
}

// ============================================================================
// Ancestor and descendant writes in one batch
// ============================================================================

#[test]
fn test_ancestor_written_after_descendant() {
    let state = ReactiveState::new(json!({"a": {"b": 1}}));

    state.write(path!("a", "b"), 2).unwrap();
    state.write(path!("a"), Value::from(json!({"b": 5}))).unwrap();

    // The read walks top-down and the deeper buffered entry is found last.
    assert_eq!(state.get(&path!("a", "b")), Some(Value::from(2)));

    // The commit applies writes in drain order, so the later ancestor wins.
    state.checkpoint().unwrap();
    assert_eq!(state.snapshot().to_json(), json!({"a": {"b": 5}}));
}

#[test]
fn test_descendant_written_after_ancestor() {
    let state = ReactiveState::new(json!({"a": {"b": 1}}));

    state.write(path!("a"), Value::from(json!({"b": 5, "c": 0}))).unwrap();
    state.write(path!("a", "b"), 2).unwrap();

    assert_eq!(state.get(&path!("a", "b")), Some(Value::from(2)));
    state.checkpoint().unwrap();
    assert_eq!(state.snapshot().to_json(), json!({"a": {"b": 2, "c": 0}}));
}

// ============================================================================
// Arrays
// ============================================================================

#[test]
fn test_push_returns_new_length() {
    let state = ReactiveState::new(json!({"list": [1, 2, 3]}));
    let list = state.read().array("list").unwrap();

    assert_eq!(list.push(4), 4);
    assert_eq!(list.to_value().to_json(), json!([1, 2, 3, 4]));
    assert_eq!(state.snapshot().to_json(), json!({"list": [1, 2, 3]}));

    state.checkpoint().unwrap();
    assert_eq!(state.snapshot().to_json(), json!({"list": [1, 2, 3, 4]}));
}

#[test]
fn test_pop_returns_last_element() {
    let state = ReactiveState::new(json!({"list": [1, 2, 3]}));
    let list = state.read().array("list").unwrap();

    assert_eq!(list.pop(), Some(Value::from(3)));
    assert_eq!(list.len(), 2);
    state.checkpoint().unwrap();
    assert_eq!(state.snapshot().to_json(), json!({"list": [1, 2]}));
}

#[test]
fn test_shift_unshift_splice() {
    let state = ReactiveState::new(json!({"list": ["a", "b", "c", "d"]}));
    let list = state.read().array("list").unwrap();

    assert_eq!(list.shift(), Some(Value::from("a")));
    assert_eq!(list.unshift("z"), 4);
    let removed = list.splice(1, Some(2), vec![Value::from("x")]);

    assert_eq!(Value::from(removed).to_json(), json!(["b", "c"]));
    assert_eq!(list.to_value().to_json(), json!(["z", "x", "d"]));
    assert_eq!(state.pending_writes().len(), 1);
}

#[test]
fn test_sort_and_reverse_chain() {
    let state = ReactiveState::new(json!({"list": [3, "b", null, 1, true, "a"]}));
    let list = state.read().array("list").unwrap();

    list.sort();
    assert_eq!(list.to_value().to_json(), json!([null, true, 1, 3, "a", "b"]));

    let reversed = list.reverse();
    assert_eq!(reversed.to_value().to_json(), json!(["b", "a", 3, 1, true, null]));
}

#[test]
fn test_sort_by_custom_comparator() {
    let state = ReactiveState::new(json!({"list": [1, 3, 2]}));
    let list = state.read().array("list").unwrap();

    list.sort_by(|a, b| b.total_cmp(a));
    assert_eq!(list.to_value().to_json(), json!([3, 2, 1]));
}

#[test]
fn test_array_method_folds_pending_index_writes() {
    let state = ReactiveState::new(json!({"list": [1, 2, 3]}));
    let list = state.read().array("list").unwrap();

    list.set(0, 10);
    list.push(4);

    // The per-index write was folded into the whole-array write.
    assert_eq!(state.pending_writes().len(), 1);
    state.checkpoint().unwrap();
    assert_eq!(state.snapshot().to_json(), json!({"list": [10, 2, 3, 4]}));
}

#[test]
fn test_index_write_after_array_method() {
    let state = ReactiveState::new(json!({"list": [1, 2]}));
    let list = state.read().array("list").unwrap();

    list.push(3);
    list.set(2, 30);

    assert_eq!(list.to_value().to_json(), json!([1, 2, 30]));
    state.checkpoint().unwrap();
    assert_eq!(state.snapshot().to_json(), json!({"list": [1, 2, 30]}));
}

#[test]
fn test_element_views_of_objects_in_arrays() {
    let state = ReactiveState::new(json!({"rows": [{"done": false}, {"done": false}]}));
    let rows = state.read().array("rows").unwrap();

    rows.get(1).unwrap().into_object().unwrap().set("done", true);
    state.checkpoint().unwrap();

    assert_eq!(
        state.snapshot().to_json(),
        json!({"rows": [{"done": false}, {"done": true}]})
    );
}

// ============================================================================
// Opaque keys
// ============================================================================

#[test]
fn test_opaque_keys_are_distinct_by_identity() {
    let state = ReactiveState::new(json!({"rows": {}}));
    let first = Opaque::with_description("row");
    let second = Opaque::with_description("row");

    state.write(path!("rows").opaque(&first), 1).unwrap();
    state.write(path!("rows").opaque(&second), 2).unwrap();

    assert_eq!(state.get(&path!("rows").opaque(&first)), Some(Value::from(1)));
    assert_eq!(state.get(&path!("rows").opaque(&second)), Some(Value::from(2)));
    assert_eq!(state.pending_writes().len(), 2);
}

#[test]
fn test_opaque_descendant_write_coalesces() {
    let state = ReactiveState::new(json!({"rows": {}}));
    let row = Opaque::new();
    let row_path = path!("rows").opaque(&row);

    state.write(row_path.clone(), Value::from(json!({"n": 1}))).unwrap();
    state.write(row_path.child("n"), 2).unwrap();

    assert_eq!(state.pending_writes().len(), 1);
    assert_eq!(state.get(&row_path.child("n")), Some(Value::from(2)));

    state.checkpoint().unwrap();
    let snapshot = state.snapshot();
    assert_eq!(
        snapshot.get_in(row_path.keys()).map(Value::to_json),
        Some(json!({"n": 2}))
    );
    // Opaque keys have no serialized form.
    assert_eq!(snapshot.to_json(), json!({"rows": {}}));
}

#[test]
fn test_opaque_rewrite_after_unmergeable_write() {
    let state = ReactiveState::new(json!({"foo": {}}));
    let k = Opaque::new();
    let row = path!("foo").opaque(&k);

    state.write(row.clone(), 1).unwrap();
    state.write(row.child("x"), 2).unwrap();
    state.write(row.clone(), Value::empty_object()).unwrap();
    state.write(row.child("x"), 3).unwrap();

    assert_eq!(state.get(&row.child("x")), Some(Value::from(3)));
    assert_eq!(state.pending_writes().len(), 2);

    state.checkpoint().unwrap();
    assert_eq!(
        state.snapshot().get_in(row.child("x").keys()),
        Some(&Value::from(3))
    );
}

#[test]
fn test_opaque_keys_through_views() {
    let state = ReactiveState::new(json!({}));
    let handle = Opaque::new();
    let root = state.read();

    root.set(&handle, "payload");
    assert_eq!(root.value(&handle), Some(Value::from("payload")));
    assert!(root.keys().contains(&Key::from(&handle)));
}

// ============================================================================
// Hooks
// ============================================================================

#[test]
fn test_commit_callback_runs_once_per_non_empty_checkpoint() {
    let state = ReactiveState::new(json!({"n": 0}));
    let calls = Rc::new(RefCell::new(Vec::new()));
    let seen = calls.clone();
    state.on_commit(move |old, new| {
        seen.borrow_mut().push((old.to_json(), new.to_json()));
    });

    state.write(path!("n"), 1).unwrap();
    state.write(path!("n"), 2).unwrap();
    state.checkpoint().unwrap();
    state.checkpoint().unwrap();

    assert_eq!(
        calls.borrow().as_slice(),
        &[(json!({"n": 0}), json!({"n": 2}))]
    );
}

#[test]
fn test_writes_inside_commit_callback_go_to_next_batch() {
    let state = ReactiveState::new(json!({"n": 0, "echo": 0}));
    let handle = state.clone();
    state.on_commit(move |_, new| {
        let n = new.get_in(path!("n").keys()).and_then(Value::as_i64).unwrap_or(0);
        handle.write(path!("echo"), n).unwrap();
    });

    state.write(path!("n"), 7).unwrap();
    state.checkpoint().unwrap();

    assert!(state.is_dirty());
    assert_eq!(state.snapshot().to_json(), json!({"n": 7, "echo": 0}));
    state.checkpoint().unwrap();
    assert_eq!(state.snapshot().to_json(), json!({"n": 7, "echo": 7}));
}

#[test]
fn test_write_signal_sees_every_write() {
    let state = ReactiveState::new(json!({"list": [1]}));
    let paths = Rc::new(RefCell::new(Vec::new()));
    let seen = paths.clone();
    state.on_write(move |path| seen.borrow_mut().push(path.clone()));

    let row = Opaque::new();
    state.write(path!("a"), 1).unwrap();
    state.write(path!().opaque(&row), 2).unwrap();
    state.read().array("list").unwrap().push(2);

    assert_eq!(
        paths.borrow().as_slice(),
        &[path!("a"), path!().opaque(&row), path!("list")]
    );
}

// ============================================================================
// Views across commits
// ============================================================================

#[test]
fn test_views_resolve_against_latest_snapshot() {
    let state = ReactiveState::new(json!({"todo": {"title": "a"}}));
    let todo = state.read().object("todo").unwrap();

    todo.set("title", "b");
    state.checkpoint().unwrap();
    state.write(path!("todo", "title"), "c").unwrap();

    assert_eq!(todo.value("title"), Some(Value::from("c")));
    state.checkpoint().unwrap();
    assert_eq!(todo.value("title"), Some(Value::from("c")));
}

#[test]
fn test_instances_are_independent() {
    let left = ReactiveState::new(json!({"n": 0}));
    let right = ReactiveState::new(json!({"n": 0}));

    left.write(path!("n"), 1).unwrap();
    left.checkpoint().unwrap();

    assert!(!right.is_dirty());
    assert_eq!(right.snapshot().to_json(), json!({"n": 0}));
}
