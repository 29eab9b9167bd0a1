//! `ReactiveState` owns one state instance: the committed snapshot, the
//! write buffer, and the collaborator hooks.
//!
//! Writes made through views are only buffered. Reads resolve against the
//! buffer first, so they observe every write made since the last commit.
//! A scheduling collaborator calls [`ReactiveState::checkpoint`] once per
//! evaluation pass to fold the buffer into a new snapshot.
//!
//! # Example
//!
//! ```
//! use tirea_reactive::ReactiveState;
//! use serde_json::json;
//!
//! let state = ReactiveState::new(json!({"count": 0, "todos": ["a"]}));
//! let view = state.read();
//!
//! view.set("count", 1);
//! view.array("todos").unwrap().push("b");
//!
//! // Reads see the writes, the snapshot does not yet.
//! assert_eq!(view.value("count").unwrap().as_i64(), Some(1));
//! assert_eq!(state.snapshot().to_json(), json!({"count": 0, "todos": ["a"]}));
//!
//! state.checkpoint().unwrap();
//! assert_eq!(state.snapshot().to_json(), json!({"count": 1, "todos": ["a", "b"]}));
//! ```

use crate::buffer::{PendingWrite, WriteBuffer};
use crate::commit::{commit_writes, SkippedWrite};
use crate::view::ObjectView;
use crate::{Path, ReactiveResult, StateConfig, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace, warn};

type CommitCallback = Box<dyn FnMut(&Value, &Value)>;
type WriteSignal = Box<dyn FnMut(&Path)>;

/// Summary of a successful commit.
#[derive(Debug)]
pub struct CommitReport {
    /// Revision of the new snapshot. The initial snapshot is revision 0.
    pub revision: u64,
    /// Number of writes applied.
    pub applied: usize,
    /// Writes dropped under [`CommitPolicy::SkipInvalid`](crate::CommitPolicy::SkipInvalid).
    pub skipped: Vec<SkippedWrite>,
}

struct Inner {
    snapshot: Value,
    buffer: WriteBuffer,
    config: StateConfig,
    revision: u64,
    on_commit: Option<CommitCallback>,
    on_write: Option<WriteSignal>,
    opaque_warned: bool,
}

enum Stage {
    Set,
    ReplaceSubtree,
}

/// Handle to one reactive state instance.
///
/// Cloning the handle shares the instance. The handle is single-threaded
/// (`!Send`, `!Sync`); separate instances are fully independent.
#[derive(Clone)]
pub struct ReactiveState {
    inner: Rc<RefCell<Inner>>,
}

impl ReactiveState {
    /// Create a state instance from an initial value.
    pub fn new(initial: impl Into<Value>) -> Self {
        Self::with_config(initial, StateConfig::default())
    }

    /// Create a state instance with an explicit configuration.
    pub fn with_config(initial: impl Into<Value>, config: StateConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                snapshot: initial.into(),
                buffer: WriteBuffer::new(),
                config,
                revision: 0,
                on_commit: None,
                on_write: None,
                opaque_warned: false,
            })),
        }
    }

    /// Create a state instance whose initial value comes from `init`,
    /// which runs exactly once.
    pub fn from_initializer<F, V>(init: F) -> Self
    where
        F: FnOnce() -> V,
        V: Into<Value>,
    {
        Self::new(init())
    }

    /// The root view.
    ///
    /// The root is expected to be an object; for any other root the view
    /// resolves no keys.
    pub fn read(&self) -> ObjectView {
        ObjectView::new(self.clone(), Path::root())
    }

    /// Resolve `path` through the buffer. Containers are returned as they
    /// are found, without folding in buffered writes below them.
    pub fn get(&self, path: &Path) -> Option<Value> {
        let inner = self.inner.borrow();
        inner.buffer.read_through(&inner.snapshot, path.keys())
    }

    /// Buffer a write. Nothing is applied until the next checkpoint.
    pub fn write(&self, path: Path, value: impl Into<Value>) -> ReactiveResult<()> {
        self.try_stage(path, value.into(), Stage::Set)
    }

    /// Register the commit callback, replacing any previous one.
    ///
    /// It runs synchronously inside [`checkpoint`](Self::checkpoint) with
    /// the previous and the new snapshot.
    pub fn on_commit(&self, callback: impl FnMut(&Value, &Value) + 'static) {
        self.inner.borrow_mut().on_commit = Some(Box::new(callback));
    }

    /// Register the re-evaluation signal, replacing any previous one.
    ///
    /// It runs after every buffered write with the written path.
    pub fn on_write(&self, signal: impl FnMut(&Path) + 'static) {
        self.inner.borrow_mut().on_write = Some(Box::new(signal));
    }

    /// True while buffered writes are waiting for a commit.
    pub fn is_dirty(&self) -> bool {
        !self.inner.borrow().buffer.is_empty()
    }

    /// Pending writes in the order a commit would apply them.
    pub fn pending_writes(&self) -> Vec<PendingWrite> {
        self.inner.borrow().buffer.pending().cloned().collect()
    }

    /// The committed snapshot.
    pub fn snapshot(&self) -> Value {
        self.inner.borrow().snapshot.clone()
    }

    /// Number of commits so far.
    pub fn revision(&self) -> u64 {
        self.inner.borrow().revision
    }

    pub fn config(&self) -> StateConfig {
        self.inner.borrow().config.clone()
    }

    /// Commit if anything is buffered; otherwise do nothing.
    ///
    /// On success the buffer is cleared, the new snapshot becomes the
    /// underlying state, and the commit callback runs before this returns.
    /// If the commit is aborted the buffer and snapshot are left as they were.
    pub fn checkpoint(&self) -> ReactiveResult<Option<CommitReport>> {
        let (base, writes, policy) = {
            let inner = self.inner.borrow();
            if inner.buffer.is_empty() {
                return Ok(None);
            }
            let writes: Vec<PendingWrite> = inner.buffer.pending().cloned().collect();
            (inner.snapshot.clone(), writes, inner.config.commit_policy)
        };

        let outcome = match commit_writes(&base, &writes, policy) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, pending = writes.len(), "commit aborted, writes kept");
                return Err(err);
            }
        };
        for skipped in &outcome.skipped {
            warn!(path = %skipped.path, error = %skipped.error, "skipped invalid write");
        }

        let revision = {
            let mut inner = self.inner.borrow_mut();
            inner.buffer.clear();
            inner.snapshot = outcome.state.clone();
            inner.revision += 1;
            inner.opaque_warned = false;
            inner.revision
        };
        debug!(
            revision,
            applied = outcome.applied,
            skipped = outcome.skipped.len(),
            "committed"
        );

        self.notify_commit(&base, &outcome.state);

        Ok(Some(CommitReport {
            revision,
            applied: outcome.applied,
            skipped: outcome.skipped,
        }))
    }

    pub(crate) fn materialize(&self, path: &Path) -> Option<Value> {
        let inner = self.inner.borrow();
        inner.buffer.materialize(&inner.snapshot, path)
    }

    pub(crate) fn stage(&self, path: Path, value: Value) {
        if let Err(err) = self.try_stage(path, value, Stage::Set) {
            warn!(error = %err, "dropped write");
        }
    }

    pub(crate) fn replace_subtree(&self, path: Path, value: Value) {
        if let Err(err) = self.try_stage(path, value, Stage::ReplaceSubtree) {
            warn!(error = %err, "dropped write");
        }
    }

    fn try_stage(&self, path: Path, value: Value, stage: Stage) -> ReactiveResult<()> {
        {
            let mut inner = self.inner.borrow_mut();
            match stage {
                Stage::Set => inner.buffer.set(path.clone(), value)?,
                Stage::ReplaceSubtree => inner.buffer.replace_subtree(path.clone(), value)?,
            }
            trace!(path = %path, pending = inner.buffer.len(), "buffered write");

            let opaque = inner.buffer.opaque_len();
            if opaque > inner.config.opaque_scan_warn_threshold && !inner.opaque_warned {
                inner.opaque_warned = true;
                warn!(
                    opaque,
                    threshold = inner.config.opaque_scan_warn_threshold,
                    "opaque-keyed writes are looked up linearly"
                );
            }
        }
        self.notify_write(&path);
        Ok(())
    }

    // Hooks are taken out of the cell while they run so they can use the
    // handle. A hook registered during the call wins over the one restored.

    fn notify_write(&self, path: &Path) {
        let signal = self.inner.borrow_mut().on_write.take();
        if let Some(mut signal) = signal {
            signal(path);
            let mut inner = self.inner.borrow_mut();
            if inner.on_write.is_none() {
                inner.on_write = Some(signal);
            }
        }
    }

    fn notify_commit(&self, old: &Value, new: &Value) {
        let callback = self.inner.borrow_mut().on_commit.take();
        if let Some(mut callback) = callback {
            callback(old, new);
            let mut inner = self.inner.borrow_mut();
            if inner.on_commit.is_none() {
                inner.on_commit = Some(callback);
            }
        }
    }
}

impl fmt::Debug for ReactiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ReactiveState")
            .field("revision", &inner.revision)
            .field("pending", &inner.buffer.len())
            .field("config", &inner.config)
            .finish()
    }
}
