//! Buffered reactive state for deterministic evaluation passes.
//!
//! `tirea-reactive` wraps a state tree so that every write made during an
//! evaluation pass is buffered instead of applied, every read observes the
//! writes made so far, and the whole batch is folded into a new immutable
//! snapshot at a checkpoint the host controls.
//!
//! # Core Concepts
//!
//! - **ReactiveState**: Handle to one instance (snapshot, buffer, hooks)
//! - **ObjectView / ArrayView**: Path-carrying views; reads resolve lazily
//! - **WriteBuffer**: Pending writes keyed by path, coalescing redundant ones
//! - **commit_writes**: Pure fold of pending writes into a new snapshot
//! - **Path / Key**: Location in the tree; keys are names, indices, or opaque identities
//!
//! # Snapshot Semantics
//!
//! ```text
//! Snapshot' = commit(Snapshot, Buffer)
//! ```
//!
//! - The previous snapshot is never modified
//! - Subtrees no write touched are shared between the two snapshots
//! - A commit that fails under the default policy changes nothing
//!
//! # Quick Start
//!
//! ```
//! use tirea_reactive::{path, ReactiveState};
//! use serde_json::json;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let state = ReactiveState::new(json!({"todos": [], "filter": "all"}));
//!
//! let commits = Rc::new(RefCell::new(Vec::new()));
//! let seen = commits.clone();
//! state.on_commit(move |_old, new| seen.borrow_mut().push(new.to_json()));
//!
//! let todos = state.read().array("todos").unwrap();
//! todos.push("write docs");
//! todos.push("ship");
//! state.write(path!("filter"), "open").unwrap();
//!
//! assert_eq!(todos.len(), 2);
//! assert!(state.checkpoint().unwrap().is_some());
//! assert!(state.checkpoint().unwrap().is_none());
//!
//! assert_eq!(
//!     commits.borrow().as_slice(),
//!     &[json!({"todos": ["write docs", "ship"], "filter": "open"})]
//! );
//! ```

mod array;
mod buffer;
mod commit;
mod config;
mod error;
mod path;
mod state;
mod value;
mod view;

pub use array::{apply_op, sort_with, ArrayMethod, ArrayOp, ArrayOpResult};
pub use buffer::{PendingWrite, WriteBuffer, KEY_SEPARATOR};
pub use commit::{commit_writes, set_in, CommitOutcome, CommitPolicy, SkippedWrite};
pub use config::StateConfig;
pub use error::{ReactiveError, ReactiveResult};
pub use path::{Key, Opaque, Path};
pub use state::{CommitReport, ReactiveState};
pub use value::{Object, Value};
pub use view::{ArrayView, ObjectView, Read};
