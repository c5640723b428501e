//! Content-addressed memoization for expensive computations
//!
//! savepoint fingerprints a unit of work — a function call or a named block
//! over local state — from its declared inputs and its own definition, then
//! either replays a previously stored result or executes the work and
//! persists it under that fingerprint.
//!
//! # Whole-function memoization
//!
//! ```
//! use savepoint::{CallArgs, CallOptions, MemoEngine, fn_def};
//! use savepoint_store::ArtifactStore;
//!
//! fn adding(a: i64, b: i64) -> i64 { a + b }
//!
//! # fn main() -> savepoint::Result<()> {
//! # let tmp = tempfile::TempDir::new().map_err(|e| savepoint::Error::configuration(e.to_string()))?;
//! let engine = MemoEngine::new(ArtifactStore::new(tmp.path()));
//! let def = fn_def!(adding);
//!
//! let args = CallArgs::new().bind("a", &2_i64)?.bind("b", &3_i64)?;
//! let sum: i64 =
//!     engine.call(&def, &args, &CallOptions::new(), || Ok::<_, savepoint::Error>(adding(2, 3)))?;
//! assert_eq!(sum, 5);
//! // An identical call replays the stored result without running the body.
//! # Ok(())
//! # }
//! ```
//!
//! # Block memoization
//!
//! A block reads watched slots and writes produced slots in a [`State`]
//! tree; if all produced slots are already cached for the current watch
//! values, the body closure is never invoked and the slots are restored
//! from the store instead.
//!
//! # What goes into a fingerprint
//!
//! - the defining file and its modification time (edit the source, bust the
//!   cache),
//! - the qualified name of the function or block body,
//! - a canonical representation of every bound, non-ignored input — bulk
//!   numeric data by content digest plus shape, never by printed form.

pub mod block;
pub mod canon;
pub mod engine;
mod error;
pub mod fingerprint;
pub mod identity;

pub use block::{BlockGuard, BlockSpec, DEFAULT_BLOCK_ID, State};
pub use canon::{Canonical, Frame, Tensor};
pub use engine::MemoEngine;
pub use error::{Error, Result};
pub use fingerprint::Fingerprint;
pub use identity::{CallArgs, CallOptions, FnDef};
