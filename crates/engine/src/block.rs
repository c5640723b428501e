//! Scoped block memoization
//!
//! A [`BlockGuard`] wraps a named block of work that reads watched slots and
//! writes produced slots in a [`State`] tree. Construction validates both
//! sets, fingerprints the block's status (identifier, watched values, body
//! definition), and decides up front whether the body needs to run at all:
//! if every produced slot is already stored under the status fingerprint,
//! the body is never invoked and the stored values are spliced back into the
//! caller's state instead.
//!
//! The body is an ordinary closure over `&mut State`; skipping is a
//! structured conditional, not a suppressed abort, so there is no skip
//! signal to recognize at the boundary.

use crate::canon::{Canonical, json_value_repr};
use crate::engine::{decode, encode};
use crate::identity::{self, FnDef};
use crate::{Error, Fingerprint, Result};
use savepoint_store::ArtifactStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Identifier used when a block does not name itself.
pub const DEFAULT_BLOCK_ID: &str = "default";

/// Named-slot state tree addressed by dotted paths.
///
/// Slots hold JSON values; `f.c` addresses field `c` of the object stored
/// under the top-level slot `f`. Intermediate segments must already exist;
/// only the final segment of a write is created on demand.
#[derive(Debug, Clone, Default)]
pub struct State {
    root: serde_json::Map<String, Value>,
}

impl State {
    /// Empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `path` currently resolves.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.resolve(path).is_ok()
    }

    /// Read the slot at `path`, decoding into `T`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the path does not resolve, or a
    /// serialization error if the value does not decode as `T`.
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self.resolve(path)?.clone();
        serde_json::from_value(value).map_err(|e| Error::serialization(e.to_string()))
    }

    /// Write `value` to the slot at `path`, creating or overwriting the
    /// final segment.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an intermediate segment does not
    /// resolve to an object, or a serialization error if `value` cannot be
    /// encoded.
    pub fn set<T: Serialize>(&mut self, path: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| Error::serialization(e.to_string()))?;
        self.splice(path, value)
    }

    /// Borrow the raw value at `path`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the path does not resolve.
    pub fn resolve(&self, path: &str) -> Result<&Value> {
        let mut segments = path.split('.');
        let head = segments.next().unwrap_or_default();
        let mut current = self
            .root
            .get(head)
            .ok_or_else(|| unresolved(path, head))?;
        for segment in segments {
            current = current
                .as_object()
                .and_then(|obj| obj.get(segment))
                .ok_or_else(|| unresolved(path, segment))?;
        }
        Ok(current)
    }

    /// Place a raw value at `path`. Intermediate segments must already
    /// resolve to objects; the final segment is created or overwritten.
    pub(crate) fn splice(&mut self, path: &str, value: Value) -> Result<()> {
        let Some((parent_path, last)) = path.rsplit_once('.') else {
            self.root.insert(path.to_string(), value);
            return Ok(());
        };
        let parent = self.resolve_mut(parent_path)?;
        let obj = parent
            .as_object_mut()
            .ok_or_else(|| unresolved(path, parent_path))?;
        obj.insert(last.to_string(), value);
        Ok(())
    }

    fn resolve_mut(&mut self, path: &str) -> Result<&mut Value> {
        let mut segments = path.split('.');
        let head = segments.next().unwrap_or_default();
        let mut current = self
            .root
            .get_mut(head)
            .ok_or_else(|| unresolved(path, head))?;
        for segment in segments {
            current = current
                .as_object_mut()
                .and_then(|obj| obj.get_mut(segment))
                .ok_or_else(|| unresolved(path, segment))?;
        }
        Ok(current)
    }
}

fn unresolved(path: &str, segment: &str) -> Error {
    Error::configuration(format!(
        "path {path:?} does not resolve: segment {segment:?} is missing"
    ))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Declaration of a guarded block: what it watches, what it produces, and
/// how it names itself.
#[derive(Debug, Clone)]
pub struct BlockSpec {
    watch: Vec<String>,
    produce: Vec<String>,
    id: String,
    watch_callables: Vec<(String, FnDef)>,
}

impl BlockSpec {
    /// Declare watch and produce sets; the identifier defaults to
    /// [`DEFAULT_BLOCK_ID`].
    pub fn new<I, P, S, T>(watch: I, produce: P) -> Self
    where
        I: IntoIterator<Item = S>,
        P: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            watch: watch.into_iter().map(Into::into).collect(),
            produce: produce.into_iter().map(Into::into).collect(),
            id: DEFAULT_BLOCK_ID.to_string(),
            watch_callables: Vec::new(),
        }
    }

    /// Name the block explicitly.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Watch a callable by its definition identity rather than a state slot.
    #[must_use]
    pub fn watch_callable(mut self, name: impl Into<String>, def: FnDef) -> Self {
        self.watch_callables.push((name.into(), def));
        self
    }
}

/// One entry/exit of a guarded block.
///
/// Constructed via [`MemoEngine::block`](crate::MemoEngine::block); consumed
/// by [`run`](Self::run), so an instance guards exactly one execution.
#[derive(Debug)]
pub struct BlockGuard<'s> {
    store: &'s ArtifactStore,
    produce: Vec<String>,
    status: Fingerprint,
    skip: bool,
}

impl<'s> BlockGuard<'s> {
    pub(crate) fn new(
        store: &'s ArtifactStore,
        body: &FnDef,
        spec: &BlockSpec,
        state: &State,
    ) -> Result<Self> {
        let mut watch_pairs = Vec::with_capacity(spec.watch.len() + spec.watch_callables.len());
        for path in &spec.watch {
            let value = state
                .resolve(path)
                .map_err(|_| Error::configuration(format!("watch path {path:?} does not resolve")))?;
            watch_pairs.push((path.clone(), json_value_repr(value)?));
        }
        for (name, def) in &spec.watch_callables {
            watch_pairs.push((name.clone(), def.canonical_repr()?));
        }

        for path in &spec.produce {
            let (parent, last) = match path.rsplit_once('.') {
                Some((parent, last)) => (Some(parent), last),
                None => (None, path.as_str()),
            };
            if !is_identifier(last) {
                return Err(Error::configuration(format!(
                    "produce path {path:?}: {last:?} is not a valid identifier"
                )));
            }
            if let Some(parent) = parent {
                state.resolve(parent).map_err(|_| {
                    Error::configuration(format!(
                        "produce path {path:?}: parent {parent:?} does not resolve"
                    ))
                })?;
            }
        }

        let identity = identity::block_identity(&spec.id, body, &watch_pairs)?;
        let status = Fingerprint::of_text(&identity);

        let mut skip = true;
        for path in &spec.produce {
            if !store.exists(&entry_key(&status, path))? {
                skip = false;
                break;
            }
        }
        tracing::debug!(%status, skip, id = %spec.id, "block guard constructed");

        Ok(Self {
            store,
            produce: spec.produce.clone(),
            status,
            skip,
        })
    }

    /// Status fingerprint of this block entry.
    #[must_use]
    pub fn status(&self) -> &Fingerprint {
        &self.status
    }

    /// Whether the body will be skipped and the produced slots replayed.
    #[must_use]
    pub fn will_skip(&self) -> bool {
        self.skip
    }

    /// Execute or replay the block.
    ///
    /// When skipping, `body` is never invoked and every produced slot is
    /// loaded from the store and written into `state`. Otherwise `body`
    /// runs; on success every produced slot is read from `state` and
    /// persisted under the status fingerprint. A body error propagates
    /// unchanged and nothing is persisted for that attempt.
    ///
    /// # Errors
    ///
    /// Engine and store errors surface through `E: From<Error>`; body
    /// errors propagate as-is. A produce path that is still unresolvable
    /// after the body ran is a configuration error.
    pub fn run<E, F>(self, state: &mut State, body: F) -> std::result::Result<(), E>
    where
        E: From<Error>,
        F: FnOnce(&mut State) -> std::result::Result<(), E>,
    {
        if self.skip {
            tracing::debug!(status = %self.status, "replaying block outputs");
            for path in &self.produce {
                let bytes = self
                    .store
                    .get(&entry_key(&self.status, path))
                    .map_err(Error::from)?;
                let value: Value = decode(&bytes)?;
                state.splice(path, value)?;
            }
            return Ok(());
        }

        body(state)?;

        tracing::debug!(status = %self.status, "persisting block outputs");
        for path in &self.produce {
            let value = state.resolve(path).map_err(|_| {
                Error::configuration(format!("block body did not produce {path:?}"))
            })?;
            self.store
                .put(&entry_key(&self.status, path), &encode(value)?)
                .map_err(Error::from)?;
        }
        Ok(())
    }
}

fn entry_key(status: &Fingerprint, path: &str) -> String {
    format!("{}-{}", status.as_hex(), path)
}
