//! Whole-function memoization
//!
//! `fingerprint → store lookup → execute-or-replay → persist`: a hit decodes
//! the stored artifact and skips the body entirely; a miss (or a forced
//! overwrite) runs the body and persists its result under the fingerprint.

use crate::block::{BlockGuard, BlockSpec, State};
use crate::identity::{self, CallArgs, CallOptions, FnDef};
use crate::{Error, Fingerprint, Result};
use savepoint_store::ArtifactStore;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Orchestrates memoized execution against an artifact store.
#[derive(Debug, Clone)]
pub struct MemoEngine {
    store: ArtifactStore,
}

impl MemoEngine {
    /// Create an engine over the given store.
    #[must_use]
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Fingerprint a call without executing or consulting the store.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for uncacheable definitions or
    /// malformed options.
    pub fn fingerprint(
        &self,
        def: &FnDef,
        args: &CallArgs,
        opts: &CallOptions,
    ) -> Result<Fingerprint> {
        let identity = identity::call_identity(def, args, opts)?;
        Ok(Fingerprint::of_text(&identity))
    }

    /// Run `body` memoized under the identity of `def` and `args`.
    ///
    /// On a hit (and without the overwrite flag) the stored result is
    /// decoded and returned and `body` is never invoked. Otherwise `body`
    /// runs; its result is persisted and returned. A body error propagates
    /// unchanged and nothing is persisted for that attempt.
    ///
    /// # Errors
    ///
    /// Configuration, canonicalization, store, and serialization errors
    /// surface through `E: From<Error>`; body errors propagate as-is.
    pub fn call<T, E, F>(
        &self,
        def: &FnDef,
        args: &CallArgs,
        opts: &CallOptions,
        body: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<Error>,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let fp = self.fingerprint(def, args, opts)?;
        let key = fp.as_hex();

        if !opts.overwrite && self.store.exists(key).map_err(Error::from)? {
            tracing::debug!(%fp, name = %def.qualified_name(), "cache hit, replaying");
            let bytes = self.store.get(key).map_err(Error::from)?;
            return Ok(decode(&bytes)?);
        }

        tracing::debug!(
            %fp,
            name = %def.qualified_name(),
            overwrite = opts.overwrite,
            "cache miss, executing"
        );
        let result = body()?;
        self.store.put(key, &encode(&result)?).map_err(Error::from)?;
        Ok(result)
    }

    /// Construct a guard for a named block over `state`.
    ///
    /// Validation of the watch and produce sets happens eagerly here, along
    /// with the status fingerprint and the skip decision; see
    /// [`BlockGuard`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unresolvable watch/produce paths
    /// or a malformed produce tail.
    pub fn block(&self, body: &FnDef, spec: &BlockSpec, state: &State) -> Result<BlockGuard<'_>> {
        BlockGuard::new(&self.store, body, spec, state)
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| Error::serialization(e.to_string()))
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| Error::serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fn_def;
    use std::cell::Cell;
    use tempfile::TempDir;

    fn engine(tmp: &TempDir) -> MemoEngine {
        MemoEngine::new(ArtifactStore::new(tmp.path()))
    }

    fn adding(a: i64, b: i64) -> i64 {
        a + b
    }

    #[test]
    fn test_hit_skips_body() {
        let tmp = TempDir::new().unwrap();
        let eng = engine(&tmp);
        let def = fn_def!(adding);
        let runs = Cell::new(0_u32);

        let call = |a: i64, b: i64| -> Result<i64> {
            let args = CallArgs::new().bind("a", &a)?.bind("b", &b)?;
            eng.call(&def, &args, &CallOptions::new(), || {
                runs.set(runs.get() + 1);
                Ok(adding(a, b))
            })
        };

        assert_eq!(call(2, 3).unwrap(), 5);
        assert_eq!(runs.get(), 1);
        assert_eq!(call(2, 3).unwrap(), 5);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let tmp = TempDir::new().unwrap();
        let eng = engine(&tmp);
        let def = fn_def!(adding);
        let args = CallArgs::new()
            .bind("a", &2_i64)
            .unwrap()
            .bind("b", &3_i64)
            .unwrap();
        let opts = CallOptions::new();
        assert_eq!(
            eng.fingerprint(&def, &args, &opts).unwrap(),
            eng.fingerprint(&def, &args, &opts).unwrap()
        );
    }

    #[test]
    fn test_body_error_not_persisted() {
        let tmp = TempDir::new().unwrap();
        let eng = engine(&tmp);
        let def = fn_def!(adding);
        let args = CallArgs::new().bind("a", &1_i64).unwrap();

        let res: Result<i64> = eng.call(&def, &args, &CallOptions::new(), || {
            Err(Error::configuration("body failed"))
        });
        assert!(res.is_err());

        let fp = eng
            .fingerprint(&def, &args, &CallOptions::new())
            .unwrap();
        assert!(!eng.store().exists(fp.as_hex()).unwrap());
    }

    #[test]
    fn test_overwrite_replaces_entry() {
        let tmp = TempDir::new().unwrap();
        let eng = engine(&tmp);
        let def = fn_def!(adding);
        let args = CallArgs::new().bind("a", &1_i64).unwrap();

        let first: i64 = eng
            .call(&def, &args, &CallOptions::new(), || Ok::<_, Error>(10))
            .unwrap();
        assert_eq!(first, 10);

        // Forced overwrite re-executes and replaces the stored value
        let second: i64 = eng
            .call(&def, &args, &CallOptions::new().overwrite(true), || {
                Ok::<_, Error>(20)
            })
            .unwrap();
        assert_eq!(second, 20);

        let third: i64 = eng
            .call(&def, &args, &CallOptions::new(), || Ok::<_, Error>(30))
            .unwrap();
        assert_eq!(third, 20);
    }
}
