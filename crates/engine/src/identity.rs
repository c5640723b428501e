//! Identity strings for function calls and guarded blocks
//!
//! An identity string is the human-debuggable encoding of "what produced
//! this value": for a call, the defining file's version marker, the
//! qualified name, and a `name=repr` pair for every bound parameter that is
//! not ignored, in declared order. Blocks compose their identifier, the
//! defining file's base name, the watch representations, and the body's own
//! function identity.

use crate::canon::Canonical;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Sentinel version marker used when the defining file cannot be read
/// (e.g. running from an installed binary without the source tree).
const UNVERSIONED: &str = "unversioned";

/// Description of a function or closure definition site.
///
/// Built with [`fn_def!`](crate::fn_def), which captures the module path,
/// the item name, and the defining file at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnDef {
    module_path: String,
    name: String,
    file: PathBuf,
}

impl FnDef {
    /// Describe a definition site. Prefer [`fn_def!`](crate::fn_def).
    #[must_use]
    pub fn new(
        module_path: impl Into<String>,
        name: impl Into<String>,
        file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            module_path: module_path.into(),
            name: name.into(),
            file: file.into(),
        }
    }

    /// Qualified name, e.g. `my_app::pipeline::adding`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        if self.module_path.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.module_path, self.name)
        }
    }

    /// Defining file.
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Base name of the defining file.
    pub(crate) fn file_base_name(&self) -> String {
        self.file
            .file_name()
            .map_or_else(|| UNVERSIONED.to_string(), |n| n.to_string_lossy().into_owned())
    }

    /// Reject definitions that cannot identify themselves.
    pub(crate) fn check_cacheable(&self) -> Result<()> {
        if self.name.is_empty() || self.file.as_os_str().is_empty() {
            return Err(Error::configuration(format!(
                "definition {:?} is not cacheable: missing name or source location",
                self.qualified_name()
            )));
        }
        Ok(())
    }

    /// Version marker of the defining file: its mtime, read fresh each time,
    /// so editing the source invalidates previously stored fingerprints.
    pub(crate) fn file_version(&self) -> String {
        let modified = std::fs::metadata(&self.file).and_then(|m| m.modified());
        match modified {
            Ok(t) => match t.duration_since(UNIX_EPOCH) {
                Ok(d) => format!("{}.{:09}", d.as_secs(), d.subsec_nanos()),
                Err(_) => UNVERSIONED.to_string(),
            },
            Err(_) => {
                tracing::warn!(
                    file = %self.file.display(),
                    "cannot read source mtime; using sentinel version marker"
                );
                UNVERSIONED.to_string()
            }
        }
    }

    /// Identity string of the definition itself: version marker plus
    /// qualified name. This is also how callables canonicalize when they
    /// appear as arguments or watched values.
    #[must_use]
    pub fn identity(&self) -> String {
        format!(
            "{}:{}-{}",
            self.file.display(),
            self.file_version(),
            self.qualified_name()
        )
    }
}

impl Canonical for FnDef {
    fn canonical_repr(&self) -> Result<String> {
        Ok(format!("fn:{}", self.identity()))
    }
}

/// Capture a [`FnDef`] for an item in the current module.
///
/// ```
/// fn adding(a: i64, b: i64) -> i64 { a + b }
/// let def = savepoint::fn_def!(adding);
/// assert!(def.qualified_name().ends_with("::adding"));
/// ```
#[macro_export]
macro_rules! fn_def {
    ($name:ident) => {
        $crate::identity::FnDef::new(module_path!(), stringify!($name), file!())
    };
}

/// Ordered parameter bindings for one call.
///
/// Bind every declared parameter in declared order, defaults included: a
/// call site that fills in a default binds exactly the same pairs as one
/// that passes the default explicitly, so the two calls share a fingerprint.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    bound: Vec<(String, String)>,
}

impl CallArgs {
    /// No parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the next declared parameter.
    ///
    /// # Errors
    ///
    /// Returns a configuration error on duplicate names, or a
    /// canonicalization error from the value itself.
    pub fn bind(mut self, name: &str, value: &dyn Canonical) -> Result<Self> {
        if self.bound.iter().any(|(n, _)| n == name) {
            return Err(Error::configuration(format!(
                "parameter {name:?} bound twice"
            )));
        }
        let repr = value.canonical_repr()?;
        self.bound.push((name.to_string(), repr));
        Ok(self)
    }

    pub(crate) fn is_bound(&self, name: &str) -> bool {
        self.bound.iter().any(|(n, _)| n == name)
    }

    pub(crate) fn pairs(&self) -> &[(String, String)] {
        &self.bound
    }
}

/// Per-invocation options for the memo engine.
///
/// Every invocation gets its own value; `Default::default()` builds a fresh
/// empty ignore list each time.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub(crate) ignore: Vec<String>,
    pub(crate) overwrite: bool,
}

impl CallOptions {
    /// Defaults: nothing ignored, no forced overwrite.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude the named parameters from the identity.
    #[must_use]
    pub fn ignore<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore = names.into_iter().map(Into::into).collect();
        self
    }

    /// Force re-execution and replace any stored entry.
    #[must_use]
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// Identity string for a function call: `{file}:{version}-{qualname}` plus
/// `name=repr` for every bound, non-ignored parameter in declared order.
pub(crate) fn call_identity(def: &FnDef, args: &CallArgs, opts: &CallOptions) -> Result<String> {
    def.check_cacheable()?;
    for name in &opts.ignore {
        if !args.is_bound(name) {
            return Err(Error::configuration(format!(
                "ignored parameter {name:?} is not bound"
            )));
        }
    }

    let mut identity = def.identity();
    for (name, repr) in args.pairs() {
        if opts.ignore.iter().any(|i| i == name) {
            continue;
        }
        identity.push('-');
        identity.push_str(name);
        identity.push('=');
        identity.push_str(repr);
    }
    tracing::debug!(identity = %identity, "call identity");
    Ok(identity)
}

/// Identity string for a guarded block:
/// `{id}-{file}-{watch reprs}-{body identity}`.
pub(crate) fn block_identity(
    id: &str,
    body: &FnDef,
    watch_pairs: &[(String, String)],
) -> Result<String> {
    body.check_cacheable()?;
    let watch_str = watch_pairs
        .iter()
        .map(|(path, repr)| format!("{path}:{repr}"))
        .collect::<Vec<_>>()
        .join("-");
    let identity = format!(
        "{}-{}-{}-{}",
        id,
        body.file_base_name(),
        watch_str,
        body.identity()
    );
    tracing::debug!(identity = %identity, "block identity");
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def() -> FnDef {
        FnDef::new("app::pipeline", "adding", file!())
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(def().qualified_name(), "app::pipeline::adding");
    }

    #[test]
    fn test_call_identity_orders_parameters_as_bound() {
        let args = CallArgs::new()
            .bind("a", &2_i64)
            .unwrap()
            .bind("b", &3_i64)
            .unwrap();
        let id = call_identity(&def(), &args, &CallOptions::new()).unwrap();
        let a = id.find("-a=2").unwrap();
        let b = id.find("-b=3").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_call_identity_removes_ignored() {
        let args = CallArgs::new()
            .bind("a", &2_i64)
            .unwrap()
            .bind("b", &3_i64)
            .unwrap();
        let opts = CallOptions::new().ignore(["a"]);
        let id = call_identity(&def(), &args, &opts).unwrap();
        assert!(!id.contains("a=2"));
        assert!(id.contains("b=3"));
    }

    #[test]
    fn test_ignore_of_unbound_parameter_is_error() {
        let args = CallArgs::new().bind("a", &2_i64).unwrap();
        let opts = CallOptions::new().ignore(["nope"]);
        assert!(call_identity(&def(), &args, &opts).is_err());
    }

    #[test]
    fn test_duplicate_binding_is_error() {
        let res = CallArgs::new()
            .bind("a", &1_i64)
            .unwrap()
            .bind("a", &2_i64);
        assert!(res.is_err());
    }

    #[test]
    fn test_uncacheable_definition_rejected() {
        let anon = FnDef::new("app", "", file!());
        let err = call_identity(&anon, &CallArgs::new(), &CallOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_file_version_sentinel_for_missing_file() {
        let ghost = FnDef::new("app", "f", "/no/such/source.rs");
        assert_eq!(ghost.file_version(), UNVERSIONED);
    }

    #[test]
    fn test_fn_def_canonical_never_calls_the_function() {
        // Identity comes from the definition site alone.
        let repr = def().canonical_repr().unwrap();
        assert!(repr.starts_with("fn:"));
        assert!(repr.contains("app::pipeline::adding"));
    }

    #[test]
    fn test_block_identity_composition() {
        let id = block_identity(
            "default",
            &def(),
            &[("a".into(), "1".into()), ("b".into(), "2".into())],
        )
        .unwrap();
        assert!(id.starts_with("default-"));
        assert!(id.contains("a:1-b:2"));
        assert!(id.contains("app::pipeline::adding"));
    }
}
