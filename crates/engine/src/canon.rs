//! Canonical value representations for identity strings
//!
//! A value participates in a fingerprint only through a stable textual form:
//! two values get the same representation iff they are equal, and the form
//! never depends on printing defaults that truncate or reorder. Bulk numeric
//! data is special-cased: its representation is a digest of the raw element
//! bytes plus shape metadata, never the printed elements.
//!
//! Participation is a capability: a type can be bound into an identity
//! string iff it implements [`Canonical`]. There is no fallback to pointer
//! identity or `Debug` output.

use crate::{Error, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Capability to produce a deterministic representation for hashing.
pub trait Canonical {
    /// Stable textual form of this value.
    ///
    /// # Errors
    ///
    /// Returns a canonicalization error if the value has no deterministic
    /// representation (e.g. a malformed bulk wrapper).
    fn canonical_repr(&self) -> Result<String>;
}

impl<T: Canonical + ?Sized> Canonical for &T {
    fn canonical_repr(&self) -> Result<String> {
        (**self).canonical_repr()
    }
}

macro_rules! canonical_int {
    ($($ty:ty),*) => {
        $(impl Canonical for $ty {
            fn canonical_repr(&self) -> Result<String> {
                Ok(self.to_string())
            }
        })*
    };
}

canonical_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Canonical for bool {
    fn canonical_repr(&self) -> Result<String> {
        Ok(self.to_string())
    }
}

// Floats canonicalize by bit pattern: JSON text cannot represent NaN, and
// -0.0 must stay distinct from 0.0.
impl Canonical for f32 {
    fn canonical_repr(&self) -> Result<String> {
        Ok(format!("f32:{:08x}", self.to_bits()))
    }
}

impl Canonical for f64 {
    fn canonical_repr(&self) -> Result<String> {
        Ok(format!("f64:{:016x}", self.to_bits()))
    }
}

impl Canonical for char {
    fn canonical_repr(&self) -> Result<String> {
        Ok(format!("char:{}", self))
    }
}

impl Canonical for str {
    fn canonical_repr(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::canon(e.to_string()))
    }
}

impl Canonical for String {
    fn canonical_repr(&self) -> Result<String> {
        self.as_str().canonical_repr()
    }
}

impl<T: Canonical> Canonical for Option<T> {
    fn canonical_repr(&self) -> Result<String> {
        match self {
            Some(v) => Ok(format!("Some({})", v.canonical_repr()?)),
            None => Ok("None".to_string()),
        }
    }
}

impl<T: Canonical> Canonical for [T] {
    fn canonical_repr(&self) -> Result<String> {
        let parts: Result<Vec<String>> = self.iter().map(Canonical::canonical_repr).collect();
        Ok(format!("[{}]", parts?.join(",")))
    }
}

impl<T: Canonical> Canonical for Vec<T> {
    fn canonical_repr(&self) -> Result<String> {
        self.as_slice().canonical_repr()
    }
}

impl<A: Canonical, B: Canonical> Canonical for (A, B) {
    fn canonical_repr(&self) -> Result<String> {
        Ok(format!(
            "({},{})",
            self.0.canonical_repr()?,
            self.1.canonical_repr()?
        ))
    }
}

impl<A: Canonical, B: Canonical, C: Canonical> Canonical for (A, B, C) {
    fn canonical_repr(&self) -> Result<String> {
        Ok(format!(
            "({},{},{})",
            self.0.canonical_repr()?,
            self.1.canonical_repr()?,
            self.2.canonical_repr()?
        ))
    }
}

impl<V: Canonical> Canonical for BTreeMap<String, V> {
    fn canonical_repr(&self) -> Result<String> {
        let mut parts = Vec::with_capacity(self.len());
        for (k, v) in self {
            parts.push(format!("{}={}", k, v.canonical_repr()?));
        }
        Ok(format!("{{{}}}", parts.join(",")))
    }
}

impl Canonical for Value {
    fn canonical_repr(&self) -> Result<String> {
        json_value_repr(self)
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Primitive element type with a fixed-width little-endian byte encoding.
pub trait Element: sealed::Sealed + Copy {
    /// Stable dtype label embedded in the representation.
    const DTYPE: &'static str;

    /// Append this element's little-endian bytes to `out`.
    fn write_le_bytes(self, out: &mut Vec<u8>);
}

macro_rules! element_impl {
    ($($ty:ty => $label:literal),*) => {
        $(
            impl sealed::Sealed for $ty {}
            impl Element for $ty {
                const DTYPE: &'static str = $label;
                fn write_le_bytes(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

element_impl!(
    i8 => "i8", i16 => "i16", i32 => "i32", i64 => "i64",
    u8 => "u8", u16 => "u16", u32 => "u32", u64 => "u64",
    f32 => "f32", f64 => "f64"
);

/// Borrowed view of a dense numeric buffer with an explicit shape.
///
/// Identity is content plus shape: a transpose or reshape of the same
/// elements canonicalizes differently, and two buffers with equal elements
/// and shape canonicalize identically no matter how large they are.
#[derive(Debug, Clone)]
pub struct Tensor<'a, T: Element> {
    data: &'a [T],
    shape: Vec<usize>,
}

impl<'a, T: Element> Tensor<'a, T> {
    /// View `data` with the given shape.
    ///
    /// # Errors
    ///
    /// Returns a canonicalization error if the shape does not cover the
    /// buffer exactly.
    pub fn new(data: &'a [T], shape: impl Into<Vec<usize>>) -> Result<Self> {
        let shape = shape.into();
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::canon(format!(
                "shape {shape:?} covers {expected} elements, buffer has {}",
                data.len()
            )));
        }
        Ok(Self { data, shape })
    }

    /// View `data` as a one-dimensional buffer.
    #[must_use]
    pub fn vector(data: &'a [T]) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }
}

impl<T: Element> Canonical for Tensor<'_, T> {
    fn canonical_repr(&self) -> Result<String> {
        let mut bytes = Vec::with_capacity(self.data.len() * std::mem::size_of::<T>());
        for v in self.data {
            v.write_le_bytes(&mut bytes);
        }
        let shape = self
            .shape
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("x");
        Ok(format!(
            "tensor[{};{}]:{}",
            T::DTYPE,
            shape,
            hex::encode(Sha256::digest(&bytes))
        ))
    }
}

/// Borrowed view of columnar data: named f64 columns.
///
/// Column names and per-column lengths are part of the identity, so renaming
/// a column changes the representation even when the values are unchanged.
#[derive(Debug, Clone, Default)]
pub struct Frame<'a> {
    columns: Vec<(&'a str, &'a [f64])>,
}

impl<'a> Frame<'a> {
    /// Empty frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named column.
    #[must_use]
    pub fn column(mut self, name: &'a str, data: &'a [f64]) -> Self {
        self.columns.push((name, data));
        self
    }
}

impl Canonical for Frame<'_> {
    fn canonical_repr(&self) -> Result<String> {
        let mut bytes = Vec::new();
        for (name, data) in &self.columns {
            bytes.extend_from_slice(&(name.len() as u64).to_le_bytes());
            bytes.extend_from_slice(name.as_bytes());
            bytes.extend_from_slice(&(data.len() as u64).to_le_bytes());
            for v in *data {
                v.write_le_bytes(&mut bytes);
            }
        }
        let names = self
            .columns
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(",");
        Ok(format!(
            "frame[{}]:{}",
            names,
            hex::encode(Sha256::digest(&bytes))
        ))
    }
}

/// Canonical representation of a JSON tree.
///
/// Rectangular numeric arrays (vectors, nested matrices) canonicalize as
/// bulk data: a digest over tagged element bytes plus the shape. Everything
/// else uses canonical JSON text (object keys already sorted by the
/// underlying map).
pub fn json_value_repr(value: &Value) -> Result<String> {
    if let Some(shape) = numeric_shape(value) {
        if !shape.is_empty() {
            let mut bytes = Vec::new();
            flatten_numeric(value, &mut bytes);
            let shape = shape
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("x");
            return Ok(format!(
                "array[{}]:{}",
                shape,
                hex::encode(Sha256::digest(&bytes))
            ));
        }
    }
    serde_json::to_string(value).map_err(|e| Error::canon(e.to_string()))
}

/// Shape of `value` if it is a rectangular block of numbers, scalar shape
/// `[]` for a bare number, `None` otherwise.
fn numeric_shape(value: &Value) -> Option<Vec<usize>> {
    match value {
        Value::Number(_) => Some(Vec::new()),
        Value::Array(items) => {
            let mut iter = items.iter();
            let first = match iter.next() {
                Some(v) => numeric_shape(v)?,
                None => return Some(vec![0]),
            };
            for item in iter {
                if numeric_shape(item)? != first {
                    return None;
                }
            }
            let mut shape = Vec::with_capacity(first.len() + 1);
            shape.push(items.len());
            shape.extend(first);
            Some(shape)
        }
        _ => None,
    }
}

/// Row-major element bytes, tagged by numeric kind so `2` and `2.0` stay
/// distinct.
fn flatten_numeric(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.push(b'i');
                out.extend_from_slice(&i.to_le_bytes());
            } else if let Some(u) = n.as_u64() {
                out.push(b'u');
                out.extend_from_slice(&u.to_le_bytes());
            } else if let Some(f) = n.as_f64() {
                out.push(b'f');
                out.extend_from_slice(&f.to_bits().to_le_bytes());
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten_numeric(item, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_are_type_distinct() {
        assert_ne!(
            2_i64.canonical_repr().unwrap(),
            2.0_f64.canonical_repr().unwrap()
        );
        assert_ne!(
            2_i64.canonical_repr().unwrap(),
            "2".canonical_repr().unwrap()
        );
        assert_ne!(
            'a'.canonical_repr().unwrap(),
            "a".canonical_repr().unwrap()
        );
    }

    #[test]
    fn test_float_bit_patterns() {
        assert_ne!(
            0.0_f64.canonical_repr().unwrap(),
            (-0.0_f64).canonical_repr().unwrap()
        );
        // NaN still canonicalizes deterministically
        assert_eq!(
            f64::NAN.canonical_repr().unwrap(),
            f64::NAN.canonical_repr().unwrap()
        );
    }

    #[test]
    fn test_containers() {
        assert_eq!(vec![1, 2, 3].canonical_repr().unwrap(), "[1,2,3]");
        assert_eq!(Some(5_i32).canonical_repr().unwrap(), "Some(5)");
        assert_eq!(None::<i32>.canonical_repr().unwrap(), "None");
        assert_eq!((1_i32, "a").canonical_repr().unwrap(), "(1,\"a\")");
    }

    #[test]
    fn test_map_is_key_ordered() {
        let mut m = BTreeMap::new();
        m.insert("b".to_string(), 2_i32);
        m.insert("a".to_string(), 1_i32);
        assert_eq!(m.canonical_repr().unwrap(), "{a=1,b=2}");
    }

    #[test]
    fn test_tensor_content_equality() {
        let a = [1.0_f64, 2.0, 3.0, 4.0];
        let b = [1.0_f64, 2.0, 3.0, 4.0];
        let ta = Tensor::new(&a, [2, 2]).unwrap();
        let tb = Tensor::new(&b, [2, 2]).unwrap();
        assert_eq!(ta.canonical_repr().unwrap(), tb.canonical_repr().unwrap());
    }

    #[test]
    fn test_tensor_shape_sensitivity() {
        let data = [1.0_f64, 2.0, 3.0, 4.0];
        let row = Tensor::new(&data, [1, 4]).unwrap();
        let col = Tensor::new(&data, [4, 1]).unwrap();
        assert_ne!(row.canonical_repr().unwrap(), col.canonical_repr().unwrap());
    }

    #[test]
    fn test_tensor_transpose_is_distinct() {
        // Same shape, permuted elements: [[1,2],[3,4]] vs its transpose
        let m = [1.0_f64, 2.0, 3.0, 4.0];
        let t = [1.0_f64, 3.0, 2.0, 4.0];
        let tm = Tensor::new(&m, [2, 2]).unwrap();
        let tt = Tensor::new(&t, [2, 2]).unwrap();
        assert_ne!(tm.canonical_repr().unwrap(), tt.canonical_repr().unwrap());
    }

    #[test]
    fn test_tensor_rejects_bad_shape() {
        let data = [1.0_f64, 2.0, 3.0];
        assert!(Tensor::new(&data, [2, 2]).is_err());
    }

    #[test]
    fn test_tensor_dtype_sensitivity() {
        let ints = [1_i64, 2, 3];
        let floats = [1.0_f64, 2.0, 3.0];
        assert_ne!(
            Tensor::vector(&ints).canonical_repr().unwrap(),
            Tensor::vector(&floats).canonical_repr().unwrap()
        );
    }

    #[test]
    fn test_tensor_repr_is_digest_not_elements() {
        let big: Vec<f64> = (0..10_000).map(f64::from).collect();
        let repr = Tensor::vector(&big).canonical_repr().unwrap();
        // Fixed-size representation regardless of buffer size
        assert!(repr.len() < 100);
        assert!(repr.starts_with("tensor[f64;10000]:"));
    }

    #[test]
    fn test_frame_column_name_sensitivity() {
        let col = [1.0_f64, 2.0];
        let a = Frame::new().column("a", &col).column("b", &col);
        let b = Frame::new().column("a", &col).column("c", &col);
        assert_ne!(a.canonical_repr().unwrap(), b.canonical_repr().unwrap());
    }

    #[test]
    fn test_frame_value_sensitivity() {
        let c1 = [2.0_f64];
        let c2 = [2.1_f64];
        let a = Frame::new().column("b", &c1);
        let b = Frame::new().column("b", &c2);
        assert_ne!(a.canonical_repr().unwrap(), b.canonical_repr().unwrap());
    }

    #[test]
    fn test_json_scalar_reprs() {
        assert_eq!(json_value_repr(&json!("x")).unwrap(), "\"x\"");
        assert_eq!(json_value_repr(&json!(true)).unwrap(), "true");
        assert_eq!(json_value_repr(&json!(null)).unwrap(), "null");
        assert_eq!(json_value_repr(&json!(7)).unwrap(), "7");
    }

    #[test]
    fn test_json_numeric_array_is_digested() {
        let repr = json_value_repr(&json!([[1, 2], [3, 4]])).unwrap();
        assert!(repr.starts_with("array[2x2]:"));
    }

    #[test]
    fn test_json_numeric_array_shape_sensitivity() {
        let a = json_value_repr(&json!([[1, 2, 3], [4, 5, 6]])).unwrap();
        let b = json_value_repr(&json!([[1, 2], [3, 4], [5, 6]])).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_json_int_float_arrays_distinct() {
        let ints = json_value_repr(&json!([1, 2])).unwrap();
        let floats = json_value_repr(&json!([1.0, 2.0])).unwrap();
        assert_ne!(ints, floats);
    }

    #[test]
    fn test_json_ragged_array_falls_back_to_text() {
        let repr = json_value_repr(&json!([[1, 2], [3]])).unwrap();
        assert_eq!(repr, "[[1,2],[3]]");
    }

    #[test]
    fn test_json_object_keys_sorted() {
        let v: Value = serde_json::from_str(r#"{"b":2,"a":1}"#).unwrap();
        assert_eq!(json_value_repr(&v).unwrap(), r#"{"a":1,"b":2}"#);
    }
}
