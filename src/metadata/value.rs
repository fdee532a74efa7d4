// src/metadata/value.rs
use smallvec::SmallVec;

use crate::error::{PaxError, Result};

/// Longest text payload a comment or string metadata entry can carry.
/// Longer input is truncated, matching the legacy fixed buffer.
pub const MAX_META_TEXT: usize = 255;

/// Maximum number of dimensions a metadata array may declare.
pub const MAX_META_DIMS: usize = 4;

/// Ordered spellings of the metadata array dimension clauses.
pub(crate) const DIM_INDEX_TAGS: [&str; MAX_META_DIMS] = ["first", "second", "third", "fourth"];

/// The metadata type tags recognized in `## [type]` clauses, plus the
/// comment pseudo-type. This set is distinct from the raster element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaType {
    Comment,
    String,
    Float,
    Double,
    Int64,
    Uint64,
    Int32,
    Uint32,
    Int16,
    Uint16,
    Int8,
    Uint8,
}

impl MetaType {
    /// The named (non-comment) types, in legacy table order.
    pub(crate) const NAMED: [MetaType; 11] = [
        MetaType::String,
        MetaType::Float,
        MetaType::Double,
        MetaType::Int64,
        MetaType::Uint64,
        MetaType::Int32,
        MetaType::Uint32,
        MetaType::Int16,
        MetaType::Uint16,
        MetaType::Int8,
        MetaType::Uint8,
    ];

    /// Canonical lowercase tag, as written between brackets.
    pub fn tag(self) -> &'static str {
        match self {
            MetaType::Comment => "",
            MetaType::String => "string",
            MetaType::Float => "float",
            MetaType::Double => "double",
            MetaType::Int64 => "int64",
            MetaType::Uint64 => "uint64",
            MetaType::Int32 => "int32",
            MetaType::Uint32 => "uint32",
            MetaType::Int16 => "int16",
            MetaType::Uint16 => "uint16",
            MetaType::Int8 => "int8",
            MetaType::Uint8 => "uint8",
        }
    }

    /// Human-readable name for diagnostics; like [`MetaType::tag`] except
    /// that comments, which have no written tag, get a word.
    pub fn label(self) -> &'static str {
        match self {
            MetaType::Comment => "comment",
            other => other.tag(),
        }
    }

    /// Case-insensitive tag lookup.
    pub fn from_tag(tag: &str) -> Option<MetaType> {
        MetaType::NAMED
            .into_iter()
            .find(|ty| ty.tag().eq_ignore_ascii_case(tag))
    }
}

/// Dense metadata value storage: a scalar, or an N-dimensional array.
///
/// A scalar is the `dims.is_empty()` case holding exactly one value. Small
/// payloads stay inline; larger ones spill to the heap.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaArray<T> {
    dims: SmallVec<[u32; MAX_META_DIMS]>,
    values: SmallVec<[T; 8]>,
}

impl<T: Copy> MetaArray<T> {
    pub fn scalar(value: T) -> Self {
        MetaArray {
            dims: SmallVec::new(),
            values: SmallVec::from_elem(value, 1),
        }
    }

    /// Build an array from a shape and its flattened values (first
    /// dimension fastest). A shape with a total count of one or less
    /// collapses to a scalar, as the legacy store did.
    pub fn from_parts(dims: &[u32], values: impl IntoIterator<Item = T>) -> Result<Self> {
        if dims.len() > MAX_META_DIMS {
            return Err(PaxError::IndexOutOfBounds {
                index: dims.len() as u64,
                bound: MAX_META_DIMS as u64,
                axis: "metadata dimensions",
            });
        }
        let count: usize = dims.iter().map(|&d| d as usize).product();
        let values: SmallVec<[T; 8]> = values.into_iter().collect();
        if count <= 1 {
            if values.len() != 1 {
                return Err(PaxError::BufferTooShort {
                    expected: 1,
                    available: values.len(),
                });
            }
            return Ok(MetaArray {
                dims: SmallVec::new(),
                values,
            });
        }
        if values.len() != count {
            return Err(PaxError::BufferTooShort {
                expected: count,
                available: values.len(),
            });
        }
        Ok(MetaArray {
            dims: SmallVec::from_slice(dims),
            values,
        })
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// Total number of stored values.
    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn dims(&self) -> &[u32] {
        &self.dims
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// The scalar value, if this is not an array.
    pub fn as_scalar(&self) -> Option<T> {
        if self.is_scalar() {
            Some(self.values[0])
        } else {
            None
        }
    }

    /// Flattened index of the element at `indices`, first dimension
    /// fastest. The rank must match and every index must be in range.
    pub fn flat_index(&self, indices: &[u32]) -> Result<usize> {
        if indices.len() != self.dims.len() {
            return Err(PaxError::IndexOutOfBounds {
                index: indices.len() as u64,
                bound: self.dims.len() as u64,
                axis: "metadata array rank",
            });
        }
        let mut index = 0usize;
        let mut stride = 1usize;
        for (&i, &dim) in indices.iter().zip(self.dims.iter()) {
            if i >= dim {
                return Err(PaxError::IndexOutOfBounds {
                    index: i as u64,
                    bound: dim as u64,
                    axis: "metadata dimension",
                });
            }
            index += i as usize * stride;
            stride *= dim as usize;
        }
        Ok(index)
    }

    pub fn get(&self, indices: &[u32]) -> Result<T> {
        Ok(self.values[self.flat_index(indices)?])
    }
}

/// A typed metadata value: a comment, a string, or a numeric scalar/array
/// of one of the ten numeric metadata types.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Comment { text: String, stripped: bool },
    Str { text: String, stripped: bool },
    Float(MetaArray<f32>),
    Double(MetaArray<f64>),
    Int64(MetaArray<i64>),
    Uint64(MetaArray<u64>),
    Int32(MetaArray<i32>),
    Uint32(MetaArray<u32>),
    Int16(MetaArray<i16>),
    Uint16(MetaArray<u16>),
    Int8(MetaArray<i8>),
    Uint8(MetaArray<u8>),
}

/// Truncate text to the storage limit, respecting char boundaries.
fn clip_text(text: &str) -> String {
    if text.len() <= MAX_META_TEXT {
        return text.to_string();
    }
    let mut end = MAX_META_TEXT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

impl MetaValue {
    pub(crate) fn comment(text: &str, stripped: bool) -> MetaValue {
        MetaValue::Comment {
            text: clip_text(text),
            stripped,
        }
    }

    pub(crate) fn string(text: &str, stripped: bool) -> MetaValue {
        MetaValue::Str {
            text: clip_text(text),
            stripped,
        }
    }

    pub fn meta_type(&self) -> MetaType {
        match self {
            MetaValue::Comment { .. } => MetaType::Comment,
            MetaValue::Str { .. } => MetaType::String,
            MetaValue::Float(_) => MetaType::Float,
            MetaValue::Double(_) => MetaType::Double,
            MetaValue::Int64(_) => MetaType::Int64,
            MetaValue::Uint64(_) => MetaType::Uint64,
            MetaValue::Int32(_) => MetaType::Int32,
            MetaValue::Uint32(_) => MetaType::Uint32,
            MetaValue::Int16(_) => MetaType::Int16,
            MetaValue::Uint16(_) => MetaType::Uint16,
            MetaValue::Int8(_) => MetaType::Int8,
            MetaValue::Uint8(_) => MetaType::Uint8,
        }
    }

    pub fn is_array(&self) -> bool {
        match self {
            MetaValue::Comment { .. } | MetaValue::Str { .. } => false,
            MetaValue::Float(a) => !a.is_scalar(),
            MetaValue::Double(a) => !a.is_scalar(),
            MetaValue::Int64(a) => !a.is_scalar(),
            MetaValue::Uint64(a) => !a.is_scalar(),
            MetaValue::Int32(a) => !a.is_scalar(),
            MetaValue::Uint32(a) => !a.is_scalar(),
            MetaValue::Int16(a) => !a.is_scalar(),
            MetaValue::Uint16(a) => !a.is_scalar(),
            MetaValue::Int8(a) => !a.is_scalar(),
            MetaValue::Uint8(a) => !a.is_scalar(),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            MetaValue::Comment { text, .. } | MetaValue::Str { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Numeric scalar types storable as metadata; maps each Rust type onto its
/// metadata tag and its `MetaValue` variant for generic typed access.
pub trait MetaScalar: Copy {
    const META_TYPE: MetaType;

    fn as_array(value: &MetaValue) -> Option<&MetaArray<Self>>;
    fn wrap(array: MetaArray<Self>) -> MetaValue;
}

macro_rules! impl_meta_scalar {
    ($( ($ty:ty, $variant:ident, $meta:ident) ),+ $(,)?) => {
        $(
            impl MetaScalar for $ty {
                const META_TYPE: MetaType = MetaType::$meta;

                fn as_array(value: &MetaValue) -> Option<&MetaArray<Self>> {
                    match value {
                        MetaValue::$variant(array) => Some(array),
                        _ => None,
                    }
                }

                fn wrap(array: MetaArray<Self>) -> MetaValue {
                    MetaValue::$variant(array)
                }
            }

            impl From<$ty> for MetaValue {
                fn from(value: $ty) -> MetaValue {
                    MetaValue::$variant(MetaArray::scalar(value))
                }
            }
        )+
    };
}

impl_meta_scalar![
    (f32, Float, Float),
    (f64, Double, Double),
    (i64, Int64, Int64),
    (u64, Uint64, Uint64),
    (i32, Int32, Int32),
    (u32, Uint32, Uint32),
    (i16, Int16, Int16),
    (u16, Uint16, Uint16),
    (i8, Int8, Int8),
    (u8, Uint8, Uint8),
];

impl From<&str> for MetaValue {
    fn from(text: &str) -> MetaValue {
        MetaValue::string(text, true)
    }
}

impl From<String> for MetaValue {
    fn from(text: String) -> MetaValue {
        MetaValue::string(&text, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_lookup_is_case_insensitive() {
        assert_eq!(MetaType::from_tag("float"), Some(MetaType::Float));
        assert_eq!(MetaType::from_tag("FLOAT"), Some(MetaType::Float));
        assert_eq!(MetaType::from_tag("Uint8"), Some(MetaType::Uint8));
        assert_eq!(MetaType::from_tag("complex"), None);
        assert_eq!(MetaType::from_tag(""), None);
    }

    #[test]
    fn test_scalar_array_distinction() {
        let s = MetaArray::scalar(3.5f64);
        assert!(s.is_scalar());
        assert_eq!(s.as_scalar(), Some(3.5));

        let a = MetaArray::from_parts(&[2, 3], 0..6i32).unwrap();
        assert!(!a.is_scalar());
        assert_eq!(a.count(), 6);
        assert_eq!(a.as_scalar(), None);
    }

    #[test]
    fn test_trivial_shape_collapses_to_scalar() {
        let a = MetaArray::from_parts(&[1], [42i32]).unwrap();
        assert!(a.is_scalar());
        assert_eq!(a.as_scalar(), Some(42));
    }

    #[test]
    fn test_flat_index_first_dimension_fastest() {
        let a = MetaArray::from_parts(&[2, 3], 0..6i32).unwrap();
        assert_eq!(a.get(&[0, 0]).unwrap(), 0);
        assert_eq!(a.get(&[1, 0]).unwrap(), 1);
        assert_eq!(a.get(&[0, 1]).unwrap(), 2);
        assert_eq!(a.get(&[1, 2]).unwrap(), 5);
    }

    #[test]
    fn test_out_of_range_indices() {
        let a = MetaArray::from_parts(&[2, 3], 0..6i32).unwrap();
        assert!(matches!(
            a.get(&[2, 0]),
            Err(PaxError::IndexOutOfBounds { .. })
        ));
        // rank mismatch is also an indexing failure
        assert!(matches!(a.get(&[0]), Err(PaxError::IndexOutOfBounds { .. })));
    }

    #[test]
    fn test_count_mismatch_rejected() {
        assert!(MetaArray::from_parts(&[2, 2], 0..3i32).is_err());
    }

    #[test]
    fn test_text_truncation() {
        let long = "x".repeat(1000);
        let value = MetaValue::comment(&long, true);
        assert_eq!(value.text().unwrap().len(), MAX_META_TEXT);
    }
}
