//! Fixed-layout element types for typed (buffer) transfers.
//!
//! This module provides the [`Datatype`] trait, a sealed trait that maps Rust
//! primitive types to a fixed little-endian wire layout. Typed transfers move
//! whole slices of these elements in place, without any serialization framing.
//!
//! # Supported Types
//!
//! | Rust Type | Width (bytes) | Tag Value |
//! |-----------|---------------|-----------|
//! | `f32`     | 4             | 0         |
//! | `f64`     | 8             | 1         |
//! | `i32`     | 4             | 2         |
//! | `i64`     | 8             | 3         |
//! | `u8`      | 1             | 4         |
//! | `u32`     | 4             | 5         |
//! | `u64`     | 8             | 6         |

use crate::error::{Error, Result};

/// Internal module to seal the trait — prevents external implementations.
mod sealed {
    pub trait Sealed {}
}

/// Identifies the element type of a typed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DatatypeTag {
    /// 32-bit floating point
    F32 = 0,
    /// 64-bit floating point
    F64 = 1,
    /// 32-bit signed integer
    I32 = 2,
    /// 64-bit signed integer
    I64 = 3,
    /// 8-bit unsigned integer
    U8 = 4,
    /// 32-bit unsigned integer
    U32 = 5,
    /// 64-bit unsigned integer
    U64 = 6,
}

/// Trait for element types that can be moved by typed transfers.
///
/// This is a **sealed trait** — it cannot be implemented outside this crate.
/// Supported types: [`f32`], [`f64`], [`i32`], [`i64`], [`u8`], [`u32`], [`u64`].
pub trait Datatype: sealed::Sealed + Copy + Default + Send + 'static {
    /// The datatype tag.
    const TAG: DatatypeTag;
    /// Encoded width of one element in bytes.
    const WIDTH: usize;

    /// Append the little-endian encoding of `self` to `out`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Decode one element from exactly [`Self::WIDTH`] bytes.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_datatype {
    ($ty:ty, $tag:expr) => {
        impl sealed::Sealed for $ty {}
        impl Datatype for $ty {
            const TAG: DatatypeTag = $tag;
            const WIDTH: usize = std::mem::size_of::<$ty>();

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                <$ty>::from_le_bytes(raw)
            }
        }
    };
}

impl_datatype!(f32, DatatypeTag::F32);
impl_datatype!(f64, DatatypeTag::F64);
impl_datatype!(i32, DatatypeTag::I32);
impl_datatype!(i64, DatatypeTag::I64);
impl_datatype!(u8, DatatypeTag::U8);
impl_datatype!(u32, DatatypeTag::U32);
impl_datatype!(u64, DatatypeTag::U64);

/// Encode a slice into its fixed little-endian layout.
pub(crate) fn encode_slice<T: Datatype>(data: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * T::WIDTH);
    for &x in data {
        x.write_le(&mut out);
    }
    out
}

/// Decode a payload into `dst`, which must be exactly as long as the payload.
pub(crate) fn decode_into<T: Datatype>(bytes: &[u8], dst: &mut [T], source: usize) -> Result<()> {
    if bytes.len() != dst.len() * T::WIDTH {
        return Err(Error::MalformedPayload {
            peer: source,
            reason: format!(
                "{} bytes cannot fill {} elements of {:?}",
                bytes.len(),
                dst.len(),
                T::TAG
            ),
        });
    }
    for (x, chunk) in dst.iter_mut().zip(bytes.chunks_exact(T::WIDTH)) {
        *x = T::read_le(chunk);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datatype_tag_values_are_sequential() {
        let tags = [
            DatatypeTag::F32,
            DatatypeTag::F64,
            DatatypeTag::I32,
            DatatypeTag::I64,
            DatatypeTag::U8,
            DatatypeTag::U32,
            DatatypeTag::U64,
        ];
        for (i, tag) in tags.iter().enumerate() {
            assert_eq!(*tag as i32, i as i32, "Tag {tag:?} should have value {i}");
        }
    }

    #[test]
    fn widths() {
        assert_eq!(f32::WIDTH, 4);
        assert_eq!(f64::WIDTH, 8);
        assert_eq!(u8::WIDTH, 1);
        assert_eq!(i64::WIDTH, 8);
    }

    #[test]
    fn layout_is_little_endian() {
        assert_eq!(encode_slice(&[1u32, 0x0102_0304]), vec![1, 0, 0, 0, 4, 3, 2, 1]);
    }

    #[test]
    fn decode_fills_destination() {
        let bytes = encode_slice(&[1.5f64, -2.0, 3.25]);
        let mut dst = [0.0f64; 3];
        decode_into(&bytes, &mut dst, 1).unwrap();
        assert_eq!(dst, [1.5, -2.0, 3.25]);
    }

    #[test]
    fn decode_rejects_short_payload() {
        let bytes = encode_slice(&[7i32, 8]);
        let mut dst = [0i32; 3];
        let err = decode_into(&bytes, &mut dst, 2).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload { peer: 2, .. }));
        assert_eq!(dst, [0, 0, 0]);
    }
}
