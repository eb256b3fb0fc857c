//! Endian-aware, bounds-checked primitive encoding on byte slices.
//!
//! This is the lowest layer of the crate: every typed access to array-backed or buffer-backed
//! memory ends up in one of the functions below. The [`NativeIO`] trait abstracts over the
//! fixed-size byte representation of each primitive so that one generic function covers all
//! integer and floating point widths.
//!
//! Floating point values are encoded as the raw bits of their IEEE representation, exactly like
//! the integer of the same width. No rounding or normalisation takes place.
//!
//! # Examples
//!
//! ```rust,ignore
//! use nativemem::memory::io::{read_le_at, write_be};
//!
//! let data = [0x01, 0x00, 0x02, 0x00];
//! let mut offset = 0;
//! let first: u16 = read_le_at(&data, &mut offset)?;
//! let second: u16 = read_le_at(&data, &mut offset)?;
//! assert_eq!((first, second, offset), (1, 2, 4));
//!
//! let mut data = [0u8; 4];
//! write_be(&mut data, 1u32)?;
//! assert_eq!(data, [0, 0, 0, 1]);
//! ```

use crate::{Error, Result};

/// Primitive types which can be encoded to and decoded from raw native memory.
///
/// Each implementation defines the fixed-size byte array it is stored as (for example
/// `[u8; 4]` for `u32` and `f32`).
pub trait NativeIO: Sized + Copy {
    /// The byte array holding one encoded value.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Decode from little-endian bytes
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    /// Decode from big-endian bytes
    fn from_be_bytes(bytes: Self::Bytes) -> Self;

    /// Encode as little-endian bytes
    fn to_le_bytes(self) -> Self::Bytes;
    /// Encode as big-endian bytes
    fn to_be_bytes(self) -> Self::Bytes;
}

macro_rules! impl_native_io {
    ($($ty:ty => $len:literal),* $(,)?) => {
        $(
            impl NativeIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$ty>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_native_io! {
    u8 => 1, i8 => 1,
    u16 => 2, i16 => 2,
    u32 => 4, i32 => 4,
    u64 => 8, i64 => 8,
    f32 => 4, f64 => 8,
}

/// Builds the bounds error for a slice access, saturating values that do not fit an `i64`.
pub(crate) fn out_of_bounds(offset: usize, length: usize, size: usize) -> Error {
    let clamp = |value: usize| i64::try_from(value).unwrap_or(i64::MAX);
    Error::OutOfBounds {
        offset: clamp(offset),
        length: clamp(length),
        size: clamp(size),
    }
}

fn window(data_len: usize, offset: usize, length: usize) -> Result<std::ops::Range<usize>> {
    match offset.checked_add(length) {
        Some(end) if end <= data_len => Ok(offset..end),
        _ => Err(out_of_bounds(offset, length, data_len)),
    }
}

fn read_impl<T: NativeIO>(data: &[u8], offset: &mut usize, big_endian: bool) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let range = window(data.len(), *offset, type_len)?;

    let Ok(bytes) = T::Bytes::try_from(&data[range]) else {
        return Err(out_of_bounds(*offset, type_len, data.len()));
    };

    *offset += type_len;
    Ok(if big_endian {
        T::from_be_bytes(bytes)
    } else {
        T::from_le_bytes(bytes)
    })
}

fn write_impl<T: NativeIO>(
    data: &mut [u8],
    offset: &mut usize,
    value: T,
    big_endian: bool,
) -> Result<()> {
    let bytes = if big_endian {
        value.to_be_bytes()
    } else {
        value.to_le_bytes()
    };
    let bytes = bytes.as_ref();
    let range = window(data.len(), *offset, bytes.len())?;

    data[range].copy_from_slice(bytes);
    *offset += bytes.len();
    Ok(())
}

/// Read a little-endian `T` from the start of `data`.
///
/// # Errors
/// Returns [`Error::OutOfBounds`] if `data` is shorter than `T`.
pub fn read_le<T: NativeIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Read a little-endian `T` at `offset`, advancing `offset` past it.
///
/// # Errors
/// Returns [`Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain at `offset`.
pub fn read_le_at<T: NativeIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    read_impl(data, offset, false)
}

/// Read a big-endian `T` from the start of `data`.
///
/// # Errors
/// Returns [`Error::OutOfBounds`] if `data` is shorter than `T`.
pub fn read_be<T: NativeIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_be_at(data, &mut offset)
}

/// Read a big-endian `T` at `offset`, advancing `offset` past it.
///
/// # Errors
/// Returns [`Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain at `offset`.
pub fn read_be_at<T: NativeIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    read_impl(data, offset, true)
}

/// Write `value` little-endian to the start of `data`.
///
/// # Errors
/// Returns [`Error::OutOfBounds`] if `data` is shorter than `T`.
pub fn write_le<T: NativeIO>(data: &mut [u8], value: T) -> Result<()> {
    let mut offset = 0_usize;
    write_le_at(data, &mut offset, value)
}

/// Write `value` little-endian at `offset`, advancing `offset` past it.
///
/// # Errors
/// Returns [`Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain at `offset`.
pub fn write_le_at<T: NativeIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    write_impl(data, offset, value, false)
}

/// Write `value` big-endian to the start of `data`.
///
/// # Errors
/// Returns [`Error::OutOfBounds`] if `data` is shorter than `T`.
pub fn write_be<T: NativeIO>(data: &mut [u8], value: T) -> Result<()> {
    let mut offset = 0_usize;
    write_be_at(data, &mut offset, value)
}

/// Write `value` big-endian at `offset`, advancing `offset` past it.
///
/// # Errors
/// Returns [`Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain at `offset`.
pub fn write_be_at<T: NativeIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    write_impl(data, offset, value, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_BUFFER: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    #[test]
    fn read_le_widths() {
        assert_eq!(read_le::<u8>(&TEST_BUFFER).unwrap(), 0x01);
        assert_eq!(read_le::<i16>(&TEST_BUFFER).unwrap(), 0x0201);
        assert_eq!(read_le::<u32>(&TEST_BUFFER).unwrap(), 0x0403_0201);
        assert_eq!(read_le::<u64>(&TEST_BUFFER).unwrap(), 0x0807_0605_0403_0201);
    }

    #[test]
    fn read_be_widths() {
        assert_eq!(read_be::<u16>(&TEST_BUFFER).unwrap(), 0x0102);
        assert_eq!(read_be::<i32>(&TEST_BUFFER).unwrap(), 0x0102_0304);
        assert_eq!(read_be::<u64>(&TEST_BUFFER).unwrap(), 0x0102_0304_0506_0708);
    }

    #[test]
    fn read_advances_offset() {
        let mut offset = 0;
        let first: u16 = read_le_at(&TEST_BUFFER, &mut offset).unwrap();
        let second: u32 = read_le_at(&TEST_BUFFER, &mut offset).unwrap();
        assert_eq!(first, 0x0201);
        assert_eq!(second, 0x0605_0403);
        assert_eq!(offset, 6);
    }

    #[test]
    fn floats_are_raw_bits() {
        let mut data = [0u8; 8];
        write_le(&mut data, -1.5f64).unwrap();
        assert_eq!(read_le::<u64>(&data).unwrap(), (-1.5f64).to_bits());

        write_be(&mut data, 3.25f32).unwrap();
        assert_eq!(read_be::<u32>(&data).unwrap(), 3.25f32.to_bits());
    }

    #[test]
    fn write_advances_offset() {
        let mut data = [0u8; 6];
        let mut offset = 0;
        write_le_at(&mut data, &mut offset, 0x0102u16).unwrap();
        write_be_at(&mut data, &mut offset, 0x0304_0506u32).unwrap();
        assert_eq!(data, [0x02, 0x01, 0x03, 0x04, 0x05, 0x06]);
        assert_eq!(offset, 6);
    }

    #[test]
    fn out_of_bounds_leaves_data_untouched() {
        let mut data = [0xAAu8; 3];
        let result = write_le(&mut data, 0u32);
        assert!(matches!(
            result,
            Err(Error::OutOfBounds {
                offset: 0,
                length: 4,
                size: 3
            })
        ));
        assert_eq!(data, [0xAA; 3]);

        let mut offset = usize::MAX;
        assert!(matches!(
            read_le_at::<u8>(&TEST_BUFFER, &mut offset),
            Err(Error::OutOfBounds { .. })
        ));
        assert_eq!(offset, usize::MAX);
    }
}
