//! Uniform access to native memory.
//!
//! Every kind of addressable storage implements [`MemoryIO`]: heap arrays ([`ArrayMemory`]),
//! wrapped byte buffers ([`BufferMemory`]), the two sentinels ([`NullMemory`],
//! [`InaccessibleMemory`]) and the two views ([`BoundedMemory`], [`ShareMemory`]). Client code
//! works with the cloneable [`Pointer`] handle, which pairs a [`MemoryIO`] with the
//! [`crate::Runtime`] it belongs to.
//!
//! # Architecture
//!
//! ```text
//! Pointer ──► dyn MemoryIO ──► ShareMemory / BoundedMemory ──► ArrayMemory ──► ByteRegion (heap)
//!                                                          └─► BufferMemory ─► ByteRegion (heap or mapped)
//!                                                          └─► NullMemory / InaccessibleMemory
//! ```
//!
//! Views never stack: slicing a view produces a new view over the same backend.
//! [`MemoryIO::underlying`] resolves any implementation to the storage that actually holds the
//! bytes, which is what equality, hashing and the transfer fast paths are based on.
//!
//! # Bounds
//!
//! Region backed memory validates every `(offset, length)` pair with [`check_bounds`] before a
//! byte is touched. A failed bulk operation or transfer leaves the destination unchanged.

use std::fmt;

use crate::{Error, Result};

macro_rules! region_accessors {
    () => {
        fn get_i8(&self, offset: i64) -> crate::Result<i8> {
            self.read(offset)
        }

        fn get_i16(&self, offset: i64) -> crate::Result<i16> {
            self.read(offset)
        }

        fn get_i32(&self, offset: i64) -> crate::Result<i32> {
            self.read(offset)
        }

        fn get_i64(&self, offset: i64) -> crate::Result<i64> {
            self.read(offset)
        }

        fn get_f32(&self, offset: i64) -> crate::Result<f32> {
            self.read(offset)
        }

        fn get_f64(&self, offset: i64) -> crate::Result<f64> {
            self.read(offset)
        }

        fn put_i8(&self, offset: i64, value: i8) -> crate::Result<()> {
            self.write(offset, value)
        }

        fn put_i16(&self, offset: i64, value: i16) -> crate::Result<()> {
            self.write(offset, value)
        }

        fn put_i32(&self, offset: i64, value: i32) -> crate::Result<()> {
            self.write(offset, value)
        }

        fn put_i64(&self, offset: i64, value: i64) -> crate::Result<()> {
            self.write(offset, value)
        }

        fn put_f32(&self, offset: i64, value: f32) -> crate::Result<()> {
            self.write(offset, value)
        }

        fn put_f64(&self, offset: i64, value: f64) -> crate::Result<()> {
            self.write(offset, value)
        }

        fn get_address(&self, offset: i64) -> crate::Result<u64> {
            let index = self.index(offset, self.codec.address_size().bytes())?;
            self.region()
                .with_bytes(|bytes| self.codec.get_address(bytes, index))
        }

        fn put_address(&self, offset: i64, value: u64) -> crate::Result<()> {
            let index = self.index(offset, self.codec.address_size().bytes())?;
            self.region()
                .with_bytes_mut(|bytes| self.codec.put_address(bytes, index, value))
        }

        fn get_bytes(&self, offset: i64, dst: &mut [u8]) -> crate::Result<()> {
            let index = self.index(offset, dst.len())?;
            self.region().with_bytes(|bytes| {
                dst.copy_from_slice(crate::memory::region::window(bytes, index, dst.len())?);
                Ok(())
            })
        }

        fn put_bytes(&self, offset: i64, src: &[u8]) -> crate::Result<()> {
            let index = self.index(offset, src.len())?;
            self.region().with_bytes_mut(|bytes| {
                crate::memory::region::window_mut(bytes, index, src.len())?.copy_from_slice(src);
                Ok(())
            })
        }

        fn fill(&self, offset: i64, length: i64, value: u8) -> crate::Result<()> {
            self.check_bounds(offset, length)?;
            let length = usize::try_from(length).unwrap_or(0);
            let index = self.index(offset, length)?;
            self.region().with_bytes_mut(|bytes| {
                crate::memory::region::window_mut(bytes, index, length)?.fill(value);
                Ok(())
            })
        }

        fn index_of(&self, offset: i64, value: u8, max_length: i64) -> crate::Result<Option<i64>> {
            self.check_bounds(offset, 0)?;
            let remaining = self.size() - offset;
            let length = usize::try_from(max_length.clamp(0, remaining)).unwrap_or(0);
            let index = self.index(offset, length)?;
            self.region().with_bytes(|bytes| {
                let window = crate::memory::region::window(bytes, index, length)?;
                Ok(window
                    .iter()
                    .position(|byte| *byte == value)
                    .and_then(|found| i64::try_from(found).ok()))
            })
        }
    };
}

mod array;
mod buffer;
pub mod codec;
pub mod io;
mod pointer;
pub(crate) mod region;
mod sentinel;
mod string;
mod view;

pub use array::ArrayMemory;
pub use buffer::{BufferMemory, ByteBuffer};
pub use codec::Codec;
pub use pointer::{AsPointer, Pointer};
pub use region::ByteRegion;
pub use sentinel::{InaccessibleMemory, NullMemory};
pub use string::Charset;
pub use view::{BoundedMemory, ShareMemory, ViewParts};

/// Validates an access of `length` bytes at `offset` against a memory of `size` bytes.
///
/// One signed test covers a negative offset, a negative length, an `offset + length` overflow and
/// an access past the end.
///
/// # Errors
/// Returns [`Error::OutOfBounds`] when the access does not fit.
///
/// ```rust
/// use nativemem::memory::check_bounds;
///
/// assert!(check_bounds(16, 12, 4).is_ok());
/// assert!(check_bounds(16, 13, 4).is_err());
/// assert!(check_bounds(16, -1, 1).is_err());
/// assert!(check_bounds(16, i64::MAX, 2).is_err());
/// ```
pub fn check_bounds(size: i64, offset: i64, length: i64) -> Result<()> {
    let end = offset.wrapping_add(length);
    if (offset | length | end | size.wrapping_sub(end)) < 0 {
        return Err(Error::OutOfBounds {
            offset,
            length,
            size,
        });
    }

    Ok(())
}

/// Number of bytes covered by `count` elements of `width` bytes, saturating at `i64::MAX`.
pub(crate) fn byte_length(count: usize, width: usize) -> i64 {
    count
        .checked_mul(width)
        .and_then(|length| i64::try_from(length).ok())
        .unwrap_or(i64::MAX)
}

/// The storage that ultimately holds the bytes of a [`MemoryIO`].
#[derive(Debug, Clone, Copy)]
pub enum Backend<'a> {
    /// Heap array backed memory
    Array(&'a ArrayMemory),
    /// Byte buffer backed memory
    Buffer(&'a BufferMemory),
    /// The null sentinel
    Null,
    /// The inaccessible sentinel, with its address
    Inaccessible(u64),
    /// An implementation outside of this crate
    Foreign(&'a dyn MemoryIO),
}

/// Identity of a piece of storage, independent of any view placed over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageId {
    /// A shared byte region, identified by its allocation
    Region(usize),
    /// The null sentinel
    Null,
    /// The inaccessible sentinel at an address
    Inaccessible(u64),
    /// An implementation outside of this crate, identified by its allocation
    Foreign(usize),
}

/// A [`Backend`] together with the offset of a view's origin inside it.
#[derive(Debug, Clone, Copy)]
pub struct Underlying<'a> {
    /// The storage holding the bytes
    pub backend: Backend<'a>,
    /// Offset of offset 0 of the inspected memory, relative to offset 0 of `backend`
    pub offset: i64,
}

impl<'a> Underlying<'a> {
    /// The backend itself, without translation.
    #[must_use]
    pub fn direct(backend: Backend<'a>) -> Self {
        Underlying { backend, offset: 0 }
    }

    /// Identity of the storage.
    #[must_use]
    pub fn storage_id(&self) -> StorageId {
        match self.backend {
            Backend::Array(array) => StorageId::Region(array.region().id()),
            Backend::Buffer(buffer) => StorageId::Region(buffer.buffer().region().id()),
            Backend::Null => StorageId::Null,
            Backend::Inaccessible(address) => StorageId::Inaccessible(address),
            Backend::Foreign(io) => {
                StorageId::Foreign((io as *const dyn MemoryIO).cast::<()>() as usize)
            }
        }
    }

    /// Position of the origin inside the storage, including any array window or buffer
    /// position of the backend.
    #[must_use]
    pub fn start(&self) -> i64 {
        let base = match self.backend {
            Backend::Array(array) => i64::try_from(array.array_offset()).unwrap_or(i64::MAX),
            Backend::Buffer(buffer) => i64::try_from(buffer.buffer().position()).unwrap_or(i64::MAX),
            _ => 0,
        };
        base.wrapping_add(self.offset)
    }

    /// The raw region and the absolute index of the origin, for region backed storage.
    pub(crate) fn raw(&self) -> Option<(&'a ByteRegion, i64)> {
        match self.backend {
            Backend::Array(array) => Some((array.region(), self.start())),
            Backend::Buffer(buffer) => Some((buffer.buffer().region(), self.start())),
            _ => None,
        }
    }
}

/// Capability shared by every kind of addressable memory.
///
/// All offsets are signed byte offsets relative to the memory's origin. Multi-byte values are
/// encoded with the [`Codec`] of the runtime the memory was created for.
///
/// The bulk, fill and search operations have provided implementations in terms of the single
/// value accessors. They validate the whole range first, so they never stop half way because
/// of a bounds violation. Backends override them with faster paths.
pub trait MemoryIO: fmt::Debug + Send + Sync {
    /// Size in bytes; `i64::MAX` when unknown.
    fn size(&self) -> i64;

    /// Native address of offset 0, or 0 if the memory has none.
    fn address(&self) -> u64;

    /// Whether the memory lives outside the heap at a stable native address.
    fn is_direct(&self) -> bool;

    /// Resolves views down to the storage that holds the bytes.
    fn underlying(&self) -> Underlying<'_>;

    /// Parts of a view, used to slice the view's delegate instead of stacking views.
    fn view_parts(&self) -> Option<ViewParts> {
        None
    }

    /// Validates an access of `length` bytes at `offset`.
    ///
    /// # Errors
    /// The fault the memory would raise for such an access.
    fn check_bounds(&self, offset: i64, length: i64) -> Result<()>;

    /// Reads a signed byte.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    fn get_i8(&self, offset: i64) -> Result<i8>;
    /// Reads a 16-bit integer.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    fn get_i16(&self, offset: i64) -> Result<i16>;
    /// Reads a 32-bit integer.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    fn get_i32(&self, offset: i64) -> Result<i32>;
    /// Reads a 64-bit integer.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    fn get_i64(&self, offset: i64) -> Result<i64>;
    /// Reads a 32-bit float.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    fn get_f32(&self, offset: i64) -> Result<f32>;
    /// Reads a 64-bit float.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    fn get_f64(&self, offset: i64) -> Result<f64>;
    /// Reads a pointer-sized integer, zero-extended to 64 bits.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    fn get_address(&self, offset: i64) -> Result<u64>;

    /// Writes a signed byte.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    fn put_i8(&self, offset: i64, value: i8) -> Result<()>;
    /// Writes a 16-bit integer.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    fn put_i16(&self, offset: i64, value: i16) -> Result<()>;
    /// Writes a 32-bit integer.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    fn put_i32(&self, offset: i64, value: i32) -> Result<()>;
    /// Writes a 64-bit integer.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    fn put_i64(&self, offset: i64, value: i64) -> Result<()>;
    /// Writes a 32-bit float.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    fn put_f32(&self, offset: i64, value: f32) -> Result<()>;
    /// Writes a 64-bit float.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    fn put_f64(&self, offset: i64, value: f64) -> Result<()>;
    /// Writes a pointer-sized integer; 32-bit platforms keep the low 4 bytes.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    fn put_address(&self, offset: i64, value: u64) -> Result<()>;

    /// Copies `dst.len()` bytes starting at `offset` into `dst`.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    fn get_bytes(&self, offset: i64, dst: &mut [u8]) -> Result<()>;

    /// Copies `src` into the memory starting at `offset`.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    fn put_bytes(&self, offset: i64, src: &[u8]) -> Result<()>;

    /// Reads consecutive 16-bit integers.
    ///
    /// # Errors
    /// Bounds or sentinel faults, raised before `dst` is modified.
    fn get_i16s(&self, offset: i64, dst: &mut [i16]) -> Result<()> {
        self.check_bounds(offset, byte_length(dst.len(), 2))?;
        for (index, value) in (0_i64..).zip(dst.iter_mut()) {
            *value = self.get_i16(offset + index * 2)?;
        }
        Ok(())
    }

    /// Writes consecutive 16-bit integers.
    ///
    /// # Errors
    /// Bounds or sentinel faults, raised before memory is modified.
    fn put_i16s(&self, offset: i64, src: &[i16]) -> Result<()> {
        self.check_bounds(offset, byte_length(src.len(), 2))?;
        for (index, value) in (0_i64..).zip(src) {
            self.put_i16(offset + index * 2, *value)?;
        }
        Ok(())
    }

    /// Reads consecutive 32-bit integers.
    ///
    /// # Errors
    /// Bounds or sentinel faults, raised before `dst` is modified.
    fn get_i32s(&self, offset: i64, dst: &mut [i32]) -> Result<()> {
        self.check_bounds(offset, byte_length(dst.len(), 4))?;
        for (index, value) in (0_i64..).zip(dst.iter_mut()) {
            *value = self.get_i32(offset + index * 4)?;
        }
        Ok(())
    }

    /// Writes consecutive 32-bit integers.
    ///
    /// # Errors
    /// Bounds or sentinel faults, raised before memory is modified.
    fn put_i32s(&self, offset: i64, src: &[i32]) -> Result<()> {
        self.check_bounds(offset, byte_length(src.len(), 4))?;
        for (index, value) in (0_i64..).zip(src) {
            self.put_i32(offset + index * 4, *value)?;
        }
        Ok(())
    }

    /// Reads consecutive 64-bit integers.
    ///
    /// # Errors
    /// Bounds or sentinel faults, raised before `dst` is modified.
    fn get_i64s(&self, offset: i64, dst: &mut [i64]) -> Result<()> {
        self.check_bounds(offset, byte_length(dst.len(), 8))?;
        for (index, value) in (0_i64..).zip(dst.iter_mut()) {
            *value = self.get_i64(offset + index * 8)?;
        }
        Ok(())
    }

    /// Writes consecutive 64-bit integers.
    ///
    /// # Errors
    /// Bounds or sentinel faults, raised before memory is modified.
    fn put_i64s(&self, offset: i64, src: &[i64]) -> Result<()> {
        self.check_bounds(offset, byte_length(src.len(), 8))?;
        for (index, value) in (0_i64..).zip(src) {
            self.put_i64(offset + index * 8, *value)?;
        }
        Ok(())
    }

    /// Reads consecutive 32-bit floats.
    ///
    /// # Errors
    /// Bounds or sentinel faults, raised before `dst` is modified.
    fn get_f32s(&self, offset: i64, dst: &mut [f32]) -> Result<()> {
        self.check_bounds(offset, byte_length(dst.len(), 4))?;
        for (index, value) in (0_i64..).zip(dst.iter_mut()) {
            *value = self.get_f32(offset + index * 4)?;
        }
        Ok(())
    }

    /// Writes consecutive 32-bit floats.
    ///
    /// # Errors
    /// Bounds or sentinel faults, raised before memory is modified.
    fn put_f32s(&self, offset: i64, src: &[f32]) -> Result<()> {
        self.check_bounds(offset, byte_length(src.len(), 4))?;
        for (index, value) in (0_i64..).zip(src) {
            self.put_f32(offset + index * 4, *value)?;
        }
        Ok(())
    }

    /// Reads consecutive 64-bit floats.
    ///
    /// # Errors
    /// Bounds or sentinel faults, raised before `dst` is modified.
    fn get_f64s(&self, offset: i64, dst: &mut [f64]) -> Result<()> {
        self.check_bounds(offset, byte_length(dst.len(), 8))?;
        for (index, value) in (0_i64..).zip(dst.iter_mut()) {
            *value = self.get_f64(offset + index * 8)?;
        }
        Ok(())
    }

    /// Writes consecutive 64-bit floats.
    ///
    /// # Errors
    /// Bounds or sentinel faults, raised before memory is modified.
    fn put_f64s(&self, offset: i64, src: &[f64]) -> Result<()> {
        self.check_bounds(offset, byte_length(src.len(), 8))?;
        for (index, value) in (0_i64..).zip(src) {
            self.put_f64(offset + index * 8, *value)?;
        }
        Ok(())
    }

    /// Sets `length` bytes starting at `offset` to `value`.
    ///
    /// # Errors
    /// Bounds or sentinel faults, raised before memory is modified.
    fn fill(&self, offset: i64, length: i64, value: u8) -> Result<()> {
        self.check_bounds(offset, length)?;
        for index in 0..length {
            self.put_i8(offset + index, value as i8)?;
        }
        Ok(())
    }

    /// Position of the first `value` within `max_length` bytes from `offset`, relative to
    /// `offset`.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    fn index_of(&self, offset: i64, value: u8, max_length: i64) -> Result<Option<i64>> {
        for index in 0..max_length {
            if self.get_i8(offset + index)? as u8 == value {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_single_check() {
        assert!(check_bounds(8, 0, 8).is_ok());
        assert!(check_bounds(8, 8, 0).is_ok());
        assert!(check_bounds(8, 4, 4).is_ok());
        assert!(check_bounds(8, 5, 4).is_err());
        assert!(check_bounds(8, -1, 1).is_err());
        assert!(check_bounds(8, 0, -1).is_err());
        assert!(check_bounds(8, 8, 1).is_err());
        assert!(check_bounds(i64::MAX, i64::MAX, 1).is_err());
        assert!(check_bounds(0, 0, 0).is_ok());
    }

    #[test]
    fn bounds_error_reports_window() {
        let result = check_bounds(16, 14, 4);
        assert!(matches!(
            result,
            Err(Error::OutOfBounds {
                offset: 14,
                length: 4,
                size: 16
            })
        ));
    }

    #[test]
    fn byte_length_saturates() {
        assert_eq!(byte_length(3, 8), 24);
        assert_eq!(byte_length(usize::MAX, 2), i64::MAX);
    }
}
