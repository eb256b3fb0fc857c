use std::sync::Arc;

use crate::{
    memory::{byte_length, check_bounds, MemoryIO, Underlying},
    Error, Result,
};

/// Decomposition of a view into its delegate and translation, see [`MemoryIO::view_parts`].
#[derive(Debug, Clone)]
pub struct ViewParts {
    /// The memory the view forwards to
    pub delegate: Arc<dyn MemoryIO>,
    /// Offset of the view's origin inside the delegate
    pub base: i64,
    /// The view's own size, for bounded views
    pub limit: Option<i64>,
}

macro_rules! forwarding_accessors {
    () => {
        fn get_i8(&self, offset: i64) -> Result<i8> {
            self.delegate.get_i8(self.translate(offset, 1)?)
        }

        fn get_i16(&self, offset: i64) -> Result<i16> {
            self.delegate.get_i16(self.translate(offset, 2)?)
        }

        fn get_i32(&self, offset: i64) -> Result<i32> {
            self.delegate.get_i32(self.translate(offset, 4)?)
        }

        fn get_i64(&self, offset: i64) -> Result<i64> {
            self.delegate.get_i64(self.translate(offset, 8)?)
        }

        fn get_f32(&self, offset: i64) -> Result<f32> {
            self.delegate.get_f32(self.translate(offset, 4)?)
        }

        fn get_f64(&self, offset: i64) -> Result<f64> {
            self.delegate.get_f64(self.translate(offset, 8)?)
        }

        fn get_address(&self, offset: i64) -> Result<u64> {
            self.delegate
                .get_address(self.translate(offset, self.address_width)?)
        }

        fn put_i8(&self, offset: i64, value: i8) -> Result<()> {
            self.delegate.put_i8(self.translate(offset, 1)?, value)
        }

        fn put_i16(&self, offset: i64, value: i16) -> Result<()> {
            self.delegate.put_i16(self.translate(offset, 2)?, value)
        }

        fn put_i32(&self, offset: i64, value: i32) -> Result<()> {
            self.delegate.put_i32(self.translate(offset, 4)?, value)
        }

        fn put_i64(&self, offset: i64, value: i64) -> Result<()> {
            self.delegate.put_i64(self.translate(offset, 8)?, value)
        }

        fn put_f32(&self, offset: i64, value: f32) -> Result<()> {
            self.delegate.put_f32(self.translate(offset, 4)?, value)
        }

        fn put_f64(&self, offset: i64, value: f64) -> Result<()> {
            self.delegate.put_f64(self.translate(offset, 8)?, value)
        }

        fn put_address(&self, offset: i64, value: u64) -> Result<()> {
            self.delegate
                .put_address(self.translate(offset, self.address_width)?, value)
        }

        fn get_bytes(&self, offset: i64, dst: &mut [u8]) -> Result<()> {
            let at = self.translate(offset, byte_length(dst.len(), 1))?;
            self.delegate.get_bytes(at, dst)
        }

        fn put_bytes(&self, offset: i64, src: &[u8]) -> Result<()> {
            let at = self.translate(offset, byte_length(src.len(), 1))?;
            self.delegate.put_bytes(at, src)
        }

        fn get_i16s(&self, offset: i64, dst: &mut [i16]) -> Result<()> {
            let at = self.translate(offset, byte_length(dst.len(), 2))?;
            self.delegate.get_i16s(at, dst)
        }

        fn put_i16s(&self, offset: i64, src: &[i16]) -> Result<()> {
            let at = self.translate(offset, byte_length(src.len(), 2))?;
            self.delegate.put_i16s(at, src)
        }

        fn get_i32s(&self, offset: i64, dst: &mut [i32]) -> Result<()> {
            let at = self.translate(offset, byte_length(dst.len(), 4))?;
            self.delegate.get_i32s(at, dst)
        }

        fn put_i32s(&self, offset: i64, src: &[i32]) -> Result<()> {
            let at = self.translate(offset, byte_length(src.len(), 4))?;
            self.delegate.put_i32s(at, src)
        }

        fn get_i64s(&self, offset: i64, dst: &mut [i64]) -> Result<()> {
            let at = self.translate(offset, byte_length(dst.len(), 8))?;
            self.delegate.get_i64s(at, dst)
        }

        fn put_i64s(&self, offset: i64, src: &[i64]) -> Result<()> {
            let at = self.translate(offset, byte_length(src.len(), 8))?;
            self.delegate.put_i64s(at, src)
        }

        fn get_f32s(&self, offset: i64, dst: &mut [f32]) -> Result<()> {
            let at = self.translate(offset, byte_length(dst.len(), 4))?;
            self.delegate.get_f32s(at, dst)
        }

        fn put_f32s(&self, offset: i64, src: &[f32]) -> Result<()> {
            let at = self.translate(offset, byte_length(src.len(), 4))?;
            self.delegate.put_f32s(at, src)
        }

        fn get_f64s(&self, offset: i64, dst: &mut [f64]) -> Result<()> {
            let at = self.translate(offset, byte_length(dst.len(), 8))?;
            self.delegate.get_f64s(at, dst)
        }

        fn put_f64s(&self, offset: i64, src: &[f64]) -> Result<()> {
            let at = self.translate(offset, byte_length(src.len(), 8))?;
            self.delegate.put_f64s(at, src)
        }

        fn fill(&self, offset: i64, length: i64, value: u8) -> Result<()> {
            let at = self.translate(offset, length)?;
            self.delegate.fill(at, length, value)
        }

        fn address(&self) -> u64 {
            match self.delegate.address() {
                0 => 0,
                address => address.wrapping_add(self.base as u64),
            }
        }

        fn is_direct(&self) -> bool {
            self.delegate.is_direct()
        }

        fn underlying(&self) -> Underlying<'_> {
            let inner = self.delegate.underlying();
            Underlying {
                backend: inner.backend,
                offset: inner.offset.wrapping_add(self.base),
            }
        }
    };
}

/// A window of fixed size into another memory.
///
/// Every access is checked against the window's own size, and again by the delegate at the
/// translated offset. The address is the delegate's address plus the base, except that a
/// delegate without an address yields a view without one.
#[derive(Debug, Clone)]
pub struct BoundedMemory {
    delegate: Arc<dyn MemoryIO>,
    base: i64,
    size: i64,
    address_width: i64,
}

impl BoundedMemory {
    /// A view of `size` bytes of `delegate` starting at `base`.
    ///
    /// `address_width` is the platform pointer size in bytes, used to check address accesses.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if `base` or `size` are negative.
    pub fn new(
        delegate: Arc<dyn MemoryIO>,
        base: i64,
        size: i64,
        address_width: usize,
    ) -> Result<Self> {
        check_bounds(i64::MAX, base, size)?;
        Ok(BoundedMemory {
            delegate,
            base,
            size,
            address_width: byte_length(address_width, 1),
        })
    }

    fn translate(&self, offset: i64, length: i64) -> Result<i64> {
        check_bounds(self.size, offset, length)?;
        Ok(self.base + offset)
    }
}

impl MemoryIO for BoundedMemory {
    fn size(&self) -> i64 {
        self.size
    }

    fn view_parts(&self) -> Option<ViewParts> {
        Some(ViewParts {
            delegate: self.delegate.clone(),
            base: self.base,
            limit: Some(self.size),
        })
    }

    fn check_bounds(&self, offset: i64, length: i64) -> Result<()> {
        check_bounds(self.size, offset, length)?;
        self.delegate.check_bounds(self.base + offset, length)
    }

    fn index_of(&self, offset: i64, value: u8, max_length: i64) -> Result<Option<i64>> {
        check_bounds(self.size, offset, 0)?;
        let limit = max_length.min(self.size - offset);
        self.delegate.index_of(self.base + offset, value, limit)
    }

    forwarding_accessors!();
}

/// An open-ended window into another memory, starting at a base offset.
///
/// The view has no bound of its own: its size is whatever remains of the delegate, and all
/// checks are left to the delegate.
#[derive(Debug, Clone)]
pub struct ShareMemory {
    delegate: Arc<dyn MemoryIO>,
    base: i64,
    address_width: i64,
}

impl ShareMemory {
    /// A view of `delegate` starting at `base`.
    #[must_use]
    pub fn new(delegate: Arc<dyn MemoryIO>, base: i64, address_width: usize) -> Self {
        ShareMemory {
            delegate,
            base,
            address_width: byte_length(address_width, 1),
        }
    }

    fn translate(&self, offset: i64, length: i64) -> Result<i64> {
        self.base
            .checked_add(offset)
            .ok_or_else(|| Error::OutOfBounds {
                offset,
                length,
                size: self.size(),
            })
    }
}

impl MemoryIO for ShareMemory {
    fn size(&self) -> i64 {
        self.delegate.size().saturating_sub(self.base).max(0)
    }

    fn view_parts(&self) -> Option<ViewParts> {
        Some(ViewParts {
            delegate: self.delegate.clone(),
            base: self.base,
            limit: None,
        })
    }

    fn check_bounds(&self, offset: i64, length: i64) -> Result<()> {
        let at = self.translate(offset, length)?;
        self.delegate.check_bounds(at, length)
    }

    fn index_of(&self, offset: i64, value: u8, max_length: i64) -> Result<Option<i64>> {
        let at = self.translate(offset, 0)?;
        self.delegate.index_of(at, value, max_length)
    }

    forwarding_accessors!();
}
