use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::{
    memory::{
        byte_length, region::copy_between, BoundedMemory, Charset, InaccessibleMemory, MemoryIO,
        NullMemory, ShareMemory, Underlying,
    },
    platform::{NativeType, WordSize},
    Error, Result, Runtime,
};

/// Anything that can be read and written through a [`Pointer`].
///
/// Implemented by [`Pointer`] itself and by [`crate::Record`], so that record fields accept
/// either.
pub trait AsPointer {
    /// The pointer to access.
    fn pointer(&self) -> &Pointer;
}

/// A cheaply cloneable handle to native memory.
///
/// A `Pointer` couples a [`MemoryIO`] implementation with the [`Runtime`] it was created for.
/// Clones refer to the same bytes. All accessors take signed byte offsets relative to the
/// pointer's origin, and fail without side effects.
///
/// Two pointers are equal when they resolve to the same storage, start at the same position in
/// it and have the same size, regardless of how many views were involved in creating them.
///
/// # Examples
///
/// ```rust
/// use nativemem::Runtime;
///
/// let runtime = Runtime::system();
/// let memory = runtime.allocate(16);
///
/// memory.put_i32(4, 0x1234_5678)?;
/// let tail = memory.slice(4);
/// assert_eq!(tail.get_i32(0)?, 0x1234_5678);
/// assert_eq!(tail.size(), 12);
/// # Ok::<(), nativemem::Error>(())
/// ```
#[derive(Clone)]
pub struct Pointer {
    runtime: Arc<Runtime>,
    io: Arc<dyn MemoryIO>,
}

impl Pointer {
    /// Wraps any memory implementation for use with `runtime`.
    #[must_use]
    pub fn from_io(runtime: Arc<Runtime>, io: Arc<dyn MemoryIO>) -> Self {
        Pointer { runtime, io }
    }

    /// The runtime this pointer belongs to.
    #[must_use]
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// The wrapped memory implementation.
    #[must_use]
    pub fn io(&self) -> &Arc<dyn MemoryIO> {
        &self.io
    }

    /// Size in bytes; `i64::MAX` if unknown.
    #[must_use]
    pub fn size(&self) -> i64 {
        self.io.size()
    }

    /// Native address, or 0 for memory without one.
    #[must_use]
    pub fn address(&self) -> u64 {
        self.io.address()
    }

    /// True if this is the null pointer or a view of it.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self.io.underlying().backend, crate::memory::Backend::Null)
    }

    /// Whether the memory lives at a stable native address.
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.io.is_direct()
    }

    /// The storage holding the bytes and the position of this pointer in it.
    #[must_use]
    pub fn underlying(&self) -> Underlying<'_> {
        self.io.underlying()
    }

    /// Validates an access of `length` bytes at `offset`.
    ///
    /// # Errors
    /// The fault an access of that range would raise.
    pub fn check_bounds(&self, offset: i64, length: i64) -> Result<()> {
        self.io.check_bounds(offset, length)
    }

    /// Reads a signed byte.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn get_i8(&self, offset: i64) -> Result<i8> {
        self.io.get_i8(offset)
    }

    /// Reads an unsigned byte.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn get_u8(&self, offset: i64) -> Result<u8> {
        self.io.get_i8(offset).map(|value| value as u8)
    }

    /// Reads a 16-bit integer.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn get_i16(&self, offset: i64) -> Result<i16> {
        self.io.get_i16(offset)
    }

    /// Reads a 32-bit integer.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn get_i32(&self, offset: i64) -> Result<i32> {
        self.io.get_i32(offset)
    }

    /// Reads a 64-bit integer.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn get_i64(&self, offset: i64) -> Result<i64> {
        self.io.get_i64(offset)
    }

    /// Reads a 32-bit float.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn get_f32(&self, offset: i64) -> Result<f32> {
        self.io.get_f32(offset)
    }

    /// Reads a 64-bit float.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn get_f64(&self, offset: i64) -> Result<f64> {
        self.io.get_f64(offset)
    }

    /// Writes a signed byte.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn put_i8(&self, offset: i64, value: i8) -> Result<()> {
        self.io.put_i8(offset, value)
    }

    /// Writes an unsigned byte.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn put_u8(&self, offset: i64, value: u8) -> Result<()> {
        self.io.put_i8(offset, value as i8)
    }

    /// Writes a 16-bit integer.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn put_i16(&self, offset: i64, value: i16) -> Result<()> {
        self.io.put_i16(offset, value)
    }

    /// Writes a 32-bit integer.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn put_i32(&self, offset: i64, value: i32) -> Result<()> {
        self.io.put_i32(offset, value)
    }

    /// Writes a 64-bit integer.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn put_i64(&self, offset: i64, value: i64) -> Result<()> {
        self.io.put_i64(offset, value)
    }

    /// Writes a 32-bit float.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn put_f32(&self, offset: i64, value: f32) -> Result<()> {
        self.io.put_f32(offset, value)
    }

    /// Writes a 64-bit float.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn put_f64(&self, offset: i64, value: f64) -> Result<()> {
        self.io.put_f64(offset, value)
    }

    /// Reads a pointer-sized integer.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn get_address(&self, offset: i64) -> Result<u64> {
        self.io.get_address(offset)
    }

    /// Writes a pointer-sized integer.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn put_address(&self, offset: i64, value: u64) -> Result<()> {
        self.io.put_address(offset, value)
    }

    /// Reads a C `long`, 4 or 8 bytes depending on the platform, sign-extended.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn get_native_long(&self, offset: i64) -> Result<i64> {
        match self.runtime.platform().long_size {
            WordSize::Bits32 => self.io.get_i32(offset).map(i64::from),
            WordSize::Bits64 => self.io.get_i64(offset),
        }
    }

    /// Writes a C `long`; 4 byte longs keep the low 32 bits of `value`.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn put_native_long(&self, offset: i64, value: i64) -> Result<()> {
        match self.runtime.platform().long_size {
            WordSize::Bits32 => self.io.put_i32(offset, value as i32),
            WordSize::Bits64 => self.io.put_i64(offset, value),
        }
    }

    /// Reads an integer of the given native type, widened to `i64`.
    ///
    /// Signed types are sign-extended, unsigned types zero-extended; unsigned 64-bit values keep
    /// their bit pattern.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedType`] for types without an integer representation, besides
    /// bounds or sentinel faults.
    pub fn get_int(&self, native: NativeType, offset: i64) -> Result<i64> {
        let long32 = self.runtime.platform().long_size == WordSize::Bits32;
        match native {
            NativeType::SChar => self.io.get_i8(offset).map(i64::from),
            NativeType::UChar => self.io.get_i8(offset).map(|v| i64::from(v as u8)),
            NativeType::SShort => self.io.get_i16(offset).map(i64::from),
            NativeType::UShort => self.io.get_i16(offset).map(|v| i64::from(v as u16)),
            NativeType::SInt => self.io.get_i32(offset).map(i64::from),
            NativeType::UInt => self.io.get_i32(offset).map(|v| i64::from(v as u32)),
            NativeType::SLong => self.get_native_long(offset),
            NativeType::ULong if long32 => self.io.get_i32(offset).map(|v| i64::from(v as u32)),
            NativeType::ULong | NativeType::SLongLong | NativeType::ULongLong => {
                self.io.get_i64(offset)
            }
            NativeType::Address => self.io.get_address(offset).map(|v| v as i64),
            NativeType::Float | NativeType::Double | NativeType::Void | NativeType::Struct => {
                Err(Error::UnsupportedType(native))
            }
        }
    }

    /// Writes an integer as the given native type, truncating to its width.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedType`] for types without an integer representation, besides
    /// bounds or sentinel faults.
    pub fn put_int(&self, native: NativeType, offset: i64, value: i64) -> Result<()> {
        match native {
            NativeType::SChar | NativeType::UChar => self.io.put_i8(offset, value as i8),
            NativeType::SShort | NativeType::UShort => self.io.put_i16(offset, value as i16),
            NativeType::SInt | NativeType::UInt => self.io.put_i32(offset, value as i32),
            NativeType::SLong | NativeType::ULong => self.put_native_long(offset, value),
            NativeType::SLongLong | NativeType::ULongLong => self.io.put_i64(offset, value),
            NativeType::Address => self.io.put_address(offset, value as u64),
            NativeType::Float | NativeType::Double | NativeType::Void | NativeType::Struct => {
                Err(Error::UnsupportedType(native))
            }
        }
    }

    /// Reads an address and resolves it in the runtime's address space.
    ///
    /// Address 0 yields the null pointer; an address outside every live direct region yields an
    /// inaccessible pointer.
    ///
    /// # Errors
    /// Bounds or sentinel faults while reading the address.
    pub fn get_pointer(&self, offset: i64) -> Result<Pointer> {
        let address = self.io.get_address(offset)?;
        Ok(self.runtime.pointer_at(address))
    }

    /// Like [`Pointer::get_pointer`], bounding the result to `size` bytes.
    ///
    /// # Errors
    /// Bounds or sentinel faults, or [`Error::OutOfBounds`] if the pointee is smaller than
    /// `size`.
    pub fn get_pointer_sized(&self, offset: i64, size: i64) -> Result<Pointer> {
        let pointer = self.get_pointer(offset)?;
        if !pointer.is_null() && pointer.underlying().raw().is_some() {
            return pointer.slice_bounded(0, size);
        }
        Ok(pointer)
    }

    /// Stores the native address of `value` at `offset`.
    ///
    /// # Errors
    /// Returns [`Error::NotDirect`] if `value` has no native address (heap memory), or
    /// [`Error::AddressOverflow`] if its address is wider than the platform's pointers, besides
    /// bounds or sentinel faults.
    pub fn put_pointer(&self, offset: i64, value: &Pointer) -> Result<()> {
        let address = self.storable_address(value)?;
        self.io.put_address(offset, address)
    }

    fn storable_address(&self, value: &Pointer) -> Result<u64> {
        if value.is_null() {
            return Ok(0);
        }

        let address = value.address();
        if address == 0 {
            return Err(Error::NotDirect);
        }

        let width = self.runtime.platform().address_bytes();
        if width < 8 && address >> (width * 8) != 0 {
            return Err(Error::AddressOverflow { address, width });
        }
        Ok(address)
    }

    /// Reads `count` consecutive pointers starting at `offset`.
    ///
    /// # Errors
    /// Bounds or sentinel faults, checked for the whole array before the first read.
    pub fn get_pointers(&self, offset: i64, count: usize) -> Result<Vec<Pointer>> {
        let width = self.runtime.platform().address_bytes();
        self.check_bounds(offset, byte_length(count, width))?;

        let mut pointers = Vec::with_capacity(count);
        let mut at = offset;
        for _ in 0..count {
            pointers.push(self.get_pointer(at)?);
            at += width as i64;
        }
        Ok(pointers)
    }

    /// Writes the addresses of `values` as consecutive pointers starting at `offset`.
    ///
    /// Every value is validated before the first address is written.
    ///
    /// # Errors
    /// Same as [`Pointer::put_pointer`] for any element, or bounds and sentinel faults of the
    /// whole array.
    pub fn put_pointers(&self, offset: i64, values: &[Pointer]) -> Result<()> {
        let width = self.runtime.platform().address_bytes();
        self.check_bounds(offset, byte_length(values.len(), width))?;
        let addresses = values
            .iter()
            .map(|value| self.storable_address(value))
            .collect::<Result<Vec<_>>>()?;

        let mut at = offset;
        for address in addresses {
            self.io.put_address(at, address)?;
            at += width as i64;
        }
        Ok(())
    }

    /// Reads pointers from `offset` up to, not including, the first null entry.
    ///
    /// # Errors
    /// Bounds or sentinel faults, including running off the end before a null entry.
    pub fn get_null_terminated_pointers(&self, offset: i64) -> Result<Vec<Pointer>> {
        let width = self.runtime.platform().address_bytes() as i64;
        let mut pointers = Vec::new();
        let mut at = offset;
        loop {
            let pointer = self.get_pointer(at)?;
            if pointer.is_null() {
                return Ok(pointers);
            }
            pointers.push(pointer);
            at += width;
        }
    }

    /// Reads the strings referenced by a null-terminated array of pointers at `offset`.
    ///
    /// # Errors
    /// Faults of reading the array, or of reading any referenced string.
    pub fn get_null_terminated_strings(
        &self,
        offset: i64,
        charset: Charset,
    ) -> Result<Vec<String>> {
        self.get_null_terminated_pointers(offset)?
            .iter()
            .map(|pointer| pointer.get_string(0, pointer.size(), charset))
            .collect()
    }

    /// Copies `dst.len()` bytes at `offset` into `dst`.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn get_bytes(&self, offset: i64, dst: &mut [u8]) -> Result<()> {
        self.io.get_bytes(offset, dst)
    }

    /// Copies `src` to `offset`.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn put_bytes(&self, offset: i64, src: &[u8]) -> Result<()> {
        self.io.put_bytes(offset, src)
    }

    /// Reads consecutive 16-bit integers.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn get_i16s(&self, offset: i64, dst: &mut [i16]) -> Result<()> {
        self.io.get_i16s(offset, dst)
    }

    /// Writes consecutive 16-bit integers.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn put_i16s(&self, offset: i64, src: &[i16]) -> Result<()> {
        self.io.put_i16s(offset, src)
    }

    /// Reads consecutive 32-bit integers.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn get_i32s(&self, offset: i64, dst: &mut [i32]) -> Result<()> {
        self.io.get_i32s(offset, dst)
    }

    /// Writes consecutive 32-bit integers.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn put_i32s(&self, offset: i64, src: &[i32]) -> Result<()> {
        self.io.put_i32s(offset, src)
    }

    /// Reads consecutive 64-bit integers.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn get_i64s(&self, offset: i64, dst: &mut [i64]) -> Result<()> {
        self.io.get_i64s(offset, dst)
    }

    /// Writes consecutive 64-bit integers.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn put_i64s(&self, offset: i64, src: &[i64]) -> Result<()> {
        self.io.put_i64s(offset, src)
    }

    /// Reads consecutive 32-bit floats.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn get_f32s(&self, offset: i64, dst: &mut [f32]) -> Result<()> {
        self.io.get_f32s(offset, dst)
    }

    /// Writes consecutive 32-bit floats.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn put_f32s(&self, offset: i64, src: &[f32]) -> Result<()> {
        self.io.put_f32s(offset, src)
    }

    /// Reads consecutive 64-bit floats.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn get_f64s(&self, offset: i64, dst: &mut [f64]) -> Result<()> {
        self.io.get_f64s(offset, dst)
    }

    /// Writes consecutive 64-bit floats.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn put_f64s(&self, offset: i64, src: &[f64]) -> Result<()> {
        self.io.put_f64s(offset, src)
    }

    /// Sets `length` bytes at `offset` to `value`.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn fill(&self, offset: i64, length: i64, value: u8) -> Result<()> {
        self.io.fill(offset, length, value)
    }

    /// Searches at most `max_length` bytes from `offset` for `value`, returning its position
    /// relative to `offset`.
    ///
    /// # Errors
    /// Bounds or sentinel faults.
    pub fn index_of(&self, offset: i64, value: u8, max_length: i64) -> Result<Option<i64>> {
        self.io.index_of(offset, value, max_length)
    }

    /// An open-ended view starting at `offset`.
    ///
    /// Slicing a view inside its window slices its delegate, so such views never nest. A bounded
    /// view stays bounded: a slice that starts before or past its window wraps the bounded view
    /// itself, and every access through it faults. Slices of the sentinels are sentinels.
    #[must_use]
    pub fn slice(&self, offset: i64) -> Pointer {
        if let Some(sentinel) = self.slice_sentinel(offset) {
            return sentinel;
        }

        let width = self.runtime.platform().address_bytes();
        let io: Arc<dyn MemoryIO> = match self.io.view_parts() {
            Some(parts) => match parts.limit {
                Some(limit) if (0..=limit).contains(&offset) => {
                    match BoundedMemory::new(
                        parts.delegate,
                        parts.base + offset,
                        limit - offset,
                        width,
                    ) {
                        Ok(bounded) => Arc::new(bounded),
                        Err(_) => Arc::new(ShareMemory::new(self.io.clone(), offset, width)),
                    }
                }
                Some(_) => Arc::new(ShareMemory::new(self.io.clone(), offset, width)),
                None => Arc::new(ShareMemory::new(
                    parts.delegate,
                    parts.base.saturating_add(offset),
                    width,
                )),
            },
            None => Arc::new(ShareMemory::new(self.io.clone(), offset, width)),
        };

        Pointer {
            runtime: self.runtime.clone(),
            io,
        }
    }

    /// A view of exactly `size` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns the fault of an access to `(offset, size)` on this pointer.
    pub fn slice_bounded(&self, offset: i64, size: i64) -> Result<Pointer> {
        if let Some(sentinel) = self.slice_sentinel(offset) {
            return Ok(sentinel);
        }

        self.check_bounds(offset, size)?;
        let width = self.runtime.platform().address_bytes();
        let bounded = match self.io.view_parts() {
            Some(parts) => BoundedMemory::new(parts.delegate, parts.base + offset, size, width)?,
            None => BoundedMemory::new(self.io.clone(), offset, size, width)?,
        };

        Ok(Pointer {
            runtime: self.runtime.clone(),
            io: Arc::new(bounded),
        })
    }

    fn slice_sentinel(&self, offset: i64) -> Option<Pointer> {
        let io: Arc<dyn MemoryIO> = match self.io.underlying().backend {
            crate::memory::Backend::Null => Arc::new(NullMemory),
            crate::memory::Backend::Inaccessible(address) => Arc::new(InaccessibleMemory::new(
                address.wrapping_add(self.io.underlying().offset.wrapping_add(offset) as u64),
            )),
            _ => return None,
        };

        Some(Pointer {
            runtime: self.runtime.clone(),
            io,
        })
    }

    /// Copies `count` bytes from `offset` of this pointer to `other_offset` of `other`.
    ///
    /// Both ranges are validated before any byte moves. Views are resolved on both sides; when
    /// both resolve to region backed memory the copy happens in one step, otherwise byte by
    /// byte.
    ///
    /// # Errors
    /// Bounds or sentinel faults of either side.
    pub fn transfer_to(
        &self,
        offset: i64,
        other: &Pointer,
        other_offset: i64,
        count: i64,
    ) -> Result<()> {
        other.check_bounds(other_offset, count)?;
        self.check_bounds(offset, count)?;
        transfer(self, offset, other, other_offset, count)
    }

    /// Copies `count` bytes from `other_offset` of `other` to `offset` of this pointer.
    ///
    /// # Errors
    /// Bounds or sentinel faults of either side.
    pub fn transfer_from(
        &self,
        offset: i64,
        other: &Pointer,
        other_offset: i64,
        count: i64,
    ) -> Result<()> {
        other.check_bounds(other_offset, count)?;
        self.check_bounds(offset, count)?;
        transfer(other, other_offset, self, offset, count)
    }
}

fn transfer(src: &Pointer, src_offset: i64, dst: &Pointer, dst_offset: i64, count: i64) -> Result<()> {
    let source = src.io.underlying();
    let target = dst.io.underlying();

    if let (Some((src_region, src_start)), Some((dst_region, dst_start))) =
        (source.raw(), target.raw())
    {
        log::trace!("region transfer of {count} bytes");
        let index = |start: i64, offset: i64| usize::try_from(start + offset).unwrap_or(usize::MAX);
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        return copy_between(
            src_region,
            index(src_start, src_offset),
            dst_region,
            index(dst_start, dst_offset),
            count,
        );
    }

    if let Some((dst_region, dst_start)) = target.raw() {
        log::trace!("transfer of {count} bytes into a region");
        let index = usize::try_from(dst_start + dst_offset).unwrap_or(usize::MAX);
        let length = usize::try_from(count).unwrap_or(usize::MAX);
        return dst_region.with_bytes_mut(|bytes| {
            let window = crate::memory::region::window_mut(bytes, index, length)?;
            src.io.get_bytes(src_offset, window)
        });
    }

    if let Some((src_region, src_start)) = source.raw() {
        log::trace!("transfer of {count} bytes out of a region");
        let index = usize::try_from(src_start + src_offset).unwrap_or(usize::MAX);
        let length = usize::try_from(count).unwrap_or(usize::MAX);
        return src_region.with_bytes(|bytes| {
            let window = crate::memory::region::window(bytes, index, length)?;
            dst.io.put_bytes(dst_offset, window)
        });
    }

    log::trace!("bytewise transfer of {count} bytes");
    for index in 0..count {
        dst.io
            .put_i8(dst_offset + index, src.io.get_i8(src_offset + index)?)?;
    }
    Ok(())
}

impl AsPointer for Pointer {
    fn pointer(&self) -> &Pointer {
        self
    }
}

impl PartialEq for Pointer {
    fn eq(&self, other: &Self) -> bool {
        let (left, right) = (self.io.underlying(), other.io.underlying());
        left.storage_id() == right.storage_id()
            && left.start() == right.start()
            && self.size() == other.size()
    }
}

impl Eq for Pointer {}

impl Hash for Pointer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.io.underlying().storage_id().hash(state);
    }
}

impl fmt::Debug for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let underlying = self.io.underlying();
        f.debug_struct("Pointer")
            .field("address", &format_args!("{:#x}", self.address()))
            .field("size", &self.size())
            .field("direct", &self.is_direct())
            .field("storage", &underlying.storage_id())
            .field("start", &underlying.start())
            .finish()
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "null");
        }
        match self.address() {
            0 => write!(f, "heap[{}]", self.size()),
            address => write!(f, "{address:#x}"),
        }
    }
}
