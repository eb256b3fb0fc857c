use byteorder::{BigEndian, ByteOrder as Endianness, LittleEndian};

use crate::{
    memory::{
        byte_length, check_bounds, codec::Codec, io::NativeIO, region::window,
        region::window_mut, Backend, ByteRegion, MemoryIO, Underlying,
    },
    platform::ByteOrder,
    Error, Result,
};

/// A positioned window `position..limit` into a [`ByteRegion`].
///
/// Models an externally managed byte buffer: the buffer is direct when its region is an
/// anonymous mapping, and heap allocated otherwise. Clones share the bytes.
#[derive(Debug, Clone)]
pub struct ByteBuffer {
    region: ByteRegion,
    position: usize,
    limit: usize,
}

impl ByteBuffer {
    /// A zero-filled heap buffer of `capacity` bytes.
    #[must_use]
    pub fn allocate(capacity: usize) -> Self {
        Self::from_region(ByteRegion::zeroed(capacity))
    }

    /// A zero-filled direct buffer of `capacity` bytes.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the mapping cannot be created.
    pub fn allocate_direct(capacity: usize) -> Result<Self> {
        Ok(Self::from_region(ByteRegion::map_anon(capacity)?))
    }

    /// A heap buffer over `data`.
    #[must_use]
    pub fn wrap(data: Vec<u8>) -> Self {
        Self::from_region(ByteRegion::from_vec(data))
    }

    /// A buffer spanning all of `region`.
    #[must_use]
    pub fn from_region(region: ByteRegion) -> Self {
        let limit = region.len();
        ByteBuffer {
            region,
            position: 0,
            limit,
        }
    }

    /// The same bytes, restricted to `position..limit` of the region.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] unless `position <= limit <= capacity`.
    pub fn with_window(&self, position: usize, limit: usize) -> Result<Self> {
        if position > limit || limit > self.region.len() {
            return Err(Error::OutOfBounds {
                offset: byte_length(position, 1),
                length: byte_length(limit.saturating_sub(position), 1),
                size: byte_length(self.region.len(), 1),
            });
        }

        Ok(ByteBuffer {
            region: self.region.clone(),
            position,
            limit,
        })
    }

    /// The underlying region.
    #[must_use]
    pub fn region(&self) -> &ByteRegion {
        &self.region
    }

    /// Start of the window.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// End of the window.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of bytes between position and limit.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    /// Total length of the region.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    /// True if the bytes live in a stable mapping outside the heap.
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.region.is_mapped()
    }
}

/// Memory backed by a [`ByteBuffer`].
///
/// Offset 0 is the buffer's position, the size is its remaining length. Directness and the
/// native address follow the wrapped buffer. Bulk typed accessors convert the whole range at
/// once through `byteorder` instead of looping over single values.
#[derive(Debug, Clone)]
pub struct BufferMemory {
    buffer: ByteBuffer,
    codec: Codec,
}

macro_rules! buffer_bulk {
    ($($get:ident / $put:ident : $ty:ty => $read_into:ident / $write_into:ident),* $(,)?) => {
        $(
            fn $get(&self, offset: i64, dst: &mut [$ty]) -> Result<()> {
                let length = dst.len().saturating_mul(std::mem::size_of::<$ty>());
                let index = self.index(offset, length)?;
                self.buffer.region.with_bytes(|bytes| {
                    let src = window(bytes, index, length)?;
                    match self.codec.byte_order() {
                        ByteOrder::LittleEndian => LittleEndian::$read_into(src, dst),
                        ByteOrder::BigEndian => BigEndian::$read_into(src, dst),
                    }
                    Ok(())
                })
            }

            fn $put(&self, offset: i64, src: &[$ty]) -> Result<()> {
                let length = src.len().saturating_mul(std::mem::size_of::<$ty>());
                let index = self.index(offset, length)?;
                self.buffer.region.with_bytes_mut(|bytes| {
                    let dst = window_mut(bytes, index, length)?;
                    match self.codec.byte_order() {
                        ByteOrder::LittleEndian => LittleEndian::$write_into(src, dst),
                        ByteOrder::BigEndian => BigEndian::$write_into(src, dst),
                    }
                    Ok(())
                })
            }
        )*
    };
}

impl BufferMemory {
    /// Memory over the remaining bytes of `buffer`.
    #[must_use]
    pub fn new(codec: Codec, buffer: ByteBuffer) -> Self {
        BufferMemory { buffer, codec }
    }

    /// The wrapped buffer.
    #[must_use]
    pub fn buffer(&self) -> &ByteBuffer {
        &self.buffer
    }

    fn region(&self) -> &ByteRegion {
        &self.buffer.region
    }

    fn index(&self, offset: i64, length: usize) -> Result<usize> {
        check_bounds(self.size(), offset, byte_length(length, 1))?;
        usize::try_from(offset)
            .map(|offset| self.buffer.position + offset)
            .map_err(|_| Error::OutOfBounds {
                offset,
                length: byte_length(length, 1),
                size: self.size(),
            })
    }

    fn read<T: NativeIO>(&self, offset: i64) -> Result<T> {
        let index = self.index(offset, std::mem::size_of::<T>())?;
        self.region().with_bytes(|bytes| self.codec.get(bytes, index))
    }

    fn write<T: NativeIO>(&self, offset: i64, value: T) -> Result<()> {
        let index = self.index(offset, std::mem::size_of::<T>())?;
        self.region()
            .with_bytes_mut(|bytes| self.codec.put(bytes, index, value))
    }
}

impl MemoryIO for BufferMemory {
    fn size(&self) -> i64 {
        byte_length(self.buffer.remaining(), 1)
    }

    fn address(&self) -> u64 {
        if self.buffer.is_direct() {
            self.buffer.region.address() + self.buffer.position as u64
        } else {
            0
        }
    }

    fn is_direct(&self) -> bool {
        self.buffer.is_direct()
    }

    fn underlying(&self) -> Underlying<'_> {
        Underlying::direct(Backend::Buffer(self))
    }

    fn check_bounds(&self, offset: i64, length: i64) -> Result<()> {
        check_bounds(self.size(), offset, length)
    }

    region_accessors!();

    buffer_bulk! {
        get_i16s / put_i16s : i16 => read_i16_into / write_i16_into,
        get_i32s / put_i32s : i32 => read_i32_into / write_i32_into,
        get_i64s / put_i64s : i64 => read_i64_into / write_i64_into,
        get_f32s / put_f32s : f32 => read_f32_into / write_f32_into,
        get_f64s / put_f64s : f64 => read_f64_into / write_f64_into,
    }
}
