//! Numeric codecs selecting byte order and address width for raw-byte backends.

use crate::{
    memory::io::{read_be_at, read_le_at, write_be_at, write_le_at, NativeIO},
    platform::{ByteOrder, Platform, WordSize},
    Result,
};

/// Numeric codec for one combination of byte order and address width.
///
/// The codec is selected once per [`crate::Runtime`] and shared by every backend that owns raw
/// bytes. Address width only matters for [`Codec::get_address`] and [`Codec::put_address`]:
/// 32-bit codecs read 4 bytes and zero-extend them, 64-bit codecs read 8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Little endian, 4 byte addresses
    Le32,
    /// Little endian, 8 byte addresses
    Le64,
    /// Big endian, 4 byte addresses
    Be32,
    /// Big endian, 8 byte addresses
    Be64,
}

impl Codec {
    /// Selects the codec for a byte order and address width.
    #[must_use]
    pub const fn select(order: ByteOrder, address: WordSize) -> Self {
        match (order, address) {
            (ByteOrder::LittleEndian, WordSize::Bits32) => Codec::Le32,
            (ByteOrder::LittleEndian, WordSize::Bits64) => Codec::Le64,
            (ByteOrder::BigEndian, WordSize::Bits32) => Codec::Be32,
            (ByteOrder::BigEndian, WordSize::Bits64) => Codec::Be64,
        }
    }

    /// Selects the codec matching a platform.
    #[must_use]
    pub const fn for_platform(platform: &Platform) -> Self {
        Self::select(platform.byte_order, platform.address_size)
    }

    /// Byte order of this codec.
    #[must_use]
    pub const fn byte_order(self) -> ByteOrder {
        match self {
            Codec::Le32 | Codec::Le64 => ByteOrder::LittleEndian,
            Codec::Be32 | Codec::Be64 => ByteOrder::BigEndian,
        }
    }

    /// Address width of this codec.
    #[must_use]
    pub const fn address_size(self) -> WordSize {
        match self {
            Codec::Le32 | Codec::Be32 => WordSize::Bits32,
            Codec::Le64 | Codec::Be64 => WordSize::Bits64,
        }
    }

    /// Decodes a `T` at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` ends before the value does.
    pub fn get<T: NativeIO>(self, data: &[u8], offset: usize) -> Result<T> {
        let mut offset = offset;
        match self.byte_order() {
            ByteOrder::LittleEndian => read_le_at(data, &mut offset),
            ByteOrder::BigEndian => read_be_at(data, &mut offset),
        }
    }

    /// Encodes `value` at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` ends before the value does.
    pub fn put<T: NativeIO>(self, data: &mut [u8], offset: usize, value: T) -> Result<()> {
        let mut offset = offset;
        match self.byte_order() {
            ByteOrder::LittleEndian => write_le_at(data, &mut offset, value),
            ByteOrder::BigEndian => write_be_at(data, &mut offset, value),
        }
    }

    /// Decodes a pointer-sized integer at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` ends before the address does.
    pub fn get_address(self, data: &[u8], offset: usize) -> Result<u64> {
        match self.address_size() {
            WordSize::Bits32 => Ok(u64::from(self.get::<u32>(data, offset)?)),
            WordSize::Bits64 => self.get::<u64>(data, offset),
        }
    }

    /// Encodes a pointer-sized integer at `offset`; 32-bit codecs keep the low 4 bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` ends before the address does.
    pub fn put_address(self, data: &mut [u8], offset: usize, value: u64) -> Result<()> {
        match self.address_size() {
            WordSize::Bits32 => self.put::<u32>(data, offset, value as u32),
            WordSize::Bits64 => self.put::<u64>(data, offset, value),
        }
    }
}
