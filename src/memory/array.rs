use crate::{
    memory::{
        byte_length, check_bounds, codec::Codec, io::NativeIO, region::window, Backend,
        ByteRegion, MemoryIO, Underlying,
    },
    Error, Result,
};

/// Memory backed by a heap byte array.
///
/// Wraps a [`ByteRegion`] the caller owns, or a window `(offset, length)` into one. Array memory
/// is never direct and reports address 0. The region is exposed through [`ArrayMemory::region`]
/// so that an invocation layer can pin or copy it; nothing in this crate relies on that.
#[derive(Debug, Clone)]
pub struct ArrayMemory {
    region: ByteRegion,
    offset: usize,
    length: usize,
    codec: Codec,
}

impl ArrayMemory {
    /// Memory over the whole of `region`.
    #[must_use]
    pub fn new(codec: Codec, region: ByteRegion) -> Self {
        let length = region.len();
        ArrayMemory {
            region,
            offset: 0,
            length,
            codec,
        }
    }

    /// Memory over `length` bytes of `region`, starting at `offset`.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if the window does not fit into `region`.
    pub fn with_window(
        codec: Codec,
        region: ByteRegion,
        offset: usize,
        length: usize,
    ) -> Result<Self> {
        let size = byte_length(region.len(), 1);
        check_bounds(size, byte_length(offset, 1), byte_length(length, 1))?;

        Ok(ArrayMemory {
            region,
            offset,
            length,
            codec,
        })
    }

    /// The wrapped region.
    #[must_use]
    pub fn region(&self) -> &ByteRegion {
        &self.region
    }

    /// Start of the window inside the region.
    #[must_use]
    pub fn array_offset(&self) -> usize {
        self.offset
    }

    /// Length of the window.
    #[must_use]
    pub fn array_length(&self) -> usize {
        self.length
    }

    /// Sets every byte of the window to zero.
    pub fn clear(&self) {
        let (offset, length) = (self.offset, self.length);
        self.region.with_bytes_mut(|bytes| {
            if let Some(window) = bytes.get_mut(offset..offset + length) {
                window.fill(0);
            }
        });
    }

    fn index(&self, offset: i64, length: usize) -> Result<usize> {
        check_bounds(self.size(), offset, byte_length(length, 1))?;
        usize::try_from(offset)
            .map(|offset| self.offset + offset)
            .map_err(|_| Error::OutOfBounds {
                offset,
                length: byte_length(length, 1),
                size: self.size(),
            })
    }

    fn read<T: NativeIO>(&self, offset: i64) -> Result<T> {
        let index = self.index(offset, std::mem::size_of::<T>())?;
        self.region.with_bytes(|bytes| self.codec.get(bytes, index))
    }

    fn write<T: NativeIO>(&self, offset: i64, value: T) -> Result<()> {
        let index = self.index(offset, std::mem::size_of::<T>())?;
        self.region
            .with_bytes_mut(|bytes| self.codec.put(bytes, index, value))
    }

    fn read_many<T: NativeIO>(&self, offset: i64, dst: &mut [T]) -> Result<()> {
        let width = std::mem::size_of::<T>();
        let begin = self.index(offset, dst.len().saturating_mul(width))?;
        self.region.with_bytes(|bytes| {
            let bytes = window(bytes, begin, dst.len() * width)?;
            for (slot, value) in dst.iter_mut().enumerate() {
                *value = self.codec.get(bytes, slot * width)?;
            }
            Ok(())
        })
    }

    fn write_many<T: NativeIO>(&self, offset: i64, src: &[T]) -> Result<()> {
        let width = std::mem::size_of::<T>();
        let begin = self.index(offset, src.len().saturating_mul(width))?;
        self.region.with_bytes_mut(|bytes| {
            let bytes = crate::memory::region::window_mut(bytes, begin, src.len() * width)?;
            for (slot, value) in src.iter().enumerate() {
                self.codec.put(bytes, slot * width, *value)?;
            }
            Ok(())
        })
    }
}

impl MemoryIO for ArrayMemory {
    fn size(&self) -> i64 {
        byte_length(self.length, 1)
    }

    fn address(&self) -> u64 {
        0
    }

    fn is_direct(&self) -> bool {
        false
    }

    fn underlying(&self) -> Underlying<'_> {
        Underlying::direct(Backend::Array(self))
    }

    fn check_bounds(&self, offset: i64, length: i64) -> Result<()> {
        check_bounds(self.size(), offset, length)
    }

    region_accessors!();

    fn get_i16s(&self, offset: i64, dst: &mut [i16]) -> Result<()> {
        self.read_many(offset, dst)
    }

    fn put_i16s(&self, offset: i64, src: &[i16]) -> Result<()> {
        self.write_many(offset, src)
    }

    fn get_i32s(&self, offset: i64, dst: &mut [i32]) -> Result<()> {
        self.read_many(offset, dst)
    }

    fn put_i32s(&self, offset: i64, src: &[i32]) -> Result<()> {
        self.write_many(offset, src)
    }

    fn get_i64s(&self, offset: i64, dst: &mut [i64]) -> Result<()> {
        self.read_many(offset, dst)
    }

    fn put_i64s(&self, offset: i64, src: &[i64]) -> Result<()> {
        self.write_many(offset, src)
    }

    fn get_f32s(&self, offset: i64, dst: &mut [f32]) -> Result<()> {
        self.read_many(offset, dst)
    }

    fn put_f32s(&self, offset: i64, src: &[f32]) -> Result<()> {
        self.write_many(offset, src)
    }

    fn get_f64s(&self, offset: i64, dst: &mut [f64]) -> Result<()> {
        self.read_many(offset, dst)
    }

    fn put_f64s(&self, offset: i64, src: &[f64]) -> Result<()> {
        self.write_many(offset, src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(len: usize) -> ArrayMemory {
        ArrayMemory::new(Codec::Le64, ByteRegion::zeroed(len))
    }

    #[test]
    fn typed_round_trip() {
        let memory = memory(32);
        memory.put_i32(0, -2).unwrap();
        memory.put_i64(8, i64::MIN).unwrap();
        memory.put_f64(16, 0.5).unwrap();
        memory.put_address(24, 0xDEAD_BEEF_0000).unwrap();

        assert_eq!(memory.get_i32(0).unwrap(), -2);
        assert_eq!(memory.get_i64(8).unwrap(), i64::MIN);
        assert_eq!(memory.get_f64(16).unwrap(), 0.5);
        assert_eq!(memory.get_address(24).unwrap(), 0xDEAD_BEEF_0000);
        assert_eq!(memory.get_i8(0).unwrap(), -2);
    }

    #[test]
    fn window_translates_offsets() {
        let region = ByteRegion::from_vec((0u8..16).collect());
        let memory = ArrayMemory::with_window(Codec::Be32, region.clone(), 4, 8).unwrap();

        assert_eq!(memory.size(), 8);
        assert_eq!(memory.get_i8(0).unwrap(), 4);
        assert_eq!(memory.get_i16(6).unwrap(), 0x0A0B);
        assert!(memory.get_i16(7).is_err());

        memory.clear();
        assert_eq!(region.to_vec()[3..13], [3, 0, 0, 0, 0, 0, 0, 0, 0, 12]);

        assert!(ArrayMemory::with_window(Codec::Be32, region, 10, 8).is_err());
    }

    #[test]
    fn bulk_checks_before_writing() {
        let memory = memory(8);
        assert!(memory.put_i16s(2, &[1, 2, 3, 4]).is_err());
        assert_eq!(memory.region().to_vec(), vec![0; 8]);

        memory.put_i16s(0, &[1, 2, 3, 4]).unwrap();
        let mut out = [0i16; 3];
        memory.get_i16s(2, &mut out).unwrap();
        assert_eq!(out, [2, 3, 4]);
    }

    #[test]
    fn index_of_and_fill() {
        let memory = memory(8);
        memory.fill(2, 3, 0x7F).unwrap();
        assert_eq!(memory.index_of(0, 0x7F, 8).unwrap(), Some(2));
        assert_eq!(memory.index_of(3, 0x7F, 8).unwrap(), Some(0));
        assert_eq!(memory.index_of(5, 0x7F, 100).unwrap(), None);
        assert_eq!(memory.index_of(0, 0x7F, 2).unwrap(), None);
        assert!(memory.fill(6, 3, 0).is_err());
        assert!(memory.index_of(9, 0, 1).is_err());
    }

    #[test]
    fn heap_memory_is_not_direct() {
        let memory = memory(4);
        assert!(!memory.is_direct());
        assert_eq!(memory.address(), 0);
        assert!(matches!(memory.underlying().backend, Backend::Array(_)));
    }
}
