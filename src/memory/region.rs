use std::{
    fmt,
    ops::{Deref, DerefMut},
    sync::{Arc, RwLock, Weak},
};

use memmap2::MmapMut;

use crate::{memory::io::out_of_bounds, Result};

enum Storage {
    Heap(Vec<u8>),
    Mapped(MmapMut),
}

impl Deref for Storage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Storage::Heap(data) => data.as_slice(),
            Storage::Mapped(map) => &map[..],
        }
    }
}

impl DerefMut for Storage {
    fn deref_mut(&mut self) -> &mut [u8] {
        match self {
            Storage::Heap(data) => data.as_mut_slice(),
            Storage::Mapped(map) => &mut map[..],
        }
    }
}

/// A shared, fixed-length run of bytes.
///
/// Regions live on the heap (`Vec<u8>`) or in an anonymous memory mapping. Mapped regions never
/// move and report their native address; heap regions report address 0. Clones share the same
/// bytes.
///
/// The bytes sit behind a lock, so every single access is atomic with respect to every other.
/// Sequences of accesses still need external synchronisation.
#[derive(Clone)]
pub struct ByteRegion {
    storage: Arc<RwLock<Storage>>,
    address: u64,
    len: usize,
}

impl ByteRegion {
    /// Takes ownership of `data` as a heap region.
    #[must_use]
    pub fn from_vec(data: Vec<u8>) -> Self {
        let len = data.len();
        ByteRegion {
            storage: Arc::new(RwLock::new(Storage::Heap(data))),
            address: 0,
            len,
        }
    }

    /// A zero-filled heap region of `len` bytes.
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        Self::from_vec(vec![0; len])
    }

    /// A zero-filled region of `len` bytes in an anonymous mapping.
    ///
    /// # Errors
    /// Returns [`crate::Error::Io`] if the operating system refuses the mapping.
    pub fn map_anon(len: usize) -> Result<Self> {
        // Zero length mappings are rejected by the kernel
        let map = MmapMut::map_anon(len.max(1))?;
        let address = map.as_ptr() as usize as u64;

        Ok(ByteRegion {
            storage: Arc::new(RwLock::new(Storage::Mapped(map))),
            address,
            len,
        })
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the region holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True for regions in a memory mapping.
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.address != 0
    }

    /// Native address of the first byte, 0 for heap regions.
    #[must_use]
    pub fn address(&self) -> u64 {
        self.address
    }

    /// Identity of the shared storage; equal for all clones.
    #[must_use]
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.storage).cast::<()>() as usize
    }

    /// Runs `f` over the bytes under a read lock.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let guard = read_lock!(self.storage);
        f(&guard[..self.len])
    }

    /// Runs `f` over the bytes under a write lock.
    pub fn with_bytes_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let mut guard = write_lock!(self.storage);
        f(&mut guard[..self.len])
    }

    /// A copy of the current contents.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.with_bytes(<[u8]>::to_vec)
    }

    pub(crate) fn downgrade(&self) -> WeakRegion {
        WeakRegion {
            storage: Arc::downgrade(&self.storage),
            address: self.address,
            len: self.len,
        }
    }
}

impl fmt::Debug for ByteRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteRegion")
            .field("address", &format_args!("{:#x}", self.address))
            .field("len", &self.len)
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

/// A non-owning reference to a [`ByteRegion`], held by the runtime's address space.
#[derive(Clone)]
pub(crate) struct WeakRegion {
    storage: Weak<RwLock<Storage>>,
    address: u64,
    len: usize,
}

impl WeakRegion {
    pub(crate) fn upgrade(&self) -> Option<ByteRegion> {
        self.storage.upgrade().map(|storage| ByteRegion {
            storage,
            address: self.address,
            len: self.len,
        })
    }
}

/// `length` bytes of `bytes` at `index`, or a bounds error.
pub(crate) fn window(bytes: &[u8], index: usize, length: usize) -> Result<&[u8]> {
    index
        .checked_add(length)
        .and_then(|end| bytes.get(index..end))
        .ok_or_else(|| out_of_bounds(index, length, bytes.len()))
}

/// Mutable variant of [`window`].
pub(crate) fn window_mut(bytes: &mut [u8], index: usize, length: usize) -> Result<&mut [u8]> {
    let size = bytes.len();
    index
        .checked_add(length)
        .and_then(|end| bytes.get_mut(index..end))
        .ok_or_else(|| out_of_bounds(index, length, size))
}

/// Copies `count` bytes between two regions, which may be the same region.
///
/// Locks are taken in a fixed order, so concurrent copies in opposite directions cannot
/// deadlock.
pub(crate) fn copy_between(
    src: &ByteRegion,
    src_index: usize,
    dst: &ByteRegion,
    dst_index: usize,
    count: usize,
) -> Result<()> {
    if src.id() == dst.id() {
        return dst.with_bytes_mut(|bytes| {
            window(bytes, src_index, count)?;
            window(bytes, dst_index, count)?;
            bytes.copy_within(src_index..src_index + count, dst_index);
            Ok(())
        });
    }

    if src.id() < dst.id() {
        let source = read_lock!(src.storage);
        let mut target = write_lock!(dst.storage);
        window_mut(&mut target[..dst.len], dst_index, count)?
            .copy_from_slice(window(&source[..src.len], src_index, count)?);
    } else {
        let mut target = write_lock!(dst.storage);
        let source = read_lock!(src.storage);
        window_mut(&mut target[..dst.len], dst_index, count)?
            .copy_from_slice(window(&source[..src.len], src_index, count)?);
    }

    Ok(())
}
