//! The platform description, address space and allocator entry points.
//!
//! A [`Runtime`] fixes the [`Platform`] (and with it the [`Codec`]) that all memory created
//! through it uses. It keeps a registry of the direct regions it handed out, so that an address
//! read from native memory can be resolved back to accessible bytes, and a cache of record
//! layouts, computed once per record type.
//!
//! # Address space
//!
//! Direct regions are registered by their start address in a [`SkipMap`]. Resolving an address
//! looks up the closest region starting at or below it. The registry only holds weak
//! references: once every [`Pointer`] to a region is gone, its addresses resolve to an
//! inaccessible pointer instead of dangling.

use std::{
    any::{Any, TypeId},
    ops::Bound,
    sync::{Arc, OnceLock},
};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;

use crate::{
    memory::{
        region::WeakRegion, ArrayMemory, BufferMemory, ByteBuffer, ByteRegion, Codec,
        InaccessibleMemory, NullMemory, Pointer,
    },
    record::{RecordSchema, RecordType},
    Platform, Result,
};

/// Entry point for allocating native memory and laying out records for one platform.
///
/// Runtimes are shared through [`Arc`]; every [`Pointer`] holds on to the runtime it was created
/// by. [`Runtime::system`] returns a process wide runtime for the host platform.
///
/// # Examples
///
/// ```rust
/// use nativemem::{Platform, Runtime};
///
/// let runtime = Runtime::new(Platform::linux_i386());
/// let memory = runtime.allocate(8);
/// memory.put_address(0, 0x1_2345_6789)?;
///
/// // 32-bit addresses keep the low four bytes
/// assert_eq!(memory.get_address(0)?, 0x2345_6789);
/// assert_eq!(memory.get_i32(4)?, 0);
/// # Ok::<(), nativemem::Error>(())
/// ```
pub struct Runtime {
    platform: Platform,
    codec: Codec,
    address_space: SkipMap<u64, WeakRegion>,
    schemas: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Runtime {
    /// Creates a runtime for `platform`.
    #[must_use]
    pub fn new(platform: Platform) -> Arc<Self> {
        Arc::new(Runtime {
            platform,
            codec: Codec::for_platform(&platform),
            address_space: SkipMap::new(),
            schemas: DashMap::new(),
        })
    }

    /// The shared runtime of the host platform.
    #[must_use]
    pub fn system() -> Arc<Self> {
        static SYSTEM: OnceLock<Arc<Runtime>> = OnceLock::new();
        SYSTEM.get_or_init(|| Runtime::new(Platform::native())).clone()
    }

    /// The platform this runtime lays out and encodes data for.
    #[must_use]
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// The codec used by all memory of this runtime.
    #[must_use]
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Zero-filled heap memory of `size` bytes.
    #[must_use]
    pub fn allocate(self: &Arc<Self>, size: usize) -> Pointer {
        self.wrap_array(ByteRegion::zeroed(size))
    }

    /// Heap memory over an existing region.
    #[must_use]
    pub fn wrap_array(self: &Arc<Self>, region: ByteRegion) -> Pointer {
        Pointer::from_io(self.clone(), Arc::new(ArrayMemory::new(self.codec, region)))
    }

    /// Zero-filled direct memory of `size` bytes at a stable native address.
    ///
    /// The region is registered in the address space, so that its address can be stored in
    /// native memory and read back as a pointer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Io`] if the mapping cannot be created.
    pub fn allocate_direct(self: &Arc<Self>, size: usize) -> Result<Pointer> {
        let buffer = ByteBuffer::allocate_direct(size)?;
        Ok(self.wrap(buffer))
    }

    /// Memory over the remaining bytes of `buffer`.
    ///
    /// Direct buffers are registered in the address space.
    #[must_use]
    pub fn wrap(self: &Arc<Self>, buffer: ByteBuffer) -> Pointer {
        if buffer.is_direct() {
            self.register(buffer.region());
        }
        Pointer::from_io(self.clone(), Arc::new(BufferMemory::new(self.codec, buffer)))
    }

    /// The null pointer.
    #[must_use]
    pub fn null(self: &Arc<Self>) -> Pointer {
        Pointer::from_io(self.clone(), Arc::new(NullMemory))
    }

    /// A pointer to `address` that faults on every access.
    #[must_use]
    pub fn inaccessible(self: &Arc<Self>, address: u64) -> Pointer {
        Pointer::from_io(self.clone(), Arc::new(InaccessibleMemory::new(address)))
    }

    /// Resolves a native address.
    ///
    /// Address 0 is the null pointer. An address inside a live direct region of this runtime
    /// resolves to the rest of that region, anything else to an inaccessible pointer.
    #[must_use]
    pub fn pointer_at(self: &Arc<Self>, address: u64) -> Pointer {
        if address == 0 {
            return self.null();
        }

        if let Some(entry) = self.address_space.upper_bound(Bound::Included(&address)) {
            let start = address - *entry.key();
            if let Ok(start) = usize::try_from(start) {
                match entry.value().upgrade() {
                    Some(region) if start <= region.len() => {
                        let len = region.len();
                        if let Ok(buffer) = ByteBuffer::from_region(region).with_window(start, len)
                        {
                            return Pointer::from_io(
                                self.clone(),
                                Arc::new(BufferMemory::new(self.codec, buffer)),
                            );
                        }
                    }
                    Some(_) => {}
                    None => {
                        log::debug!("dropping released region at {:#x}", entry.key());
                        entry.remove();
                    }
                }
            }
        }

        self.inaccessible(address)
    }

    /// Number of live direct regions in the address space.
    #[must_use]
    pub fn direct_regions(&self) -> usize {
        self.address_space
            .iter()
            .filter(|entry| entry.value().upgrade().is_some())
            .count()
    }

    fn register(&self, region: &ByteRegion) {
        log::debug!(
            "registering direct region {:#x}..{:#x}",
            region.address(),
            region.address() + region.len() as u64
        );

        // Released regions are pruned here, before their address can be handed out again
        for entry in self.address_space.iter() {
            if entry.value().upgrade().is_none() {
                entry.remove();
            }
        }
        self.address_space
            .insert(region.address(), region.downgrade());
    }

    /// The layout and field accessors of `T` on this runtime's platform.
    ///
    /// Computed on first use and cached for the lifetime of the runtime. Concurrent first uses
    /// may compute the schema more than once, but all callers observe the same cached value.
    ///
    /// # Errors
    /// Returns the layout error of `T`, see [`crate::layout::LayoutBuilder::finish`].
    pub fn schema<T: RecordType>(&self) -> Result<Arc<RecordSchema<T>>> {
        let key = TypeId::of::<T>();
        if let Some(cached) = self.schemas.get(&key) {
            if let Ok(schema) = cached.value().clone().downcast::<RecordSchema<T>>() {
                return Ok(schema);
            }
        }

        let schema = Arc::new(RecordSchema::<T>::compute(&self.platform)?);
        let stored = self
            .schemas
            .entry(key)
            .or_insert_with(|| schema.clone() as Arc<dyn Any + Send + Sync>)
            .value()
            .clone();

        Ok(stored.downcast::<RecordSchema<T>>().unwrap_or(schema))
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("platform", &self.platform)
            .field("codec", &self.codec)
            .field("direct_regions", &self.address_space.len())
            .field("schemas", &self.schemas.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::test::lp64;

    #[test]
    fn heap_allocation_is_not_direct() {
        let runtime = lp64();
        let memory = runtime.allocate(16);
        assert!(!memory.is_direct());
        assert_eq!(memory.address(), 0);
        assert_eq!(memory.size(), 16);
        assert_eq!(runtime.direct_regions(), 0);
    }

    #[test]
    fn direct_allocation_is_registered() {
        let runtime = Runtime::new(Platform::native());
        let memory = runtime.allocate_direct(64).unwrap();
        assert!(memory.is_direct());
        assert_ne!(memory.address(), 0);
        assert_eq!(runtime.direct_regions(), 1);

        let inside = runtime.pointer_at(memory.address() + 60);
        assert_eq!(inside.size(), 4);
        memory.put_i32(60, 42).unwrap();
        assert_eq!(inside.get_i32(0).unwrap(), 42);
        assert_eq!(inside, memory.slice(60));
    }

    #[test]
    fn released_region_becomes_inaccessible() {
        let runtime = Runtime::new(Platform::native());
        let memory = runtime.allocate_direct(8).unwrap();
        let address = memory.address();
        drop(memory);

        let stale = runtime.pointer_at(address);
        assert!(matches!(
            stale.get_i8(0),
            Err(Error::InaccessibleMemory { offset: 0, .. })
        ));
        assert_eq!(stale.address(), address);
        assert_eq!(runtime.direct_regions(), 0);
    }

    #[test]
    fn unknown_addresses() {
        let runtime = Runtime::new(Platform::native());
        assert!(runtime.pointer_at(0).is_null());
        let opaque = runtime.pointer_at(0x10);
        assert_eq!(opaque.size(), 0);
        assert_eq!(opaque.address(), 0x10);
    }

    #[test]
    fn heap_buffer_is_not_registered() {
        let runtime = Runtime::new(Platform::native());
        let memory = runtime.wrap(ByteBuffer::wrap(vec![1, 2, 3, 4]));
        assert!(!memory.is_direct());
        assert_eq!(memory.get_i8(3).unwrap(), 4);
        assert_eq!(runtime.direct_regions(), 0);
    }

    #[test]
    fn system_runtime_is_shared() {
        assert!(Arc::ptr_eq(&Runtime::system(), &Runtime::system()));
        assert_eq!(*Runtime::system().platform(), Platform::native());
    }
}
