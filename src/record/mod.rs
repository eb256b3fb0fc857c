//! Typed records over native memory.
//!
//! A record type is a Rust struct whose fields are field descriptors ([`Signed32`],
//! [`Double`], [`StructRef`], ...), usually declared through [`crate::native_record!`]. When the
//! record is first used on a [`Runtime`], its fields are declared in order on a
//! [`LayoutBuilder`], each descriptor remembering the offset it was assigned. The resulting
//! [`RecordSchema`] is cached by the runtime.
//!
//! A [`Record<T>`] binds a schema to memory. It dereferences to the descriptors, which read and
//! write through the record's memory:
//!
//! ```rust
//! use nativemem::prelude::*;
//!
//! native_record! {
//!     pub struct Point {
//!         pub x: Signed32,
//!         pub y: Signed32,
//!     }
//! }
//!
//! let runtime = Runtime::new(Platform::linux_x86_64());
//! let point = Record::<Point>::new(&runtime)?;
//! point.x.set(&point, 3)?;
//! point.y.set(&point, -4)?;
//!
//! assert_eq!(point.memory().get_i32(4)?, -4);
//! assert_eq!(point.to_string(), "Point {\n    x = 3\n    y = -4\n}\n");
//! # Ok::<(), nativemem::Error>(())
//! ```
//!
//! Records never cache values: two records bound to the same memory observe each other's
//! writes.

mod composite;
mod field;
mod text;

pub use composite::{Inner, Integer, Padding, PointerField, StructRef, TypeAlias};
pub use text::{AsciiString, AsciiStringRef, Utf8String, Utf8StringRef};
pub use field::{
    Address, Bool16, Boolean, Double, Enum16, Enum32, Enum64, Enum8, EnumLong, FieldType, Float,
    NativeEnum, Scalar, Signed16, Signed32, Signed64, Signed8, SignedLong, Unsigned16, Unsigned32,
    Unsigned64, Unsigned8, UnsignedLong, WBool,
};

use std::{
    fmt,
    ops::Deref,
    sync::{Arc, OnceLock},
};

use crate::{
    layout::{LayoutBuilder, RecordKind, RecordLayout},
    memory::{AsPointer, Pointer},
    Platform, Result, Runtime,
};

/// A native record type.
///
/// Implemented by [`crate::native_record!`]; a manual implementation declares its fields on the
/// builder in [`declare`](Self::declare) and renders them in
/// [`render_fields`](Self::render_fields).
pub trait RecordType: fmt::Debug + Send + Sync + Sized + 'static {
    /// Struct or union.
    const KIND: RecordKind = RecordKind::Struct;

    /// Name used when rendering the record.
    const NAME: &'static str;

    /// Applies record directives such as packing before the first field is declared.
    fn directives(_layout: &mut LayoutBuilder) {}

    /// Declares every field in order and returns the descriptors.
    fn declare(layout: &mut LayoutBuilder) -> Self;

    /// Renders every field of the record stored at `target`, in declaration order.
    fn render_fields(&self, target: &Pointer) -> Vec<(&'static str, Result<String>)>;
}

/// The field descriptors of a record type together with its layout.
#[derive(Debug)]
pub struct RecordSchema<T: RecordType> {
    fields: T,
    layout: RecordLayout,
}

impl<T: RecordType> RecordSchema<T> {
    /// Lays out `T` for `platform`.
    ///
    /// # Errors
    /// The first error raised while declaring the fields of `T`.
    pub fn compute(platform: &Platform) -> Result<Self> {
        let mut builder = LayoutBuilder::new(T::KIND, *platform);
        T::directives(&mut builder);
        let fields = T::declare(&mut builder);
        let layout = builder.finish()?;

        Ok(RecordSchema { fields, layout })
    }

    /// The field descriptors.
    #[must_use]
    pub fn fields(&self) -> &T {
        &self.fields
    }

    /// The computed layout.
    #[must_use]
    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }
}

/// An instance of record type `T`, bound to memory.
///
/// The memory is either supplied ([`Record::bound`]), allocated up front
/// ([`Record::new_direct`]) or allocated on the heap on first access ([`Record::new`]). Clones
/// share the memory.
pub struct Record<T: RecordType> {
    runtime: Arc<Runtime>,
    schema: Arc<RecordSchema<T>>,
    memory: OnceLock<Pointer>,
}

impl<T: RecordType> Record<T> {
    /// A record whose heap memory is allocated on first access.
    ///
    /// # Errors
    /// The layout error of `T`.
    pub fn new(runtime: &Arc<Runtime>) -> Result<Self> {
        Ok(Record {
            runtime: runtime.clone(),
            schema: runtime.schema::<T>()?,
            memory: OnceLock::new(),
        })
    }

    /// A record in direct memory, whose address can be stored in other native memory.
    ///
    /// # Errors
    /// The layout error of `T`, or [`crate::Error::Io`] if the memory cannot be mapped.
    pub fn new_direct(runtime: &Arc<Runtime>) -> Result<Self> {
        let schema = runtime.schema::<T>()?;
        let memory = runtime.allocate_direct(schema.layout.size)?;
        Ok(Self::with_schema(runtime.clone(), schema, memory))
    }

    /// A record over existing memory, for the runtime of `memory`.
    ///
    /// The memory is not required to be as large as the record; accesses beyond it fail.
    ///
    /// # Errors
    /// The layout error of `T`.
    pub fn bound(memory: Pointer) -> Result<Self> {
        let runtime = memory.runtime().clone();
        let schema = runtime.schema::<T>()?;
        Ok(Self::with_schema(runtime, schema, memory))
    }

    pub(crate) fn with_schema(
        runtime: Arc<Runtime>,
        schema: Arc<RecordSchema<T>>,
        memory: Pointer,
    ) -> Self {
        Record {
            runtime,
            schema,
            memory: OnceLock::from(memory),
        }
    }

    /// `count` records in one heap allocation, each bound to its own slice of it.
    ///
    /// # Errors
    /// The layout error of `T`.
    pub fn array_of(runtime: &Arc<Runtime>, count: usize) -> Result<Vec<Self>> {
        let schema = runtime.schema::<T>()?;
        let memory = runtime.allocate(Self::array_size(&schema, count)?);
        Self::split(runtime, &schema, &memory, count)
    }

    /// `count` records in one direct allocation.
    ///
    /// # Errors
    /// The layout error of `T`, or [`crate::Error::Io`] if the memory cannot be mapped.
    pub fn array_of_direct(runtime: &Arc<Runtime>, count: usize) -> Result<Vec<Self>> {
        let schema = runtime.schema::<T>()?;
        let memory = runtime.allocate_direct(Self::array_size(&schema, count)?)?;
        Self::split(runtime, &schema, &memory, count)
    }

    fn array_size(schema: &RecordSchema<T>, count: usize) -> Result<usize> {
        schema
            .layout
            .size
            .checked_mul(count)
            .ok_or_else(|| malformed_error!("array of {} {} overflows", count, T::NAME))
    }

    fn split(
        runtime: &Arc<Runtime>,
        schema: &Arc<RecordSchema<T>>,
        memory: &Pointer,
        count: usize,
    ) -> Result<Vec<Self>> {
        let size = crate::memory::byte_length(schema.layout.size, 1);
        (0..count)
            .map(|index| {
                let slice = memory.slice_bounded(crate::memory::byte_length(index, 1) * size, size)?;
                Ok(Self::with_schema(runtime.clone(), schema.clone(), slice))
            })
            .collect()
    }

    /// The runtime the record was laid out for.
    #[must_use]
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// The memory of the record, allocating heap memory on first use.
    pub fn memory(&self) -> &Pointer {
        self.memory
            .get_or_init(|| self.runtime.allocate(self.schema.layout.size))
    }

    /// Size in bytes, including tail padding.
    #[must_use]
    pub fn size(&self) -> usize {
        self.schema.layout.size
    }

    /// Alignment in bytes.
    #[must_use]
    pub fn alignment(&self) -> usize {
        self.schema.layout.alignment
    }

    /// The layout of `T`.
    #[must_use]
    pub fn layout(&self) -> &RecordLayout {
        &self.schema.layout
    }

    pub(crate) fn schema(&self) -> &Arc<RecordSchema<T>> {
        &self.schema
    }
}

impl<T: RecordType> Clone for Record<T> {
    fn clone(&self) -> Self {
        Self::with_schema(self.runtime.clone(), self.schema.clone(), self.memory().clone())
    }
}

impl<T: RecordType> Deref for Record<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.schema.fields
    }
}

impl<T: RecordType> AsPointer for Record<T> {
    fn pointer(&self) -> &Pointer {
        self.memory()
    }
}

impl<T: RecordType> fmt::Debug for Record<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("type", &T::NAME)
            .field("layout", &self.schema.layout)
            .field("memory", &self.memory.get())
            .finish()
    }
}

/// Renders every field as `name = value`, one per line; a field that cannot be read shows
/// `- <fault> -` in place of its value.
impl<T: RecordType> fmt::Display for Record<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {{", T::NAME)?;
        for (name, value) in self.schema.fields.render_fields(self.memory()) {
            let value = match value {
                Ok(value) => value,
                Err(error) => format!("- {} -", error.fault_name()),
            };
            writeln!(f, "    {} = {}", name, value.replace('\n', "\n    "))?;
        }
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::test::{ilp32, lp64};

    native_record! {
        struct Sample {
            a: Signed8,
            b: Signed64,
            c: Signed32,
        }
    }

    #[test]
    fn lazy_memory_is_allocated_once() {
        let runtime = lp64();
        let record = Record::<Sample>::new(&runtime).unwrap();
        assert_eq!(record.size(), 24);
        assert_eq!(record.alignment(), 8);

        record.b.set(&record, 5).unwrap();
        assert_eq!(record.memory().size(), 24);
        assert_eq!(record.b.get(&record).unwrap(), 5);
        assert_eq!(record.memory().get_i64(8).unwrap(), 5);
    }

    #[test]
    fn clones_share_memory() {
        let runtime = lp64();
        let record = Record::<Sample>::new(&runtime).unwrap();
        let clone = record.clone();
        clone.c.set(&clone, 9).unwrap();
        assert_eq!(record.c.get(&record).unwrap(), 9);
    }

    #[test]
    fn schema_is_cached_per_runtime() {
        let runtime = lp64();
        let first = Record::<Sample>::new(&runtime).unwrap();
        let second = Record::<Sample>::new(&runtime).unwrap();
        assert!(Arc::ptr_eq(first.schema(), second.schema()));

        let other = ilp32();
        let third = Record::<Sample>::new(&other).unwrap();
        assert!(!Arc::ptr_eq(first.schema(), third.schema()));
        assert_eq!(third.size(), 16);
    }

    #[test]
    fn arrays_share_one_allocation() {
        let runtime = lp64();
        let records = Record::<Sample>::array_of(&runtime, 3).unwrap();
        records[1].a.set(&records[1], 7).unwrap();
        records[2].b.set(&records[2], -1).unwrap();

        assert!(Arc::ptr_eq(records[0].memory().runtime(), &runtime));
        assert_eq!(
            records[0].memory().underlying().storage_id(),
            records[2].memory().underlying().storage_id()
        );
        assert_eq!(records[2].memory().underlying().start(), 48);
        assert!(records[0].a.get(&records[0]).is_ok());
        assert!(records[0].memory().get_i8(24).is_err());
    }

    #[test]
    fn unreadable_fields_render_placeholders() {
        let runtime = lp64();
        let record = Record::<Sample>::bound(runtime.allocate(16)).unwrap();
        record.a.set(&record, -3).unwrap();
        assert_eq!(
            record.to_string(),
            "Sample {\n    a = -3\n    b = 0\n    c = - OutOfBounds -\n}\n"
        );

        let null = Record::<Sample>::bound(runtime.null()).unwrap();
        assert!(null.to_string().contains("a = - NullDereference -"));
        assert!(matches!(
            null.a.get(&null),
            Err(Error::NullDereference { offset: 0 })
        ));
    }
}
