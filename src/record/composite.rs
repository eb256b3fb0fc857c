use std::{fmt, marker::PhantomData, sync::Arc};

use crate::{
    layout::LayoutBuilder,
    memory::{AsPointer, Pointer},
    platform::{NativeType, Platform},
    record::{
        field::{at, FieldType, Scalar},
        Record, RecordSchema, RecordType,
    },
    Error, Result,
};

/// A pointer-valued field.
///
/// Reads resolve the stored address through the runtime's address space; writes store the
/// native address of a pointer, which therefore has to be direct (or null).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointerField {
    offset: usize,
}

impl PointerField {
    /// Offset of the field inside its record.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Reads the stored address as a pointer.
    ///
    /// # Errors
    /// Bounds or sentinel faults of the target memory.
    pub fn get(&self, target: &impl AsPointer) -> Result<Pointer> {
        target.pointer().get_pointer(at(self.offset))
    }

    /// Stores the address of `value`.
    ///
    /// # Errors
    /// Returns [`Error::NotDirect`] for heap memory, besides bounds or sentinel faults.
    pub fn set(&self, target: &impl AsPointer, value: &Pointer) -> Result<()> {
        target.pointer().put_pointer(at(self.offset), value)
    }
}

impl FieldType for PointerField {
    fn declare(layout: &mut LayoutBuilder) -> Self {
        PointerField {
            offset: layout.add(NativeType::Address),
        }
    }

    fn render(&self, target: &Pointer) -> Result<String> {
        self.get(target).map(|pointer| pointer.to_string())
    }
}

/// A pointer to a record of type `R`, as `struct R *` in C.
pub struct StructRef<R: RecordType> {
    offset: usize,
    marker: PhantomData<fn() -> R>,
}

impl<R: RecordType> StructRef<R> {
    /// Offset of the field inside its record.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The referenced record, or `None` for a null reference.
    ///
    /// No memory is allocated: the record is bound to the memory at the stored address, limited
    /// to the size of `R`. An address outside every live direct region yields a record whose
    /// fields fault.
    ///
    /// # Errors
    /// Bounds or sentinel faults while reading the address, or the layout error of `R`.
    pub fn get(&self, target: &impl AsPointer) -> Result<Option<Record<R>>> {
        let memory = target.pointer();
        let runtime = memory.runtime();
        let schema = runtime.schema::<R>()?;

        let referenced = memory.get_pointer_sized(
            at(self.offset),
            crate::memory::byte_length(schema.layout().size, 1),
        )?;
        if referenced.is_null() {
            return Ok(None);
        }

        Ok(Some(Record::with_schema(runtime.clone(), schema, referenced)))
    }

    /// Stores the address of `value`, or 0 for `None`.
    ///
    /// # Errors
    /// Returns [`Error::NotDirect`] if `value` lives on the heap, besides bounds or sentinel
    /// faults.
    pub fn set(&self, target: &impl AsPointer, value: Option<&Record<R>>) -> Result<()> {
        let memory = target.pointer();
        match value {
            Some(record) => memory.put_pointer(at(self.offset), record.memory()),
            None => memory.put_address(at(self.offset), 0),
        }
    }
}

impl<R: RecordType> FieldType for StructRef<R> {
    fn declare(layout: &mut LayoutBuilder) -> Self {
        StructRef {
            offset: layout.add(NativeType::Address),
            marker: PhantomData,
        }
    }

    fn render(&self, target: &Pointer) -> Result<String> {
        match target.get_address(at(self.offset))? {
            0 => Ok("null".to_string()),
            address => Ok(format!("{} @ {address:#x}", R::NAME)),
        }
    }
}

impl<R: RecordType> fmt::Debug for StructRef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructRef")
            .field("offset", &self.offset)
            .field("record", &R::NAME)
            .finish()
    }
}

/// A record embedded by value, laid out with its own alignment.
///
/// Accessed through a record bound to a bounded view of the outer record's memory, so the
/// inner record cannot reach past its own size.
pub struct Inner<R: RecordType> {
    offset: usize,
    schema: Option<Arc<RecordSchema<R>>>,
}

impl<R: RecordType> Inner<R> {
    /// Offset of the embedded record inside its parent.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The embedded record, sharing the parent's memory.
    ///
    /// # Errors
    /// The fault of a view of the embedded record's range of `target`.
    pub fn get(&self, target: &impl AsPointer) -> Result<Record<R>> {
        let schema = self
            .schema
            .clone()
            .ok_or_else(|| malformed_error!("layout of {} failed", R::NAME))?;

        let memory = target.pointer();
        let view = memory.slice_bounded(
            at(self.offset),
            crate::memory::byte_length(schema.layout().size, 1),
        )?;
        Ok(Record::with_schema(memory.runtime().clone(), schema, view))
    }
}

impl<R: RecordType> FieldType for Inner<R> {
    fn declare(layout: &mut LayoutBuilder) -> Self {
        match RecordSchema::<R>::compute(layout.platform()) {
            Ok(schema) => Inner {
                offset: layout.nested(schema.layout()),
                schema: Some(Arc::new(schema)),
            },
            Err(error) => {
                layout.fail(error);
                Inner {
                    offset: 0,
                    schema: None,
                }
            }
        }
    }

    fn render(&self, target: &Pointer) -> Result<String> {
        let record = self.get(target)?;
        let mut rendered = record.to_string();
        rendered.truncate(rendered.trim_end().len());
        Ok(rendered)
    }
}

impl<R: RecordType> fmt::Debug for Inner<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inner")
            .field("offset", &self.offset)
            .field("record", &R::NAME)
            .finish()
    }
}

/// `N` unused values of the primitive type of `F`, reserved with that type's alignment.
pub struct Padding<F: Scalar, const N: usize> {
    offset: usize,
    marker: PhantomData<fn() -> F>,
}

impl<F: Scalar, const N: usize> Padding<F, N> {
    /// Offset of the first reserved byte.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<F: Scalar, const N: usize> FieldType for Padding<F, N> {
    fn declare(layout: &mut LayoutBuilder) -> Self {
        Padding {
            offset: layout.padding(F::NATIVE, N),
            marker: PhantomData,
        }
    }

    fn render(&self, _target: &Pointer) -> Result<String> {
        Ok(format!("[{} x {}]", N, F::NATIVE))
    }
}

impl<F: Scalar, const N: usize> fmt::Debug for Padding<F, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Padding")
            .field("offset", &self.offset)
            .field("native", &F::NATIVE)
            .field("count", &N)
            .finish()
    }
}

/// Fixed size arrays of any field type; elements are laid out back to back.
impl<F: FieldType, const N: usize> FieldType for [F; N] {
    fn declare(layout: &mut LayoutBuilder) -> Self {
        layout.array(|layout| std::array::from_fn(|_| F::declare(layout)))
    }

    fn render(&self, target: &Pointer) -> Result<String> {
        let elements: Vec<String> = self
            .iter()
            .map(|element| match element.render(target) {
                Ok(value) => value,
                Err(error) => format!("- {} -", error.fault_name()),
            })
            .collect();
        Ok(format!("[{}]", elements.join(", ")))
    }
}

/// Maps a platform dependent C type name, such as `size_t`, to a primitive type.
///
/// Implemented by the caller; this crate carries no alias tables.
pub trait TypeAlias: Send + Sync + 'static {
    /// The primitive type the alias stands for on `platform`.
    fn resolve(platform: &Platform) -> NativeType;
}

/// An integer field whose type is resolved through a [`TypeAlias`] when the record is laid out.
///
/// Values are handled as `i64`; see [`Pointer::get_int`] for the widening rules. Declaring the
/// field with an alias that resolves to a non-integer type fails the layout with
/// [`Error::UnsupportedType`].
pub struct Integer<A: TypeAlias> {
    offset: usize,
    native: NativeType,
    marker: PhantomData<fn() -> A>,
}

impl<A: TypeAlias> Integer<A> {
    /// Offset of the field inside its record.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The primitive type the alias resolved to.
    #[must_use]
    pub fn native(&self) -> NativeType {
        self.native
    }

    /// Reads the field.
    ///
    /// # Errors
    /// Bounds or sentinel faults of the target memory.
    pub fn get(&self, target: &impl AsPointer) -> Result<i64> {
        target.pointer().get_int(self.native, at(self.offset))
    }

    /// Writes the field, truncated to its width.
    ///
    /// # Errors
    /// Bounds or sentinel faults of the target memory.
    pub fn set(&self, target: &impl AsPointer, value: i64) -> Result<()> {
        target.pointer().put_int(self.native, at(self.offset), value)
    }
}

impl<A: TypeAlias> FieldType for Integer<A> {
    fn declare(layout: &mut LayoutBuilder) -> Self {
        let native = A::resolve(layout.platform());
        if !native.is_integer() {
            layout.fail(Error::UnsupportedType(native));
        }

        Integer {
            offset: layout.add(native),
            native,
            marker: PhantomData,
        }
    }

    fn render(&self, target: &Pointer) -> Result<String> {
        self.get(target).map(|value| value.to_string())
    }
}

impl<A: TypeAlias> fmt::Debug for Integer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Integer")
            .field("offset", &self.offset)
            .field("native", &self.native)
            .finish()
    }
}
