use std::{fmt, marker::PhantomData};

use crate::{
    layout::LayoutBuilder,
    memory::{AsPointer, Pointer},
    platform::NativeType,
    Error, Result,
};

/// A field descriptor: something that can be declared on a [`LayoutBuilder`] and rendered.
///
/// Descriptors hold the offset they were assigned, never any data.
pub trait FieldType: fmt::Debug + Send + Sync + Sized {
    /// Declares the field at the builder's current position.
    fn declare(layout: &mut LayoutBuilder) -> Self;

    /// Reads the field from the record stored at `target` and formats its value.
    ///
    /// # Errors
    /// The fault raised while reading the field.
    fn render(&self, target: &Pointer) -> Result<String>;
}

/// A field of a single primitive native type, usable as the element of [`super::Padding`].
pub trait Scalar: FieldType {
    /// The primitive type of the field.
    const NATIVE: NativeType;

    /// Offset of the field inside its record.
    fn offset(&self) -> usize;
}

/// Converts a layout offset to a memory offset; layouts never exceed `i64::MAX` bytes.
pub(crate) fn at(offset: usize) -> i64 {
    i64::try_from(offset).unwrap_or(i64::MAX)
}

macro_rules! scalar_field {
    (
        $(#[$meta:meta])*
        $name:ident : $native:expr => $ty:ty,
        get($get_ptr:ident, $get_at:ident) $get:expr,
        set($set_ptr:ident, $set_at:ident, $value:ident) $set:expr,
        render($render:ident) $fmt:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            offset: usize,
        }

        impl $name {
            /// Offset of the field inside its record.
            #[must_use]
            pub fn offset(&self) -> usize {
                self.offset
            }

            /// Reads the field.
            ///
            /// # Errors
            /// Bounds or sentinel faults of the target memory.
            pub fn get(&self, target: &impl AsPointer) -> Result<$ty> {
                let $get_ptr = target.pointer();
                let $get_at = at(self.offset);
                $get
            }

            /// Writes the field.
            ///
            /// # Errors
            /// Bounds or sentinel faults of the target memory.
            pub fn set(&self, target: &impl AsPointer, $value: $ty) -> Result<()> {
                let $set_ptr = target.pointer();
                let $set_at = at(self.offset);
                $set
            }
        }

        impl FieldType for $name {
            fn declare(layout: &mut LayoutBuilder) -> Self {
                $name {
                    offset: layout.add($native),
                }
            }

            fn render(&self, target: &Pointer) -> Result<String> {
                let $render = self.get(target)?;
                Ok($fmt)
            }
        }

        impl Scalar for $name {
            const NATIVE: NativeType = $native;

            fn offset(&self) -> usize {
                self.offset
            }
        }
    };
}

scalar_field! {
    /// `signed char`
    Signed8: NativeType::SChar => i8,
    get(memory, offset) memory.get_i8(offset),
    set(memory, offset, value) memory.put_i8(offset, value),
    render(value) value.to_string()
}

scalar_field! {
    /// `unsigned char`
    Unsigned8: NativeType::UChar => u8,
    get(memory, offset) memory.get_u8(offset),
    set(memory, offset, value) memory.put_u8(offset, value),
    render(value) value.to_string()
}

scalar_field! {
    /// `signed short`
    Signed16: NativeType::SShort => i16,
    get(memory, offset) memory.get_i16(offset),
    set(memory, offset, value) memory.put_i16(offset, value),
    render(value) value.to_string()
}

scalar_field! {
    /// `unsigned short`
    Unsigned16: NativeType::UShort => u16,
    get(memory, offset) memory.get_i16(offset).map(|value| value as u16),
    set(memory, offset, value) memory.put_i16(offset, value as i16),
    render(value) value.to_string()
}

scalar_field! {
    /// `signed int`
    Signed32: NativeType::SInt => i32,
    get(memory, offset) memory.get_i32(offset),
    set(memory, offset, value) memory.put_i32(offset, value),
    render(value) value.to_string()
}

scalar_field! {
    /// `unsigned int`
    Unsigned32: NativeType::UInt => u32,
    get(memory, offset) memory.get_i32(offset).map(|value| value as u32),
    set(memory, offset, value) memory.put_i32(offset, value as i32),
    render(value) value.to_string()
}

scalar_field! {
    /// `signed long long`
    Signed64: NativeType::SLongLong => i64,
    get(memory, offset) memory.get_i64(offset),
    set(memory, offset, value) memory.put_i64(offset, value),
    render(value) value.to_string()
}

scalar_field! {
    /// `unsigned long long`
    Unsigned64: NativeType::ULongLong => u64,
    get(memory, offset) memory.get_i64(offset).map(|value| value as u64),
    set(memory, offset, value) memory.put_i64(offset, value as i64),
    render(value) value.to_string()
}

scalar_field! {
    /// `signed long`, 4 or 8 bytes depending on the platform.
    ///
    /// Values are handled as `i64`; on platforms with a 4 byte `long` writes keep the low
    /// 32 bits and reads sign-extend.
    SignedLong: NativeType::SLong => i64,
    get(memory, offset) memory.get_native_long(offset),
    set(memory, offset, value) memory.put_native_long(offset, value),
    render(value) value.to_string()
}

scalar_field! {
    /// `unsigned long`, 4 or 8 bytes depending on the platform.
    UnsignedLong: NativeType::ULong => u64,
    get(memory, offset) memory.get_int(NativeType::ULong, offset).map(|value| value as u64),
    set(memory, offset, value) memory.put_native_long(offset, value as i64),
    render(value) value.to_string()
}

scalar_field! {
    /// `float`
    Float: NativeType::Float => f32,
    get(memory, offset) memory.get_f32(offset),
    set(memory, offset, value) memory.put_f32(offset, value),
    render(value) value.to_string()
}

scalar_field! {
    /// `double`
    Double: NativeType::Double => f64,
    get(memory, offset) memory.get_f64(offset),
    set(memory, offset, value) memory.put_f64(offset, value),
    render(value) value.to_string()
}

scalar_field! {
    /// A one byte boolean; any non-zero value reads as `true`.
    Boolean: NativeType::UChar => bool,
    get(memory, offset) memory.get_i8(offset).map(|value| value != 0),
    set(memory, offset, value) memory.put_i8(offset, i8::from(value)),
    render(value) value.to_string()
}

scalar_field! {
    /// A two byte boolean.
    Bool16: NativeType::UShort => bool,
    get(memory, offset) memory.get_i16(offset).map(|value| value != 0),
    set(memory, offset, value) memory.put_i16(offset, i16::from(value)),
    render(value) value.to_string()
}

scalar_field! {
    /// A four byte boolean, as the Windows `BOOL`.
    WBool: NativeType::SInt => bool,
    get(memory, offset) memory.get_i32(offset).map(|value| value != 0),
    set(memory, offset, value) memory.put_i32(offset, i32::from(value)),
    render(value) value.to_string()
}

scalar_field! {
    /// A raw pointer-sized integer.
    ///
    /// Occupies the platform's address size; 32-bit addresses are zero-extended on read.
    Address: NativeType::Address => u64,
    get(memory, offset) memory.get_address(offset),
    set(memory, offset, value) memory.put_address(offset, value),
    render(value) format!("{value:#x}")
}

/// A Rust enum stored as a native integer.
///
/// Usually implemented with [`crate::native_enum!`] on an enum deriving `strum::FromRepr`.
pub trait NativeEnum: fmt::Debug + Copy + Send + Sync + Sized + 'static {
    /// The variant for an integer value, if there is one.
    fn from_native(value: i64) -> Option<Self>;

    /// The integer value of a variant.
    fn to_native(self) -> i64;
}

macro_rules! enum_field {
    ($(#[$meta:meta])* $name:ident : $native:expr, $bits:expr) => {
        $(#[$meta])*
        pub struct $name<E: NativeEnum> {
            offset: usize,
            marker: PhantomData<fn() -> E>,
        }

        impl<E: NativeEnum> $name<E> {
            /// Offset of the field inside its record.
            #[must_use]
            pub fn offset(&self) -> usize {
                self.offset
            }

            /// Reads the stored integer, sign-extended.
            ///
            /// # Errors
            /// Bounds or sentinel faults of the target memory.
            pub fn get_raw(&self, target: &impl AsPointer) -> Result<i64> {
                target.pointer().get_int($native, at(self.offset))
            }

            /// Reads the field and decodes it.
            ///
            /// Values are matched signed first, then zero-extended, so that enums with a signed
            /// or an unsigned representation both decode.
            ///
            /// # Errors
            /// Returns [`Error::InvalidEnumValue`] if no variant has the stored value, besides
            /// bounds or sentinel faults.
            pub fn get(&self, target: &impl AsPointer) -> Result<E> {
                let value = self.get_raw(target)?;
                let unsigned = zero_extend(value, $bits(target.pointer()));
                E::from_native(value)
                    .or_else(|| E::from_native(unsigned))
                    .ok_or(Error::InvalidEnumValue {
                        type_name: std::any::type_name::<E>(),
                        value,
                    })
            }

            /// Writes the integer value of `value`.
            ///
            /// # Errors
            /// Bounds or sentinel faults of the target memory.
            pub fn set(&self, target: &impl AsPointer, value: E) -> Result<()> {
                self.set_raw(target, value.to_native())
            }

            /// Writes an integer, truncated to the width of the field.
            ///
            /// # Errors
            /// Bounds or sentinel faults of the target memory.
            pub fn set_raw(&self, target: &impl AsPointer, value: i64) -> Result<()> {
                target.pointer().put_int($native, at(self.offset), value)
            }
        }

        impl<E: NativeEnum> FieldType for $name<E> {
            fn declare(layout: &mut LayoutBuilder) -> Self {
                $name {
                    offset: layout.add($native),
                    marker: PhantomData,
                }
            }

            fn render(&self, target: &Pointer) -> Result<String> {
                self.get(target).map(|value| format!("{value:?}"))
            }
        }

        impl<E: NativeEnum> Scalar for $name<E> {
            const NATIVE: NativeType = $native;

            fn offset(&self) -> usize {
                self.offset
            }
        }

        impl<E: NativeEnum> fmt::Debug for $name<E> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("offset", &self.offset)
                    .field("enum", &std::any::type_name::<E>())
                    .finish()
            }
        }
    };
}

fn zero_extend(value: i64, bits: u32) -> i64 {
    if bits >= 64 {
        value
    } else {
        value & ((1i64 << bits) - 1)
    }
}

fn long_bits(memory: &Pointer) -> u32 {
    u32::try_from(memory.runtime().platform().long_bytes() * 8).unwrap_or(64)
}

enum_field! {
    /// An enum stored in one byte.
    Enum8: NativeType::SChar, |_: &Pointer| 8
}

enum_field! {
    /// An enum stored in two bytes.
    Enum16: NativeType::SShort, |_: &Pointer| 16
}

enum_field! {
    /// An enum stored in four bytes, the usual size of a C `enum`.
    Enum32: NativeType::SInt, |_: &Pointer| 32
}

enum_field! {
    /// An enum stored in eight bytes.
    Enum64: NativeType::SLongLong, |_: &Pointer| 64
}

enum_field! {
    /// An enum stored in a C `long`.
    EnumLong: NativeType::SLong, long_bits
}
