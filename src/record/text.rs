//! Strings stored inline in a record, or referenced through a pointer.

use crate::{
    layout::LayoutBuilder,
    memory::{byte_length, AsPointer, Charset, Pointer},
    platform::{NativeType, TypeInfo},
    record::field::{at, FieldType},
    Result,
};

macro_rules! string_fields {
    (
        $(#[$inline_meta:meta])*
        $inline:ident,
        $(#[$ref_meta:meta])*
        $reference:ident,
        $charset:expr
    ) => {
        $(#[$inline_meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $inline<const N: usize> {
            offset: usize,
        }

        impl<const N: usize> $inline<N> {
            /// Offset of the first byte of the buffer.
            #[must_use]
            pub fn offset(&self) -> usize {
                self.offset
            }

            /// Reads up to the first terminator, or the whole buffer if it has none.
            ///
            /// # Errors
            /// Bounds or sentinel faults of the target memory.
            pub fn get(&self, target: &impl AsPointer) -> Result<String> {
                target
                    .pointer()
                    .slice_bounded(at(self.offset), byte_length(N, 1))?
                    .get_string(0, byte_length(N, 1), $charset)
            }

            /// Writes `value` and a terminator, cutting `value` to fit the buffer.
            ///
            /// # Errors
            /// Bounds or sentinel faults of the target memory.
            pub fn set(&self, target: &impl AsPointer, value: &str) -> Result<()> {
                let memory = target.pointer();
                memory.check_bounds(at(self.offset), byte_length(N, 1))?;
                memory.put_string(at(self.offset), value, byte_length(N, 1), $charset)
            }
        }

        impl<const N: usize> FieldType for $inline<N> {
            fn declare(layout: &mut LayoutBuilder) -> Self {
                $inline {
                    offset: layout.add_spec(TypeInfo::new(N, 1)),
                }
            }

            fn render(&self, target: &Pointer) -> Result<String> {
                self.get(target).map(|value| format!("{value:?}"))
            }
        }

        $(#[$ref_meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $reference {
            offset: usize,
        }

        impl $reference {
            /// Offset of the field inside its record.
            #[must_use]
            pub fn offset(&self) -> usize {
                self.offset
            }

            /// The referenced string, or `None` for a null reference.
            ///
            /// The string ends at its terminator or at the end of the memory it lives in.
            ///
            /// # Errors
            /// Bounds or sentinel faults while reading the address, or while reading the
            /// string through it.
            pub fn get(&self, target: &impl AsPointer) -> Result<Option<String>> {
                let referenced = target.pointer().get_pointer(at(self.offset))?;
                if referenced.is_null() {
                    return Ok(None);
                }
                referenced
                    .get_string(0, referenced.size(), $charset)
                    .map(Some)
            }

            /// Copies `value` into fresh direct memory and stores its address, or stores 0 for
            /// `None`.
            ///
            /// The address space only holds weak references, so the returned memory has to be
            /// kept alive for as long as the field is read. Once it is dropped, reads of the
            /// field fault with [`crate::Error::InaccessibleMemory`].
            ///
            /// # Errors
            /// Bounds or sentinel faults of the target memory, an address that does not fit the
            /// platform, or [`crate::Error::Io`] if the memory cannot be mapped.
            #[must_use = "the string is released when the returned memory is dropped"]
            pub fn set(
                &self,
                target: &impl AsPointer,
                value: Option<&str>,
            ) -> Result<Option<Pointer>> {
                let memory = target.pointer();
                let width = memory.runtime().platform().address_bytes();
                memory.check_bounds(at(self.offset), byte_length(width, 1))?;

                let Some(value) = value else {
                    memory.put_address(at(self.offset), 0)?;
                    return Ok(None);
                };

                let capacity = encoded_length(value, $charset) + 1;
                let holder = memory.runtime().allocate_direct(capacity)?;
                holder.put_string(0, value, byte_length(capacity, 1), $charset)?;
                memory.put_pointer(at(self.offset), &holder)?;
                Ok(Some(holder))
            }
        }

        impl FieldType for $reference {
            fn declare(layout: &mut LayoutBuilder) -> Self {
                $reference {
                    offset: layout.add(NativeType::Address),
                }
            }

            fn render(&self, target: &Pointer) -> Result<String> {
                match self.get(target)? {
                    Some(value) => Ok(format!("{value:?}")),
                    None => Ok("null".to_string()),
                }
            }
        }
    };
}

fn encoded_length(value: &str, charset: Charset) -> usize {
    match charset {
        Charset::Utf8 => value.len(),
        Charset::Ascii => value.chars().count(),
        Charset::Utf16 => value.encode_utf16().count() * 2,
    }
}

string_fields! {
    /// An inline `char[N]` buffer holding a UTF-8 string, with byte alignment.
    Utf8String,
    /// A `char *` to a UTF-8 string.
    Utf8StringRef,
    Charset::Utf8
}

string_fields! {
    /// An inline `char[N]` buffer holding an ASCII string.
    ///
    /// Bytes outside ASCII read back as U+FFFD, characters outside ASCII are written as `?`.
    AsciiString,
    /// A `char *` to an ASCII string.
    AsciiStringRef,
    Charset::Ascii
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{record::Record, Error};
    use crate::test::{ilp32, lp64};

    crate::native_record! {
        struct Label {
            tag: crate::record::Unsigned8,
            name: Utf8String<6>,
            code: AsciiString<3>,
            title: Utf8StringRef,
        }
    }

    #[test]
    fn inline_buffers_are_byte_aligned() {
        let runtime = lp64();
        let label = Record::<Label>::new(&runtime).unwrap();
        assert_eq!(label.name.offset(), 1);
        assert_eq!(label.code.offset(), 7);
        assert_eq!(label.title.offset(), 16);
        assert_eq!(label.size(), 24);
    }

    #[test]
    fn inline_strings_are_cut_to_the_buffer() {
        let runtime = lp64();
        let label = Record::<Label>::new(&runtime).unwrap();

        label.name.set(&label, "héllo!").unwrap();
        assert_eq!(label.name.get(&label).unwrap(), "héll");
        assert_eq!(label.memory().get_i8(6).unwrap(), 0);

        label.code.set(&label, "ñop").unwrap();
        assert_eq!(label.code.get(&label).unwrap(), "?o");
        assert_eq!(label.tag.get(&label).unwrap(), 0);
    }

    #[test]
    fn unterminated_inline_buffer_stops_at_its_end() {
        let runtime = lp64();
        let label = Record::<Label>::new(&runtime).unwrap();
        label.memory().put_bytes(1, b"abcdefXY\0").unwrap();
        assert_eq!(label.name.get(&label).unwrap(), "abcdef");
        assert_eq!(label.code.get(&label).unwrap(), "XY");
    }

    #[test]
    fn string_references_hold_their_memory() {
        let runtime = lp64();
        let label = Record::<Label>::new(&runtime).unwrap();
        assert_eq!(label.title.get(&label).unwrap(), None);

        let holder = label.title.set(&label, Some("résumé")).unwrap().unwrap();
        assert_eq!(holder.size(), 9);
        assert_eq!(label.title.get(&label).unwrap().as_deref(), Some("résumé"));
        assert_eq!(label.memory().get_address(16).unwrap(), holder.address());

        drop(holder);
        assert!(matches!(
            label.title.get(&label),
            Err(Error::InaccessibleMemory { .. })
        ));

        assert!(label.title.set(&label, None).unwrap().is_none());
        assert_eq!(label.title.get(&label).unwrap(), None);
    }

    #[test]
    fn short_target_is_checked_before_allocating() {
        let runtime = ilp32();
        let memory = runtime.allocate(2);
        let before = runtime.direct_regions();
        let field = Utf8StringRef { offset: 0 };

        assert!(matches!(
            field.set(&memory, Some("x")),
            Err(Error::OutOfBounds { .. })
        ));
        assert_eq!(runtime.direct_regions(), before);
    }
}
