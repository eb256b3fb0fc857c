#![allow(unused_macros)]

/// Helper macro for reading locked items
///
/// A poisoned lock is recovered: byte regions carry no invariant a panicking writer could
/// have broken.
///
/// ```rust, ignore
///  let data = read_lock!(my_arc_rwlock);
///  println!("{}", data.len());
/// ```
macro_rules! read_lock {
    ($arc_rwlock:expr) => {
        $arc_rwlock
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

/// Helper macro for writing to locked items
///
/// ```rust, ignore
///  let mut data = write_lock!(my_arc_rwlock);
///  data[0] = 42;
/// ```
macro_rules! write_lock {
    ($arc_rwlock:expr) => {
        $arc_rwlock
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

/// Declares a native record: a Rust struct of typed fields together with its
/// [`RecordType`](crate::RecordType) implementation.
///
/// Fields are laid out in declaration order. A `union` places every top-level field at offset 0.
/// Record directives follow the name after a colon and map onto the
/// [`LayoutBuilder`](crate::layout::LayoutBuilder) methods of the same name: `packed(n)`,
/// `packed_if(n, predicate)`, `aligned(n)` and `min_aligned(n)`.
///
/// ```rust
/// use nativemem::prelude::*;
///
/// native_record! {
///     /// `struct timeval`
///     pub struct Timeval {
///         pub tv_sec: SignedLong,
///         pub tv_usec: SignedLong,
///     }
/// }
///
/// native_record! {
///     pub struct Pack2 : packed(2) {
///         pub i: Unsigned32,
///         pub l: Unsigned64,
///     }
/// }
///
/// let runtime = Runtime::new(Platform::linux_x86_64());
/// let tv = Record::<Timeval>::new(&runtime)?;
/// tv.tv_sec.set(&tv, 1_700_000_000)?;
/// assert_eq!(tv.size(), 16);
///
/// let packed = Record::<Pack2>::new(&runtime)?;
/// assert_eq!(packed.l.offset(), 4);
/// assert_eq!(packed.size(), 12);
/// # Ok::<(), nativemem::Error>(())
/// ```
#[macro_export]
macro_rules! native_record {
    (@record $kind:ident,
        [$(#[$meta:meta])*] $vis:vis $name:ident,
        [$( $directive:ident ( $($arg:expr),* ) ),*],
        { $( [$(#[$fmeta:meta])*] $fvis:vis $field:ident : $fty:ty ),* }
    ) => {
        $(#[$meta])*
        #[derive(Debug)]
        $vis struct $name {
            $( $(#[$fmeta])* $fvis $field: $fty, )*
        }

        impl $crate::RecordType for $name {
            const KIND: $crate::layout::RecordKind = $crate::layout::RecordKind::$kind;
            const NAME: &'static str = stringify!($name);

            #[allow(unused_variables)]
            fn directives(layout: &mut $crate::layout::LayoutBuilder) {
                $( layout.$directive($($arg),*); )*
            }

            #[allow(unused_variables)]
            fn declare(layout: &mut $crate::layout::LayoutBuilder) -> Self {
                $name {
                    $( $field: <$fty as $crate::record::FieldType>::declare(layout), )*
                }
            }

            #[allow(unused_variables)]
            fn render_fields(
                &self,
                target: &$crate::Pointer,
            ) -> Vec<(&'static str, $crate::Result<String>)> {
                vec![
                    $( (stringify!($field), $crate::record::FieldType::render(&self.$field, target)), )*
                ]
            }
        }
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(: $($directive:ident ( $($arg:expr),* )),+ )? {
            $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $fty:ty ),* $(,)?
        }
    ) => {
        $crate::native_record!(@record Struct,
            [$(#[$meta])*] $vis $name,
            [$($( $directive ( $($arg),* ) ),+)?],
            { $( [$(#[$fmeta])*] $fvis $field : $fty ),* }
        );
    };

    (
        $(#[$meta:meta])*
        $vis:vis union $name:ident $(: $($directive:ident ( $($arg:expr),* )),+ )? {
            $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $fty:ty ),* $(,)?
        }
    ) => {
        $crate::native_record!(@record Union,
            [$(#[$meta])*] $vis $name,
            [$($( $directive ( $($arg),* ) ),+)?],
            { $( [$(#[$fmeta])*] $fvis $field : $fty ),* }
        );
    };
}

/// Implements [`NativeEnum`](crate::record::NativeEnum) for a fieldless enum with an explicit
/// `#[repr]`, decoding through the `from_repr` constructor generated by `strum::FromRepr`.
///
/// ```rust
/// use nativemem::native_enum;
/// use strum::FromRepr;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
/// #[repr(i32)]
/// pub enum Whence {
///     Set = 0,
///     Cur = 1,
///     End = 2,
/// }
///
/// native_enum!(Whence: i32);
/// ```
#[macro_export]
macro_rules! native_enum {
    ($name:ty : $repr:ty) => {
        impl $crate::record::NativeEnum for $name {
            fn from_native(value: i64) -> Option<Self> {
                <$repr>::try_from(value).ok().and_then(<$name>::from_repr)
            }

            fn to_native(self) -> i64 {
                self as $repr as i64
            }
        }
    };
}
