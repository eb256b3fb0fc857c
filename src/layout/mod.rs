//! Computation of C compatible record layouts.
//!
//! A [`LayoutBuilder`] receives the fields of a record in declaration order and assigns each an
//! offset, following the rules a C compiler applies to `struct` and `union` declarations on the
//! builder's [`Platform`](crate::Platform):
//!
//! - every field is placed at the next offset that is a multiple of its effective alignment,
//!   the natural alignment of its type clamped by an active packing directive;
//! - union members all start at offset 0, except elements of an array member, which follow
//!   each other from 0;
//! - the record's alignment is the largest effective field alignment, or an explicit override;
//! - the record's size is the end of its last field (struct) or its largest member (union),
//!   rounded up to its alignment.
//!
//! Nested records are embedded as a single field with the size and alignment of their own
//! layout. The result is a [`RecordLayout`], which depends on nothing but the declarations and
//! the platform.
//!
//! # Examples
//!
//! ```rust
//! use nativemem::{
//!     layout::{LayoutBuilder, RecordKind},
//!     NativeType, Platform,
//! };
//!
//! let mut builder = LayoutBuilder::new(RecordKind::Struct, Platform::linux_x86_64());
//! assert_eq!(builder.add(NativeType::SChar), 0);
//! assert_eq!(builder.add(NativeType::SLongLong), 8);
//! assert_eq!(builder.add(NativeType::SInt), 16);
//!
//! let layout = builder.finish()?;
//! assert_eq!((layout.size, layout.alignment), (24, 8));
//! # Ok::<(), nativemem::Error>(())
//! ```

mod builder;

pub use builder::LayoutBuilder;

use strum::Display;

use crate::platform::TypeInfo;

/// Whether fields follow each other or overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum RecordKind {
    /// Fields are placed one after the other
    Struct,
    /// All top-level fields start at offset 0
    Union,
}

/// Position and geometry of one declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldSlot {
    /// Byte offset from the start of the record
    pub offset: usize,
    /// Size in bytes
    pub size: usize,
    /// Effective alignment, after packing
    pub alignment: usize,
}

/// The computed layout of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordLayout {
    /// Struct or union
    pub kind: RecordKind,
    /// Size in bytes, including tail padding
    pub size: usize,
    /// Alignment of the record
    pub alignment: usize,
    /// The packing directive in effect, if any
    pub packing: Option<usize>,
    /// Every declared field in declaration order, including array elements and padding
    pub fields: Vec<FieldSlot>,
}

impl RecordLayout {
    /// Size and alignment of the record, for embedding it into another one.
    #[must_use]
    pub fn type_info(&self) -> TypeInfo {
        TypeInfo::new(self.size, self.alignment)
    }
}

/// Rounds `value` up to the next multiple of `alignment`, `None` on overflow.
///
/// `alignment` must be a power of two.
///
/// ```rust
/// use nativemem::layout::align_up;
///
/// assert_eq!(align_up(13, 4), Some(16));
/// assert_eq!(align_up(16, 4), Some(16));
/// assert_eq!(align_up(usize::MAX, 2), None);
/// ```
#[must_use]
pub fn align_up(value: usize, alignment: usize) -> Option<usize> {
    let mask = alignment.saturating_sub(1);
    value.checked_add(mask).map(|value| value & !mask)
}
