//! # nativemem Prelude
//!
//! The types, traits and macros needed to declare records and work with native memory. Import
//! with a glob to get all of them at once.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all nativemem operations
pub use crate::Error;

/// The result type used throughout nativemem
pub use crate::Result;

// ================================================================================================
// Entry Points
// ================================================================================================

/// Allocation, address space and schema cache
pub use crate::Runtime;

/// Target platform description
pub use crate::platform::{ByteOrder, NativeType, Platform, WordSize};

// ================================================================================================
// Memory
// ================================================================================================

/// The memory handle and its capability
pub use crate::memory::{AsPointer, ByteBuffer, ByteRegion, Charset, MemoryIO, Pointer};

// ================================================================================================
// Records
// ================================================================================================

/// Record instances and record types
pub use crate::record::{FieldType, NativeEnum, Record, RecordType, TypeAlias};

/// Field descriptors
pub use crate::record::{
    Address, AsciiString, AsciiStringRef, Bool16, Boolean, Double, Enum16, Enum32, Enum64, Enum8,
    EnumLong, Float, Inner, Integer, Padding, PointerField, Signed16, Signed32, Signed64, Signed8,
    SignedLong, StructRef, Unsigned16, Unsigned32, Unsigned64, Unsigned8, UnsignedLong,
    Utf8String, Utf8StringRef, WBool,
};

/// Layout inspection
pub use crate::layout::{LayoutBuilder, RecordKind, RecordLayout};

/// Record declaration macros
pub use crate::{native_enum, native_record};
