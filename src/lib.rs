// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

//! # nativemem
//!
//! [![Crates.io](https://img.shields.io/crates/v/nativemem.svg)](https://crates.io/crates/nativemem)
//! [![Documentation](https://docs.rs/nativemem/badge.svg)](https://docs.rs/nativemem)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://github.com/BinFlip/nativemem/blob/main/LICENSE-APACHE)
//!
//! Native memory access and C struct layout, in safe Rust. `nativemem` reads, writes and lays
//! out data exactly as a C compiler for a given platform would, so that values can be exchanged
//! with foreign code through raw addresses.
//!
//! ## Features
//!
//! - **Uniform memory access** - One [`memory::MemoryIO`] capability over heap arrays, wrapped
//!   byte buffers, anonymous mappings and the null and inaccessible sentinels
//! - **Checked everywhere** - Every access is bounds-checked before a byte moves, bulk operations
//!   and transfers included
//! - **C compatible layouts** - Struct and union layout with nesting, arrays, packing and
//!   alignment overrides, for any [`Platform`]
//! - **Typed records** - Declarative records through [`native_record!`], with typed field
//!   accessors and diagnostic rendering
//! - **No unsafe code** - Direct memory is backed by anonymous mappings, never by raw pointers
//!
//! ## Quick Start
//!
//! ```rust
//! use nativemem::prelude::*;
//!
//! native_record! {
//!     pub struct Header {
//!         pub magic: Unsigned32,
//!         pub flags: Unsigned8,
//!         pub length: Unsigned64,
//!     }
//! }
//!
//! let runtime = Runtime::new(Platform::linux_x86_64());
//! let header = Record::<Header>::new(&runtime)?;
//! header.magic.set(&header, 0xFEED_FACE)?;
//! header.length.set(&header, 4096)?;
//!
//! assert_eq!(header.size(), 16);
//! assert_eq!(header.length.offset(), 8);
//! assert_eq!(header.memory().get_i32(0)?, 0xFEED_FACE_u32 as i32);
//! # Ok::<(), nativemem::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`platform`] - The C data model of a target: byte order, pointer and `long` width, type sizes
//! - [`memory`] - Codec, storage backends, views and the [`Pointer`] handle
//! - [`Runtime`] - Allocation, the address space of direct memory and the record schema cache
//! - [`layout`] - The struct and union layout engine
//! - [`record`] - Record types, typed field descriptors and record instances
//! - [`Error`] and [`Result`] - Error handling
//!
//! ### Memory
//!
//! A [`Pointer`] pairs a [`memory::MemoryIO`] implementation with its [`Runtime`]. Pointers are
//! cheap to clone, can be sliced into bounded or open views, and compare equal when they resolve
//! to the same bytes. Heap memory has no native address; direct memory (anonymous mappings) does,
//! and its addresses can be stored in other memory and resolved back through the runtime.
//!
//! ### Layout
//!
//! Layouts are computed once per record type and runtime, from the declared fields and the
//! runtime's [`Platform`]. They depend on nothing else, so the same declarations always produce
//! the same offsets.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result). Faults are raised before any byte is
//! touched:
//!
//! ```rust
//! use nativemem::{Error, Runtime};
//!
//! let memory = Runtime::system().allocate(8);
//! match memory.get_i64(4) {
//!     Err(Error::OutOfBounds { offset, length, size }) => {
//!         assert_eq!((offset, length, size), (4, 8, 8));
//!     }
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! cargo +nightly fuzz run pointer --release
//! ```
#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types, traits and macros.
///
/// # Example
///
/// ```rust
/// use nativemem::prelude::*;
///
/// let runtime = Runtime::new(Platform::linux_x86_64());
/// let memory: Pointer = runtime.allocate(4);
/// memory.put_i32(0, 1)?;
/// # Ok::<(), nativemem::Error>(())
/// ```
pub mod prelude;

/// Target platform descriptions.
///
/// A [`Platform`] describes the C data model of a target: operating system, processor, byte
/// order and the widths of pointers and `long`. It supplies the size and alignment of every
/// [`NativeType`] to the layout engine, and selects the [`memory::Codec`] of a runtime.
pub mod platform;

/// Native memory access.
///
/// See the module documentation for the backends, views and the bounds checking contract.
pub mod memory;

/// The struct and union layout engine.
pub mod layout;

/// Record types and typed field descriptors.
pub mod record;

mod runtime;

/// `nativemem` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `nativemem` Error type
///
/// The single error type of the crate, covering memory access faults, type faults and layout
/// errors.
pub use error::Error;

pub use memory::{AsPointer, Pointer};
pub use platform::{NativeType, Platform};
pub use record::{Record, RecordType};
pub use runtime::Runtime;
