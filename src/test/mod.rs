use std::sync::Arc;

use crate::{Platform, Runtime};

/// Runtime for 64-bit little endian Linux (LP64)
pub fn lp64() -> Arc<Runtime> {
    Runtime::new(Platform::linux_x86_64())
}

/// Runtime for 64-bit Windows (LLP64, 4 byte `long`)
pub fn llp64() -> Arc<Runtime> {
    Runtime::new(Platform::windows_x86_64())
}

/// Runtime for 32-bit i386 Linux
pub fn ilp32() -> Arc<Runtime> {
    Runtime::new(Platform::linux_i386())
}

/// Runtime for a 64-bit big endian platform
pub fn big_endian() -> Arc<Runtime> {
    Runtime::new(Platform::linux_ppc64())
}

/// `len` bytes counting up from 1, wrapping at 255
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|index| (index % 255) as u8 + 1).collect()
}
