//! Explicit description of the target platform.
//!
//! Everything that depends on the C ABI of the target (byte order, pointer width, the width of
//! `long`, and the size and alignment of every primitive) is resolved through a [`Platform`]
//! value. There is no ambient global state: a [`crate::Runtime`] is created for one platform and
//! hands that platform to the numeric codec and to the layout engine.
//!
//! Besides [`Platform::native`], a set of preset constructors describe common foreign targets,
//! which makes it possible to compute (and test) the layout of a record for a platform other
//! than the one the crate is running on.
//!
//! # Examples
//!
//! ```rust
//! use nativemem::{NativeType, Platform};
//!
//! let windows = Platform::windows_x86_64();
//! assert_eq!(windows.type_info(NativeType::SLong)?.size, 4);
//!
//! let linux = Platform::linux_x86_64();
//! assert_eq!(linux.type_info(NativeType::SLong)?.size, 8);
//! # Ok::<(), nativemem::Error>(())
//! ```

use strum::{Display, EnumIter};

use crate::{Error, Result};

/// Byte order of multi-byte values in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ByteOrder {
    /// Least significant byte first
    LittleEndian,
    /// Most significant byte first
    BigEndian,
}

impl ByteOrder {
    /// The byte order of the machine this crate was compiled for.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }
}

/// Width of a machine word, used for addresses and for `long`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum WordSize {
    /// 4 byte words
    Bits32,
    /// 8 byte words
    Bits64,
}

impl WordSize {
    /// Number of bytes in a word of this size.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            WordSize::Bits32 => 4,
            WordSize::Bits64 => 8,
        }
    }
}

/// Operating system family of a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[allow(missing_docs)]
pub enum Os {
    Linux,
    Darwin,
    Windows,
    FreeBsd,
    OpenBsd,
    NetBsd,
    Solaris,
    Aix,
    Unknown,
}

/// Processor architecture of a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[allow(missing_docs)]
pub enum Cpu {
    I386,
    X86_64,
    Arm,
    Aarch64,
    Ppc,
    Ppc64,
    Ppc64le,
    S390x,
    Mips,
    Mipsel,
    Riscv64,
    Unknown,
}

/// Tag of a C primitive type.
///
/// The size and alignment of each type are not fixed, they are resolved per platform through
/// [`Platform::type_info`]. Platform aliases such as `size_t` are mapped to one of these tags by
/// the caller before a field is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum NativeType {
    /// `void`, has no size
    Void,
    /// `signed char`
    SChar,
    /// `unsigned char`
    UChar,
    /// `signed short`
    SShort,
    /// `unsigned short`
    UShort,
    /// `signed int`
    SInt,
    /// `unsigned int`
    UInt,
    /// `signed long`
    SLong,
    /// `unsigned long`
    ULong,
    /// `signed long long`
    SLongLong,
    /// `unsigned long long`
    ULongLong,
    /// `float`
    Float,
    /// `double`
    Double,
    /// Any data pointer
    Address,
    /// An aggregate, whose geometry comes from its own layout
    Struct,
}

impl NativeType {
    /// Whether values of this type are integers.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            NativeType::SChar
                | NativeType::UChar
                | NativeType::SShort
                | NativeType::UShort
                | NativeType::SInt
                | NativeType::UInt
                | NativeType::SLong
                | NativeType::ULong
                | NativeType::SLongLong
                | NativeType::ULongLong
                | NativeType::Address
        )
    }

    /// Whether this is a signed integer type.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            NativeType::SChar
                | NativeType::SShort
                | NativeType::SInt
                | NativeType::SLong
                | NativeType::SLongLong
        )
    }
}

/// Size and natural alignment of a native type, both in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    /// Size in bytes
    pub size: usize,
    /// Natural alignment in bytes
    pub alignment: usize,
}

impl TypeInfo {
    /// A type of `size` bytes with an alignment of `alignment` bytes.
    #[must_use]
    pub const fn new(size: usize, alignment: usize) -> Self {
        TypeInfo { size, alignment }
    }
}

/// Description of a target platform's C data model.
///
/// Follows the pattern of a plain configuration value: construct one of the presets, or
/// [`Platform::new`] for a custom combination, and hand it to [`crate::Runtime::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    /// Operating system family
    pub os: Os,
    /// Processor architecture
    pub cpu: Cpu,
    /// Byte order of multi-byte values
    pub byte_order: ByteOrder,
    /// Width of a data pointer
    pub address_size: WordSize,
    /// Width of C `long`
    pub long_size: WordSize,
}

impl Default for Platform {
    fn default() -> Self {
        Self::native()
    }
}

impl Platform {
    /// Creates a platform description, deriving the width of `long` from the data model
    /// (LLP64 on Windows, ILP32/LP64 everywhere else).
    #[must_use]
    pub const fn new(os: Os, cpu: Cpu, byte_order: ByteOrder, address_size: WordSize) -> Self {
        let long_size = match os {
            Os::Windows => WordSize::Bits32,
            _ => address_size,
        };

        Platform {
            os,
            cpu,
            byte_order,
            address_size,
            long_size,
        }
    }

    /// The platform this crate was compiled for.
    #[must_use]
    pub const fn native() -> Self {
        let os = if cfg!(target_os = "linux") || cfg!(target_os = "android") {
            Os::Linux
        } else if cfg!(target_vendor = "apple") {
            Os::Darwin
        } else if cfg!(target_os = "windows") {
            Os::Windows
        } else if cfg!(target_os = "freebsd") {
            Os::FreeBsd
        } else if cfg!(target_os = "openbsd") {
            Os::OpenBsd
        } else if cfg!(target_os = "netbsd") {
            Os::NetBsd
        } else if cfg!(target_os = "solaris") || cfg!(target_os = "illumos") {
            Os::Solaris
        } else if cfg!(target_os = "aix") {
            Os::Aix
        } else {
            Os::Unknown
        };

        let cpu = if cfg!(target_arch = "x86") {
            Cpu::I386
        } else if cfg!(target_arch = "x86_64") {
            Cpu::X86_64
        } else if cfg!(target_arch = "arm") {
            Cpu::Arm
        } else if cfg!(target_arch = "aarch64") {
            Cpu::Aarch64
        } else if cfg!(target_arch = "powerpc") {
            Cpu::Ppc
        } else if cfg!(all(target_arch = "powerpc64", target_endian = "big")) {
            Cpu::Ppc64
        } else if cfg!(target_arch = "powerpc64") {
            Cpu::Ppc64le
        } else if cfg!(target_arch = "s390x") {
            Cpu::S390x
        } else if cfg!(all(target_arch = "mips", target_endian = "big")) {
            Cpu::Mips
        } else if cfg!(target_arch = "mips") {
            Cpu::Mipsel
        } else if cfg!(target_arch = "riscv64") {
            Cpu::Riscv64
        } else {
            Cpu::Unknown
        };

        let address_size = if cfg!(target_pointer_width = "64") {
            WordSize::Bits64
        } else {
            WordSize::Bits32
        };

        Self::new(os, cpu, ByteOrder::native(), address_size)
    }

    /// 64-bit Linux on x86_64 (LP64, little endian).
    #[must_use]
    pub const fn linux_x86_64() -> Self {
        Self::new(Os::Linux, Cpu::X86_64, ByteOrder::LittleEndian, WordSize::Bits64)
    }

    /// 32-bit Linux on i386 (ILP32, little endian, 8 byte scalars aligned to 4).
    #[must_use]
    pub const fn linux_i386() -> Self {
        Self::new(Os::Linux, Cpu::I386, ByteOrder::LittleEndian, WordSize::Bits32)
    }

    /// 64-bit Windows on x86_64 (LLP64, little endian).
    #[must_use]
    pub const fn windows_x86_64() -> Self {
        Self::new(Os::Windows, Cpu::X86_64, ByteOrder::LittleEndian, WordSize::Bits64)
    }

    /// macOS on Apple silicon (LP64, little endian).
    #[must_use]
    pub const fn darwin_aarch64() -> Self {
        Self::new(Os::Darwin, Cpu::Aarch64, ByteOrder::LittleEndian, WordSize::Bits64)
    }

    /// 64-bit big endian Linux on POWER.
    #[must_use]
    pub const fn linux_ppc64() -> Self {
        Self::new(Os::Linux, Cpu::Ppc64, ByteOrder::BigEndian, WordSize::Bits64)
    }

    /// 32-bit big endian Linux on MIPS.
    #[must_use]
    pub const fn linux_mips() -> Self {
        Self::new(Os::Linux, Cpu::Mips, ByteOrder::BigEndian, WordSize::Bits32)
    }

    /// True for macOS, iOS and the other Apple operating systems.
    #[must_use]
    pub fn is_darwin(&self) -> bool {
        self.os == Os::Darwin
    }

    /// True for Windows.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    /// True for every platform that is neither Windows nor Darwin.
    #[must_use]
    pub fn is_unix(&self) -> bool {
        !matches!(self.os, Os::Windows | Os::Darwin | Os::Unknown)
    }

    /// Size of a data pointer in bytes.
    #[must_use]
    pub fn address_bytes(&self) -> usize {
        self.address_size.bytes()
    }

    /// Size of C `long` in bytes.
    #[must_use]
    pub fn long_bytes(&self) -> usize {
        self.long_size.bytes()
    }

    /// Size and natural alignment of a primitive type on this platform.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedType`] for [`NativeType::Void`] and [`NativeType::Struct`],
    /// neither of which has a fixed geometry.
    pub fn type_info(&self, native: NativeType) -> Result<TypeInfo> {
        let size = match native {
            NativeType::SChar | NativeType::UChar => 1,
            NativeType::SShort | NativeType::UShort => 2,
            NativeType::SInt | NativeType::UInt | NativeType::Float => 4,
            NativeType::SLong | NativeType::ULong => self.long_bytes(),
            NativeType::SLongLong | NativeType::ULongLong | NativeType::Double => 8,
            NativeType::Address => self.address_bytes(),
            NativeType::Void | NativeType::Struct => return Err(Error::UnsupportedType(native)),
        };

        // The i386 System V ABI only aligns 8 byte scalars to 4 inside aggregates
        let alignment = if size == 8 && self.cpu == Cpu::I386 && self.os != Os::Windows {
            4
        } else {
            size
        };

        Ok(TypeInfo::new(size, alignment))
    }
}
