use thiserror::Error;

use crate::platform::NativeType;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every fault is raised before a single byte is read or written, for single-value accessors as
/// well as for bulk operations and transfers. None of the errors are transient, so there is
/// nothing to retry: the failing call had no effect.
///
/// # Error Categories
///
/// ## Memory Access Faults
/// - [`Error::OutOfBounds`] - Offset/length pair outside the addressable window
/// - [`Error::NullDereference`] - Any access through the null pointer
/// - [`Error::InaccessibleMemory`] - Any access through an address not mapped in this process
/// - [`Error::NotDirect`] - A native address was required but the memory lives on the heap
/// - [`Error::AddressOverflow`] - An address wider than the platform's pointers was stored
///
/// ## Type Faults
/// - [`Error::UnsupportedType`] - A native type without a representation for the operation
/// - [`Error::InvalidEnumValue`] - A stored integer that maps to no enum variant
///
/// ## Layout and Platform Errors
/// - [`Error::Malformed`] - Invalid packing, alignment or size during layout computation
/// - [`Error::Io`] - The operating system refused to map direct memory
///
/// # Examples
///
/// ```rust
/// use nativemem::{Error, Runtime};
///
/// let runtime = Runtime::system();
/// let memory = runtime.allocate(4);
///
/// match memory.put_i32(2, 7) {
///     Err(Error::OutOfBounds { offset, length, size }) => {
///         assert_eq!((offset, length, size), (2, 4, 4));
///     }
///     other => panic!("unexpected result {:?}", other),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// An access was attempted outside of the addressable window.
    ///
    /// One check catches negative offsets, negative lengths, `offset + length` overflow
    /// and accesses that run past the end of the memory.
    ///
    /// # Fields
    ///
    /// * `offset` - The offset of the rejected access
    /// * `length` - The number of bytes the access covered
    /// * `size` - The size of the memory that rejected the access
    #[error("Out of bounds access - offset {offset}, length {length}, size {size}")]
    OutOfBounds {
        /// The offset of the rejected access
        offset: i64,
        /// The length of the rejected access
        length: i64,
        /// The size of the memory which was accessed
        size: i64,
    },

    /// Attempted access to a NULL memory address.
    #[error("Attempted access to a NULL memory address at offset {offset}")]
    NullDereference {
        /// The offset relative to address 0 at which the access was attempted
        offset: i64,
    },

    /// Attempted access to memory which is not mapped in this process.
    ///
    /// Raised by pointers created from opaque integers, or from addresses that do not fall into
    /// any live region of the runtime's address space.
    #[error("Attempted access to inaccessible memory at {address:#x} + {offset}")]
    InaccessibleMemory {
        /// The address of the inaccessible pointer
        address: u64,
        /// The offset relative to `address`
        offset: i64,
    },

    /// The native type has no representation for the requested operation.
    ///
    /// For example an integer read of [`NativeType::Float`], or the size of [`NativeType::Void`].
    #[error("Unsupported native type for this operation - {0}")]
    UnsupportedType(NativeType),

    /// A stored integer does not correspond to any variant of the enum it is decoded into.
    #[error("Invalid value {value} for enum {type_name}")]
    InvalidEnumValue {
        /// Name of the Rust enum type
        type_name: &'static str,
        /// The integer value found in memory
        value: i64,
    },

    /// The memory has no stable native address.
    ///
    /// Heap memory may be stored into a pointer-valued field only once it is direct.
    #[error("Memory is not direct and has no native address")]
    NotDirect,

    /// An address does not fit into a pointer of the runtime's platform.
    ///
    /// Storing it would silently drop its upper bits, so the store is refused instead.
    #[error("Address {address:#x} does not fit into a {width} byte pointer")]
    AddressOverflow {
        /// The address that was to be stored
        address: u64,
        /// The platform's pointer width in bytes
        width: usize,
    },

    /// A record layout could not be computed.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// I/O error while mapping direct memory.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short name of the fault, used as placeholder when a record is rendered for diagnostics.
    ///
    /// ```rust
    /// use nativemem::Error;
    ///
    /// assert_eq!(Error::NullDereference { offset: 0 }.fault_name(), "NullDereference");
    /// ```
    #[must_use]
    pub fn fault_name(&self) -> &'static str {
        match self {
            Error::OutOfBounds { .. } => "OutOfBounds",
            Error::NullDereference { .. } => "NullDereference",
            Error::InaccessibleMemory { .. } => "InaccessibleMemory",
            Error::UnsupportedType(_) => "UnsupportedType",
            Error::InvalidEnumValue { .. } => "InvalidEnumValue",
            Error::NotDirect => "NotDirect",
            Error::AddressOverflow { .. } => "AddressOverflow",
            Error::Malformed { .. } => "Malformed",
            Error::Io(_) => "Io",
        }
    }
}
