use crate::{
    memory::{Backend, MemoryIO, Underlying},
    Error, Result,
};

macro_rules! faulting_accessors {
    () => {
        fn get_i8(&self, offset: i64) -> Result<i8> {
            Err(self.fault(offset))
        }

        fn get_i16(&self, offset: i64) -> Result<i16> {
            Err(self.fault(offset))
        }

        fn get_i32(&self, offset: i64) -> Result<i32> {
            Err(self.fault(offset))
        }

        fn get_i64(&self, offset: i64) -> Result<i64> {
            Err(self.fault(offset))
        }

        fn get_f32(&self, offset: i64) -> Result<f32> {
            Err(self.fault(offset))
        }

        fn get_f64(&self, offset: i64) -> Result<f64> {
            Err(self.fault(offset))
        }

        fn get_address(&self, offset: i64) -> Result<u64> {
            Err(self.fault(offset))
        }

        fn put_i8(&self, offset: i64, _value: i8) -> Result<()> {
            Err(self.fault(offset))
        }

        fn put_i16(&self, offset: i64, _value: i16) -> Result<()> {
            Err(self.fault(offset))
        }

        fn put_i32(&self, offset: i64, _value: i32) -> Result<()> {
            Err(self.fault(offset))
        }

        fn put_i64(&self, offset: i64, _value: i64) -> Result<()> {
            Err(self.fault(offset))
        }

        fn put_f32(&self, offset: i64, _value: f32) -> Result<()> {
            Err(self.fault(offset))
        }

        fn put_f64(&self, offset: i64, _value: f64) -> Result<()> {
            Err(self.fault(offset))
        }

        fn put_address(&self, offset: i64, _value: u64) -> Result<()> {
            Err(self.fault(offset))
        }

        fn get_bytes(&self, offset: i64, _dst: &mut [u8]) -> Result<()> {
            Err(self.fault(offset))
        }

        fn put_bytes(&self, offset: i64, _src: &[u8]) -> Result<()> {
            Err(self.fault(offset))
        }

        fn check_bounds(&self, offset: i64, _length: i64) -> Result<()> {
            Err(self.fault(offset))
        }

        fn index_of(&self, offset: i64, _value: u8, _max_length: i64) -> Result<Option<i64>> {
            Err(self.fault(offset))
        }
    };
}

/// The null pointer.
///
/// Address 0 with an unbounded size; every access fails with [`Error::NullDereference`].
/// Stateless, so it can be constructed wherever one is needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NullMemory;

impl NullMemory {
    fn fault(&self, offset: i64) -> Error {
        Error::NullDereference { offset }
    }
}

impl MemoryIO for NullMemory {
    fn size(&self) -> i64 {
        i64::MAX
    }

    fn address(&self) -> u64 {
        0
    }

    fn is_direct(&self) -> bool {
        true
    }

    fn underlying(&self) -> Underlying<'_> {
        Underlying::direct(Backend::Null)
    }

    faulting_accessors!();
}

/// An address that is known not to be mapped in this process.
///
/// Used for opaque integers disguised as pointers and for addresses that fall outside every live
/// region of a runtime. Every access fails with [`Error::InaccessibleMemory`]; the size is 0 and
/// two instances are equal when their addresses are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InaccessibleMemory {
    address: u64,
}

impl InaccessibleMemory {
    /// An inaccessible pointer at `address`.
    #[must_use]
    pub const fn new(address: u64) -> Self {
        InaccessibleMemory { address }
    }

    fn fault(&self, offset: i64) -> Error {
        Error::InaccessibleMemory {
            address: self.address,
            offset,
        }
    }
}

impl MemoryIO for InaccessibleMemory {
    fn size(&self) -> i64 {
        0
    }

    fn address(&self) -> u64 {
        self.address
    }

    fn is_direct(&self) -> bool {
        true
    }

    fn underlying(&self) -> Underlying<'_> {
        Underlying::direct(Backend::Inaccessible(self.address))
    }

    faulting_accessors!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_faults_everywhere() {
        let null = NullMemory;
        assert_eq!(null.size(), i64::MAX);
        assert_eq!(null.address(), 0);
        assert!(matches!(
            null.get_i32(16),
            Err(Error::NullDereference { offset: 16 })
        ));
        assert!(matches!(
            null.put_f64(0, 1.0),
            Err(Error::NullDereference { offset: 0 })
        ));
        assert!(null.fill(0, 4, 0).is_err());
        let mut dst = [0i64; 2];
        assert!(null.get_i64s(8, &mut dst).is_err());
    }

    #[test]
    fn inaccessible_identity_is_address() {
        let a = InaccessibleMemory::new(0x1234);
        let b = InaccessibleMemory::new(0x1234);
        assert_eq!(a, b);
        assert_ne!(a, InaccessibleMemory::new(0x1235));
        assert_eq!(a.size(), 0);
        assert!(matches!(
            a.get_i8(3),
            Err(Error::InaccessibleMemory {
                address: 0x1234,
                offset: 3
            })
        ));
        assert!(a.index_of(0, 0, 10).is_err());
    }
}
