use std::fmt;

/// An absolute address inside the kernel's address space. Kept distinct from
/// plain integers and from userspace pointers so the two address spaces can't
/// be mixed up by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct KernelAddr(u64);

impl KernelAddr {
    pub const NULL: KernelAddr = KernelAddr(0);

    pub const fn new(addr: u64) -> KernelAddr {
        KernelAddr(addr)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Applies a signed, structure-relative field offset.
    pub const fn offset(self, off: i64) -> KernelAddr {
        KernelAddr(self.0.wrapping_add(off as u64))
    }

    /// The end of an `len`-byte range starting here, or `None` if the range
    /// would wrap around the address space.
    pub fn checked_end(self, len: usize) -> Option<KernelAddr> {
        self.0.checked_add(len as u64).map(KernelAddr)
    }
}

impl std::ops::Add<u64> for KernelAddr {
    type Output = KernelAddr;

    fn add(self, rhs: u64) -> KernelAddr {
        KernelAddr(self.0.wrapping_add(rhs))
    }
}

impl std::ops::Add<i64> for KernelAddr {
    type Output = KernelAddr;

    fn add(self, rhs: i64) -> KernelAddr {
        self.offset(rhs)
    }
}

impl fmt::LowerHex for KernelAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::Display for KernelAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
