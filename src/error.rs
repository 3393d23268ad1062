use std::fmt;

use nix::errno::Errno;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The running kernel's version has no row in the offset table. Never
    /// falls back to a nearest-version guess; a wrong offset corrupts the
    /// kernel silently. Version `0` means the version query itself failed.
    UnsupportedFirmware(u32),
    /// The underlying raw kernel read/write capability reported failure.
    /// Not retried; the kernel may already be in an undefined state.
    KernelAccess(Errno),
    /// A parameter was structurally invalid (null buffer, null kernel
    /// address, wrapping range), caught before touching kernel memory.
    InvalidArgument(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedFirmware(0) => {
                write!(f, "firmware version could not be determined")
            }
            Error::UnsupportedFirmware(version) => {
                write!(f, "unsupported firmware version {version:#x}")
            }
            Error::KernelAccess(errno) => {
                write!(f, "kernel memory access failed: {errno}")
            }
            Error::InvalidArgument(what) => write!(f, "invalid argument: {what}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<Errno> for Error {
    fn from(errno: Errno) -> Error {
        Error::KernelAccess(errno)
    }
}
