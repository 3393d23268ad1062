use std::ffi::CStr;
use std::fmt;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Identifies a kernel build. Only the major/minor digits of the raw
/// `kern.sdk_version` value are meaningful; the low half varies between
/// point releases that share a memory layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FirmwareVersion(u32);

const BUILD_MASK: u32 = 0xffff_0000;

impl FirmwareVersion {
    pub const fn from_raw(raw: u32) -> FirmwareVersion {
        FirmwareVersion(raw & BUILD_MASK)
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 0x1750000 renders as "1.75"
        write!(f, "{:x}.{:02x}", self.0 >> 24, (self.0 >> 16) & 0xff)
    }
}

pub const SDK_VERSION_SYSCTL: &CStr = cstr::cstr!(b"kern.sdk_version");

// FreeBSD __sysctl
const SYS_SYSCTL: i64 = 202;

// The {0, 3} node translates a dotted name into its numeric OID
const NAME2OID_MIB: [i32; 2] = [0, 3];
const CTL_MAXNAME: usize = 24;

unsafe fn sysctl_raw(
    name: *const i32,
    namelen: u32,
    oldp: *mut u8,
    oldlenp: *mut usize,
    newp: *const u8,
    newlen: usize,
) -> i64 {
    let result: i64;

    std::arch::asm!(
        "syscall",

        in("rax") SYS_SYSCTL,
        in("rdi") name,
        in("rsi") namelen as u64,
        in("rdx") oldp,
        in("r10") oldlenp,
        in("r8") newp,
        in("r9") newlen,
        lateout("rax") result,
        out("rcx") _,
        out("r11") _,

        options(nostack),
    );

    result
}

/// Raw `kern.sdk_version` value, or 0 if the kernel refused the query.
fn query_sdk_version() -> u32 {
    let name = SDK_VERSION_SYSCTL.to_bytes();

    let mut oid = [0i32; CTL_MAXNAME];
    let mut oid_size = std::mem::size_of_val(&oid);
    let ret = unsafe {
        sysctl_raw(
            NAME2OID_MIB.as_ptr(),
            NAME2OID_MIB.len() as u32,
            oid.as_mut_ptr().cast(),
            &mut oid_size,
            name.as_ptr(),
            name.len(),
        )
    };
    if ret != 0 {
        log::debug!("name2oid({:?}) failed: {}", SDK_VERSION_SYSCTL, ret);
        return 0;
    }

    let mut version = 0u32;
    let mut version_size = std::mem::size_of::<u32>();
    let ret = unsafe {
        sysctl_raw(
            oid.as_ptr(),
            (oid_size / std::mem::size_of::<i32>()) as u32,
            (&mut version as *mut u32).cast(),
            &mut version_size,
            std::ptr::null(),
            0,
        )
    };
    if ret != 0 || version_size != std::mem::size_of::<u32>() {
        log::debug!("sdk_version query failed: {}", ret);
        return 0;
    }

    version
}

static FIRMWARE_VERSION: OnceLock<Result<FirmwareVersion>> = OnceLock::new();

/// Resolves the running kernel's firmware version. The kernel is queried at
/// most once per process; every later call returns the cached result. An
/// undeterminable version, or one with no offset table row, is reported as
/// `UnsupportedFirmware` rather than guessed at.
pub fn get_firmware_version() -> Result<FirmwareVersion> {
    *FIRMWARE_VERSION.get_or_init(|| {
        let raw = query_sdk_version();
        if raw == 0 {
            return Err(Error::UnsupportedFirmware(0));
        }

        let version = FirmwareVersion::from_raw(raw);
        if !crate::offsets::is_supported(version) {
            log::error!("No offsets for firmware {} (raw {:#x})", version, raw);
            return Err(Error::UnsupportedFirmware(version.value()));
        }

        log::debug!("Firmware version {} (raw {:#x})", version, raw);
        Ok(version)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_masks_patch_digits() {
        assert_eq!(
            FirmwareVersion::from_raw(0x1750001),
            FirmwareVersion::from_raw(0x1750000)
        );
        assert_eq!(FirmwareVersion::from_raw(0x5050013).value(), 0x5050000);
        assert_eq!(FirmwareVersion::from_raw(0xffff_ffff).value(), 0xffff_0000);
    }

    #[test]
    fn display_is_dotted() {
        assert_eq!(FirmwareVersion::from_raw(0x1750000).to_string(), "1.75");
        assert_eq!(FirmwareVersion::from_raw(0x9000000).to_string(), "9.00");
    }

    #[test]
    fn resolution_is_idempotent() {
        // Whatever the outcome on the running kernel, it must be stable for
        // the lifetime of the process.
        assert_eq!(get_firmware_version(), get_firmware_version());
    }
}
