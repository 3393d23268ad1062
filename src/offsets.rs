use crate::addr::KernelAddr;
use crate::error::{Error, Result};
use crate::firmware::{self, FirmwareVersion};

/// Kernel addresses and structure-field offsets valid for exactly one
/// firmware build. Every value was recovered by reverse engineering that
/// build; nothing here can be validated at runtime from userspace, so a row
/// is only ever used for the version it was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetSet {
    /// Base of the kernel's static data segment.
    pub data_base: KernelAddr,
    /// Head of the global process list.
    pub allproc: KernelAddr,
    /// struct proc: pointer to the process's credential block.
    pub proc_ucred: i64,
    /// struct proc: process id.
    pub proc_pid: i64,
    /// struct ucred: effective user id.
    pub ucred_uid: i64,
    /// struct ucred: real user id.
    pub ucred_ruid: i64,
    /// struct ucred: saved user id.
    pub ucred_svuid: i64,
    /// struct ucred: real group id.
    pub ucred_rgid: i64,
}

// The ucred layout and the p_ucred slot have been stable across every build
// reversed so far; allproc moves with each release and p_pid moved in 6.00.
const PROC_UCRED: i64 = 0x40;
const UCRED_UID: i64 = 0x04;
const UCRED_RUID: i64 = 0x08;
const UCRED_SVUID: i64 = 0x0c;
const UCRED_RGID: i64 = 0x14;

const fn row(data_base: u64, allproc: u64, proc_pid: i64) -> OffsetSet {
    OffsetSet {
        data_base: KernelAddr::new(data_base),
        allproc: KernelAddr::new(allproc),
        proc_ucred: PROC_UCRED,
        proc_pid,
        ucred_uid: UCRED_UID,
        ucred_ruid: UCRED_RUID,
        ucred_svuid: UCRED_SVUID,
        ucred_rgid: UCRED_RGID,
    }
}

/// One row per reversed firmware build, in release order. Append-only: new
/// builds get new rows, existing rows are never edited once verified.
#[rustfmt::skip]
static SUPPORTED: &[(u32, OffsetSet)] = &[
    (0x1050000, row(0xffff_ffff_8328_0000, 0xffff_ffff_8543_42a8, 0xb0)),
    (0x1750000, row(0xffff_ffff_8330_0000, 0xffff_ffff_8546_df18, 0xb0)),
    (0x1760000, row(0xffff_ffff_8330_0000, 0xffff_ffff_8546_e098, 0xb0)),
    (0x2000000, row(0xffff_ffff_8338_0000, 0xffff_ffff_8552_b100, 0xb0)),
    (0x2500000, row(0xffff_ffff_8340_0000, 0xffff_ffff_8563_62c8, 0xb0)),
    (0x3000000, row(0xffff_ffff_8348_0000, 0xffff_ffff_8577_8d68, 0xb0)),
    (0x3500000, row(0xffff_ffff_8350_0000, 0xffff_ffff_8585_2f08, 0xb0)),
    (0x4050000, row(0xffff_ffff_8358_0000, 0xffff_ffff_8588_3590, 0xb0)),
    (0x4550000, row(0xffff_ffff_8360_0000, 0xffff_ffff_858e_70b8, 0xb0)),
    (0x5050000, row(0xffff_ffff_8368_0000, 0xffff_ffff_85a0_2ff8, 0xb0)),
    (0x6720000, row(0xffff_ffff_8378_0000, 0xffff_ffff_85b4_3e80, 0xbc)),
    (0x7020000, row(0xffff_ffff_8380_0000, 0xffff_ffff_85c6_88b0, 0xbc)),
    (0x7550000, row(0xffff_ffff_8380_0000, 0xffff_ffff_85c8_90d0, 0xbc)),
    (0x9000000, row(0xffff_ffff_8398_0000, 0xffff_ffff_85d1_46e0, 0xbc)),
];

pub fn is_supported(version: FirmwareVersion) -> bool {
    SUPPORTED.iter().any(|(v, _)| *v == version.value())
}

/// Looks up the offset row for `version`. A version without a row is an
/// explicit error; there is no nearest-match fallback.
pub fn resolve(version: FirmwareVersion) -> Result<&'static OffsetSet> {
    SUPPORTED
        .iter()
        .find(|(v, _)| *v == version.value())
        .map(|(_, set)| set)
        .ok_or(Error::UnsupportedFirmware(version.value()))
}

/// The offset row for the kernel this process is running on.
pub fn current() -> Result<&'static OffsetSet> {
    resolve(firmware::get_firmware_version()?)
}

pub fn data_base_address() -> Result<KernelAddr> {
    Ok(current()?.data_base)
}

pub fn allproc_address() -> Result<KernelAddr> {
    Ok(current()?.allproc)
}

pub fn proc_ucred_offset() -> Result<i64> {
    Ok(current()?.proc_ucred)
}

pub fn proc_pid_offset() -> Result<i64> {
    Ok(current()?.proc_pid)
}

pub fn ucred_uid_offset() -> Result<i64> {
    Ok(current()?.ucred_uid)
}

pub fn ucred_ruid_offset() -> Result<i64> {
    Ok(current()?.ucred_ruid)
}

pub fn ucred_svuid_offset() -> Result<i64> {
    Ok(current()?.ucred_svuid)
}

pub fn ucred_rgid_offset() -> Result<i64> {
    Ok(current()?.ucred_rgid)
}
