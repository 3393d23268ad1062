use crate::addr::KernelAddr;
use crate::error::{Error, Result};

/// The raw kernel read/write capability won by the exploit chain. This layer
/// only consumes it; how it exists is not this crate's business. It is
/// treated as untrusted: a reported success means no more than "the kernel
/// did not refuse the transfer".
pub trait RawKernelRw {
    fn read(&self, src: KernelAddr, dst: &mut [u8]) -> nix::Result<()>;
    fn write(&self, dst: KernelAddr, src: &[u8]) -> nix::Result<()>;
}

impl<T: RawKernelRw + ?Sized> RawKernelRw for &T {
    fn read(&self, src: KernelAddr, dst: &mut [u8]) -> nix::Result<()> {
        (**self).read(src, dst)
    }

    fn write(&self, dst: KernelAddr, src: &[u8]) -> nix::Result<()> {
        (**self).write(dst, src)
    }
}

/// Copy-in/copy-out primitives over a raw capability. Stateless: each call
/// is a single transfer, with no buffering, caching, or retry. Whether the
/// kernel address actually points where the caller thinks it does is the
/// caller's problem; a wrong address corrupts live kernel state.
pub struct KernelMemory<R> {
    raw: R,
}

impl<R: RawKernelRw> KernelMemory<R> {
    pub fn new(raw: R) -> KernelMemory<R> {
        KernelMemory { raw }
    }

    /// Copies `src` into kernel memory at `dst`. Mutates live kernel state.
    pub fn copy_in(&self, src: &[u8], dst: KernelAddr) -> Result<()> {
        if src.is_empty() {
            return Ok(());
        }
        Self::check_range(dst, src.len())?;

        log::trace!("copyin  {:#x} <- {} bytes", dst, src.len());
        self.raw.write(dst, src).map_err(Error::KernelAccess)
    }

    /// Copies kernel memory at `src` into `dst`.
    pub fn copy_out(&self, src: KernelAddr, dst: &mut [u8]) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }
        Self::check_range(src, dst.len())?;

        log::trace!("copyout {:#x} -> {} bytes", src, dst.len());
        self.raw.read(src, dst).map_err(Error::KernelAccess)
    }

    /// Pointer-and-length variant of [`copy_in`](Self::copy_in).
    ///
    /// # Safety
    /// `src` must be valid for reads of `len` bytes for the duration of the
    /// call, or null (rejected as `InvalidArgument` before any transfer).
    pub unsafe fn copy_in_raw(&self, src: *const u8, dst: KernelAddr, len: usize) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        if src.is_null() {
            return Err(Error::InvalidArgument("null source buffer"));
        }
        self.copy_in(std::slice::from_raw_parts(src, len), dst)
    }

    /// Pointer-and-length variant of [`copy_out`](Self::copy_out).
    ///
    /// # Safety
    /// `dst` must be valid for writes of `len` bytes for the duration of the
    /// call, or null (rejected as `InvalidArgument` before any transfer).
    pub unsafe fn copy_out_raw(&self, src: KernelAddr, dst: *mut u8, len: usize) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        if dst.is_null() {
            return Err(Error::InvalidArgument("null destination buffer"));
        }
        self.copy_out(src, std::slice::from_raw_parts_mut(dst, len))
    }

    fn check_range(addr: KernelAddr, len: usize) -> Result<()> {
        if addr.is_null() {
            return Err(Error::InvalidArgument("null kernel address"));
        }
        if addr.checked_end(len).is_none() {
            return Err(Error::InvalidArgument("kernel range wraps address space"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use nix::errno::Errno;

    use super::*;

    /// A flat byte region posing as kernel memory, mapped at `base`.
    struct FakeKernel {
        base: u64,
        mem: Mutex<Vec<u8>>,
        transfers: AtomicUsize,
    }

    impl FakeKernel {
        fn new(base: u64, size: usize) -> FakeKernel {
            FakeKernel {
                base,
                mem: Mutex::new(vec![0; size]),
                transfers: AtomicUsize::new(0),
            }
        }

        fn range(&self, addr: KernelAddr, len: usize) -> nix::Result<std::ops::Range<usize>> {
            let start = addr
                .raw()
                .checked_sub(self.base)
                .ok_or(Errno::EFAULT)? as usize;
            let end = start.checked_add(len).ok_or(Errno::EFAULT)?;
            if end > self.mem.lock().unwrap().len() {
                return Err(Errno::EFAULT);
            }
            Ok(start..end)
        }
    }

    impl RawKernelRw for FakeKernel {
        fn read(&self, src: KernelAddr, dst: &mut [u8]) -> nix::Result<()> {
            self.transfers.fetch_add(1, Ordering::SeqCst);
            let range = self.range(src, dst.len())?;
            dst.copy_from_slice(&self.mem.lock().unwrap()[range]);
            Ok(())
        }

        fn write(&self, dst: KernelAddr, src: &[u8]) -> nix::Result<()> {
            self.transfers.fetch_add(1, Ordering::SeqCst);
            let range = self.range(dst, src.len())?;
            self.mem.lock().unwrap()[range].copy_from_slice(src);
            Ok(())
        }
    }

    const BASE: u64 = 0xffff_ffff_8340_0000;

    #[test]
    fn write_then_read_round_trip() {
        let kmem = KernelMemory::new(FakeKernel::new(BASE, 0x100));
        let addr = KernelAddr::new(BASE + 0x20);

        kmem.copy_in(&[0xde, 0xad, 0xbe, 0xef], addr).unwrap();
        let mut readback = [0u8; 4];
        kmem.copy_out(addr, &mut readback).unwrap();
        assert_eq!(readback, [0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn zero_length_is_a_noop() {
        let fake = FakeKernel::new(BASE, 0x100);
        let kmem = KernelMemory::new(&fake);

        kmem.copy_in(&[], KernelAddr::new(BASE)).unwrap();
        kmem.copy_out(KernelAddr::new(BASE), &mut []).unwrap();
        // Even a garbage address is fine at length zero; nothing is issued.
        kmem.copy_in(&[], KernelAddr::NULL).unwrap();
        unsafe {
            kmem.copy_in_raw(std::ptr::null(), KernelAddr::new(BASE), 0)
                .unwrap();
        }

        assert_eq!(fake.transfers.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn null_buffers_are_rejected_before_transfer() {
        let fake = FakeKernel::new(BASE, 0x100);
        let kmem = KernelMemory::new(&fake);

        let err = unsafe {
            kmem.copy_in_raw(std::ptr::null(), KernelAddr::new(BASE), 4)
                .unwrap_err()
        };
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = unsafe {
            kmem.copy_out_raw(KernelAddr::new(BASE), std::ptr::null_mut(), 4)
                .unwrap_err()
        };
        assert!(matches!(err, Error::InvalidArgument(_)));

        assert_eq!(fake.transfers.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn bogus_kernel_addresses_are_rejected_locally() {
        let fake = FakeKernel::new(BASE, 0x100);
        let kmem = KernelMemory::new(&fake);
        let mut buf = [0u8; 8];

        let err = kmem.copy_out(KernelAddr::NULL, &mut buf).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = kmem
            .copy_out(KernelAddr::new(u64::MAX - 2), &mut buf)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        assert_eq!(fake.transfers.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn raw_failure_surfaces_as_kernel_access() {
        let kmem = KernelMemory::new(FakeKernel::new(BASE, 0x10));
        let mut buf = [0u8; 8];

        // In range of the address space, outside the backing region.
        let err = kmem
            .copy_out(KernelAddr::new(BASE + 0x1000), &mut buf)
            .unwrap_err();
        assert_eq!(err, Error::KernelAccess(Errno::EFAULT));
    }
}
