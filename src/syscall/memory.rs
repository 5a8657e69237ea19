//! Syscalls de memória: mmap, munmap, brk, madvise e o mapeamento fixo.
//!
//! O runtime reserva grandes faixas com `PROT_NONE` e depois as ativa por
//! partes, então reservar só anda o `sbrk` e mapear aloca páginas zeradas.

use bitflags::bitflags;

use super::abi::SyscallArgs;
use super::error::{Errno, SysResult};
use crate::arch::TrapFrame;
use crate::mm::{
    self,
    config::{checked_page_round_up, USER_VA_END},
};

bitflags! {
    /// `prot` do mmap.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MmapProt: usize {
        const READ = 0x1;
        const WRITE = 0x2;
        const EXEC = 0x4;
    }
}

bitflags! {
    /// `flags` do mmap (apenas os bits que o kernel olha).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MmapFlags: usize {
        const SHARED = 0x01;
        const PRIVATE = 0x02;
        const FIXED = 0x10;
        const ANONYMOUS = 0x20;
    }
}

/// Confere `[addr, addr + len)` e devolve `len` arredondado para página.
///
/// Faixas que estouram ou passam de `USER_VA_END` dão `too_big`.
fn user_range(addr: usize, len: usize, too_big: Errno) -> SysResult<usize> {
    if len == 0 {
        return Err(Errno::EINVAL);
    }
    let len = checked_page_round_up(len).ok_or(too_big)?;
    match addr.checked_add(len) {
        Some(end) if end <= USER_VA_END => Ok(len),
        _ => Err(too_big),
    }
}

/// Núcleo do mmap, sem o frame.
pub fn mmap(addr: usize, len: usize, prot: MmapProt, flags: MmapFlags) -> SysResult {
    if len == 0 {
        return Err(Errno::EINVAL);
    }
    // não há arquivos mapeáveis
    if !flags.contains(MmapFlags::ANONYMOUS) {
        return Err(Errno::EACCES);
    }
    let len = user_range(addr, len, Errno::ENOMEM)?;
    if prot.is_empty() {
        return Ok(if addr == 0 { mm::sbrk(len) } else { addr });
    }
    Ok(mm::mmap(addr, len))
}

pub fn sys_mmap(_tf: &mut TrapFrame, a: &SyscallArgs) -> SysResult {
    mmap(
        a.arg1,
        a.arg2,
        MmapProt::from_bits_truncate(a.arg3),
        MmapFlags::from_bits_truncate(a.arg4),
    )
}

/// Núcleo do munmap. Devolve quantas páginas foram liberadas.
pub fn munmap(addr: usize, len: usize) -> SysResult {
    let len = user_range(addr, len, Errno::EINVAL)?;
    Ok(mm::munmap(addr, len))
}

pub fn sys_munmap(_tf: &mut TrapFrame, a: &SyscallArgs) -> SysResult {
    munmap(a.arg1, a.arg2).map(|_| 0)
}

/// Sem heap de processo: devolve o topo atual do `sbrk`.
pub fn sys_brk(_tf: &mut TrapFrame, _a: &SyscallArgs) -> SysResult {
    Ok(mm::sbrk(0))
}

pub fn sys_madvise(_tf: &mut TrapFrame, _a: &SyscallArgs) -> SysResult {
    Ok(0)
}

/// SYS_FIXED_MMAP: `[addr, addr + len)` em identidade (registradores de
/// dispositivo, framebuffer).
pub fn sys_fixed_mmap(_tf: &mut TrapFrame, a: &SyscallArgs) -> SysResult {
    let (addr, len) = (a.arg1, a.arg2);
    let len = user_range(addr, len, Errno::EINVAL)?;
    mm::fixmap(addr, addr, len);
    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::PAGE_SIZE;

    const ANON: MmapFlags = MmapFlags::PRIVATE.union(MmapFlags::ANONYMOUS);

    #[test]
    fn prot_none_only_reserves() {
        let hint = 0x4000_0000;
        assert_eq!(mmap(hint, 10, MmapProt::empty(), ANON), Ok(hint));
        let va = mmap(0, PAGE_SIZE + 1, MmapProt::empty(), ANON).unwrap();
        assert_ne!(va, 0);
    }

    #[test]
    fn mapping_returns_zeroed_memory() {
        let va = mmap(0, 100, MmapProt::READ | MmapProt::WRITE, ANON).unwrap();
        assert_eq!(va % PAGE_SIZE, 0);
        let page = unsafe { core::slice::from_raw_parts(va as *const u8, PAGE_SIZE) };
        assert!(page.iter().all(|&b| b == 0));
    }

    #[test]
    fn bad_requests() {
        assert_eq!(mmap(0, 0, MmapProt::READ, ANON), Err(Errno::EINVAL));
        assert_eq!(mmap(0, 10, MmapProt::READ, MmapFlags::PRIVATE), Err(Errno::EACCES));
    }

    #[test]
    fn huge_lengths_fail_without_wrapping() {
        let rw = MmapProt::READ | MmapProt::WRITE;
        assert_eq!(mmap(0, usize::MAX - 10, rw, ANON), Err(Errno::ENOMEM));
        assert_eq!(mmap(0, usize::MAX - 10, MmapProt::empty(), ANON), Err(Errno::ENOMEM));
        // cabe em usize, mas a faixa passa do fim do espaço do runtime
        assert_eq!(mmap(USER_VA_END - PAGE_SIZE, 2 * PAGE_SIZE, rw, ANON), Err(Errno::ENOMEM));

        assert_eq!(munmap(0x4000_0000, usize::MAX - 10), Err(Errno::EINVAL));
        assert_eq!(munmap(usize::MAX - PAGE_SIZE, 2 * PAGE_SIZE), Err(Errno::EINVAL));
        assert_eq!(munmap(0x4000_0000, 0), Err(Errno::EINVAL));
        assert_eq!(munmap(0x4000_0000, PAGE_SIZE + 1), Ok(2));
    }
}
