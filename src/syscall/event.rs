//! Syscalls de espera: futex e epoll.
//!
//! A lógica mora em `ipc`; aqui só se decodificam os argumentos.

use super::abi::{read_user_opt, SyscallArgs};
use super::error::{Errno, SysResult};
use crate::arch::TrapFrame;
use crate::core::time::Timespec;
use crate::ipc::epoll::{self, EpollEvent};
use crate::ipc::futex::{self, FUTEX_CMD_MASK, FUTEX_WAIT};

/// `futex(uaddr, op, val, timeout, ...)`
///
/// O quarto argumento só é um ponteiro para timeout nas operações WAIT.
pub fn sys_futex(_tf: &mut TrapFrame, a: &SyscallArgs) -> SysResult {
    let timeout: Option<Timespec> = if a.arg2 & FUTEX_CMD_MASK == FUTEX_WAIT {
        read_user_opt(a.arg4)?
    } else {
        None
    };
    futex::futex(a.arg1, a.arg2, a.arg3 as u32, timeout)
}

pub fn sys_epoll_create(_tf: &mut TrapFrame, _a: &SyscallArgs) -> SysResult {
    epoll::create()
}

/// `epoll_ctl(epfd, op, fd, event)`
pub fn sys_epoll_ctl(_tf: &mut TrapFrame, a: &SyscallArgs) -> SysResult {
    let event: Option<EpollEvent> = read_user_opt(a.arg4)?;
    epoll::ctl(a.arg1, a.arg2, a.arg3, event)
}

/// `epoll_wait(epfd, events, maxevents, timeout)` (e `epoll_pwait`, que
/// ignora a máscara).
pub fn sys_epoll_wait(_tf: &mut TrapFrame, a: &SyscallArgs) -> SysResult {
    let max = a.arg3 as i32;
    if max <= 0 {
        return Err(Errno::EINVAL);
    }
    if a.arg2 == 0 {
        return Err(Errno::EFAULT);
    }
    // SAFETY: vetor do runtime com `max` entradas (espaço de endereço único)
    let out = unsafe { core::slice::from_raw_parts_mut(a.arg2 as *mut EpollEvent, max as usize) };
    epoll::wait(a.arg1, out, a.arg4 as i32 as isize)
}
