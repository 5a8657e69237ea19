//! # Inline Syscall Table
//!
//! Tabela estática de handlers atendidos no próprio trap, indexada pelo
//! número da syscall. `None` = não implementada (ENOSYS).

use super::super::abi::SyscallArgs;
use super::super::error::SysResult;
use super::super::numbers::*;
use super::super::{event, io, memory, process, signal, time};
use crate::arch::TrapFrame;

/// Handler inline: pode reescrever o frame (clone, rt_sigreturn, pânico).
pub type InlineHandler = fn(&mut TrapFrame, &SyscallArgs) -> SysResult;

pub const TABLE_SIZE: usize = MAX_SYSCALL;

pub static INLINE_TABLE: [Option<InlineHandler>; TABLE_SIZE] = {
    let mut table: [Option<InlineHandler>; TABLE_SIZE] = [None; TABLE_SIZE];

    // === PROCESSO / THREAD ===
    table[SYS_EXIT] = Some(process::sys_exit);
    table[SYS_EXIT_GROUP] = Some(process::sys_exit_group);
    table[SYS_SCHED_YIELD] = Some(process::sys_sched_yield);
    table[SYS_CLONE] = Some(process::sys_clone);
    table[SYS_GETTID] = Some(process::sys_gettid);
    table[SYS_GETPID] = Some(process::sys_getpid);
    table[SYS_ARCH_PRCTL] = Some(process::sys_arch_prctl);
    table[SYS_SCHED_GETAFFINITY] = Some(process::sys_sched_getaffinity);
    table[SYS_FORK] = Some(process::sys_unsupported_panic);
    table[SYS_VFORK] = Some(process::sys_unsupported_panic);
    table[SYS_EXECVE] = Some(process::sys_unsupported_panic);

    // === MEMÓRIA ===
    table[SYS_MMAP] = Some(memory::sys_mmap);
    table[SYS_MUNMAP] = Some(memory::sys_munmap);
    table[SYS_BRK] = Some(memory::sys_brk);
    table[SYS_MADVISE] = Some(memory::sys_madvise);
    table[SYS_FIXED_MMAP] = Some(memory::sys_fixed_mmap);

    // === SINAIS ===
    table[SYS_RT_SIGACTION] = Some(signal::sys_rt_sigaction);
    table[SYS_RT_SIGPROCMASK] = Some(signal::sys_rt_sigprocmask);
    table[SYS_RT_SIGRETURN] = Some(signal::sys_rt_sigreturn);
    table[SYS_SIGALTSTACK] = Some(signal::sys_sigaltstack);
    table[SYS_TGKILL] = Some(signal::sys_tgkill);
    table[SYS_TKILL] = Some(signal::sys_tkill);

    // === TEMPO ===
    table[SYS_NANOSLEEP] = Some(time::sys_nanosleep);
    table[SYS_CLOCK_GETTIME] = Some(time::sys_clock_gettime);

    // === EVENTOS ===
    table[SYS_FUTEX] = Some(event::sys_futex);
    table[SYS_EPOLL_CREATE] = Some(event::sys_epoll_create);
    table[SYS_EPOLL_CREATE1] = Some(event::sys_epoll_create);
    table[SYS_EPOLL_CTL] = Some(event::sys_epoll_ctl);
    table[SYS_EPOLL_WAIT] = Some(event::sys_epoll_wait);
    table[SYS_EPOLL_PWAIT] = Some(event::sys_epoll_wait);

    // === I/O (boot) ===
    table[SYS_WRITE] = Some(io::sys_write);
    table[SYS_READ] = Some(io::sys_read);
    table[SYS_CLOSE] = Some(io::sys_close);
    table[SYS_PIPE] = Some(io::sys_pipe2);
    table[SYS_PIPE2] = Some(io::sys_pipe2);
    table[SYS_OPEN] = Some(io::sys_open);
    table[SYS_OPENAT] = Some(io::sys_open);
    table[SYS_UNAME] = Some(io::sys_zero);
    table[SYS_FCNTL] = Some(io::sys_denied);
    table[SYS_READLINKAT] = Some(io::sys_denied);
    table[SYS_GETRANDOM] = Some(io::sys_getrandom);

    // === SERVIÇOS ===
    table[SYS_WAIT_IRQ] = Some(super::sys_wait_irq);
    table[SYS_WAIT_SYSCALL] = Some(super::sys_wait_syscall);

    table
};
