//! # Syscall Numbers
//!
//! O runtime hospedado emite syscalls Linux x86_64 cruas, então a numeração
//! é exatamente a do Linux. Apenas a fatia usada pelo runtime tem nome aqui.
//!
//! | Faixa   | Origem |
//! |---------|--------|
//! | 0-334   | Linux x86_64 |
//! | 500-502 | Primitivas internas dos serviços do kernel |

// ============================================================================
// I/O
// ============================================================================

pub const SYS_READ: usize = 0;
pub const SYS_WRITE: usize = 1;
pub const SYS_OPEN: usize = 2;
pub const SYS_CLOSE: usize = 3;
pub const SYS_FCNTL: usize = 72;
pub const SYS_OPENAT: usize = 257;
pub const SYS_READLINKAT: usize = 267;
pub const SYS_PIPE: usize = 22;
pub const SYS_PIPE2: usize = 293;

// ============================================================================
// MEMÓRIA
// ============================================================================

pub const SYS_MMAP: usize = 9;
pub const SYS_MUNMAP: usize = 11;
pub const SYS_BRK: usize = 12;
pub const SYS_MADVISE: usize = 28;

// ============================================================================
// SINAIS
// ============================================================================

pub const SYS_RT_SIGACTION: usize = 13;
pub const SYS_RT_SIGPROCMASK: usize = 14;
pub const SYS_RT_SIGRETURN: usize = 15;
pub const SYS_SIGALTSTACK: usize = 131;
pub const SYS_TKILL: usize = 200;
pub const SYS_TGKILL: usize = 234;

// ============================================================================
// PROCESSO / THREAD
// ============================================================================

pub const SYS_SCHED_YIELD: usize = 24;
pub const SYS_GETPID: usize = 39;
pub const SYS_CLONE: usize = 56;
pub const SYS_FORK: usize = 57;
pub const SYS_VFORK: usize = 58;
pub const SYS_EXECVE: usize = 59;
pub const SYS_EXIT: usize = 60;
pub const SYS_UNAME: usize = 63;
pub const SYS_ARCH_PRCTL: usize = 158;
pub const SYS_GETTID: usize = 186;
pub const SYS_FUTEX: usize = 202;
pub const SYS_SCHED_GETAFFINITY: usize = 204;
pub const SYS_EXIT_GROUP: usize = 231;

// ============================================================================
// TEMPO
// ============================================================================

pub const SYS_NANOSLEEP: usize = 35;
pub const SYS_CLOCK_GETTIME: usize = 228;

// ============================================================================
// EVENTOS
// ============================================================================

pub const SYS_EPOLL_CREATE: usize = 213;
pub const SYS_EPOLL_WAIT: usize = 232;
pub const SYS_EPOLL_CTL: usize = 233;
pub const SYS_EPOLL_PWAIT: usize = 281;
pub const SYS_EPOLL_CREATE1: usize = 291;
pub const SYS_GETRANDOM: usize = 318;

// ============================================================================
// INTERNAS (serviços do kernel)
// ============================================================================

/// Serviço de traps: espera IRQs pendentes.
pub const SYS_WAIT_IRQ: usize = 500;
/// Serviço de syscalls: espera uma chamada encaminhada.
pub const SYS_WAIT_SYSCALL: usize = 501;
/// Mapeamento em identidade de uma faixa de dispositivo.
pub const SYS_FIXED_MMAP: usize = 502;

/// Tamanho das tabelas indexadas por número.
pub const MAX_SYSCALL: usize = 512;

/// Nome para logs (apenas os números conhecidos).
pub fn name(no: usize) -> &'static str {
    match no {
        SYS_READ => "read",
        SYS_WRITE => "write",
        SYS_OPEN => "open",
        SYS_CLOSE => "close",
        SYS_MMAP => "mmap",
        SYS_MUNMAP => "munmap",
        SYS_BRK => "brk",
        SYS_RT_SIGACTION => "rt_sigaction",
        SYS_RT_SIGPROCMASK => "rt_sigprocmask",
        SYS_RT_SIGRETURN => "rt_sigreturn",
        SYS_PIPE => "pipe",
        SYS_SCHED_YIELD => "sched_yield",
        SYS_MADVISE => "madvise",
        SYS_NANOSLEEP => "nanosleep",
        SYS_GETPID => "getpid",
        SYS_CLONE => "clone",
        SYS_FORK => "fork",
        SYS_VFORK => "vfork",
        SYS_EXECVE => "execve",
        SYS_EXIT => "exit",
        SYS_UNAME => "uname",
        SYS_FCNTL => "fcntl",
        SYS_SIGALTSTACK => "sigaltstack",
        SYS_ARCH_PRCTL => "arch_prctl",
        SYS_GETTID => "gettid",
        SYS_TKILL => "tkill",
        SYS_FUTEX => "futex",
        SYS_SCHED_GETAFFINITY => "sched_getaffinity",
        SYS_EPOLL_CREATE => "epoll_create",
        SYS_CLOCK_GETTIME => "clock_gettime",
        SYS_EXIT_GROUP => "exit_group",
        SYS_EPOLL_WAIT => "epoll_wait",
        SYS_EPOLL_CTL => "epoll_ctl",
        SYS_TGKILL => "tgkill",
        SYS_OPENAT => "openat",
        SYS_READLINKAT => "readlinkat",
        SYS_EPOLL_PWAIT => "epoll_pwait",
        SYS_EPOLL_CREATE1 => "epoll_create1",
        SYS_PIPE2 => "pipe2",
        SYS_GETRANDOM => "getrandom",
        SYS_WAIT_IRQ => "wait_irq",
        SYS_WAIT_SYSCALL => "wait_syscall",
        SYS_FIXED_MMAP => "fixed_mmap",
        _ => "?",
    }
}
