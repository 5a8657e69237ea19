//! Quais syscalls rodam no próprio trap e quais vão para o serviço.
//!
//! A lista do kernel contém apenas chamadas que terminam sem bloquear por
//! tempo indeterminado (ou que dormem nas primitivas do próprio kernel).

use super::numbers::*;

/// Chamadas sempre atendidas no contexto do trap.
pub const KERNEL_CALLS: &[usize] = &[
    SYS_EXIT,
    SYS_ARCH_PRCTL,
    SYS_SCHED_YIELD,
    SYS_NANOSLEEP,
    SYS_BRK,
    SYS_MUNMAP,
    SYS_MMAP,
    SYS_MADVISE,
    SYS_CLONE,
    SYS_GETTID,
    SYS_FUTEX,
    SYS_RT_SIGACTION,
    SYS_RT_SIGPROCMASK,
    SYS_RT_SIGRETURN,
    SYS_SIGALTSTACK,
    SYS_CLOCK_GETTIME,
    SYS_EXIT_GROUP,
    SYS_EPOLL_CREATE1,
    SYS_EPOLL_CTL,
    SYS_EPOLL_WAIT,
    SYS_TGKILL,
    SYS_WAIT_IRQ,
    SYS_WAIT_SYSCALL,
    SYS_FIXED_MMAP,
];

const STDERR: usize = 2;

/// A chamada `no` (primeiro argumento `arg0`) deve ser encaminhada?
///
/// Nunca encaminha: chamadas da lista do kernel, chamadas do próprio
/// serviço de syscalls, e `write` em stderr (saída de pânico do runtime).
pub fn can_forward(no: usize, arg0: usize, from_syscall_task: bool) -> bool {
    if from_syscall_task {
        return false;
    }
    if no == SYS_WRITE && arg0 == STDERR {
        return false;
    }
    !KERNEL_CALLS.contains(&no)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_calls_stay_inline() {
        for &no in KERNEL_CALLS {
            assert!(!can_forward(no, 0, false), "{} encaminhada", name(no));
        }
    }

    #[test]
    fn io_is_forwarded() {
        assert!(can_forward(SYS_READ, 0, false));
        assert!(can_forward(SYS_WRITE, 1, false));
        assert!(can_forward(SYS_OPENAT, 0, false));
        assert!(can_forward(SYS_GETRANDOM, 0, false));
    }

    #[test]
    fn stderr_and_service_are_never_forwarded() {
        assert!(!can_forward(SYS_WRITE, 2, false));
        assert!(!can_forward(SYS_READ, 0, true));
        assert!(!can_forward(SYS_OPENAT, 0, true));
    }
}
