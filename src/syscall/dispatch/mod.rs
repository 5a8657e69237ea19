//! # Syscall Dispatcher
//!
//! Handler do vetor 0x80. Cada chamada segue um de três caminhos:
//!
//! 1. **Inline**: antes do bootstrap, ou chamada da lista do kernel.
//!    Atendida pela `INLINE_TABLE` no próprio trap.
//! 2. **Trampolim**: a thread segura um recurso de escalonamento do
//!    runtime. O retorno do trap é reescrito para o trampolim de syscall
//!    bloqueante, que reemite a mesma chamada depois que o runtime soltou o
//!    recurso.
//! 3. **Encaminhada**: a requisição vai para a caixa do serviço e o
//!    chamador dorme até a conclusão.

pub mod table;

use super::abi::{SyscallArgs, SyscallRequest};
use super::classify::can_forward;
use super::error::{encode, Errno, SysResult, KERNEL_PANIC_SENTINEL};
use super::forward;
use crate::arch::platform::interrupts::blocking_syscall_trampoline_addr;
use crate::arch::TrapFrame;
use crate::core::panic::throw_frame;
use crate::sched;
use crate::trap::{change_return_pc, hooks};

pub use table::{InlineHandler, INLINE_TABLE};

/// Handler registrado no vetor 0x80.
pub fn syscall_intr(tf: &mut TrapFrame) {
    let no = tf.rax;
    let from_service = sched::current().is_some_and(sched::is_syscall_task);
    if !(crate::core::entry::bootstrap_done() && can_forward(no, tf.rdi, from_service)) {
        tf.rax = dispatch_inline(tf);
        return;
    }

    let reentered = sched::with_current(|t| core::mem::replace(&mut t.in_blocking_syscall, false)).unwrap_or(false);
    if !reentered && hooks::holds_scheduling_resource(tf) {
        let pc = hooks::get()
            .map(|h| h.blocking_syscall)
            .filter(|&pc| pc != 0)
            .unwrap_or_else(blocking_syscall_trampoline_addr);
        let diverted = sched::with_current(|t| {
            t.in_blocking_syscall = true;
            divert_to_trampoline(tf, &mut t.systf, pc);
        });
        if diverted.is_some() {
            crate::ktrace!("(Syscall) desvio para o trampolim, no=", no);
            return;
        }
    }

    let mut req = SyscallRequest::from_frame(tf);
    crate::ktrace!("(Syscall) encaminhada, no=", no);
    forward::forward_call(&mut req);
    if req.ret == KERNEL_PANIC_SENTINEL {
        crate::kerror!("(Syscall) handler pediu pânico, no=", no);
        throw_frame(tf, "(Syscall) handler encaminhado falhou");
    }
    tf.rax = req.ret;
}

/// Desvia o retorno do trap para o trampolim `pc`.
///
/// O frame da chamada fica em `saved` (o `systf` da thread) e o trampolim
/// recebe o endereço dele em RDI para reemitir a chamada a partir dali.
fn divert_to_trampoline(tf: &mut TrapFrame, saved: &mut TrapFrame, pc: usize) {
    *saved = *tf;
    tf.rdi = saved as *mut TrapFrame as usize;
    change_return_pc(tf, pc);
}

/// Atende a chamada do frame pela tabela inline. Retorna a palavra de RAX.
pub fn dispatch_inline(tf: &mut TrapFrame) -> usize {
    let args = SyscallArgs::from_frame(tf);
    let result = match INLINE_TABLE.get(args.num).copied().flatten() {
        Some(handler) => handler(tf, &args),
        None => {
            crate::kwarn!("(Syscall) não implementada, no=", args.num);
            Err(Errno::ENOSYS)
        }
    };
    crate::ktrace!("(Syscall) inline, no=", args.num);
    encode(result)
}

/// SYS_WAIT_IRQ (apenas o serviço de traps).
fn sys_wait_irq(_tf: &mut TrapFrame, _a: &SyscallArgs) -> SysResult {
    Ok(crate::trap::wait_irq() as usize)
}

/// SYS_WAIT_SYSCALL (apenas o serviço de syscalls).
fn sys_wait_syscall(_tf: &mut TrapFrame, _a: &SyscallArgs) -> SysResult {
    Ok(forward::fetch_pending_call() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syscall::numbers::*;

    fn frame(no: usize, a1: usize, a2: usize, a3: usize) -> TrapFrame {
        let mut tf = TrapFrame::zeroed();
        tf.rax = no;
        tf.rdi = a1;
        tf.rsi = a2;
        tf.rdx = a3;
        tf
    }

    #[test]
    fn unknown_number_is_enosys() {
        let mut tf = frame(333, 0, 0, 0);
        assert_eq!(dispatch_inline(&mut tf) as isize, -38);
        let mut tf = frame(10_000, 0, 0, 0);
        assert_eq!(dispatch_inline(&mut tf) as isize, -38);
    }

    #[test]
    fn syscall_before_bootstrap_runs_inline() {
        let msg = b"boot\n";
        let mut tf = frame(SYS_WRITE, 1, msg.as_ptr() as usize, msg.len());
        syscall_intr(&mut tf);
        assert_eq!(tf.rax, msg.len());

        let mut tf = frame(SYS_OPENAT, 0, 0, 0);
        syscall_intr(&mut tf);
        assert_eq!(tf.rax as isize, -(Errno::ENOENT as isize));
    }

    #[test]
    fn clock_gettime_writes_timespec() {
        let mut ts = crate::core::time::Timespec::default();
        let mut tf = frame(SYS_CLOCK_GETTIME, 1, &mut ts as *mut _ as usize, 0);
        syscall_intr(&mut tf);
        assert_eq!(tf.rax, 0);
        assert!(ts.tv_nsec >= 0 && ts.tv_nsec < 1_000_000_000);
    }

    #[test]
    fn trampoline_receives_the_saved_call() {
        let mut stack = [0usize; 4];
        let top = stack.as_mut_ptr_range().end as usize;
        let mut tf = frame(SYS_READ, 7, 0x5000, 64);
        tf.rip = 0x40_1234;
        tf.rsp = top;
        let mut saved = TrapFrame::zeroed();

        divert_to_trampoline(&mut tf, &mut saved, 0x10_1200);

        assert_eq!(saved.rax, SYS_READ);
        assert_eq!((saved.rdi, saved.rsi, saved.rdx), (7, 0x5000, 64));
        assert_eq!(tf.rdi, &saved as *const TrapFrame as usize);
        assert_eq!(tf.rip, 0x10_1200);
        assert_eq!(tf.rsp, top - core::mem::size_of::<usize>());
        // o trampolim retorna para onde a chamada original voltaria
        assert_eq!(stack[3], 0x40_1234);
    }

    #[test]
    fn fixed_answers() {
        let mut tf = frame(SYS_SCHED_GETAFFINITY, 0, 0, 0);
        syscall_intr(&mut tf);
        assert_eq!(tf.rax as isize, -1);
        let mut tf = frame(SYS_MADVISE, 0, 0, 0);
        syscall_intr(&mut tf);
        assert_eq!(tf.rax, 0);
    }
}
