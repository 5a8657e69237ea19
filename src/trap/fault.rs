//! Falhas (exceções) e reescrita do endereço de retorno.
//!
//! Falha em Ring 0 é fatal. Falha no runtime hospedado vira um pânico do
//! próprio runtime: o frame passa a "chamar" a entrada de pânico dele, como
//! se a instrução que falhou tivesse feito um `call`.

use crate::arch::TrapFrame;
use crate::core::panic::{dump_frame, throw_frame};
use crate::sched;
use crate::sched::signal::{delivery::can_deliver, SIGSEGV};

use super::hooks;

pub const VEC_DIVIDE_ERROR: usize = 0;
pub const VEC_BREAKPOINT: usize = 3;
pub const VEC_INVALID_OPCODE: usize = 6;
pub const VEC_GENERAL_PROTECTION: usize = 13;
pub const VEC_PAGE_FAULT: usize = 14;

/// Empilha `tf.rip` na pilha interrompida e retoma em `pc`.
pub fn change_return_pc(tf: &mut TrapFrame, pc: usize) {
    let sp = tf.rsp - core::mem::size_of::<usize>();
    // SAFETY: a pilha interrompida é da própria thread e cresce para baixo
    unsafe { (sp as *mut usize).write(tf.rip) };
    tf.rsp = sp;
    tf.rip = pc;
}

/// Sinal equivalente a uma exceção.
pub fn signal_for(trapno: usize) -> usize {
    match trapno {
        VEC_DIVIDE_ERROR => 8,   // SIGFPE
        VEC_BREAKPOINT => 5,     // SIGTRAP
        VEC_INVALID_OPCODE => 4, // SIGILL
        _ => SIGSEGV,
    }
}

/// Dump e hang para falhas em código do kernel.
pub(crate) fn kernel_fault(tf: &TrapFrame) -> ! {
    crate::kerror!("(Trap) falha em Ring 0");
    // a falha pode ter ocorrido com THREADS travada
    let tid = sched::try_with_current(|t| t.id.index()).unwrap_or(usize::MAX);
    dump_frame(tid, tf);
    throw_frame(tf, "trap fault in kernel")
}

/// Desvia uma falha do runtime para `pc` (gancho) ou para o handler de
/// sinal; sem nenhum dos dois a falha é fatal.
fn redirect(tf: &mut TrapFrame, pc: Option<usize>, msg: &str) {
    if let Some(pc) = pc.filter(|&pc| pc != 0) {
        change_return_pc(tf, pc);
        return;
    }
    let sig = signal_for(tf.trapno);
    let raised = sched::with_current(|t| can_deliver(sig, &t.signal) && t.signal.raise(sig).is_ok());
    if raised == Some(true) {
        // entregue no fim do `dotrap`
        return;
    }
    throw_frame(tf, msg)
}

/// Vetor sem handler registrado.
pub fn fault_handler(tf: &mut TrapFrame) {
    if tf.is_kernel() {
        kernel_fault(tf);
    }
    crate::kwarn!("(Trap) exceção no runtime, vetor=", tf.trapno);
    redirect(tf, hooks::get().map(|h| h.trap_panic), "(Trap) exceção sem tratador");
}

/// Handler do vetor 14.
pub fn page_fault_handler(tf: &mut TrapFrame) {
    if tf.is_kernel() {
        kernel_fault(tf);
    }
    redirect(
        tf,
        hooks::get().map(|h| h.page_fault_panic),
        "nil pointer or invalid memory access",
    );
}

/// Pânico sintético pedido pelo kernel (ex.: syscall proibida).
pub fn prepare_panic(tf: &mut TrapFrame) {
    redirect(tf, hooks::get().map(|h| h.trap_panic), "(Trap) pânico sintético sem gancho");
}

/// Vetores espúrios (39, 47).
pub fn ignore_handler(_tf: &mut TrapFrame) {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn return_pc_is_pushed_on_interrupted_stack() {
        let mut stack = vec![0usize; 16];
        let top = stack.as_mut_ptr() as usize + 16 * 8;
        let mut tf = TrapFrame::for_user(0x40_1234, top);

        change_return_pc(&mut tf, 0x40_9000);

        assert_eq!(tf.rip, 0x40_9000);
        assert_eq!(tf.rsp, top - 8);
        assert_eq!(stack[15], 0x40_1234);
    }

    #[test]
    fn exceptions_map_to_linux_signals() {
        assert_eq!(signal_for(VEC_PAGE_FAULT), SIGSEGV);
        assert_eq!(signal_for(VEC_GENERAL_PROTECTION), SIGSEGV);
        assert_eq!(signal_for(VEC_INVALID_OPCODE), 4);
    }

    #[test]
    #[should_panic(expected = "trap fault in kernel")]
    fn kernel_page_fault_is_fatal() {
        let mut tf = TrapFrame::zeroed();
        tf.trapno = VEC_PAGE_FAULT;
        page_fault_handler(&mut tf);
    }
}
