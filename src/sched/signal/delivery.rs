//! Entrega de Sinais
//!
//! A entrega não chama o handler: ela reescreve o frame do trap para que o
//! `iretq` entre no handler, com `[restorer][ucontext][siginfo]` montados na
//! pilha alternativa (ou abaixo da red zone da pilha corrente). O restorer
//! emite `rt_sigreturn`, que recarrega o frame salvo no `ucontext`, incluindo
//! um IP eventualmente alterado pelo handler.

use core::mem::size_of;

use super::{
    ignored_by_default, sig_bit, SigAction, SignalState, StackT, ACTIONS, SA_NODEFER, SA_ONSTACK,
    SA_RESETHAND, SA_RESTORER, SIGKILL, SIGSEGV, SIGSTOP, SIG_DFL, SIG_IGN, SS_ONSTACK,
};
use crate::arch::platform::interrupts::sigreturn_trampoline_addr;
use crate::arch::TrapFrame;
use crate::klib::align_down;

/// Red zone da ABI SysV abaixo do RSP interrompido.
const RED_ZONE: usize = 128;

/// Bits de RFLAGS que o handler pode alterar via `ucontext`.
const FIX_EFLAGS: usize = 0x40DD5;

/// `struct sigcontext` (Linux x86_64).
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct SigContext {
    pub r8: usize,
    pub r9: usize,
    pub r10: usize,
    pub r11: usize,
    pub r12: usize,
    pub r13: usize,
    pub r14: usize,
    pub r15: usize,
    pub rdi: usize,
    pub rsi: usize,
    pub rbp: usize,
    pub rbx: usize,
    pub rdx: usize,
    pub rax: usize,
    pub rcx: usize,
    pub rsp: usize,
    pub rip: usize,
    pub eflags: usize,
    pub cs: u16,
    pub gs: u16,
    pub fs: u16,
    pub ss: u16,
    pub err: usize,
    pub trapno: usize,
    pub oldmask: u64,
    pub cr2: usize,
    pub fpstate: usize,
    pub reserved: [u64; 8],
}

const _: () = assert!(size_of::<SigContext>() == 256);

impl SigContext {
    fn capture(tf: &TrapFrame, mask: u64, cr2: usize) -> Self {
        Self {
            r8: tf.r8,
            r9: tf.r9,
            r10: tf.r10,
            r11: tf.r11,
            r12: tf.r12,
            r13: tf.r13,
            r14: tf.r14,
            r15: tf.r15,
            rdi: tf.rdi,
            rsi: tf.rsi,
            rbp: tf.rbp,
            rbx: tf.rbx,
            rdx: tf.rdx,
            rax: tf.rax,
            rcx: tf.rcx,
            rsp: tf.rsp,
            rip: tf.rip,
            eflags: tf.rflags,
            cs: tf.cs as u16,
            gs: 0,
            fs: 0,
            ss: tf.ss as u16,
            err: tf.err,
            trapno: tf.trapno,
            oldmask: mask,
            cr2,
            fpstate: 0,
            reserved: [0; 8],
        }
    }

    /// Recarrega os registradores de uso geral. Seletores e IF ficam
    /// como estão no frame.
    fn restore(&self, tf: &mut TrapFrame) {
        tf.r8 = self.r8;
        tf.r9 = self.r9;
        tf.r10 = self.r10;
        tf.r11 = self.r11;
        tf.r12 = self.r12;
        tf.r13 = self.r13;
        tf.r14 = self.r14;
        tf.r15 = self.r15;
        tf.rdi = self.rdi;
        tf.rsi = self.rsi;
        tf.rbp = self.rbp;
        tf.rbx = self.rbx;
        tf.rdx = self.rdx;
        tf.rax = self.rax;
        tf.rcx = self.rcx;
        tf.rsp = self.rsp;
        tf.rip = self.rip;
        tf.rflags = (tf.rflags & !FIX_EFLAGS) | (self.eflags & FIX_EFLAGS);
    }
}

/// `ucontext_t` sem a área de FPU estendida.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct UContext {
    pub uc_flags: u64,
    pub uc_link: usize,
    pub uc_stack: StackT,
    pub uc_mcontext: SigContext,
    pub uc_sigmask: u64,
}

/// `siginfo_t` (128 bytes); só o endereço da união é usado.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct SigInfo {
    pub si_signo: i32,
    pub si_errno: i32,
    pub si_code: i32,
    _pad: i32,
    pub si_addr: usize,
    _rest: [u64; 13],
}

const _: () = assert!(size_of::<SigInfo>() == 128);

impl SigInfo {
    pub fn new(signo: usize, addr: usize) -> Self {
        Self {
            si_signo: signo as i32,
            si_errno: 0,
            si_code: 0,
            _pad: 0,
            si_addr: addr,
            _rest: [0; 13],
        }
    }
}

/// Redireciona `tf` para o handler de `sig`.
///
/// A pilha do handler fica com `rsp % 16 == 8`, como logo após um `call`.
pub fn setup_frame(tf: &mut TrapFrame, sig: usize, act: &SigAction, state: &mut SignalState, addr: usize) {
    let alt = state.altstack;
    let on_alt = act.flags & SA_ONSTACK != 0 && alt.is_enabled() && !alt.contains(tf.rsp);
    let top = if on_alt { alt.ss_sp + alt.ss_size } else { tf.rsp - RED_ZONE };

    let info = align_down(top - size_of::<SigInfo>(), 16);
    let uc = align_down(info - size_of::<UContext>(), 16);
    let sp = uc - size_of::<usize>();

    let restorer = if act.flags & SA_RESTORER != 0 && act.restorer != 0 {
        act.restorer
    } else {
        sigreturn_trampoline_addr()
    };

    let mut uc_stack = alt;
    if on_alt {
        uc_stack.ss_flags |= SS_ONSTACK;
    }
    let ucontext = UContext {
        uc_flags: 0,
        uc_link: 0,
        uc_stack,
        uc_mcontext: SigContext::capture(tf, state.mask, addr),
        uc_sigmask: state.mask,
    };

    // SAFETY: a faixa [sp, top) está na pilha de usuário da thread
    unsafe {
        (info as *mut SigInfo).write(SigInfo::new(sig, addr));
        (uc as *mut UContext).write(ucontext);
        (sp as *mut usize).write(restorer);
    }

    state.mask |= act.mask;
    if act.flags & SA_NODEFER == 0 {
        state.mask |= sig_bit(sig);
    }
    state.mask &= !(sig_bit(SIGKILL) | sig_bit(SIGSTOP));

    tf.rip = act.handler;
    tf.rsp = sp;
    tf.rdi = sig;
    tf.rsi = info;
    tf.rdx = uc;
    tf.rax = 0;
}

/// rt_sigreturn: recarrega o frame salvo por `setup_frame`.
///
/// No momento da chamada o `ret` do handler já consumiu o endereço do
/// restorer, então `tf.rsp` aponta para o `ucontext`. Retorna o RAX
/// restaurado (que vira o resultado da "syscall").
pub fn rt_sigreturn(tf: &mut TrapFrame, state: &mut SignalState) -> usize {
    // SAFETY: o ucontext foi escrito por `setup_frame` nesta pilha
    let uc = unsafe { &*(tf.rsp as *const UContext) };
    uc.uc_mcontext.restore(tf);
    state.mask = uc.uc_sigmask & !(sig_bit(SIGKILL) | sig_bit(SIGSTOP));
    tf.rax
}

/// Entrega o próximo sinal pendente da thread corrente, se houver.
///
/// Chamado no fim de `dotrap`, apenas para frames de Ring 3.
pub fn deliver_pending(tf: &mut TrapFrame) {
    if tf.is_kernel() {
        return;
    }
    let Some(Some(sig)) = crate::sched::with_current(|t| t.signal.take_deliverable()) else {
        return;
    };

    let act = ACTIONS.lock().get(sig);
    match act.handler {
        SIG_IGN => return,
        SIG_DFL if ignored_by_default(sig) => return,
        SIG_DFL => {
            crate::kerror!("(Signal) sinal fatal=", sig);
            crate::core::panic::throw_frame(tf, "(Signal) sinal sem handler");
        }
        _ => {}
    }
    if act.flags & SA_RESETHAND != 0 {
        ACTIONS.lock().reset(sig);
    }

    let addr = if sig == SIGSEGV && tf.trapno == 14 {
        crate::arch::Cpu::cr2()
    } else {
        0
    };
    crate::ktrace!("(Signal) entregando sinal=", sig);
    crate::sched::with_current(|t| setup_frame(tf, sig, &act, &mut t.signal, addr));
}

/// O sinal tem um handler instalado (não DFL/IGN) e não está bloqueado?
pub fn can_deliver(sig: usize, state: &SignalState) -> bool {
    let act = ACTIONS.lock().get(sig);
    act.handler != SIG_DFL && act.handler != SIG_IGN && state.mask & sig_bit(sig) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched::signal::SA_SIGINFO;
    use alloc::vec;

    fn user_frame(stack: &mut [u8]) -> TrapFrame {
        let mut tf = TrapFrame::for_user(0x40_1000, 0);
        tf.rsp = align_down(stack.as_mut_ptr() as usize + stack.len(), 16) - 64;
        tf.rax = 0x1111;
        tf.rbx = 0x2222;
        tf
    }

    fn handler_action(flags: u64) -> SigAction {
        SigAction {
            handler: 0x40_8000,
            flags,
            restorer: 0x40_9000,
            mask: 0,
        }
    }

    #[test]
    fn frame_enters_handler_with_linux_arguments() {
        let mut stack = vec![0u8; 8192];
        let mut tf = user_frame(&mut stack);
        let mut state = SignalState::new();
        let act = handler_action(SA_SIGINFO | SA_RESTORER);

        setup_frame(&mut tf, SIGSEGV, &act, &mut state, 0xDEAD);

        assert_eq!(tf.rip, 0x40_8000);
        assert_eq!(tf.rdi, SIGSEGV);
        assert_eq!(tf.rsp % 16, 8);
        assert_eq!(unsafe { *(tf.rsp as *const usize) }, 0x40_9000);
        assert_eq!(tf.rdx, tf.rsp + 8);
        let info = unsafe { &*(tf.rsi as *const SigInfo) };
        assert_eq!((info.si_signo, info.si_addr), (SIGSEGV as i32, 0xDEAD));
        // o próprio sinal fica bloqueado durante o handler
        assert_ne!(state.mask & sig_bit(SIGSEGV), 0);
    }

    #[test]
    fn alternate_stack_is_used_when_requested() {
        let mut stack = vec![0u8; 8192];
        let mut alt = vec![0u8; 8192];
        let mut tf = user_frame(&mut stack);
        let mut state = SignalState::new();
        state.altstack = StackT {
            ss_sp: alt.as_mut_ptr() as usize,
            ss_flags: 0,
            ss_size: alt.len(),
        };

        setup_frame(&mut tf, 23, &handler_action(SA_ONSTACK), &mut state, 0);
        assert!(state.altstack.contains(tf.rsp));
        // sem SA_RESTORER a volta passa pelo trampolim do kernel
        assert_eq!(unsafe { *(tf.rsp as *const usize) }, sigreturn_trampoline_addr());
    }

    #[test]
    fn sigreturn_restores_interrupted_frame() {
        let mut stack = vec![0u8; 8192];
        let mut tf = user_frame(&mut stack);
        let orig = tf;
        let mut state = SignalState::new();
        state.mask = 0b100;

        setup_frame(&mut tf, 10, &handler_action(SA_RESTORER), &mut state, 0);
        // handler executa `ret`
        tf.rsp += 8;
        tf.rax = 15;
        tf.rbx = 0;

        let ret = rt_sigreturn(&mut tf, &mut state);
        assert_eq!(ret, 0x1111);
        assert_eq!(tf, orig);
        assert_eq!(state.mask, 0b100);
    }

    #[test]
    fn sigreturn_honours_altered_ip() {
        let mut stack = vec![0u8; 8192];
        let mut tf = user_frame(&mut stack);
        let mut state = SignalState::new();

        setup_frame(&mut tf, SIGSEGV, &handler_action(SA_RESTORER), &mut state, 0);
        let uc = unsafe { &mut *(tf.rdx as *mut UContext) };
        uc.uc_mcontext.rip = 0x40_7777;
        tf.rsp += 8;

        rt_sigreturn(&mut tf, &mut state);
        assert_eq!(tf.rip, 0x40_7777);
    }
}
