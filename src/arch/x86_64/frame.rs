//! Layout do Trap Frame.
//!
//! Espelha exatamente a ordem de push dos stubs de `interrupts.rs` seguida
//! do frame empilhado pela CPU. Qualquer reordenação quebra todos os
//! trampolins em assembly, por isso os offsets são verificados em tempo de
//! compilação.

use core::mem::{offset_of, size_of};

use super::cpu::FLAGS_IF;
use super::gdt::{KERNEL_CODE_SEL, USER_CODE_SEL};

/// Snapshot dos registradores capturado na entrada de um trap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct TrapFrame {
    // Empilhados por `alltraps` (rax fica no topo da pilha)
    pub rax: usize,
    pub rbx: usize,
    pub rcx: usize,
    pub rdx: usize,
    pub rbp: usize,
    pub rsi: usize,
    pub rdi: usize,
    pub r8: usize,
    pub r9: usize,
    pub r10: usize,
    pub r11: usize,
    pub r12: usize,
    pub r13: usize,
    pub r14: usize,
    pub r15: usize,

    // Empilhados pelo stub do vetor
    pub trapno: usize,
    pub err: usize,

    // Empilhados pela CPU
    pub rip: usize,
    pub cs: usize,
    pub rflags: usize,
    pub rsp: usize,
    pub ss: usize,
}

const _: () = assert!(size_of::<TrapFrame>() == 176);
const _: () = assert!(offset_of!(TrapFrame, rax) == 0);
const _: () = assert!(offset_of!(TrapFrame, rdx) == 24);
const _: () = assert!(offset_of!(TrapFrame, rsi) == 40);
const _: () = assert!(offset_of!(TrapFrame, rdi) == 48);
const _: () = assert!(offset_of!(TrapFrame, r8) == 56);
const _: () = assert!(offset_of!(TrapFrame, r9) == 64);
const _: () = assert!(offset_of!(TrapFrame, r10) == 72);
const _: () = assert!(offset_of!(TrapFrame, r15) == 112);
const _: () = assert!(offset_of!(TrapFrame, trapno) == 120);
const _: () = assert!(offset_of!(TrapFrame, err) == 128);
const _: () = assert!(offset_of!(TrapFrame, rip) == 136);
const _: () = assert!(offset_of!(TrapFrame, cs) == 144);
const _: () = assert!(offset_of!(TrapFrame, rflags) == 152);
const _: () = assert!(offset_of!(TrapFrame, rsp) == 160);
const _: () = assert!(offset_of!(TrapFrame, ss) == 168);

impl TrapFrame {
    pub const fn zeroed() -> Self {
        Self {
            rax: 0,
            rbx: 0,
            rcx: 0,
            rdx: 0,
            rbp: 0,
            rsi: 0,
            rdi: 0,
            r8: 0,
            r9: 0,
            r10: 0,
            r11: 0,
            r12: 0,
            r13: 0,
            r14: 0,
            r15: 0,
            trapno: 0,
            err: 0,
            rip: 0,
            cs: 0,
            rflags: 0,
            rsp: 0,
            ss: 0,
        }
    }

    /// O trap ocorreu em código do kernel (Ring 0)?
    #[inline]
    pub fn is_kernel(&self) -> bool {
        self.cs & 3 == 0
    }

    /// O trap ocorreu com interrupções habilitadas?
    #[inline]
    pub fn interrupts_enabled(&self) -> bool {
        self.rflags & FLAGS_IF != 0
    }

    /// Argumentos de syscall na ordem da ABI Linux x86_64.
    #[inline]
    pub fn syscall_args(&self) -> [usize; 6] {
        [self.rdi, self.rsi, self.rdx, self.r10, self.r8, self.r9]
    }

    /// Frame inicial de uma thread de kernel: `entry(arg)` em Ring 0.
    pub fn for_kernel_thread(entry: usize, arg: usize, stack_top: usize) -> Self {
        let mut tf = Self::zeroed();
        tf.cs = KERNEL_CODE_SEL.bits();
        tf.ss = super::gdt::KERNEL_DATA_SEL.bits();
        tf.rflags = FLAGS_IF;
        tf.rsp = stack_top;
        tf.rip = super::interrupts::kthread_entry_addr();
        tf.rdi = entry;
        tf.rsi = arg;
        tf
    }

    /// Frame inicial do runtime hospedado (Ring 3, IOPL=3).
    pub fn for_user(entry: usize, stack_top: usize) -> Self {
        let mut tf = Self::zeroed();
        tf.cs = USER_CODE_SEL.bits();
        tf.ss = super::gdt::USER_DATA_SEL.bits();
        tf.rflags = FLAGS_IF | super::cpu::FLAGS_IOPL_USER;
        tf.rsp = stack_top;
        tf.rip = entry;
        tf
    }
}
