//! Context switch
//!
//! `switch(old, new)` salva o contexto corrente em `old` e retoma `new`.
//! Uma thread nova começa com `rsp` apontando para o seu `TrapFrame` e
//! `rip = __trapret`, então a primeira "volta" dela é um `iretq`.

use core::mem::offset_of;

/// Contexto de CPU (registradores salvos)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct CpuContext {
    // Callee-saved registers (SysV ABI)
    pub rbx: usize,
    pub rbp: usize,
    pub r12: usize,
    pub r13: usize,
    pub r14: usize,
    pub r15: usize,

    // Stack pointer
    pub rsp: usize,

    // Instruction pointer (return address)
    pub rip: usize,
}

const _: () = assert!(offset_of!(CpuContext, rsp) == 0x30);
const _: () = assert!(offset_of!(CpuContext, rip) == 0x38);

impl CpuContext {
    pub const fn new() -> Self {
        Self {
            rbx: 0,
            rbp: 0,
            r12: 0,
            r13: 0,
            r14: 0,
            r15: 0,
            rsp: 0,
            rip: 0,
        }
    }

    /// Contexto que entra pelo `__trapret` com o frame em `tf`.
    pub fn for_trapret(tf: usize) -> Self {
        let mut ctx = Self::new();
        ctx.rsp = tf;
        ctx.rip = crate::arch::platform::interrupts::trapret_addr();
        ctx
    }
}

/// Realiza context switch
///
/// # Safety
///
/// - Interrupções devem estar desabilitadas
/// - `old` e `new` devem apontar para contextos vivos durante a troca
pub unsafe fn switch(old: *mut CpuContext, new: *const CpuContext) {
    context_switch_asm(old, new);
}

// RDI = old, RSI = new
// 0:rbx, 8:rbp, 16:r12, 24:r13, 32:r14, 40:r15, 48:rsp, 56:rip
core::arch::global_asm!(
    r#"
.global context_switch_asm
context_switch_asm:
    mov [rdi + 0x00], rbx
    mov [rdi + 0x08], rbp
    mov [rdi + 0x10], r12
    mov [rdi + 0x18], r13
    mov [rdi + 0x20], r14
    mov [rdi + 0x28], r15

    // Endereço de retorno e pilha como ficariam depois do `ret`
    mov rax, [rsp]
    mov [rdi + 0x38], rax
    lea rax, [rsp + 8]
    mov [rdi + 0x30], rax

    mov rbx, [rsi + 0x00]
    mov rbp, [rsi + 0x08]
    mov r12, [rsi + 0x10]
    mov r13, [rsi + 0x18]
    mov r14, [rsi + 0x20]
    mov r15, [rsi + 0x28]
    mov rsp, [rsi + 0x30]
    jmp qword ptr [rsi + 0x38]
"#
);

extern "C" {
    fn context_switch_asm(old: *mut CpuContext, new: *const CpuContext);
}
