//! Stubs de Interrupção em Assembly.
//!
//! Um stub por vetor, cada um alinhado a `STUB_ALIGN` bytes: o endereço do
//! stub `n` é `vector_base() + n * STUB_ALIGN`, sem tabela de ponteiros.
//! Todos convergem para `__alltraps`, que completa o `TrapFrame` e chama
//! `trap::dispatch::dotrap`. O retorno passa por `__trapret`, que também é o
//! ponto de partida de toda thread nova.
//!
//! Também vivem aqui os trampolins que o kernel usa para reescrever o
//! endereço de retorno de um frame (syscall bloqueante, `rt_sigreturn`) e a
//! entrada comum das threads de kernel.

/// Distância entre dois stubs consecutivos.
pub const STUB_ALIGN: usize = 16;

#[cfg(not(test))]
core::arch::global_asm!(
    r#"
    .pushsection .text.eggos_traps, "ax"
    .balign 16
    .global __trap_vectors
__trap_vectors:
    .set trapvec, 0
    .rept 256
    .balign 16
    .if (trapvec == 8) || ((trapvec >= 10) && (trapvec <= 14)) || (trapvec == 17) || (trapvec == 21) || (trapvec == 29) || (trapvec == 30)
    .else
    pushq $0
    .endif
    pushq $trapvec
    jmp __alltraps
    .set trapvec, trapvec + 1
    .endr

__alltraps:
    pushq %r15
    pushq %r14
    pushq %r13
    pushq %r12
    pushq %r11
    pushq %r10
    pushq %r9
    pushq %r8
    pushq %rdi
    pushq %rsi
    pushq %rbp
    pushq %rdx
    pushq %rcx
    pushq %rbx
    pushq %rax
    cld
    movq %rsp, %rdi
    call {dotrap}

    .global __trapret
__trapret:
    popq %rax
    popq %rbx
    popq %rcx
    popq %rdx
    popq %rbp
    popq %rsi
    popq %rdi
    popq %r8
    popq %r9
    popq %r10
    popq %r11
    popq %r12
    popq %r13
    popq %r14
    popq %r15
    addq $16, %rsp
    iretq

    .global __kthread_entry
__kthread_entry:
    movq %rdi, %rax
    movq %rsi, %rdi
    call *%rax
    call {kexit}
    ud2

    .global __blocking_syscall_trampoline
__blocking_syscall_trampoline:
    /* rdi = systf da thread: reemite a chamada salva */
    movq 0(%rdi), %rax
    movq 40(%rdi), %rsi
    movq 24(%rdi), %rdx
    movq 72(%rdi), %r10
    movq 56(%rdi), %r8
    movq 64(%rdi), %r9
    movq 48(%rdi), %rdi
    int $0x80
    ret

    .global __sigreturn_trampoline
__sigreturn_trampoline:
    movq $15, %rax
    int $0x80
    ud2
    .popsection
"#,
    dotrap = sym crate::trap::dispatch::dotrap,
    kexit = sym crate::sched::lifecycle::kthread_exit,
    options(att_syntax)
);

#[cfg(not(test))]
extern "C" {
    fn __trap_vectors();
    fn __trapret();
    fn __kthread_entry();
    fn __blocking_syscall_trampoline();
    fn __sigreturn_trampoline();
}

/// Base da tabela de stubs.
#[cfg(not(test))]
pub fn vector_base() -> usize {
    __trap_vectors as usize
}

/// Retorno comum de trap (restaura o `TrapFrame` e executa `iretq`).
#[cfg(not(test))]
pub fn trapret_addr() -> usize {
    __trapret as usize
}

/// Entrada das threads de kernel: chama `rdi(rsi)` e encerra a thread.
#[cfg(not(test))]
pub fn kthread_entry_addr() -> usize {
    __kthread_entry as usize
}

/// Trampolim padrão de syscall bloqueante: recarrega a chamada do frame
/// apontado por RDI, reemite e retorna para o endereço empilhado por
/// `change_return_pc`.
#[cfg(not(test))]
pub fn blocking_syscall_trampoline_addr() -> usize {
    __blocking_syscall_trampoline as usize
}

/// Restaurador padrão de sinais (chama `rt_sigreturn`).
#[cfg(not(test))]
pub fn sigreturn_trampoline_addr() -> usize {
    __sigreturn_trampoline as usize
}

// Nos testes de host não há stubs; os endereços são marcadores fixos.
#[cfg(test)]
pub fn vector_base() -> usize {
    0x10_0000
}

#[cfg(test)]
pub fn trapret_addr() -> usize {
    0x10_1000
}

#[cfg(test)]
pub fn kthread_entry_addr() -> usize {
    0x10_1100
}

#[cfg(test)]
pub fn blocking_syscall_trampoline_addr() -> usize {
    0x10_1200
}

#[cfg(test)]
pub fn sigreturn_trampoline_addr() -> usize {
    0x10_1300
}
