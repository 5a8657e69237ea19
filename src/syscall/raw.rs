//! Syscalls cruas para as threads de kernel (`int 0x80`).
//!
//! Os serviços de traps e de syscalls esperam trabalho com as mesmas
//! primitivas que o runtime usaria, passando pelo despacho normal.

#[cfg(not(test))]
use core::arch::asm;

#[cfg(not(test))]
#[inline]
pub fn syscall6(no: usize, a0: usize, a1: usize, a2: usize, a3: usize, a4: usize, a5: usize) -> usize {
    let ret: usize;
    // SAFETY: o vetor 0x80 está instalado e preserva todos os registradores
    // exceto RAX
    unsafe {
        asm!(
            "int 0x80",
            inlateout("rax") no => ret,
            in("rdi") a0,
            in("rsi") a1,
            in("rdx") a2,
            in("r10") a3,
            in("r8") a4,
            in("r9") a5,
        );
    }
    ret
}

/// Nos testes de host não existe IDT: a chamada vai direto ao despacho.
#[cfg(test)]
pub fn syscall6(no: usize, a0: usize, a1: usize, a2: usize, a3: usize, a4: usize, a5: usize) -> usize {
    let mut tf = crate::arch::TrapFrame::zeroed();
    tf.rax = no;
    tf.rdi = a0;
    tf.rsi = a1;
    tf.rdx = a2;
    tf.r10 = a3;
    tf.r8 = a4;
    tf.r9 = a5;
    super::dispatch::dispatch_inline(&mut tf)
}

#[inline]
pub fn syscall0(no: usize) -> usize {
    syscall6(no, 0, 0, 0, 0, 0, 0)
}

#[inline]
pub fn syscall1(no: usize, a0: usize) -> usize {
    syscall6(no, a0, 0, 0, 0, 0, 0)
}

#[inline]
pub fn syscall2(no: usize, a0: usize, a1: usize) -> usize {
    syscall6(no, a0, a1, 0, 0, 0, 0)
}

#[inline]
pub fn syscall3(no: usize, a0: usize, a1: usize, a2: usize) -> usize {
    syscall6(no, a0, a1, a2, 0, 0, 0)
}

#[inline]
pub fn syscall4(no: usize, a0: usize, a1: usize, a2: usize, a3: usize) -> usize {
    syscall6(no, a0, a1, a2, a3, 0, 0)
}

#[inline]
pub fn syscall5(no: usize, a0: usize, a1: usize, a2: usize, a3: usize, a4: usize) -> usize {
    syscall6(no, a0, a1, a2, a3, a4, 0)
}
