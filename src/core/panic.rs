//! Pânico do kernel (classe fatal).
//!
//! Não existe camada de recuperação abaixo deste kernel: violações de
//! invariante (interrupções habilitadas no trap, remapeamento de página,
//! tabela de threads cheia, exceção em Ring 0) imprimem o que se sabe e
//! travam a máquina.
//!
//! # Comportamento
//! 1. Desabilita interrupções.
//! 2. Loga mensagem, IP do frame e backtrace pela cadeia de RBP.
//! 3. Trava a CPU (hlt loop).
//!
//! Nos testes de host `throw` vira um `panic!` com a mesma mensagem.

use crate::arch::TrapFrame;

/// Profundidade máxima do backtrace.
pub const MAX_PCS: usize = 32;

/// Percorre a cadeia de frame pointers a partir de `fp`.
///
/// Cada frame é `[fp] = fp anterior`, `[fp + 8] = endereço de retorno`.
/// Para no primeiro fp nulo ou desalinhado.
///
/// # Safety
/// Toda a cadeia alcançável a partir de `fp` deve ser memória legível.
pub unsafe fn callers(mut fp: usize, pcs: &mut [usize]) -> usize {
    let mut n = 0;
    while n < pcs.len() {
        if fp == 0 || fp % 8 != 0 {
            break;
        }
        pcs[n] = *((fp + 8) as *const usize);
        n += 1;
        fp = *(fp as *const usize);
    }
    n
}

/// Imprime os registradores de um frame (um por linha).
pub fn dump_frame(tid: usize, tf: &TrapFrame) {
    print_reg("tid", tid);
    print_reg("no", tf.trapno);
    print_reg("err", tf.err);
    print_reg("cr2", crate::arch::Cpu::cr2());
    print_reg("ip", tf.rip);
    print_reg("sp", tf.rsp);
    print_reg("bp", tf.rbp);
    print_reg("ax", tf.rax);
    print_reg("bx", tf.rbx);
    print_reg("cx", tf.rcx);
    print_reg("dx", tf.rdx);
    print_reg("si", tf.rsi);
    print_reg("di", tf.rdi);
    print_reg("cs", tf.cs);
    print_reg("flags", tf.rflags);
}

fn print_reg(name: &str, value: usize) {
    crate::klog!(name);
    crate::klog!("=", value);
    crate::knl!();
}

/// Pânico com o frame da thread corrente (se houver).
#[cfg(not(test))]
pub fn throw(msg: &str) -> ! {
    use crate::arch::{Cpu, CpuOps};

    Cpu::disable_interrupts();
    match crate::sched::current_frame() {
        Some(tf) => throw_frame(unsafe { &*tf }, msg),
        None => {
            crate::kerror!(msg);
            let mut pcs = [0usize; MAX_PCS];
            let n = unsafe { callers(Cpu::rbp(), &mut pcs) };
            print_pcs(&pcs[..n]);
            Cpu::hang();
        }
    }
}

#[cfg(test)]
pub fn throw(msg: &str) -> ! {
    panic!("{}", msg);
}

/// Pânico a partir de um frame específico.
#[cfg(not(test))]
pub fn throw_frame(tf: &TrapFrame, msg: &str) -> ! {
    use crate::arch::{Cpu, CpuOps};

    Cpu::disable_interrupts();
    crate::kerror!(msg);
    crate::klog!("ip=", tf.rip);
    crate::knl!();

    let mut pcs = [0usize; MAX_PCS];
    // rbp vindo de Ring 3 pode ser lixo: o walker para no primeiro
    // ponteiro nulo ou desalinhado.
    let n = unsafe { callers(tf.rbp, &mut pcs) };
    print_pcs(&pcs[..n]);
    Cpu::hang();
}

#[cfg(test)]
pub fn throw_frame(_tf: &TrapFrame, msg: &str) -> ! {
    panic!("{}", msg);
}

#[cfg(not(test))]
fn print_pcs(pcs: &[usize]) {
    for &pc in pcs {
        crate::klog!("  ", pc);
        crate::knl!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Monta uma cadeia [fp anterior, retorno] por frame, via ponteiro cru.
    fn chain(buf: &mut [usize], links: &[(Option<usize>, usize)]) -> usize {
        let p = buf.as_mut_ptr();
        for (i, &(next, ret)) in links.iter().enumerate() {
            unsafe {
                *p.add(2 * i) = next.map_or(0, |n| p.add(2 * n) as usize);
                *p.add(2 * i + 1) = ret;
            }
        }
        p as usize
    }

    #[test]
    fn walks_frame_chain_until_null() {
        let mut buf = [0usize; 6];
        let base = chain(&mut buf, &[(Some(1), 0xAAA), (Some(2), 0xBBB), (None, 0xCCC)]);

        let mut pcs = [0usize; MAX_PCS];
        let n = unsafe { callers(base, &mut pcs) };
        assert_eq!(n, 3);
        assert_eq!(&pcs[..3], &[0xAAA, 0xBBB, 0xCCC]);
    }

    #[test]
    fn stops_at_buffer_capacity() {
        let mut buf = [0usize; 4];
        // ciclo entre dois frames
        let base = chain(&mut buf, &[(Some(1), 1), (Some(0), 2)]);

        let mut pcs = [0usize; 5];
        let n = unsafe { callers(base, &mut pcs) };
        assert_eq!(n, 5);
        assert_eq!(pcs, [1, 2, 1, 2, 1]);
    }

    #[test]
    #[should_panic(expected = "no thread slot available")]
    fn throw_panics_on_host() {
        throw("no thread slot available");
    }
}
