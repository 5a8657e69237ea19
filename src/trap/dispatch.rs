//! Despacho de traps.
//!
//! Tudo que é alcançável daqui roda sem reentrância e sem alocação:
//! interrupções desabilitadas, nenhuma chamada ao heap.

use crate::arch::{Cpu, CpuOps, TrapFrame};
use crate::core::panic::throw_frame;
use crate::sched;
use crate::sched::signal;

use super::{fault, irq, registry};

/// Vetores abaixo deste são exceções da CPU.
const FIRST_EXTERNAL_VECTOR: usize = 32;

/// Entrada em Rust de todos os vetores (chamada por `__alltraps`).
pub extern "C" fn dotrap(tf: *mut TrapFrame) {
    // SAFETY: `__alltraps` passa o frame que acabou de empilhar
    let tf = unsafe { &mut *tf };
    if Cpu::are_interrupts_enabled() {
        throw_frame(tf, "(Trap) interrupções habilitadas no trap");
    }
    if !sched::try_record_frame(tf) {
        // Com uma CPU e IF=0 sob o lock, só uma exceção dentro de uma seção
        // que segura THREADS chega aqui com a tabela travada
        if tf.is_kernel() && tf.trapno < FIRST_EXTERNAL_VECTOR {
            fault::kernel_fault(tf);
        }
        sched::record_frame(tf);
    }

    dispatch(tf);

    if tf.is_kernel() {
        // o frame de Ring 0 deixa de existir no `iretq`
        sched::record_frame(core::ptr::null_mut());
    } else {
        signal::deliver_pending(tf);
    }
}

/// Exceções, timer e syscall rodam aqui; IRQs de dispositivo são adiadas.
pub fn dispatch(tf: &mut TrapFrame) {
    let vector = tf.trapno;
    let Some(handler) = registry::handler(vector) else {
        fault::fault_handler(tf);
        return;
    };
    if irq::is_deferred(vector) {
        irq::defer(vector);
        return;
    }
    handler(tf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    static FIRED: AtomicUsize = AtomicUsize::new(0);
    static OBSERVED: AtomicUsize = AtomicUsize::new(0);

    fn count_and_observe(tf: &mut TrapFrame) {
        FIRED.fetch_add(1, Ordering::SeqCst);
        OBSERVED.store(tf.rbx, Ordering::SeqCst);
    }

    #[test]
    fn handler_runs_once_per_firing_and_sees_frame() {
        registry::register_trap(0xA0, count_and_observe);
        let mut tf = TrapFrame::zeroed();
        tf.trapno = 0xA0;
        tf.rbx = 0xC0FFEE;

        dotrap(&mut tf);
        assert_eq!(FIRED.load(Ordering::SeqCst), 1);
        assert_eq!(OBSERVED.load(Ordering::SeqCst), 0xC0FFEE);
        dotrap(&mut tf);
        assert_eq!(FIRED.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[should_panic(expected = "trap fault in kernel")]
    fn kernel_fault_with_thread_table_held_dumps_instead_of_spinning() {
        let _held = sched::THREADS.lock();
        let mut tf = TrapFrame::zeroed();
        tf.trapno = fault::VEC_PAGE_FAULT;
        dotrap(&mut tf);
    }

    #[test]
    #[should_panic(expected = "trap fault in kernel")]
    fn unregistered_kernel_vector_is_fatal() {
        let mut tf = TrapFrame::zeroed();
        tf.trapno = 7;
        dispatch(&mut tf);
    }
}
