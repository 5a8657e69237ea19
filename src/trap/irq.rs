//! IRQs adiadas.
//!
//! Callbacks de driver podem demorar e nada pode rodar muito tempo com
//! interrupções desabilitadas. O caminho de trap só marca o vetor numa
//! palavra de pendências e acorda o serviço de traps, que chama os handlers
//! fora do contexto de trap.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::arch::platform::SYSCALL_VECTOR;
use crate::arch::TrapFrame;
use crate::drivers::pic::{self, IRQ_BASE, LINE_NIC};
use crate::sched::{self, key_of, SleepKey};
use crate::syscall::{numbers::SYS_WAIT_IRQ, raw};

use super::registry;

/// Vetores adiados: IRQ_BASE < vetor < IRQ_BASE + 64 (um bit cada).
pub const DEFERRED_END: usize = IRQ_BASE as usize + 64;

/// Linha da placa de rede: disparada por nível, fica mascarada até o
/// driver tratar o dispositivo.
pub const NIC_VECTOR: usize = IRQ_BASE as usize + LINE_NIC as usize;

/// O vetor é adiado para o serviço de traps?
///
/// O timer (IRQ_BASE) e a syscall rodam de forma síncrona.
#[inline]
pub fn is_deferred(vector: usize) -> bool {
    vector > IRQ_BASE as usize && vector < DEFERRED_END && vector != SYSCALL_VECTOR
}

/// Palavra de IRQs pendentes: bit `i` = vetor `IRQ_BASE + i`.
pub struct PendingIrqs(AtomicU64);

impl PendingIrqs {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn mark(&self, vector: usize) {
        self.0.fetch_or(1 << (vector - IRQ_BASE as usize), Ordering::AcqRel);
    }

    /// Retira e zera o conjunto.
    pub fn take(&self) -> u64 {
        self.0.swap(0, Ordering::AcqRel)
    }

    pub fn key(&self) -> SleepKey {
        key_of(self)
    }
}

impl Default for PendingIrqs {
    fn default() -> Self {
        Self::new()
    }
}

/// Vetores presentes num conjunto, em ordem crescente.
pub fn vectors(set: u64) -> impl Iterator<Item = usize> {
    (0..64usize)
        .filter(move |i| set & (1 << i) != 0)
        .map(|i| IRQ_BASE as usize + i)
}

static IRQSET: PendingIrqs = PendingIrqs::new();

/// Caminho de trap: registra o vetor, acorda o serviço e cede a CPU.
pub fn defer(vector: usize) {
    if vector == NIC_VECTOR {
        pic::disable_irq(LINE_NIC);
    }
    IRQSET.mark(vector);
    sched::wakeup(IRQSET.key(), 1);
    sched::yield_now();
}

/// SYS_WAIT_IRQ: dorme até haver IRQs pendentes e devolve o conjunto.
pub fn wait_irq() -> u64 {
    loop {
        let set = IRQSET.take();
        if set != 0 {
            return set;
        }
        sched::sleepon(IRQSET.key());
    }
}

/// Chama o handler de cada vetor do conjunto com um frame sintético.
pub fn run_handlers(set: u64) {
    for vector in vectors(set) {
        match registry::handler(vector) {
            Some(h) => {
                let mut tf = TrapFrame::zeroed();
                tf.trapno = vector;
                h(&mut tf);
            }
            None => {
                crate::kwarn!("(Trap) IRQ sem handler, vetor=", vector);
                pic::eoi(vector);
            }
        }
    }
}

/// Serviço de traps (thread de kernel).
extern "C" fn trap_loop(_arg: usize) {
    loop {
        let set = raw::syscall0(SYS_WAIT_IRQ) as u64;
        run_handlers(set);
    }
}

/// Cria o serviço de traps e o registra no escalonador.
pub fn spawn_service() -> sched::ThreadId {
    let id = sched::spawn_kernel(trap_loop, 0);
    sched::set_trap_task(id);
    crate::kinfo!("(Trap) Serviço de IRQs, tid=", id.index());
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicUsize;

    #[test]
    fn deferral_window() {
        assert!(!is_deferred(0x20)); // timer
        assert!(is_deferred(0x21));
        assert!(is_deferred(0x2B));
        assert!(is_deferred(DEFERRED_END - 1));
        assert!(!is_deferred(DEFERRED_END));
        assert!(!is_deferred(SYSCALL_VECTOR));
        assert!(!is_deferred(14));
    }

    #[test]
    fn pending_word_accumulates_and_clears() {
        let p = PendingIrqs::new();
        p.mark(0x21);
        p.mark(0x2C);
        p.mark(0x21);
        let set = p.take();
        assert_eq!(set, (1 << 1) | (1 << 12));
        assert_eq!(p.take(), 0);

        let mut it = vectors(set);
        assert_eq!(it.next(), Some(0x21));
        assert_eq!(it.next(), Some(0x2C));
        assert_eq!(it.next(), None);
    }

    static SEEN: AtomicUsize = AtomicUsize::new(0);

    fn record(tf: &mut TrapFrame) {
        SEEN.store(tf.trapno, Ordering::SeqCst);
    }

    #[test]
    fn service_passes_vector_in_synthetic_frame() {
        registry::register_trap(0x5E, record);
        run_handlers(1 << (0x5E - IRQ_BASE as usize));
        assert_eq!(SEEN.load(Ordering::SeqCst), 0x5E);
    }
}
