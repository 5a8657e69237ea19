//! Registro de handlers por vetor.
//!
//! Populado no boot por cada colaborador (timer, syscall, drivers). O
//! despacho copia o ponteiro de função e solta o lock antes de chamá-lo.

use crate::arch::platform::NVECTORS;
use crate::arch::TrapFrame;
use crate::core::panic::throw;
use crate::sync::Spinlock;

/// Handler de trap. Para IRQs adiadas recebe um frame sintético cujo
/// `trapno` é o vetor.
pub type TrapHandler = fn(&mut TrapFrame);

pub struct TrapRegistry {
    handlers: [Option<TrapHandler>; NVECTORS],
}

impl TrapRegistry {
    pub const fn new() -> Self {
        Self {
            handlers: [None; NVECTORS],
        }
    }

    pub fn register(&mut self, vector: usize, handler: TrapHandler) {
        match self.handlers.get_mut(vector) {
            Some(slot) => *slot = Some(handler),
            None => throw("(Trap) vetor fora da IDT"),
        }
    }

    pub fn get(&self, vector: usize) -> Option<TrapHandler> {
        self.handlers.get(vector).copied().flatten()
    }
}

impl Default for TrapRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static REGISTRY: Spinlock<TrapRegistry> = Spinlock::new(TrapRegistry::new());

/// Associa `handler` ao vetor (substitui um registro anterior).
pub fn register_trap(vector: usize, handler: TrapHandler) {
    REGISTRY.lock().register(vector, handler);
    crate::ktrace!("(Trap) handler registrado, vetor=", vector);
}

pub fn handler(vector: usize) -> Option<TrapHandler> {
    REGISTRY.lock().get(vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(tf: &mut TrapFrame) {
        tf.rax = 1;
    }

    fn b(tf: &mut TrapFrame) {
        tf.rax = 2;
    }

    #[test]
    fn later_registration_replaces() {
        let mut r = TrapRegistry::new();
        assert!(r.get(0x21).is_none());
        r.register(0x21, a);
        r.register(0x21, b);

        let mut tf = TrapFrame::zeroed();
        (r.get(0x21).unwrap())(&mut tf);
        assert_eq!(tf.rax, 2);
    }

    #[test]
    fn out_of_range_lookup_is_none() {
        let r = TrapRegistry::new();
        assert!(r.get(NVECTORS).is_none());
    }

    #[test]
    #[should_panic(expected = "vetor fora da IDT")]
    fn out_of_range_register_is_fatal() {
        TrapRegistry::new().register(300, a);
    }
}
