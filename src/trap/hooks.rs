//! Ganchos do runtime hospedado.
//!
//! O kernel não conhece a convenção de chamada do runtime: quem o embarca
//! informa para onde desviar uma falha em Ring 3, onde fica o trampolim de
//! syscall bloqueante e como saber se a thread corrente segura um recurso
//! de escalonamento do runtime (um "P", no caso de runtimes M:N).

use spin::Once;

use crate::arch::TrapFrame;

#[derive(Clone, Copy)]
pub struct RuntimeHooks {
    /// Entrada de pânico genérico (exceções sem handler)
    pub trap_panic: usize,
    /// Entrada de pânico por acesso inválido à memória
    pub page_fault_panic: usize,
    /// Trampolim de syscall bloqueante; 0 = o do kernel.
    ///
    /// Entra com RDI apontando para o `TrapFrame` salvo da chamada.
    pub blocking_syscall: usize,
    /// A thread do frame segura um recurso de escalonamento?
    pub holds_scheduling_resource: fn(&TrapFrame) -> bool,
}

fn never(_tf: &TrapFrame) -> bool {
    false
}

impl RuntimeHooks {
    pub const fn new(trap_panic: usize, page_fault_panic: usize) -> Self {
        Self {
            trap_panic,
            page_fault_panic,
            blocking_syscall: 0,
            holds_scheduling_resource: never,
        }
    }
}

static HOOKS: Once<RuntimeHooks> = Once::new();

/// Instala os ganchos (apenas a primeira chamada tem efeito).
pub fn install(hooks: RuntimeHooks) {
    HOOKS.call_once(|| hooks);
    crate::kinfo!("(Trap) Ganchos do runtime instalados");
}

pub fn get() -> Option<&'static RuntimeHooks> {
    HOOKS.get()
}

/// A thread do frame segura um recurso de escalonamento do runtime?
pub fn holds_scheduling_resource(tf: &TrapFrame) -> bool {
    get().is_some_and(|h| (h.holds_scheduling_resource)(tf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_query_says_no() {
        let h = RuntimeHooks::new(0x1000, 0x2000);
        assert!(!(h.holds_scheduling_resource)(&TrapFrame::zeroed()));
        assert_eq!(h.blocking_syscall, 0);
    }
}
