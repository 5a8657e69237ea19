//! # Traps e Interrupções
//!
//! Fluxo: stub do vetor -> `__alltraps` monta o `TrapFrame` -> `dotrap`.
//! Exceções, o timer e a syscall (0x80) rodam sincronamente; IRQs de
//! dispositivo viram um bit pendente tratado pelo serviço de traps.
//!
//! Falhas em Ring 3 são convertidas em pânico do runtime reescrevendo o
//! endereço de retorno (`change_return_pc`), o mesmo truque usado pelo
//! trampolim de syscall bloqueante.

pub mod dispatch;
pub mod fault;
pub mod hooks;
pub mod irq;
pub mod registry;

pub use fault::{change_return_pc, prepare_panic};
pub use hooks::RuntimeHooks;
pub use irq::wait_irq;
pub use registry::{handler, register_trap, TrapHandler};

/// Registros padrão: page fault e as IRQs espúrias do PIC.
pub fn init() {
    register_trap(fault::VEC_PAGE_FAULT, fault::page_fault_handler);
    register_trap(39, fault::ignore_handler);
    register_trap(47, fault::ignore_handler);
    crate::kinfo!("(Trap) Registro inicial pronto");
}
