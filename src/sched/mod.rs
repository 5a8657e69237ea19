//! # Scheduler (Sched)
//!
//! Escalonador cooperativo de uma CPU sobre uma tabela fixa de threads.
//!
//! | Módulo    | Responsabilidade |
//! |-----------|------------------|
//! | `task`    | TCB, tabela de slots, criação/`clone`/término. |
//! | `context` | Troca de contexto (callee-saved + endereço de retorno). |
//! | `core`    | Loop do escalonador, yield/sleep/wakeup, idle. |
//! | `signal`  | Ações, máscaras, pilha alternativa e entrega. |
//!
//! O primitivo central é `sleepon(key)`/`wakeup(key, n)`: a chave é um
//! endereço qualquer e tudo que bloqueia (futex, timers, epoll, conclusão
//! de syscalls encaminhadas, IRQs adiadas) é construído sobre ele.

pub mod config;
pub mod context;
pub mod core;
pub mod signal;
pub mod task;

#[cfg(feature = "self_test")]
pub mod test;

pub use self::core::scheduler::{
    clone, current, current_frame, exit_current, init_thread0, is_syscall_task, record_frame,
    sched, schedule, set_idle, set_syscall_task, set_trap_task, sleepon, spawn_kernel,
    thread_stats, try_record_frame, try_spawn_kernel, try_with_current, wakeup, with_current, with_thread, yield_now, THREADS,
};
pub use task::lifecycle;
pub use task::{ThreadId, ThreadState};

/// Chave de sleep: um endereço usado apenas como identidade.
pub type SleepKey = usize;

/// Chave derivada do endereço de `r`.
#[inline]
pub fn key_of<T>(r: &T) -> SleepKey {
    r as *const T as usize
}

/// Cria a thread ociosa.
pub fn init() {
    self::core::idle::spawn();
    crate::kinfo!("(Sched) Tabela de threads pronta, slots=", config::NTHREADS);
}
