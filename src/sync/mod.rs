//! # Synchronization Primitives
//!
//! Com uma única CPU lógica, "interrupções desabilitadas" é a exclusão
//! mútua. O `Spinlock` combina as duas coisas: desabilita interrupções e
//! marca o dado como ocupado, o que transforma reentrância acidental (um
//! trap tentando o mesmo lock) em um travamento visível em vez de corrupção.
//!
//! ## Regras
//!
//! - Nunca segurar um guard através de uma troca de contexto.
//! - Nunca alocar com um guard do caminho de trap em mãos.

/// Spinlock (busy-wait, não dorme)
pub mod spinlock;

pub use spinlock::{Spinlock, SpinlockGuard};
