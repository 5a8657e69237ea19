//! Arquivo: core/time/jiffies.rs
//!
//! Propósito: Contador de ticks do sistema (tempo monotônico do kernel).
//!
//! Detalhes de Implementação:
//! - Incrementado apenas pelo handler do timer (vetor 0x20).
//! - Começa em 1: o valor zero fica livre para "nunca".

use core::sync::atomic::{AtomicU64, Ordering};

/// Frequência do Tick (ticks por segundo)
pub const HZ: u64 = 100;

/// Ticks desde o boot.
pub(crate) static JIFFIES: AtomicU64 = AtomicU64::new(1);

/// Retorna o número atual de jiffies.
#[inline]
pub fn get_jiffies() -> u64 {
    JIFFIES.load(Ordering::Relaxed)
}

/// Incrementa o contador. Chamado APENAS pelo handler do timer.
#[inline]
pub(crate) fn tick() -> u64 {
    JIFFIES.fetch_add(1, Ordering::Relaxed) + 1
}
