//! Alocador de endereços virtuais (`sbrk`).
//!
//! Ponteiro monotônico a partir de `VMSTART`: reserva espaço de endereço,
//! não memória. Nada é devolvido.

use super::config::page_round_up;
use crate::core::panic::throw;

pub struct VirtBump {
    voffset: usize,
}

impl VirtBump {
    pub const fn new(start: usize) -> Self {
        Self { voffset: start }
    }

    /// Reserva `n` bytes e retorna o início. `sbrk(0)` consulta o topo.
    pub fn sbrk(&mut self, n: usize) -> usize {
        let p = self.voffset;
        let next = match p.checked_add(n) {
            Some(end) => page_round_up(end),
            None => throw("(MM) espaço de endereço virtual esgotado"),
        };
        if next < p {
            throw("(MM) espaço de endereço virtual esgotado");
        }
        self.voffset = next;
        p
    }

    pub fn top(&self) -> usize {
        self.voffset
    }
}
