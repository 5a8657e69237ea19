//! Physical Memory Manager (PMM).
//!
//! Free-list de páginas físicas de 4 KiB. O ponteiro `next` de cada página
//! livre mora dentro da própria página, então a lista não custa memória
//! extra. Como toda a memória física baixa é mapeada em identidade, o
//! endereço físico de uma página também é o endereço usado para tocá-la.
//!
//! Esgotar a free-list é fatal: não existe recuperação abaixo deste kernel.

use super::config::{page_round_up, PAGE_SIZE};
use crate::core::panic::throw;

/// Fonte de páginas físicas para o walker de tabelas e o pool.
///
/// Permite montar tabelas sobre páginas do host nos testes unitários.
pub trait FrameSource {
    /// Uma página zerada. Nunca retorna em caso de esgotamento.
    fn alloc_frame(&mut self) -> usize;
    /// Devolve uma página obtida de `alloc_frame`.
    fn free_frame(&mut self, pa: usize);
}

/// Contadores do alocador.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PmmStats {
    /// Páginas entregues desde o boot.
    pub allocated: usize,
    /// Páginas na free-list agora.
    pub free: usize,
}

pub struct FrameAllocator {
    /// Topo da lista (0 = vazia)
    head: usize,
    /// Limite superior da memória gerenciada
    memtop: usize,
    stats: PmmStats,
}

impl FrameAllocator {
    pub const fn empty() -> Self {
        Self {
            head: 0,
            memtop: 0,
            stats: PmmStats {
                allocated: 0,
                free: 0,
            },
        }
    }

    /// Monta a free-list com todas as páginas inteiras de `[start, end)`.
    ///
    /// # Safety
    /// A faixa deve ser memória livre, acessível e sem outro dono.
    pub unsafe fn init(&mut self, start: usize, end: usize) {
        self.memtop = end;
        let mut p = page_round_up(start);
        while p + PAGE_SIZE <= end {
            self.free(p);
            p += PAGE_SIZE;
        }
        crate::kinfo!("(MM) Páginas livres=", self.stats.free);
    }

    /// Retira uma página da lista (conteúdo indefinido).
    pub fn alloc(&mut self) -> usize {
        let r = self.head;
        if r == 0 {
            throw("(MM) kmem alloc: sem páginas físicas");
        }
        // SAFETY: toda página na lista foi escrita por `free`
        self.head = unsafe { *(r as *const usize) };
        self.stats.allocated += 1;
        self.stats.free -= 1;
        r
    }

    /// Uma página zerada.
    pub fn alloc_zeroed(&mut self) -> usize {
        let p = self.alloc();
        // SAFETY: a página acabou de sair da lista e é nossa
        unsafe { core::ptr::write_bytes(p as *mut u8, 0, PAGE_SIZE) };
        p
    }

    /// Devolve uma página à lista.
    pub fn free(&mut self, p: usize) {
        if p % PAGE_SIZE != 0 || p >= self.memtop {
            throw("(MM) kmem free: endereço inválido");
        }
        // SAFETY: a página é do chamador e alinhada
        unsafe { *(p as *mut usize) = self.head };
        self.head = p;
        self.stats.free += 1;
    }

    pub fn stats(&self) -> PmmStats {
        self.stats
    }

    pub fn memtop(&self) -> usize {
        self.memtop
    }
}

impl FrameSource for FrameAllocator {
    fn alloc_frame(&mut self) -> usize {
        self.alloc_zeroed()
    }

    fn free_frame(&mut self, pa: usize) {
        self.free(pa)
    }
}
