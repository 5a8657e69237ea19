//! Substitutos das operações globais para os testes de host.
//!
//! Não há tabela de páginas real no host: `mmap(0, n)` devolve memória do
//! próprio processo (zerada, alinhada a página) e as operações sobre
//! endereços fixos apenas conferem os argumentos.

use core::sync::atomic::{AtomicUsize, Ordering};

use super::config::page_round_up;
use super::{PmmStats, PAGE_SIZE};

static ALLOCATED: AtomicUsize = AtomicUsize::new(0);

fn host_pages(size: usize) -> usize {
    let size = page_round_up(size.max(1));
    let layout = match core::alloc::Layout::from_size_align(size, PAGE_SIZE) {
        Ok(l) => l,
        Err(_) => panic!("layout inválido"),
    };
    // SAFETY: layout com tamanho não nulo
    let p = unsafe { std::alloc::alloc_zeroed(layout) };
    assert!(!p.is_null(), "host sem memória");
    ALLOCATED.fetch_add(size / PAGE_SIZE, Ordering::Relaxed);
    p as usize
}

pub fn alloc() -> usize {
    host_pages(PAGE_SIZE)
}

/// Páginas do host nunca voltam (os testes são curtos).
pub fn free(_pa: usize) {}

pub fn sbrk(n: usize) -> usize {
    host_pages(n)
}

pub fn mmap(va: usize, size: usize) -> usize {
    if va == 0 {
        host_pages(size)
    } else {
        va
    }
}

pub fn munmap(_va: usize, size: usize) -> usize {
    page_round_up(size) / PAGE_SIZE
}

pub fn fixmap(_va: usize, _pa: usize, _size: usize) {}

pub fn translate(va: usize) -> Option<usize> {
    Some(va)
}

pub fn stats() -> PmmStats {
    PmmStats {
        allocated: ALLOCATED.load(Ordering::Relaxed),
        free: 0,
    }
}
