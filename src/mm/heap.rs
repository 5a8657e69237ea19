//! Kernel Heap Allocator.
//!
//! `linked_list_allocator::Heap` sobre uma faixa reservada com `sbrk` e
//! mapeada com páginas zeradas. Permite `Box`/`Vec` para objetos de
//! colaboradores e para as tabelas montadas pelos autotestes.
//!
//! O heap fica atrás do `Spinlock` do kernel, que desabilita interrupções
//! enquanto o segura: uma IRQ nunca encontra o lock tomado pela thread
//! interrompida.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::{self, NonNull};

use linked_list_allocator::Heap;

use super::config::HEAP_SIZE;
use crate::sync::Spinlock;

/// `GlobalAlloc` do kernel.
pub struct KernelHeap(Spinlock<Heap>);

impl KernelHeap {
    pub const fn empty() -> Self {
        Self(Spinlock::new(Heap::empty()))
    }

    /// Entrega `[start, start + size)` ao alocador.
    ///
    /// # Safety
    ///
    /// A faixa precisa estar mapeada, ser exclusiva do heap e viver para
    /// sempre.
    pub unsafe fn init(&self, start: usize, size: usize) {
        // SAFETY: garantido pelo chamador
        unsafe { self.0.lock().init(start as *mut u8, size) };
    }

    pub fn stats(&self) -> HeapStats {
        let heap = self.0.lock();
        HeapStats {
            size: heap.size(),
            used: heap.used(),
            free: heap.free(),
        }
    }
}

unsafe impl GlobalAlloc for KernelHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.0
            .lock()
            .allocate_first_fit(layout)
            .map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if let Some(p) = NonNull::new(ptr) {
            // SAFETY: `p` veio de `alloc` com o mesmo layout
            unsafe { self.0.lock().deallocate(p, layout) };
        }
    }
}

#[cfg(not(test))]
#[global_allocator]
static ALLOCATOR: KernelHeap = KernelHeap::empty();

#[cfg(test)]
static ALLOCATOR: KernelHeap = KernelHeap::empty();

/// Uso do heap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub size: usize,
    pub used: usize,
    pub free: usize,
}

/// Reserva, mapeia e entrega a faixa do heap ao alocador.
pub fn init() {
    let start = super::mmap(0, HEAP_SIZE);
    // SAFETY: faixa recém-mapeada, exclusiva do heap
    unsafe { ALLOCATOR.init(start, HEAP_SIZE) };
    crate::kinfo!("(MM) Heap em ", start);
}

pub fn stats() -> HeapStats {
    ALLOCATOR.stats()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn empty_heap_returns_null() {
        let heap = KernelHeap::empty();
        let layout = Layout::from_size_align(64, 8).unwrap();
        assert!(unsafe { heap.alloc(layout) }.is_null());
    }

    #[test]
    fn alloc_and_free_track_usage() {
        let backing = vec![0u8; 16 << 10].leak();
        let heap = KernelHeap::empty();
        unsafe { heap.init(backing.as_mut_ptr() as usize, backing.len()) };
        assert_eq!(heap.stats().used, 0);

        let layout = Layout::from_size_align(256, 16).unwrap();
        let p = unsafe { heap.alloc(layout) };
        assert!(!p.is_null());
        assert_eq!(p as usize % 16, 0);
        assert!(heap.stats().used >= 256);

        unsafe { heap.dealloc(p, layout) };
        assert_eq!(heap.stats().used, 0);
        assert!(heap.stats().size <= backing.len());
    }
}
