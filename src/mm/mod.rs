//! # Memory Management Subsystem (MM)
//!
//! Ordem de inicialização: free-list física (`pmm`) -> árvore de páginas
//! (`vmm`) com toda a memória física baixa em identidade -> heap.
//!
//! | Módulo | Responsabilidade |
//! |--------|------------------|
//! | `pmm`  | Free-list de páginas de 4 KiB a partir do mapa do bootloader. |
//! | `vmm`  | Walker de 4 níveis, `mmap`/`munmap`/`fixmap`. |
//! | `sbrk` | Ponteiro monotônico de endereços virtuais acima de `VMSTART`. |
//! | `pool` | Blocos de tamanho fixo para o caminho de trap. |
//! | `heap` | `GlobalAlloc` (linked_list_allocator). |
//!
//! Todo estado global fica em `KMM`, atrás de um `Spinlock`: cada operação
//! roda com interrupções desabilitadas e termina recarregando o CR3.
//!
//! Nos testes de host as funções globais são servidas por páginas do
//! próprio processo (`host`), já que não existe tabela de páginas real.

pub mod config;
pub mod heap;
pub mod pmm;
pub mod pool;
pub mod sbrk;
pub mod vmm;


#[cfg(test)]
mod host;

pub use config::{PAGE_SIZE, VMSTART};
pub use pmm::{FrameSource, PmmStats};
pub use vmm::PteFlags;

#[cfg(not(test))]
use crate::arch::Cpu;
use crate::core::boot::multiboot::{BootInfo, MemoryMapEntry};
#[cfg(not(test))]
use crate::sync::Spinlock;
use config::{DEFAULT_MEMTOP, MEMSTART};
#[cfg(not(test))]
use pmm::FrameAllocator;
#[cfg(not(test))]
use sbrk::VirtBump;
#[cfg(not(test))]
use vmm::PageTable;

/// Estado global do gerenciador de memória.
#[cfg(not(test))]
struct Kmm {
    frames: FrameAllocator,
    vm: PageTable,
    brk: VirtBump,
}

#[cfg(not(test))]
static KMM: Spinlock<Kmm> = Spinlock::new(Kmm {
    frames: FrameAllocator::empty(),
    vm: PageTable::empty(),
    brk: VirtBump::new(VMSTART),
});

/// Topo da memória física utilizável, limitado a `VMSTART`.
///
/// Sem nenhuma região disponível assume `DEFAULT_MEMTOP`.
pub fn memtop_from(entries: impl Iterator<Item = MemoryMapEntry>) -> usize {
    entries
        .filter(|e| e.is_available())
        .map(|e| (e.end() as usize).min(VMSTART))
        .max()
        .filter(|&top| top != 0)
        .unwrap_or(DEFAULT_MEMTOP)
}

/// `memtop_from` sobre o mapa do bootloader, se houver.
pub fn find_memtop(boot: Option<&BootInfo>) -> usize {
    match boot {
        Some(b) => memtop_from(b.memory_map()),
        None => DEFAULT_MEMTOP,
    }
}

/// Inicializa PMM e VMM e liga a nova árvore de páginas.
#[cfg(not(test))]
pub fn init(boot: Option<&BootInfo>) {
    let memtop = find_memtop(boot);
    crate::kinfo!("(MM) memtop=", memtop);
    if memtop <= MEMSTART {
        crate::core::panic::throw("(MM) memória física insuficiente");
    }

    let mut kmm = KMM.lock();
    let kmm = &mut *kmm;
    // SAFETY: [MEMSTART, memtop) é RAM livre segundo o bootloader
    unsafe { kmm.frames.init(MEMSTART, memtop) };
    kmm.vm = PageTable::new(&mut kmm.frames);
    // Identidade de toda a memória física (a página 0 fica de fora)
    kmm.vm.fixmap(PAGE_SIZE, PAGE_SIZE, memtop - PAGE_SIZE, PteFlags::USER_RW, &mut kmm.frames);
    // SAFETY: a árvore mapeia o kernel em identidade
    unsafe { Cpu::load_cr3(kmm.vm.root()) };
    crate::kok!("(MM) Paginação ativa");
}

#[cfg(test)]
pub fn init(boot: Option<&BootInfo>) {
    let _ = (find_memtop(boot), MEMSTART);
}

/// Uma página física zerada.
#[cfg(not(test))]
pub fn alloc() -> usize {
    KMM.lock().frames.alloc_zeroed()
}

/// Devolve uma página obtida de `alloc`.
#[cfg(not(test))]
pub fn free(pa: usize) {
    KMM.lock().frames.free(pa)
}

/// Reserva espaço de endereço virtual (sem mapear).
#[cfg(not(test))]
pub fn sbrk(n: usize) -> usize {
    KMM.lock().brk.sbrk(n)
}

/// Mapeia `[va, va + size)` com páginas zeradas novas.
///
/// `va = 0` pede um endereço ao `sbrk`.
#[cfg(not(test))]
pub fn mmap(va: usize, size: usize) -> usize {
    let mut kmm = KMM.lock();
    let kmm = &mut *kmm;
    let va = if va == 0 { kmm.brk.sbrk(size) } else { va };
    kmm.vm.mmap(va, size, PteFlags::USER_RW, &mut kmm.frames);
    // SAFETY: mesma raiz, apenas descarta a TLB
    unsafe { Cpu::load_cr3(kmm.vm.root()) };
    va
}

/// Desfaz o mapeamento de `[va, va + size)`. Retorna páginas liberadas.
#[cfg(not(test))]
pub fn munmap(va: usize, size: usize) -> usize {
    let mut kmm = KMM.lock();
    let kmm = &mut *kmm;
    let n = kmm.vm.munmap(va, size, &mut kmm.frames);
    unsafe { Cpu::load_cr3(kmm.vm.root()) };
    n
}

/// Mapeia `[va, va + size)` sobre `[pa, pa + size)`.
#[cfg(not(test))]
pub fn fixmap(va: usize, pa: usize, size: usize) {
    let mut kmm = KMM.lock();
    let kmm = &mut *kmm;
    kmm.vm.fixmap(va, pa, size, PteFlags::USER_RW, &mut kmm.frames);
    unsafe { Cpu::load_cr3(kmm.vm.root()) };
}

/// Endereço físico de `va`, se mapeado.
#[cfg(not(test))]
pub fn translate(va: usize) -> Option<usize> {
    KMM.lock().vm.translate(va)
}

#[cfg(not(test))]
pub fn stats() -> PmmStats {
    KMM.lock().frames.stats()
}

#[cfg(test)]
pub use host::{alloc, fixmap, free, mmap, munmap, sbrk, stats, translate};
