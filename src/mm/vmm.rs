//! Virtual Memory Manager (VMM).
//!
//! Árvore de 4 níveis (PML4 -> PDPT -> PD -> PT) percorrida de cima para
//! baixo. Tabelas intermediárias são alocadas sob demanda pelo walker.
//!
//! Existe uma única árvore global, alterada apenas com interrupções
//! desabilitadas. Tabelas são tocadas pelo endereço físico (identidade).

use bitflags::bitflags;

use super::config::{page_round_down, ENTRIES_PER_TABLE, PAGE_LEVELS, PAGE_SHIFT, PAGE_SIZE};
use super::pmm::FrameSource;
use crate::core::panic::throw;

bitflags! {
    /// Bits de uma entrada de tabela de páginas.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PteFlags: u64 {
        const PRESENT = 1 << 0;
        const WRITABLE = 1 << 1;
        const USER = 1 << 2;
        const WRITE_THROUGH = 1 << 3;
        const NO_CACHE = 1 << 4;
        const ACCESSED = 1 << 5;
        const DIRTY = 1 << 6;
        const HUGE_PAGE = 1 << 7;
        const GLOBAL = 1 << 8;
        const NO_EXECUTE = 1 << 63;
    }
}

impl PteFlags {
    /// Permissão padrão: o runtime hospedado roda em Ring 3 e compartilha o
    /// espaço de endereçamento com o kernel.
    pub const USER_RW: Self = Self::PRESENT.union(Self::WRITABLE).union(Self::USER);
}

/// Máscara do endereço físico numa entrada.
const PTE_ADDR_MASK: u64 = 0x000F_FFFF_FFFF_F000;

/// Uma entrada de tabela.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Entry(u64);

impl Entry {
    pub const fn new(pa: usize, flags: PteFlags) -> Self {
        Self((pa as u64 & PTE_ADDR_MASK) | flags.bits())
    }

    #[inline]
    pub fn present(&self) -> bool {
        self.0 & PteFlags::PRESENT.bits() != 0
    }

    #[inline]
    pub fn addr(&self) -> usize {
        (self.0 & PTE_ADDR_MASK) as usize
    }

    #[inline]
    pub fn flags(&self) -> PteFlags {
        PteFlags::from_bits_truncate(self.0)
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

/// Índice de `va` na tabela do nível `lvl` (1 = PT ... 4 = PML4).
#[inline]
pub const fn page_entry_idx(va: usize, lvl: usize) -> usize {
    (va >> (PAGE_SHIFT + (lvl - 1) * 9)) & (ENTRIES_PER_TABLE - 1)
}

/// Faixa de páginas `[va, va + size)`, com `va` arredondado para baixo.
fn pages(va: usize, size: usize) -> impl Iterator<Item = usize> {
    let first = page_round_down(va);
    let last = page_round_down(va.saturating_add(size.max(1) - 1));
    (first..=last).step_by(PAGE_SIZE)
}

pub struct PageTable {
    /// Endereço físico da PML4
    root: usize,
}

impl PageTable {
    pub const fn empty() -> Self {
        Self { root: 0 }
    }

    /// Cria uma árvore vazia com a PML4 tirada de `frames`.
    pub fn new(frames: &mut impl FrameSource) -> Self {
        Self {
            root: frames.alloc_frame(),
        }
    }

    pub fn root(&self) -> usize {
        self.root
    }

    /// # Safety
    /// `table` deve ser o endereço de uma tabela válida da árvore.
    unsafe fn entry_at<'a>(table: usize, idx: usize) -> &'a mut Entry {
        &mut *(table as *mut Entry).add(idx)
    }

    /// Entrada folha (nível 1) de `va`.
    ///
    /// Com `alloc = None` tabelas ausentes encerram a busca com `None`.
    fn walk<F: FrameSource>(&mut self, va: usize, mut alloc: Option<&mut F>) -> Option<&mut Entry> {
        if self.root == 0 {
            throw("(MM) walk sem PML4");
        }
        let mut table = self.root;
        for lvl in (2..=PAGE_LEVELS).rev() {
            // SAFETY: `table` é a raiz ou veio de uma entrada presente
            let pe = unsafe { Self::entry_at(table, page_entry_idx(va, lvl)) };
            if !pe.present() {
                let frames = alloc.as_deref_mut()?;
                *pe = Entry::new(frames.alloc_frame(), PteFlags::USER_RW);
            }
            table = pe.addr();
        }
        // SAFETY: `table` é uma PT presente
        Some(unsafe { Self::entry_at(table, page_entry_idx(va, 1)) })
    }

    /// Mapeia páginas zeradas novas em `[va, va + size)`.
    ///
    /// Remapear uma entrada presente é fatal.
    pub fn mmap<F: FrameSource>(&mut self, va: usize, size: usize, perm: PteFlags, frames: &mut F) {
        for p in pages(va, size) {
            let pte = match self.walk(p, Some(&mut *frames)) {
                Some(pte) => pte,
                None => throw("(MM) mmap: walk falhou"),
            };
            if pte.present() {
                throw("(MM) mmap remap");
            }
            *pte = Entry::new(frames.alloc_frame(), perm | PteFlags::PRESENT);
        }
    }

    /// Desfaz o mapeamento e libera as páginas de `[va, va + size)`.
    ///
    /// Páginas não presentes são ignoradas. Retorna quantas foram liberadas.
    pub fn munmap<F: FrameSource>(&mut self, va: usize, size: usize, frames: &mut F) -> usize {
        let mut freed = 0;
        for p in pages(va, size) {
            let Some(pte) = self.walk::<F>(p, None) else {
                continue;
            };
            if !pte.present() {
                continue;
            }
            let pa = pte.addr();
            pte.clear();
            frames.free_frame(pa);
            freed += 1;
        }
        freed
    }

    /// Instala `[va, va + size)` -> `[pa, pa + size)` sem alocar páginas
    /// folha (registradores de dispositivo, framebuffer, identidade).
    pub fn fixmap<F: FrameSource>(&mut self, va: usize, pa: usize, size: usize, perm: PteFlags, frames: &mut F) {
        let mut pa = page_round_down(pa);
        for p in pages(va, size) {
            let pte = match self.walk(p, Some(&mut *frames)) {
                Some(pte) => pte,
                None => throw("(MM) fixmap: walk falhou"),
            };
            if pte.present() {
                throw("(MM) fixmap remap");
            }
            *pte = Entry::new(pa, perm | PteFlags::PRESENT);
            pa += PAGE_SIZE;
        }
    }

    /// Endereço físico de `va`, se mapeado.
    pub fn translate(&mut self, va: usize) -> Option<usize> {
        let pte = self.walk::<NoFrames>(va, None)?;
        pte.present().then(|| pte.addr() + (va & (PAGE_SIZE - 1)))
    }
}

/// Fonte vazia para buscas que nunca alocam.
enum NoFrames {}

impl FrameSource for NoFrames {
    fn alloc_frame(&mut self) -> usize {
        match *self {}
    }

    fn free_frame(&mut self, _pa: usize) {
        match *self {}
    }
}
