//! # Configuração do Módulo de Memória
//!
//! Layout físico e virtual usado pelo kernel.

// =============================================================================
// CONSTANTES DE TAMANHO
// =============================================================================

/// Tamanho de uma página (4 KiB)
pub const PAGE_SIZE: usize = 4096;

/// Bits de offset dentro de uma página
pub const PAGE_SHIFT: usize = 12;

/// Entradas por tabela de páginas
pub const ENTRIES_PER_TABLE: usize = PAGE_SIZE / core::mem::size_of::<u64>();

/// Níveis da árvore de paginação (PML4 -> PDPT -> PD -> PT)
pub const PAGE_LEVELS: usize = 4;

// =============================================================================
// LAYOUT DE MEMÓRIA FÍSICA
// =============================================================================

/// Início da memória gerenciada: 1..100 MiB ficam reservados para a imagem
/// do kernel e o que o bootloader carregou junto.
pub const MEMSTART: usize = 100 << 20;

/// Topo da memória física quando o bootloader não informa um mapa.
pub const DEFAULT_MEMTOP: usize = 256 << 20;

// =============================================================================
// LAYOUT DE MEMÓRIA VIRTUAL
// =============================================================================

/// Início do espaço virtual servido por `sbrk`. Tudo abaixo é identidade.
pub const VMSTART: usize = 1 << 30;

/// Fim da metade baixa canônica: nenhuma faixa pedida pelo runtime passa
/// daqui.
pub const USER_VA_END: usize = 1 << 47;

/// Heap do kernel (objetos de colaboradores e tabelas dos autotestes)
pub const HEAP_SIZE: usize = 4 << 20;

/// Arredonda para cima até a próxima página.
#[inline(always)]
pub const fn page_round_up(v: usize) -> usize {
    crate::klib::align_up(v, PAGE_SIZE)
}

/// `page_round_up` sem estouro: `None` se não couber.
#[inline(always)]
pub const fn checked_page_round_up(v: usize) -> Option<usize> {
    crate::klib::checked_align_up(v, PAGE_SIZE)
}

/// Arredonda para baixo até o início da página.
#[inline(always)]
pub const fn page_round_down(v: usize) -> usize {
    crate::klib::align_down(v, PAGE_SIZE)
}
