//! # Funções de Alinhamento de Memória
//!
//! `align` deve ser potência de dois.

/// Alinha um valor para cima ao próximo múltiplo de `align`.
#[inline(always)]
pub const fn align_up(val: usize, align: usize) -> usize {
    (val + align - 1) & !(align - 1)
}

/// `align_up` que devolve `None` quando o resultado não cabe em `usize`.
#[inline(always)]
pub const fn checked_align_up(val: usize, align: usize) -> Option<usize> {
    match val.checked_add(align - 1) {
        Some(v) => Some(v & !(align - 1)),
        None => None,
    }
}

/// Alinha um valor para baixo ao múltiplo anterior de `align`.
#[inline(always)]
pub const fn align_down(val: usize, align: usize) -> usize {
    val & !(align - 1)
}

/// Verifica se um valor está alinhado a `align`.
#[inline(always)]
pub const fn is_aligned(val: usize, align: usize) -> bool {
    val & (align - 1) == 0
}
