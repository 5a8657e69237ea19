//! Pool de blocos de tamanho fixo.
//!
//! Cresce uma página por vez e nunca devolve páginas. Os blocos livres
//! formam uma lista encadeada dentro deles mesmos. Usado para objetos que
//! vivem no caminho de trap (nós do epoll), onde o heap não pode entrar.

use core::mem::size_of;

use super::config::PAGE_SIZE;
use crate::klib::align_up;

pub struct Pool {
    size: usize,
    head: usize,
}

impl Pool {
    /// Pool de blocos de `size` bytes (alinhado ao tamanho de ponteiro).
    pub const fn new(size: usize) -> Self {
        let size = align_up(size, size_of::<usize>());
        assert!(size <= PAGE_SIZE);
        Self { size, head: 0 }
    }

    pub fn block_size(&self) -> usize {
        self.size
    }

    fn grow(&mut self) {
        let start = super::alloc();
        let end = start + PAGE_SIZE;
        let mut v = start;
        while v + self.size <= end {
            self.free(v);
            v += self.size;
        }
    }

    /// Um bloco zerado.
    pub fn alloc(&mut self) -> usize {
        if self.head == 0 {
            self.grow();
        }
        let ret = self.head;
        // SAFETY: blocos livres guardam o próximo no primeiro word
        self.head = unsafe { *(ret as *const usize) };
        unsafe { core::ptr::write_bytes(ret as *mut u8, 0, self.size) };
        ret
    }

    pub fn free(&mut self, ptr: usize) {
        // SAFETY: o bloco veio deste pool e não está mais em uso
        unsafe { *(ptr as *mut usize) = self.head };
        self.head = ptr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_pointer_aligned() {
        assert_eq!(Pool::new(1).block_size(), 8);
        assert_eq!(Pool::new(24).block_size(), 24);
        assert_eq!(Pool::new(25).block_size(), 32);
    }

    #[test]
    fn blocks_are_distinct_and_zeroed() {
        let mut pool = Pool::new(48);
        let a = pool.alloc();
        unsafe { core::ptr::write_bytes(a as *mut u8, 0xFF, 48) };
        let b = pool.alloc();
        assert_ne!(a, b);
        assert!(a.abs_diff(b) >= 48);

        pool.free(a);
        let c = pool.alloc();
        assert_eq!(c, a);
        let bytes = unsafe { core::slice::from_raw_parts(c as *const u8, 48) };
        assert!(bytes.iter().all(|&x| x == 0));
    }

    #[test]
    fn grows_past_one_page() {
        let mut pool = Pool::new(1024);
        let blocks: alloc::vec::Vec<usize> = (0..6).map(|_| pool.alloc()).collect();
        for (i, a) in blocks.iter().enumerate() {
            for b in &blocks[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
