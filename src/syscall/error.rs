//! Codificação do resultado numa única palavra.
//!
//! Valores em `[-4095, -1]` (vistos como `usize`) são `-errno`; qualquer
//! outro valor é sucesso. É a convenção que o runtime espera em RAX.

pub use crate::sys::{Errno, SysResult};

/// Maior errno representável na palavra de retorno.
pub const MAX_ERRNO: usize = 4095;

/// Resultado reservado de um handler encaminhado: "isto merece um pânico".
pub const KERNEL_PANIC_SENTINEL: usize = usize::MAX;

/// Converte um resultado na palavra devolvida em RAX.
#[inline]
pub fn encode(r: SysResult) -> usize {
    match r {
        Ok(v) => v,
        Err(e) => e.as_word(),
    }
}

/// A palavra carrega um `-errno`?
#[inline]
pub fn is_error(word: usize) -> bool {
    word > usize::MAX - MAX_ERRNO
}

/// Inverso de `encode` (errnos desconhecidos viram EINVAL).
pub fn decode(word: usize) -> SysResult {
    if !is_error(word) {
        return Ok(word);
    }
    let errno = (word as isize).unsigned_abs() as i32;
    Err(Errno::from_i32(errno).unwrap_or(Errno::EINVAL))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_words_are_negated_errno() {
        assert_eq!(encode(Err(Errno::EAGAIN)) as isize, -11);
        assert_eq!(encode(Err(Errno::ENOSYS)) as isize, -38);
        assert_eq!(encode(Ok(0x1234)), 0x1234);
    }

    #[test]
    fn top_range_is_error() {
        assert!(is_error(encode(Err(Errno::EPERM))));
        assert!(is_error(-4095isize as usize));
        assert!(!is_error(-4096isize as usize));
        // endereços altos de mmap continuam sendo sucesso
        assert!(!is_error(0xFFFF_8000_0000_0000));
        assert!(!is_error(0));
    }

    #[test]
    fn decode_recovers_errno() {
        assert_eq!(decode(encode(Err(Errno::EPIPE))), Err(Errno::EPIPE));
        assert_eq!(decode(42), Ok(42));
        assert_eq!(decode(-4000isize as usize), Err(Errno::EINVAL));
    }
}
