/// Arquivo: core/boot/cmdline.rs
///
/// Propósito: Linha de comando do kernel e pilha inicial do runtime.
/// A linha de comando (separada por espaços) vira o argv do runtime
/// hospedado, que recebe a pilha inicial no formato do Linux:
///
/// ```text
/// sp -> argc
///       argv[0..argc], NULL
///       envp[0..], NULL
///       auxv (AT_PAGESZ, PAGE_SIZE), (AT_NULL, 0)
///       strings...
/// ```
///
/// Detalhes de Implementação:
/// - Sem heap: tudo é escrito numa região da própria pilha do usuário.
/// - Endereços da região são endereços virtuais (mapeamento identidade).
use core::mem::size_of;

/// Máximo de argumentos repassados ao runtime.
pub const MAX_ARGS: usize = 16;

/// Ambiente fixo do runtime hospedado.
pub const ENVIRONMENT: [&[u8]; 2] = [b"TERM=xterm", b"GODEBUG=asyncpreemptoff=1"];

/// Espaço reservado no topo da pilha de usuário para argv/envp/auxv.
pub const ARGS_AREA_SIZE: usize = 1024;

pub const AT_NULL: usize = 0;
pub const AT_PAGESZ: usize = 6;

/// Divide a linha de comando em palavras (espaços múltiplos ignorados).
pub fn split_args(cmdline: &[u8]) -> impl Iterator<Item = &[u8]> {
    cmdline
        .split(|&b| b == b' ')
        .filter(|w| !w.is_empty())
        .take(MAX_ARGS)
}

/// Região insuficiente para a pilha inicial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaTooSmall;

/// Escreve argc/argv/envp/auxv no início de `area`.
///
/// Retorna o número de bytes usados. O stack pointer inicial do runtime é
/// `area.as_ptr()` (deve estar alinhado a 16).
pub fn prepare_args(area: &mut [u8], cmdline: &[u8], page_size: usize) -> Result<usize, AreaTooSmall> {
    let base = area.as_ptr() as usize;
    let argc = split_args(cmdline).count();
    let nwords = 1 + (argc + 1) + (ENVIRONMENT.len() + 1) + 4;
    let mut words = [0usize; 1 + MAX_ARGS + 1 + 3 + 4];

    let mut str_off = nwords * size_of::<usize>();
    let mut put_str = |area: &mut [u8], s: &[u8]| -> Result<usize, AreaTooSmall> {
        let end = str_off + s.len() + 1;
        if end > area.len() {
            return Err(AreaTooSmall);
        }
        area[str_off..str_off + s.len()].copy_from_slice(s);
        area[str_off + s.len()] = 0;
        let addr = base + str_off;
        str_off = end;
        Ok(addr)
    };

    let mut w = 0;
    words[w] = argc;
    w += 1;
    for arg in split_args(cmdline) {
        words[w] = put_str(area, arg)?;
        w += 1;
    }
    words[w] = 0;
    w += 1;
    for env in ENVIRONMENT {
        words[w] = put_str(area, env)?;
        w += 1;
    }
    words[w] = 0;
    w += 1;
    for v in [AT_PAGESZ, page_size, AT_NULL, 0] {
        words[w] = v;
        w += 1;
    }
    debug_assert_eq!(w, nwords);

    for (i, v) in words[..nwords].iter().enumerate() {
        let off = i * size_of::<usize>();
        area[off..off + size_of::<usize>()].copy_from_slice(&v.to_ne_bytes());
    }
    Ok(str_off)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(area: &[u8], i: usize) -> usize {
        let off = i * 8;
        usize::from_ne_bytes(area[off..off + 8].try_into().unwrap())
    }

    unsafe fn cstr(addr: usize) -> &'static [u8] {
        let p = addr as *const u8;
        let mut n = 0;
        while *p.add(n) != 0 {
            n += 1;
        }
        core::slice::from_raw_parts(p, n)
    }

    #[test]
    fn splits_on_spaces() {
        let args: alloc::vec::Vec<&[u8]> = split_args(b"  sh  -c   ls ").collect();
        assert_eq!(args, [&b"sh"[..], b"-c", b"ls"]);
    }

    #[test]
    fn builds_linux_initial_stack() {
        let mut area = [0u8; ARGS_AREA_SIZE];
        let used = prepare_args(&mut area, b"init -v", 4096).unwrap();
        assert!(used <= ARGS_AREA_SIZE);

        assert_eq!(word(&area, 0), 2);
        assert_eq!(unsafe { cstr(word(&area, 1)) }, b"init");
        assert_eq!(unsafe { cstr(word(&area, 2)) }, b"-v");
        assert_eq!(word(&area, 3), 0);
        assert_eq!(unsafe { cstr(word(&area, 4)) }, b"TERM=xterm");
        assert_eq!(unsafe { cstr(word(&area, 5)) }, b"GODEBUG=asyncpreemptoff=1");
        assert_eq!(word(&area, 6), 0);
        assert_eq!(word(&area, 7), AT_PAGESZ);
        assert_eq!(word(&area, 8), 4096);
        assert_eq!(word(&area, 9), AT_NULL);
    }

    #[test]
    fn empty_cmdline_gives_argc_zero() {
        let mut area = [0u8; ARGS_AREA_SIZE];
        prepare_args(&mut area, b"", 4096).unwrap();
        assert_eq!(word(&area, 0), 0);
        assert_eq!(word(&area, 1), 0);
    }

    #[test]
    fn area_too_small() {
        let mut area = [0u8; 64];
        assert_eq!(prepare_args(&mut area, b"a b c", 4096), Err(AreaTooSmall));
    }
}
