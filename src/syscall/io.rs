//! I/O embutido: console serial, pipes e getrandom.
//!
//! As mesmas funções atendem a chamada de duas formas. Antes do bootstrap
//! terminar elas rodam no próprio trap. Depois disso são handlers
//! encaminhados, registrados por `register_builtins`.

use core::sync::atomic::{AtomicU64, Ordering};

use super::abi::{user_slice, user_slice_mut, write_user, SyscallArgs, SyscallRequest};
use super::error::{Errno, SysResult};
use super::numbers::*;
use super::registry::register_syscall;
use crate::arch::TrapFrame;
use crate::drivers::serial;
use crate::ipc::pipe;

pub const STDOUT: usize = 1;
pub const STDERR: usize = 2;

/// Função de I/O independente de frame.
pub type IoFn = fn(&SyscallArgs) -> SysResult;

pub fn write(a: &SyscallArgs) -> SysResult {
    let (fd, buf) = (a.arg1, user_slice(a.arg2, a.arg3)?);
    match fd {
        STDOUT | STDERR => {
            serial::write_bytes(buf);
            Ok(buf.len())
        }
        _ if pipe::is_pipe(fd) => pipe::write(fd, buf),
        _ => Err(Errno::EBADF),
    }
}

/// Sem dispositivos de entrada no núcleo: quem não é pipe não tem dados.
pub fn read(a: &SyscallArgs) -> SysResult {
    let fd = a.arg1;
    if pipe::is_pipe(fd) {
        return pipe::read(fd, user_slice_mut(a.arg2, a.arg3)?);
    }
    Err(Errno::EAGAIN)
}

pub fn close(a: &SyscallArgs) -> SysResult {
    let fd = a.arg1;
    if pipe::is_pipe(fd) {
        return pipe::close(fd);
    }
    Ok(0)
}

/// `pipe2(fds, flags)`: as pontas já são não bloqueantes.
pub fn pipe2(a: &SyscallArgs) -> SysResult {
    let (r, w) = pipe::pipe2()?;
    write_user(a.arg1, [r as i32, w as i32])?;
    Ok(0)
}

pub fn open(_a: &SyscallArgs) -> SysResult {
    Err(Errno::ENOENT)
}

pub fn denied(_a: &SyscallArgs) -> SysResult {
    Err(Errno::EPERM)
}

pub fn zero(_a: &SyscallArgs) -> SysResult {
    Ok(0)
}

// =============================================================================
// GETRANDOM
// =============================================================================

/// Gerador xorshift64. Não é criptográfico; o runtime só o usa para
/// semear hashes.
pub struct XorShift64(u64);

impl XorShift64 {
    pub const fn new(seed: u64) -> Self {
        Self(if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed })
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    pub fn fill(&mut self, buf: &mut [u8]) {
        for chunk in buf.chunks_mut(8) {
            let v = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&v[..chunk.len()]);
        }
    }
}

// Estado do gerador (0 = ainda não semeado)
static RNG_STATE: AtomicU64 = AtomicU64::new(0);

/// `getrandom(buf, len, flags)`: semeado pelos ticks no primeiro uso.
pub fn getrandom(a: &SyscallArgs) -> SysResult {
    let buf = user_slice_mut(a.arg1, a.arg2)?;
    let mut seed = RNG_STATE.load(Ordering::Relaxed);
    if seed == 0 {
        seed = crate::core::time::get_jiffies().wrapping_mul(0x2545_F491_4F6C_DD1D);
    }
    let mut rng = XorShift64::new(seed);
    rng.fill(buf);
    RNG_STATE.store(rng.next_u64(), Ordering::Relaxed);
    Ok(buf.len())
}

// =============================================================================
// ADAPTADORES
// =============================================================================

/// Atende uma requisição encaminhada com `f`.
pub fn serve(req: &mut SyscallRequest, f: IoFn) {
    let a = req.to_args();
    req.set(f(&a));
}

macro_rules! inline_io {
    ($($name:ident => $f:path),* $(,)?) => {
        $(
            pub fn $name(_tf: &mut TrapFrame, a: &SyscallArgs) -> SysResult {
                $f(a)
            }
        )*
    };
}

inline_io! {
    sys_write => write,
    sys_read => read,
    sys_close => close,
    sys_pipe2 => pipe2,
    sys_open => open,
    sys_denied => denied,
    sys_zero => zero,
    sys_getrandom => getrandom,
}

/// Registra o I/O embutido como handlers encaminhados.
pub fn register_builtins() {
    register_syscall(SYS_WRITE, |req| serve(req, write));
    register_syscall(SYS_READ, |req| serve(req, read));
    register_syscall(SYS_CLOSE, |req| serve(req, close));
    register_syscall(SYS_PIPE, |req| serve(req, pipe2));
    register_syscall(SYS_PIPE2, |req| serve(req, pipe2));
    register_syscall(SYS_GETRANDOM, |req| serve(req, getrandom));
    register_syscall(SYS_OPEN, |req| serve(req, open));
    register_syscall(SYS_OPENAT, |req| serve(req, open));
    register_syscall(SYS_UNAME, |req| serve(req, zero));
    register_syscall(SYS_GETPID, |req| serve(req, zero));
    register_syscall(SYS_FCNTL, |req| serve(req, denied));
    register_syscall(SYS_READLINKAT, |req| serve(req, denied));
    register_syscall(SYS_SCHED_GETAFFINITY, |req| serve(req, denied));
    crate::kinfo!("(Syscall) Handlers embutidos registrados");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(num: usize, a1: usize, a2: usize, a3: usize) -> SyscallArgs {
        SyscallArgs {
            num,
            arg1: a1,
            arg2: a2,
            arg3: a3,
            ..Default::default()
        }
    }

    #[test]
    fn console_write_reports_length() {
        let msg = b"hello\n";
        let a = args(SYS_WRITE, STDOUT, msg.as_ptr() as usize, msg.len());
        assert_eq!(write(&a), Ok(6));
        let a = args(SYS_WRITE, 77, msg.as_ptr() as usize, msg.len());
        assert_eq!(write(&a), Err(Errno::EBADF));
    }

    #[test]
    fn boot_stubs() {
        assert_eq!(read(&args(SYS_READ, 0, 0, 0)), Err(Errno::EAGAIN));
        assert_eq!(open(&SyscallArgs::default()), Err(Errno::ENOENT));
        assert_eq!(close(&args(SYS_CLOSE, 1, 0, 0)), Ok(0));
        assert_eq!(denied(&SyscallArgs::default()), Err(Errno::EPERM));
    }

    #[test]
    fn getrandom_fills_whole_buffer() {
        let mut buf = [0u8; 37];
        let a = args(SYS_GETRANDOM, buf.as_mut_ptr() as usize, buf.len(), 0);
        assert_eq!(getrandom(&a), Ok(37));
        assert!(buf.iter().any(|&b| b != 0));

        let mut again = [0u8; 37];
        let a = args(SYS_GETRANDOM, again.as_mut_ptr() as usize, again.len(), 0);
        getrandom(&a).unwrap();
        assert_ne!(buf, again);
    }

    #[test]
    fn xorshift_never_sticks_at_zero() {
        let mut rng = XorShift64::new(0);
        assert_ne!(rng.next_u64(), 0);
        let mut out = [0u8; 3];
        rng.fill(&mut out);
    }
}
