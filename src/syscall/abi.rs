//! ABI de Syscalls (x86_64, convenção Linux)
//!
//! | Registrador | Uso |
//! |-------------|-----|
//! | RAX | Número / retorno (valor ou -errno) |
//! | RDI, RSI, RDX, R10, R8, R9 | Argumentos 1..6 |
//!
//! Invocação: `int 0x80` (gate com DPL 3).

use core::sync::atomic::{AtomicBool, Ordering};

use super::error::{encode, Errno, SysResult};
use crate::arch::TrapFrame;
use crate::sched::{self, key_of, SleepKey};

/// Máximo de argumentos suportados por syscall
pub const MAX_SYSCALL_ARGS: usize = 6;

/// Argumentos de uma syscall atendida no próprio trap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyscallArgs {
    /// Número da syscall (RAX)
    pub num: usize,
    pub arg1: usize,
    pub arg2: usize,
    pub arg3: usize,
    pub arg4: usize,
    pub arg5: usize,
    pub arg6: usize,
}

impl SyscallArgs {
    pub fn from_frame(tf: &TrapFrame) -> Self {
        let [arg1, arg2, arg3, arg4, arg5, arg6] = tf.syscall_args();
        Self {
            num: tf.rax,
            arg1,
            arg2,
            arg3,
            arg4,
            arg5,
            arg6,
        }
    }
}

/// Uma chamada em andamento.
///
/// Vive na pilha de kernel de quem fez a syscall enquanto ela é atendida
/// por outra thread. O chamador dorme no endereço de `lock` até `done()`.
#[repr(C)]
pub struct SyscallRequest {
    pub no: usize,
    pub args: [usize; MAX_SYSCALL_ARGS],
    pub ret: usize,
    /// Apenas identidade: o endereço é a chave de sleep
    lock: usize,
    completed: AtomicBool,
}

impl SyscallRequest {
    pub const fn new(no: usize, args: [usize; MAX_SYSCALL_ARGS]) -> Self {
        Self {
            no,
            args,
            ret: 0,
            lock: 0,
            completed: AtomicBool::new(false),
        }
    }

    pub fn from_frame(tf: &TrapFrame) -> Self {
        Self::new(tf.rax, tf.syscall_args())
    }

    pub fn to_args(&self) -> SyscallArgs {
        let [arg1, arg2, arg3, arg4, arg5, arg6] = self.args;
        SyscallArgs {
            num: self.no,
            arg1,
            arg2,
            arg3,
            arg4,
            arg5,
            arg6,
        }
    }

    /// Argumento `i` (0-based) na ordem da ABI.
    #[inline]
    pub fn arg(&self, i: usize) -> usize {
        self.args[i]
    }

    pub fn set_result(&mut self, v: usize) {
        self.ret = v;
    }

    pub fn set_error(&mut self, e: Errno) {
        self.ret = e.as_word();
    }

    pub fn set(&mut self, r: SysResult) {
        self.ret = encode(r);
    }

    pub fn key(&self) -> SleepKey {
        key_of(&self.lock)
    }

    /// Sinaliza conclusão e acorda o chamador.
    pub fn done(&self) {
        self.completed.store(true, Ordering::Release);
        sched::wakeup(self.key(), 1);
    }

    pub fn is_done(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }
}

// =============================================================================
// ACESSO À MEMÓRIA DO RUNTIME
// =============================================================================
//
// Kernel e runtime compartilham o espaço de endereçamento: um ponteiro do
// runtime é desreferenciado diretamente. Só o ponteiro nulo é rejeitado.

/// Lê um `T` do endereço `addr`.
pub fn read_user<T: Copy>(addr: usize) -> SysResult<T> {
    if addr == 0 {
        return Err(Errno::EFAULT);
    }
    // SAFETY: espaço de endereçamento único; o runtime responde pelo ponteiro
    Ok(unsafe { core::ptr::read_unaligned(addr as *const T) })
}

/// Como `read_user`, mas nulo significa "argumento ausente".
pub fn read_user_opt<T: Copy>(addr: usize) -> SysResult<Option<T>> {
    if addr == 0 {
        return Ok(None);
    }
    read_user(addr).map(Some)
}

/// Escreve `v` em `addr`.
pub fn write_user<T>(addr: usize, v: T) -> SysResult<()> {
    if addr == 0 {
        return Err(Errno::EFAULT);
    }
    // SAFETY: ver `read_user`
    unsafe { core::ptr::write_unaligned(addr as *mut T, v) };
    Ok(())
}

/// Escreve `v` em `addr` se o ponteiro não for nulo.
pub fn write_user_opt<T>(addr: usize, v: T) -> SysResult<()> {
    if addr == 0 {
        return Ok(());
    }
    write_user(addr, v)
}

/// Buffer `[addr, addr + len)` do runtime.
pub fn user_slice<'a>(addr: usize, len: usize) -> SysResult<&'a [u8]> {
    if len == 0 {
        return Ok(&[]);
    }
    if addr == 0 {
        return Err(Errno::EFAULT);
    }
    // SAFETY: ver `read_user`
    Ok(unsafe { core::slice::from_raw_parts(addr as *const u8, len) })
}

pub fn user_slice_mut<'a>(addr: usize, len: usize) -> SysResult<&'a mut [u8]> {
    if len == 0 {
        return Ok(&mut []);
    }
    if addr == 0 {
        return Err(Errno::EFAULT);
    }
    // SAFETY: ver `read_user`
    Ok(unsafe { core::slice::from_raw_parts_mut(addr as *mut u8, len) })
}
