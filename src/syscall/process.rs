//! Syscalls de thread: exit, clone, gettid, yield, arch_prctl.
//!
//! O runtime é um único processo; "processo" aqui é a máquina inteira.

use super::abi::{write_user, SyscallArgs};
use super::error::{Errno, SysResult};
use crate::arch::{Cpu, CpuOps, TrapFrame};
use crate::sched;
use crate::trap::prepare_panic;

pub const ARCH_SET_FS: usize = 0x1002;
pub const ARCH_GET_FS: usize = 0x1003;

pub fn sys_exit(_tf: &mut TrapFrame, _a: &SyscallArgs) -> SysResult {
    sched::exit_current()
}

/// O processo acabou: não há para onde voltar.
pub fn sys_exit_group(_tf: &mut TrapFrame, a: &SyscallArgs) -> SysResult {
    crate::kinfo!("(Syscall) exit_group, código=", a.arg1);
    crate::kinfo!("(Syscall) kernel parado");
    Cpu::hang()
}

pub fn sys_sched_yield(_tf: &mut TrapFrame, _a: &SyscallArgs) -> SysResult {
    sched::yield_now();
    Ok(0)
}

/// `clone(flags, stack, ptid, ctid, tls)`: o filho recebe 0, o pai o tid.
pub fn sys_clone(_tf: &mut TrapFrame, a: &SyscallArgs) -> SysResult {
    let child = sched::clone(a.arg1, a.arg2, a.arg5);
    crate::ktrace!("(Syscall) clone, tid=", child.index());
    Ok(child.index())
}

pub fn sys_gettid(_tf: &mut TrapFrame, _a: &SyscallArgs) -> SysResult {
    sched::current().map(|id| id.index()).ok_or(Errno::ESRCH)
}

pub fn sys_getpid(_tf: &mut TrapFrame, _a: &SyscallArgs) -> SysResult {
    Ok(0)
}

pub fn sys_arch_prctl(_tf: &mut TrapFrame, a: &SyscallArgs) -> SysResult {
    match a.arg1 {
        ARCH_SET_FS => {
            let base = a.arg2;
            sched::with_current(|t| t.fs_base = base).ok_or(Errno::ESRCH)?;
            Cpu::set_fs_base(base);
            Ok(0)
        }
        ARCH_GET_FS => {
            let base = sched::with_current(|t| t.fs_base).ok_or(Errno::ESRCH)?;
            write_user(a.arg2, base)?;
            Ok(0)
        }
        _ => Err(Errno::EINVAL),
    }
}

/// fork/vfork/execve não existem: vira pânico do runtime, para ficar visível.
pub fn sys_unsupported_panic(tf: &mut TrapFrame, a: &SyscallArgs) -> SysResult {
    crate::kwarn!("(Syscall) chamada proibida=", a.num);
    prepare_panic(tf);
    Ok(0)
}

/// Resposta fixa para quem pergunta quantas CPUs existem: -1 faz o
/// runtime assumir uma só.
pub fn sys_sched_getaffinity(_tf: &mut TrapFrame, _a: &SyscallArgs) -> SysResult {
    Err(Errno::EPERM)
}
