//! Syscalls de sinais.

use super::abi::{read_user_opt, write_user_opt, SyscallArgs};
use super::error::{Errno, SysResult};
use crate::arch::TrapFrame;
use crate::sched::signal::{self, MaskHow, SigAction, StackT, ACTIONS};
use crate::sched::{self, ThreadId};

/// `rt_sigaction(sig, act, oldact, sigsetsize)`
pub fn sys_rt_sigaction(_tf: &mut TrapFrame, a: &SyscallArgs) -> SysResult {
    let new: Option<SigAction> = read_user_opt(a.arg2)?;
    let old = ACTIONS.lock().sigaction(a.arg1, new.as_ref())?;
    write_user_opt(a.arg3, old)?;
    Ok(0)
}

/// `rt_sigprocmask(how, set, oldset, sigsetsize)`
///
/// `how` só é validado quando há um conjunto novo.
pub fn sys_rt_sigprocmask(_tf: &mut TrapFrame, a: &SyscallArgs) -> SysResult {
    let set: Option<u64> = read_user_opt(a.arg2)?;
    let how = match set {
        Some(_) => MaskHow::from_raw(a.arg1)?,
        None => MaskHow::Block,
    };
    let old = sched::with_current(|t| t.signal.procmask(how, set)).ok_or(Errno::ESRCH)?;
    write_user_opt(a.arg3, old)?;
    Ok(0)
}

/// `sigaltstack(ss, old_ss)`
pub fn sys_sigaltstack(_tf: &mut TrapFrame, a: &SyscallArgs) -> SysResult {
    let new: Option<StackT> = read_user_opt(a.arg1)?;
    let old = sched::with_current(|t| t.signal.sigaltstack(new.as_ref())).ok_or(Errno::ESRCH)??;
    write_user_opt(a.arg2, old)?;
    Ok(0)
}

/// Volta do handler: o resultado é o RAX do frame interrompido.
pub fn sys_rt_sigreturn(tf: &mut TrapFrame, _a: &SyscallArgs) -> SysResult {
    sched::with_current(|t| signal::rt_sigreturn(tf, &mut t.signal)).ok_or(Errno::ESRCH)
}

fn kill(tid: usize, sig: usize) -> SysResult {
    match sched::with_thread(ThreadId::new(tid), |t| t.signal.raise(sig)) {
        Some(r) => r.map(|_| 0),
        None => Err(Errno::ESRCH),
    }
}

/// `tgkill(tgid, tid, sig)`: marca pendente; entrega no fim do trap.
pub fn sys_tgkill(_tf: &mut TrapFrame, a: &SyscallArgs) -> SysResult {
    kill(a.arg2, a.arg3)
}

pub fn sys_tkill(_tf: &mut TrapFrame, a: &SyscallArgs) -> SysResult {
    kill(a.arg1, a.arg2)
}
