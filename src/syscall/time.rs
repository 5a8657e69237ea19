//! Syscalls de tempo.

use super::abi::{read_user, write_user, SyscallArgs};
use super::error::{Errno, SysResult};
use crate::arch::TrapFrame;
use crate::core::time::{self, Timespec};

pub const CLOCK_REALTIME: usize = 0;
pub const CLOCK_MONOTONIC: usize = 1;
pub const CLOCK_MONOTONIC_RAW: usize = 4;
pub const CLOCK_BOOTTIME: usize = 7;

/// Leitura do relógio `id`. Relógios desconhecidos usam o de parede.
pub fn read_clock(id: usize) -> Timespec {
    match id {
        CLOCK_MONOTONIC | CLOCK_MONOTONIC_RAW | CLOCK_BOOTTIME => Timespec::from_nanos(time::nanosecond()),
        _ => time::clocktime(),
    }
}

pub fn sys_clock_gettime(_tf: &mut TrapFrame, a: &SyscallArgs) -> SysResult {
    write_user(a.arg2, read_clock(a.arg1))?;
    Ok(0)
}

/// `nanosleep(req, rem)`: `rem` nunca é escrito (não há interrupção).
pub fn sys_nanosleep(_tf: &mut TrapFrame, a: &SyscallArgs) -> SysResult {
    let req: Timespec = read_user(a.arg1)?;
    if !req.is_valid_duration() {
        return Err(Errno::EINVAL);
    }
    time::nanosleep(&req);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nanosleep_with(req: &Timespec) -> SysResult {
        let args = SyscallArgs {
            arg1: req as *const Timespec as usize,
            ..SyscallArgs::default()
        };
        sys_nanosleep(&mut TrapFrame::default(), &args)
    }

    #[test]
    fn nanosleep_rejects_malformed_durations() {
        assert_eq!(nanosleep_with(&Timespec::new(-1, 0)), Err(Errno::EINVAL));
        assert_eq!(nanosleep_with(&Timespec::new(0, -5)), Err(Errno::EINVAL));
        assert_eq!(nanosleep_with(&Timespec::new(0, 1_000_000_000)), Err(Errno::EINVAL));
    }

    #[test]
    fn huge_sleep_deadline_saturates() {
        let req = Timespec::new(1 << 62, 0);
        assert!(req.is_valid_duration());
        assert_eq!(time::timer::deadline_after(time::nanosecond(), &req), i64::MAX);
    }
}
