//! Fast Userspace Mutex
//!
//! A chave de sleep é o próprio endereço da palavra. Esperas com timeout
//! dormem na chave do tick e rechecam a palavra e o prazo a cada tick.

use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

use volatile::VolatilePtr;

use crate::core::time::{nanosecond, tick_key, timer::deadline_after, Timespec};
use crate::sched::{self, key_of, SleepKey};
use crate::sys::{Errno, SysResult};

pub const FUTEX_WAIT: usize = 0;
pub const FUTEX_WAKE: usize = 1;
pub const FUTEX_PRIVATE_FLAG: usize = 128;
pub const FUTEX_CLOCK_REALTIME: usize = 256;
pub const FUTEX_WAIT_PRIVATE: usize = FUTEX_WAIT | FUTEX_PRIVATE_FLAG;
pub const FUTEX_WAKE_PRIVATE: usize = FUTEX_WAKE | FUTEX_PRIVATE_FLAG;

/// Bits de `op` que escolhem a operação.
pub const FUTEX_CMD_MASK: usize = !(FUTEX_PRIVATE_FLAG | FUTEX_CLOCK_REALTIME);

/// Leitura volátil da palavra do runtime.
fn load(addr: usize) -> SysResult<u32> {
    let ptr = NonNull::new(addr as *mut u32).ok_or(Errno::EFAULT)?;
    // SAFETY: espaço de endereçamento único; alinhamento checado em `futex`
    Ok(unsafe { VolatilePtr::new_read_only(ptr) }.read())
}

/// `futex(addr, op, val, timeout)`
pub fn futex(addr: usize, op: usize, val: u32, timeout: Option<Timespec>) -> SysResult {
    if addr % core::mem::size_of::<u32>() != 0 {
        return Err(Errno::EINVAL);
    }
    match op & FUTEX_CMD_MASK {
        FUTEX_WAIT => wait(addr, val, timeout),
        FUTEX_WAKE => Ok(sched::wakeup(addr, val as i32 as isize)),
        _ => Err(Errno::ENOSYS),
    }
}

/// Dorme enquanto `*addr == val`.
///
/// Retornos espúrios são permitidos: o runtime sempre reconfere a palavra.
fn wait(addr: usize, val: u32, timeout: Option<Timespec>) -> SysResult {
    if timeout.is_some_and(|ts| !ts.is_valid_duration()) {
        return Err(Errno::EINVAL);
    }
    if load(addr)? != val {
        return Err(Errno::EAGAIN);
    }
    let Some(ts) = timeout else {
        sched::sleepon(addr);
        return Ok(0);
    };
    let deadline = deadline_after(nanosecond(), &ts);
    loop {
        if load(addr)? != val {
            return Ok(0);
        }
        if nanosecond() >= deadline {
            return Err(Errno::ETIMEDOUT);
        }
        sched::sleepon(tick_key());
    }
}

// =============================================================================
// NOTE
// =============================================================================

/// Evento de um disparo: quem dorme acorda quando alguém chama `wakeup`.
///
/// Fica disparado até `clear`.
pub struct Note(AtomicUsize);

impl Note {
    pub const fn new() -> Self {
        Self(AtomicUsize::new(0))
    }

    pub fn key(&self) -> SleepKey {
        key_of(self)
    }

    pub fn clear(&self) {
        self.0.store(0, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire) != 0
    }

    /// Dispara e acorda todos os que dormem na nota.
    pub fn wakeup(&self) {
        self.0.store(1, Ordering::Release);
        sched::wakeup(self.key(), -1);
    }

    /// Dorme até o disparo ou até `deadline` (ns monotônicos).
    ///
    /// Retorna `false` se o prazo venceu antes.
    pub fn sleep(&self, deadline: Option<i64>) -> bool {
        self.sleep_with(deadline, sched::sleepon)
    }

    /// `sleep` com a forma de dormir dada por `park` (recebe a chave).
    pub fn sleep_with(&self, deadline: Option<i64>, mut park: impl FnMut(SleepKey)) -> bool {
        loop {
            if self.is_set() {
                return true;
            }
            match deadline {
                None => park(self.key()),
                Some(d) if nanosecond() >= d => return false,
                Some(_) => park(tick_key()),
            }
        }
    }
}

impl Default for Note {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_on_changed_word_is_eagain() {
        let word: u32 = 7;
        let addr = &word as *const u32 as usize;
        assert_eq!(futex(addr, FUTEX_WAIT_PRIVATE, 8, None), Err(Errno::EAGAIN));
    }

    #[test]
    fn wait_with_expired_timeout() {
        let word: u32 = 1;
        let addr = &word as *const u32 as usize;
        let ts = Timespec::new(0, 0);
        assert_eq!(futex(addr, FUTEX_WAIT, 1, Some(ts)), Err(Errno::ETIMEDOUT));
    }

    #[test]
    fn malformed_timeout_is_einval() {
        let word: u32 = 1;
        let addr = &word as *const u32 as usize;
        for ts in [Timespec::new(0, -1), Timespec::new(0, 1_000_000_000), Timespec::new(-1, 0)] {
            assert_eq!(futex(addr, FUTEX_WAIT, 1, Some(ts)), Err(Errno::EINVAL));
        }
        // prazo enorme é válido; com a palavra já mudada nem chega a dormir
        let far = Timespec::new(1 << 62, 0);
        assert_eq!(futex(addr, FUTEX_WAIT, 2, Some(far)), Err(Errno::EAGAIN));
    }

    #[test]
    fn wake_without_sleepers_wakes_none() {
        let word: u32 = 0;
        let addr = &word as *const u32 as usize;
        assert_eq!(futex(addr, FUTEX_WAKE_PRIVATE, 1, None), Ok(0));
    }

    #[test]
    fn bad_arguments() {
        assert_eq!(futex(0x1002, FUTEX_WAKE, 1, None), Err(Errno::EINVAL));
        assert_eq!(futex(0, FUTEX_WAIT, 0, None), Err(Errno::EFAULT));
        let word: u32 = 0;
        assert_eq!(futex(&word as *const u32 as usize, 9, 0, None), Err(Errno::ENOSYS));
    }

    #[test]
    fn note_fires_until_cleared() {
        let n = Note::new();
        assert!(!n.sleep(Some(0)));
        n.wakeup();
        assert!(n.is_set());
        assert!(n.sleep(None));
        n.clear();
        assert!(!n.is_set());
    }
}
