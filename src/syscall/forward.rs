//! Encaminhamento de syscalls para o serviço.
//!
//! A caixa `PENDING` guarda no máximo uma chamada. Quem chega com a caixa
//! ocupada dorme nela e tenta de novo. O serviço esvazia a caixa, acorda o
//! próximo publicador e roda o handler; o chamador dorme no `lock` da
//! própria requisição até `done()`.

use core::sync::atomic::{AtomicUsize, Ordering};

use super::abi::SyscallRequest;
use crate::sched::{self, key_of, SleepKey};

/// Caixa de um ocupante (0 = vazia).
pub struct Mailbox(AtomicUsize);

impl Mailbox {
    pub const fn new() -> Self {
        Self(AtomicUsize::new(0))
    }

    /// Publica `req` se a caixa estiver vazia.
    pub fn try_publish(&self, req: *mut SyscallRequest) -> bool {
        self.0
            .compare_exchange(0, req as usize, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Retira o ocupante, se houver.
    pub fn take(&self) -> Option<*mut SyscallRequest> {
        match self.0.swap(0, Ordering::AcqRel) {
            0 => None,
            p => Some(p as *mut SyscallRequest),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.load(Ordering::Acquire) == 0
    }

    pub fn key(&self) -> SleepKey {
        key_of(self)
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

static PENDING: Mailbox = Mailbox::new();

/// Publica `req`, acorda o serviço e dorme até a conclusão.
pub fn forward_call(req: &mut SyscallRequest) {
    let ptr = req as *mut SyscallRequest;
    while !PENDING.try_publish(ptr) {
        sched::sleepon(PENDING.key());
    }
    // o serviço e outros publicadores dormem na mesma chave
    sched::wakeup(PENDING.key(), -1);
    while !req.is_done() {
        sched::sleepon(req.key());
    }
}

/// SYS_WAIT_SYSCALL: espera a próxima chamada publicada.
pub fn fetch_pending_call() -> *mut SyscallRequest {
    loop {
        if let Some(req) = PENDING.take() {
            // libera um publicador que esperava a caixa
            sched::wakeup(PENDING.key(), 1);
            return req;
        }
        sched::sleepon(PENDING.key());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mailbox_never_holds_two() {
        let box_ = Mailbox::new();
        let mut a = SyscallRequest::new(0, [0; 6]);
        let mut b = SyscallRequest::new(1, [0; 6]);
        assert!(box_.try_publish(&mut a));
        assert!(!box_.try_publish(&mut b));

        let got = box_.take().unwrap();
        assert_eq!(got, &mut a as *mut _);
        assert!(box_.is_empty());
        assert!(box_.try_publish(&mut b));
        assert_eq!(box_.take().unwrap(), &mut b as *mut _);
        assert!(box_.take().is_none());
    }

    #[test]
    fn interleaved_publishers_see_single_occupant() {
        let box_ = Mailbox::new();
        let mut reqs: [SyscallRequest; 4] = core::array::from_fn(|i| SyscallRequest::new(i, [0; 6]));
        let mut delivered = 0;
        let mut occupied = 0;
        for round in 0..8 {
            for r in reqs.iter_mut() {
                if box_.try_publish(r) {
                    occupied += 1;
                }
                assert!(occupied <= 1);
            }
            if round % 2 == 0 && box_.take().is_some() {
                occupied -= 1;
                delivered += 1;
            }
        }
        assert_eq!(delivered, 4);
    }
}
