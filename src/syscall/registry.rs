//! Handlers de syscalls encaminhadas.
//!
//! Colaboradores (drivers, rede, sistema de arquivos) registram um handler
//! por número. O serviço de syscalls roda cada um numa tarefa própria, que
//! pode bloquear à vontade.

use super::abi::SyscallRequest;
use super::numbers::MAX_SYSCALL;
use crate::core::panic::throw;
use crate::sync::Spinlock;

/// Handler encaminhado: lê os argumentos e grava o resultado em `req`.
///
/// `done()` é chamado pelo serviço depois que o handler retorna.
pub type SyscallHandler = fn(&mut SyscallRequest);

static HANDLERS: Spinlock<[Option<SyscallHandler>; MAX_SYSCALL]> = Spinlock::new([None; MAX_SYSCALL]);

/// Registra `h` para `no` (o último registro vale).
pub fn register_syscall(no: usize, h: SyscallHandler) {
    if no >= MAX_SYSCALL {
        throw("(Syscall) número fora da tabela");
    }
    HANDLERS.lock()[no] = Some(h);
}

pub fn handler(no: usize) -> Option<SyscallHandler> {
    HANDLERS.lock().get(no).copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(req: &mut SyscallRequest) {
        req.set_result(1);
    }

    fn second(req: &mut SyscallRequest) {
        req.set_result(2);
    }

    #[test]
    fn last_registration_wins() {
        register_syscall(450, first);
        register_syscall(450, second);
        let mut req = SyscallRequest::new(450, [0; 6]);
        handler(450).unwrap()(&mut req);
        assert_eq!(req.ret, 2);
        assert!(handler(451).is_none());
        assert!(handler(MAX_SYSCALL + 1).is_none());
    }
}
