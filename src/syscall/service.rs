//! Serviço de syscalls.
//!
//! Thread de kernel que retira uma chamada por vez da caixa e a entrega a
//! uma tarefa nova. O handler roda nessa tarefa e pode bloquear sem segurar
//! o serviço. `done()` acorda o chamador quando ele termina.
//!
//! No máximo `MAX_SYSCALL_HANDLERS` tarefas vivas; acima disso, ou com a
//! tabela de threads cheia, a chamada volta com EAGAIN.

use core::sync::atomic::{AtomicUsize, Ordering};

use super::abi::SyscallRequest;
use super::error::{is_error, Errno};
use super::numbers::SYS_WAIT_SYSCALL;
use super::{raw, registry};
use crate::core::panic::throw;
use crate::sched::{self, config::MAX_SYSCALL_HANDLERS};

/// Contador de tarefas de handler vivas.
pub struct HandlerGate {
    busy: AtomicUsize,
    limit: usize,
}

impl HandlerGate {
    pub const fn new(limit: usize) -> Self {
        Self {
            busy: AtomicUsize::new(0),
            limit,
        }
    }

    /// Reserva uma vaga. `false` se já há `limit` tarefas.
    pub fn try_enter(&self) -> bool {
        self.busy
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < self.limit).then_some(n + 1))
            .is_ok()
    }

    pub fn leave(&self) {
        let _ = self.busy.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    pub fn busy(&self) -> usize {
        self.busy.load(Ordering::Acquire)
    }
}

static HANDLERS: HandlerGate = HandlerGate::new(MAX_SYSCALL_HANDLERS);

/// Roda o handler registrado e conclui a requisição.
fn serve(req: &mut SyscallRequest) {
    if let Some(h) = registry::handler(req.no) {
        h(req);
    }
    req.done();
}

/// Tarefa por requisição: `arg` é o `*mut SyscallRequest`.
extern "C" fn run_handler(arg: usize) {
    // SAFETY: o chamador dorme até `done()`, então a requisição (na pilha
    // dele) vive até aqui
    serve(unsafe { &mut *(arg as *mut SyscallRequest) });
    HANDLERS.leave();
}

fn reject(req: &mut SyscallRequest, err: Errno) {
    req.set_error(err);
    req.done();
}

/// Entrega `req` a quem sabe atendê-la.
pub fn dispatch(req: &mut SyscallRequest) {
    if registry::handler(req.no).is_none() {
        crate::kwarn!("(Syscall) encaminhada sem handler, no=", req.no);
        reject(req, Errno::ENOSYS);
        return;
    }
    if !HANDLERS.try_enter() {
        crate::kwarn!("(Syscall) handlers esgotados, no=", req.no);
        reject(req, Errno::EAGAIN);
        return;
    }
    if sched::try_spawn_kernel(run_handler, req as *mut SyscallRequest as usize).is_none() {
        HANDLERS.leave();
        crate::kwarn!("(Syscall) tabela de threads cheia, no=", req.no);
        reject(req, Errno::EAGAIN);
    }
}

extern "C" fn syscall_loop(_arg: usize) {
    crate::core::entry::post_init();
    loop {
        let word = raw::syscall0(SYS_WAIT_SYSCALL);
        if word == 0 || is_error(word) {
            throw("(Syscall) wait syscall falhou");
        }
        // SAFETY: veio da caixa; o dono dorme esperando a conclusão
        dispatch(unsafe { &mut *(word as *mut SyscallRequest) });
    }
}

/// Cria o serviço de syscalls e o registra no escalonador.
pub fn spawn_service() -> sched::ThreadId {
    let id = sched::spawn_kernel(syscall_loop, 0);
    sched::set_syscall_task(id);
    crate::kinfo!("(Syscall) Serviço de syscalls, tid=", id.index());
    id
}
