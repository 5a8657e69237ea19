//! # Orquestrador de Agendamento
//!
//! Loop do escalonador e as operações que entram nele.
//!
//! ## Mecanismos de Execução:
//! - **Cooperativo:** threads cedem via `yield_now()` ou `sleepon()`.
//! - **Preemptivo:** só o tick do timer força um `yield_now()`.
//!
//! O loop roda na pilha de boot com interrupções desabilitadas. Cada
//! thread volta para ele por `sched()`, que salva o `CpuContext` dela e
//! retoma o contexto do loop.
//!
//! Nenhum guard de `THREADS` atravessa uma troca de contexto: os ponteiros
//! de contexto são obtidos com o lock tomado e usados depois de soltá-lo.

use crate::arch::{without_interrupts, Cpu, TrapFrame};
use crate::arch::traits::cpu::CpuOps;
use crate::core::panic::throw;
use crate::core::time::nanosecond;
use crate::sched::config::NTHREADS;
use crate::sched::context::{switch, CpuContext};
use crate::sched::task::lifecycle::{self, KernelEntry};
use crate::sched::task::{Thread, ThreadId, ThreadState, ThreadTable};
use crate::sched::SleepKey;
use crate::sync::Spinlock;

/// Tabela global de threads.
pub static THREADS: Spinlock<ThreadTable> = Spinlock::new(ThreadTable::new());

/// Loop do escalonador. Nunca retorna.
pub fn schedule() -> ! {
    crate::kinfo!("(Sched) Escalonador iniciado");
    loop {
        let (old, new, id) = {
            let mut table = THREADS.lock();
            let id = table.pickup();
            prepare_switch(&mut table, id);
            let new = &table.get(id).context as *const CpuContext;
            let old = &mut table.scheduler as *mut CpuContext;
            (old, new, id)
        };

        let start = nanosecond();
        // SAFETY: contextos vivem na tabela estática; interrupções desligadas
        unsafe { switch(old, new) };

        let mut table = THREADS.lock();
        let t = table.get_mut(id);
        save_fpu(t.fpstate);
        t.counter += nanosecond() - start;
        table.set_current(None);
    }
}

/// Checagens e estado de CPU antes de entrar em `id`.
fn prepare_switch(table: &mut ThreadTable, id: ThreadId) {
    let is_idle = table.idle == Some(id);
    let t = table.get_mut(id);
    // Sem frame: thread de kernel que cedeu a CPU fora de um trap
    if let Some(tf) = t.frame() {
        // SAFETY: o frame vive na pilha da thread
        let tf = unsafe { &*tf };
        if !tf.interrupts_enabled() {
            throw("bad eflags");
        }
        if is_idle && !tf.is_kernel() {
            throw("bad idle cs");
        }
    }

    t.state = ThreadState::Running;
    if t.fs_base != 0 {
        Cpu::set_fs_base(t.fs_base);
    }
    crate::arch::platform::gdt::set_kernel_stack(t.kstack);
    restore_fpu(t.fpstate);
    table.set_current(Some(id));
}

#[cfg(not(test))]
fn save_fpu(area: usize) {
    // SAFETY: área do slot, uma página alinhada
    unsafe { Cpu::fxsave(area) };
}

#[cfg(not(test))]
fn restore_fpu(area: usize) {
    // SAFETY: a área contém uma imagem de `fxsave`
    unsafe { Cpu::fxrstor(area) };
}

#[cfg(test)]
fn save_fpu(_area: usize) {}

#[cfg(test)]
fn restore_fpu(_area: usize) {}

/// Volta para o loop do escalonador salvando o contexto corrente.
///
/// O estado da thread (Runnable, Sleeping, Exit) já deve estar definido.
pub fn sched() {
    let (old, new) = {
        let mut table = THREADS.lock();
        let Some(id) = table.current() else {
            throw("(Sched) sched sem thread corrente");
        };
        let old = &mut table.get_mut(id).context as *mut CpuContext;
        let new = &table.scheduler as *const CpuContext;
        (old, new)
    };
    // SAFETY: ver `schedule`
    unsafe { switch(old, new) };
}

/// Cede a CPU mantendo a thread executável.
pub fn yield_now() {
    without_interrupts(|| {
        {
            let mut table = THREADS.lock();
            match table.current_mut() {
                Some(t) => t.state = ThreadState::Runnable,
                None => return,
            }
        }
        sched();
    })
}

/// Dorme em `key` até um `wakeup` correspondente.
pub fn sleepon(key: SleepKey) {
    without_interrupts(|| {
        {
            let mut table = THREADS.lock();
            let Some(id) = table.current() else {
                throw("(Sched) sleepon sem thread corrente");
            };
            table.sleep(id, key);
        }
        sched();
    })
}

/// Acorda até `n` threads dormindo em `key` (`n < 0` = todas).
pub fn wakeup(key: SleepKey, n: isize) -> usize {
    THREADS.lock().wakeup(key, n)
}

/// Termina a thread corrente.
pub fn exit_current() -> ! {
    Cpu::disable_interrupts();
    {
        let mut table = THREADS.lock();
        let Some(id) = table.current() else {
            throw("(Sched) exit sem thread corrente");
        };
        lifecycle::exit_in(&mut table, id);
    }
    sched();
    throw("(Sched) thread terminada voltou a executar");
}

pub fn current() -> Option<ThreadId> {
    THREADS.lock().current()
}

/// Frame da thread corrente, sem bloquear (usado pelo caminho de pânico).
pub fn current_frame() -> Option<*mut TrapFrame> {
    let table = THREADS.try_lock()?;
    let id = table.current()?;
    table.get(id).frame()
}

/// Registra o frame do trap em andamento na thread corrente.
///
/// Um ponteiro nulo apaga o registro (frame de Ring 0 já desempilhado).
pub fn record_frame(tf: *mut TrapFrame) {
    if let Some(t) = THREADS.lock().current_mut() {
        t.tf = tf as usize;
    }
}

/// `record_frame` sem bloquear. `false` se a tabela está travada.
pub fn try_record_frame(tf: *mut TrapFrame) -> bool {
    let Some(mut table) = THREADS.try_lock() else {
        return false;
    };
    if let Some(t) = table.current_mut() {
        t.tf = tf as usize;
    }
    true
}

/// Executa `f` sobre a thread corrente.
pub fn with_current<R>(f: impl FnOnce(&mut Thread) -> R) -> Option<R> {
    let mut table = THREADS.lock();
    table.current_mut().map(f)
}

/// `with_current` sem bloquear (caminho fatal).
pub fn try_with_current<R>(f: impl FnOnce(&mut Thread) -> R) -> Option<R> {
    THREADS.try_lock()?.current_mut().map(f)
}

/// Executa `f` sobre a thread `id`.
pub fn with_thread<R>(id: ThreadId, f: impl FnOnce(&mut Thread) -> R) -> Option<R> {
    if id.index() >= NTHREADS {
        return None;
    }
    let mut table = THREADS.lock();
    let t = table.get_mut(id);
    if t.state.is_free() {
        return None;
    }
    Some(f(t))
}

pub fn spawn_kernel(entry: KernelEntry, arg: usize) -> ThreadId {
    lifecycle::spawn_kernel_in(&mut THREADS.lock(), entry, arg)
}

/// `spawn_kernel` sem pânico: `None` se não houver slot.
pub fn try_spawn_kernel(entry: KernelEntry, arg: usize) -> Option<ThreadId> {
    lifecycle::try_spawn_kernel_in(&mut THREADS.lock(), entry, arg)
}

pub fn init_thread0(entry: usize, cmdline: &[u8]) -> ThreadId {
    lifecycle::init_thread0_in(&mut THREADS.lock(), entry, cmdline)
}

/// `clone(2)` a partir da thread corrente.
pub fn clone(flags: usize, usp: usize, tls: usize) -> ThreadId {
    let mut table = THREADS.lock();
    let Some(parent) = table.current() else {
        throw("(Sched) clone sem thread corrente");
    };
    lifecycle::clone_in(&mut table, parent, flags, usp, tls)
}

pub fn set_trap_task(id: ThreadId) {
    THREADS.lock().trap_task = Some(id);
}

pub fn set_syscall_task(id: ThreadId) {
    THREADS.lock().syscall_task = Some(id);
}

pub fn set_idle(id: ThreadId) {
    THREADS.lock().idle = Some(id);
}

pub fn is_syscall_task(id: ThreadId) -> bool {
    THREADS.lock().syscall_task == Some(id)
}

/// Tempo de CPU (ns) por slot.
pub fn thread_stats() -> [i64; NTHREADS] {
    THREADS.lock().stats()
}
