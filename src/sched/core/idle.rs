//! Idle Thread
//!
//! Escolhida pelo `pickup` só quando nenhuma outra thread está pronta.
//! Roda em Ring 0 com IF=1: `hlt` até a próxima interrupção e cede a CPU.

use crate::arch::{Cpu, CpuOps};
use crate::sched::task::ThreadId;

extern "C" fn idle_main(_arg: usize) {
    loop {
        Cpu::halt();
        super::scheduler::yield_now();
    }
}

/// Cria a idle e a registra no escalonador.
pub fn spawn() -> ThreadId {
    let id = super::scheduler::spawn_kernel(idle_main, 0);
    super::scheduler::set_idle(id);
    crate::kdebug!("(Sched) idle tid=", id.index());
    id
}
