//! Thread Control Block

use super::state::ThreadState;
use crate::arch::TrapFrame;
use crate::sched::context::CpuContext;
use crate::sched::signal::SignalState;
use crate::sched::SleepKey;

/// Identificador de thread: o índice do slot na tabela.
///
/// É também o valor devolvido por `gettid` e aceito por `tgkill`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(usize);

impl ThreadId {
    pub const fn new(idx: usize) -> Self {
        Self(idx)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Thread Control Block
pub struct Thread {
    /// ID (slot)
    pub id: ThreadId,
    /// Estado atual
    pub state: ThreadState,
    /// Topo da pilha de kernel (RSP0 enquanto a thread roda)
    pub kstack: usize,
    /// Topo da pilha de usuário (só a thread 0 recebe uma do kernel)
    pub stack: usize,
    /// Área `fxsave` (uma página, alinhada)
    pub fpstate: usize,
    /// Endereço do `TrapFrame` mais recente (0 = nenhum)
    pub tf: usize,
    /// Contexto salvo pela troca cooperativa
    pub context: CpuContext,
    /// Tempo de CPU acumulado (ns)
    pub counter: i64,
    /// Chave em que a thread dorme (válida em `Sleeping`)
    pub sleep_key: SleepKey,
    /// Base do FS (TLS); 0 = não mexer no MSR
    pub fs_base: usize,
    /// Cópia do frame da syscall bloqueante em andamento
    pub systf: TrapFrame,
    /// A thread está reemitindo uma syscall pelo trampolim?
    pub in_blocking_syscall: bool,
    /// Máscara, pendências e pilha alternativa de sinais
    pub signal: SignalState,
}

impl Thread {
    pub const fn empty(id: ThreadId) -> Self {
        Self {
            id,
            state: ThreadState::Unused,
            kstack: 0,
            stack: 0,
            fpstate: 0,
            tf: 0,
            context: CpuContext::new(),
            counter: 0,
            sleep_key: 0,
            fs_base: 0,
            systf: TrapFrame::zeroed(),
            in_blocking_syscall: false,
            signal: SignalState::new(),
        }
    }

    /// Limpa o estado de execução preservando os recursos do slot
    /// (kstack e fpstate são reaproveitados).
    pub fn reset(&mut self) {
        let (id, kstack, fpstate) = (self.id, self.kstack, self.fpstate);
        *self = Self::empty(id);
        self.kstack = kstack;
        self.fpstate = fpstate;
    }

    /// Frame do último trap desta thread.
    pub fn frame(&self) -> Option<*mut TrapFrame> {
        (self.tf != 0).then_some(self.tf as *mut TrapFrame)
    }

    #[inline]
    pub fn is_runnable(&self) -> bool {
        self.state == ThreadState::Runnable
    }
}
