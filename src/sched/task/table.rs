//! Tabela fixa de threads.
//!
//! Tudo que o escalonador decide passa por aqui: alocação de slot, escolha
//! da próxima thread e wakeup por chave. A tabela não toca hardware nem
//! memória de pilha, o que permite exercitá-la nos testes de host.

use super::state::ThreadState;
use super::thread::{Thread, ThreadId};
use crate::core::panic::throw;
use crate::sched::config::NTHREADS;
use crate::sched::context::CpuContext;
use crate::sched::SleepKey;

pub struct ThreadTable {
    threads: [Thread; NTHREADS],
    /// Contexto do loop do escalonador (pilha de boot)
    pub scheduler: CpuContext,
    current: Option<ThreadId>,
    /// Último slot escolhido pelo round-robin
    last: usize,
    /// Serviço de IRQs adiadas (prioridade máxima)
    pub trap_task: Option<ThreadId>,
    /// Serviço de syscalls encaminhadas
    pub syscall_task: Option<ThreadId>,
    /// Thread ociosa (escolhida quando mais nada roda)
    pub idle: Option<ThreadId>,
}

impl ThreadTable {
    pub const fn new() -> Self {
        let mut threads = [const { Thread::empty(ThreadId::new(0)) }; NTHREADS];
        let mut i = 0;
        while i < NTHREADS {
            threads[i].id = ThreadId::new(i);
            i += 1;
        }
        Self {
            threads,
            scheduler: CpuContext::new(),
            current: None,
            last: 0,
            trap_task: None,
            syscall_task: None,
            idle: None,
        }
    }

    #[inline]
    pub fn get(&self, id: ThreadId) -> &Thread {
        &self.threads[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: ThreadId) -> &mut Thread {
        &mut self.threads[id.index()]
    }

    /// Thread em execução (None enquanto o escalonador roda).
    #[inline]
    pub fn current(&self) -> Option<ThreadId> {
        self.current
    }

    pub fn set_current(&mut self, id: Option<ThreadId>) {
        self.current = id;
    }

    pub fn current_mut(&mut self) -> Option<&mut Thread> {
        let id = self.current?;
        Some(self.get_mut(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Thread> {
        self.threads.iter()
    }

    /// Reserva um slot livre (`Unused` ou `Exit`) e o marca `Initing`.
    ///
    /// Kstack e fpstate de um slot reciclado continuam lá para reuso.
    pub fn alloc(&mut self) -> ThreadId {
        match self.try_alloc() {
            Some(id) => id,
            None => throw("no thread slot available"),
        }
    }

    /// Como `alloc`, mas tabela cheia devolve `None`.
    pub fn try_alloc(&mut self) -> Option<ThreadId> {
        let t = self.threads.iter_mut().find(|t| t.state.is_free())?;
        t.reset();
        t.state = ThreadState::Initing;
        Some(t.id)
    }

    /// Escolhe a próxima thread.
    ///
    /// Ordem: serviço de traps, serviço de syscalls, round-robin a partir
    /// do slot seguinte ao último escolhido (pulando a idle) e, por fim,
    /// a idle.
    pub fn pickup(&mut self) -> ThreadId {
        for id in [self.trap_task, self.syscall_task].into_iter().flatten() {
            if self.get(id).is_runnable() {
                return id;
            }
        }

        for step in 1..=NTHREADS {
            let idx = (self.last + step) % NTHREADS;
            let t = &self.threads[idx];
            if Some(t.id) == self.idle || !t.is_runnable() {
                continue;
            }
            self.last = idx;
            return t.id;
        }

        match self.idle {
            Some(id) if self.get(id).is_runnable() => id,
            _ => throw("(Sched) nenhuma thread executável"),
        }
    }

    /// Põe `id` para dormir em `key`.
    pub fn sleep(&mut self, id: ThreadId, key: SleepKey) {
        let t = self.get_mut(id);
        t.sleep_key = key;
        t.state = ThreadState::Sleeping;
    }

    /// Acorda até `n` threads dormindo em `key` (`n < 0` = todas).
    ///
    /// Retorna quantas foram acordadas.
    pub fn wakeup(&mut self, key: SleepKey, n: isize) -> usize {
        let limit = if n < 0 { usize::MAX } else { n as usize };
        let mut woken = 0;
        for t in self.threads.iter_mut() {
            if woken == limit {
                break;
            }
            if t.state == ThreadState::Sleeping && t.sleep_key == key {
                t.state = ThreadState::Runnable;
                woken += 1;
            }
        }
        woken
    }

    /// Tempo de CPU acumulado por slot.
    pub fn stats(&self) -> [i64; NTHREADS] {
        let mut out = [0i64; NTHREADS];
        for (o, t) in out.iter_mut().zip(self.threads.iter()) {
            *o = t.counter;
        }
        out
    }
}

impl Default for ThreadTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;

    fn table_with(n: usize) -> Box<ThreadTable> {
        let mut t = Box::new(ThreadTable::new());
        for _ in 0..n {
            let id = t.alloc();
            t.get_mut(id).state = ThreadState::Runnable;
        }
        t
    }

    #[test]
    fn alloc_takes_lowest_free_slot() {
        let mut t = Box::new(ThreadTable::new());
        assert_eq!(t.alloc(), ThreadId::new(0));
        assert_eq!(t.alloc(), ThreadId::new(1));
        assert_eq!(t.get(ThreadId::new(1)).state, ThreadState::Initing);
    }

    #[test]
    fn exited_slot_is_recycled_with_resources() {
        let mut t = table_with(3);
        let id = ThreadId::new(1);
        t.get_mut(id).kstack = 0xA000;
        t.get_mut(id).state = ThreadState::Exit;

        assert_eq!(t.alloc(), id);
        assert_eq!(t.get(id).kstack, 0xA000);
    }

    #[test]
    fn try_alloc_on_full_table_is_none() {
        let mut t = table_with(NTHREADS);
        assert_eq!(t.try_alloc(), None);
        t.get_mut(ThreadId::new(4)).state = ThreadState::Exit;
        assert_eq!(t.try_alloc(), Some(ThreadId::new(4)));
    }

    #[test]
    #[should_panic(expected = "no thread slot available")]
    fn full_table_is_fatal() {
        let mut t = table_with(NTHREADS);
        t.alloc();
    }

    #[test]
    fn wakeup_counts_and_limits() {
        let mut t = table_with(5);
        for i in 0..4 {
            t.sleep(ThreadId::new(i), 0x1234);
        }
        t.sleep(ThreadId::new(4), 0x9999);

        assert_eq!(t.wakeup(0x1234, 1), 1);
        assert_eq!(t.get(ThreadId::new(0)).state, ThreadState::Runnable);
        assert_eq!(t.wakeup(0x1234, -1), 3);
        assert_eq!(t.wakeup(0x1234, -1), 0);
        assert_eq!(t.get(ThreadId::new(4)).state, ThreadState::Sleeping);
    }

    #[test]
    fn wakeup_ignores_runnable_threads_with_same_key() {
        let mut t = table_with(2);
        t.get_mut(ThreadId::new(0)).sleep_key = 0x55;
        assert_eq!(t.wakeup(0x55, -1), 0);
    }

    #[test]
    fn pickup_prefers_service_threads() {
        let mut t = table_with(4);
        t.syscall_task = Some(ThreadId::new(3));
        t.trap_task = Some(ThreadId::new(2));
        assert_eq!(t.pickup(), ThreadId::new(2));

        t.sleep(ThreadId::new(2), 1);
        assert_eq!(t.pickup(), ThreadId::new(3));
    }

    #[test]
    fn pickup_round_robins_and_skips_idle() {
        let mut t = table_with(3);
        t.idle = Some(ThreadId::new(0));

        assert_eq!(t.pickup(), ThreadId::new(1));
        assert_eq!(t.pickup(), ThreadId::new(2));
        assert_eq!(t.pickup(), ThreadId::new(1));

        t.sleep(ThreadId::new(1), 7);
        t.sleep(ThreadId::new(2), 7);
        assert_eq!(t.pickup(), ThreadId::new(0));
    }

    #[test]
    #[should_panic(expected = "nenhuma thread")]
    fn pickup_without_idle_is_fatal() {
        let mut t = table_with(1);
        t.sleep(ThreadId::new(0), 1);
        t.pickup();
    }
}
