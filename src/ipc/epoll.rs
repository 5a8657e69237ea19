//! Epoll emulado.
//!
//! Uma única instância (fd 3). Cada registro é um nó tirado de um `Pool`
//! e encadeado numa lista dupla. Colaboradores chamam `notify(fd, events)`
//! quando o estado de um descritor muda; `wait` devolve os eventos
//! acumulados ou dorme até um `notify` ou até o prazo.

use core::mem::size_of;

use bitflags::bitflags;

use super::futex::Note;
use crate::core::time::{clock::MS, nanosecond};
use crate::mm::pool::Pool;
use crate::sched::{self, SleepKey};
use crate::sync::Spinlock;
use crate::sys::{Errno, SysResult};

/// Descritor da instância única.
pub const EPOLL_FD: usize = 3;

pub const EPOLL_CTL_ADD: usize = 1;
pub const EPOLL_CTL_DEL: usize = 2;
pub const EPOLL_CTL_MOD: usize = 3;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EpollEvents: u32 {
        const IN = 0x001;
        const PRI = 0x002;
        const OUT = 0x004;
        const ERR = 0x008;
        const HUP = 0x010;
        const RDHUP = 0x2000;
        const ONESHOT = 1 << 30;
        const ET = 1 << 31;
    }
}

/// `struct epoll_event` do Linux x86_64 (empacotada).
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpollEvent {
    pub events: u32,
    pub data: u64,
}

const _: () = assert!(size_of::<EpollEvent>() == 12);

impl EpollEvent {
    pub const fn new(events: EpollEvents, data: u64) -> Self {
        Self {
            events: events.bits(),
            data,
        }
    }
}

/// Um registro de interesse.
#[repr(C)]
struct Node {
    prev: *mut Node,
    next: *mut Node,
    fd: usize,
    interest: EpollEvents,
    ready: EpollEvents,
    data: u64,
}

pub struct EpollSet {
    pool: Pool,
    head: *mut Node,
    len: usize,
}

// SAFETY: os nós só são tocados com o lock da instância
unsafe impl Send for EpollSet {}

impl EpollSet {
    pub const fn new() -> Self {
        Self {
            pool: Pool::new(size_of::<Node>()),
            head: core::ptr::null_mut(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn nodes(&self) -> impl Iterator<Item = *mut Node> + '_ {
        let mut p = self.head;
        core::iter::from_fn(move || {
            if p.is_null() {
                return None;
            }
            let cur = p;
            // SAFETY: nós da lista vêm do pool e estão vivos
            p = unsafe { (*cur).next };
            Some(cur)
        })
    }

    fn find(&self, fd: usize) -> Option<*mut Node> {
        // SAFETY: ver `nodes`
        self.nodes().find(|&n| unsafe { (*n).fd == fd })
    }

    /// epoll_ctl. MOD e DEL sobre um fd desconhecido dão EINVAL.
    pub fn ctl(&mut self, op: usize, fd: usize, event: Option<EpollEvent>) -> SysResult {
        match op {
            EPOLL_CTL_ADD => {
                let ev = event.ok_or(Errno::EFAULT)?;
                if self.find(fd).is_some() {
                    return Err(Errno::EEXIST);
                }
                let node = self.pool.alloc() as *mut Node;
                // SAFETY: bloco novo do pool, grande o bastante para um Node
                unsafe {
                    node.write(Node {
                        prev: core::ptr::null_mut(),
                        next: self.head,
                        fd,
                        interest: EpollEvents::from_bits_truncate(ev.events) | EpollEvents::HUP,
                        ready: EpollEvents::empty(),
                        data: ev.data,
                    });
                    if !self.head.is_null() {
                        (*self.head).prev = node;
                    }
                }
                self.head = node;
                self.len += 1;
                Ok(0)
            }
            EPOLL_CTL_MOD => {
                let ev = event.ok_or(Errno::EFAULT)?;
                let node = self.find(fd).ok_or(Errno::EINVAL)?;
                // SAFETY: nó vivo da lista
                unsafe {
                    (*node).interest = EpollEvents::from_bits_truncate(ev.events) | EpollEvents::HUP;
                    (*node).data = ev.data;
                }
                Ok(0)
            }
            EPOLL_CTL_DEL => {
                let node = self.find(fd).ok_or(Errno::EINVAL)?;
                self.unlink(node);
                Ok(0)
            }
            _ => Err(Errno::EINVAL),
        }
    }

    fn unlink(&mut self, node: *mut Node) {
        // SAFETY: `node` está na lista; os ponteiros vêm do pool
        unsafe {
            let (prev, next) = ((*node).prev, (*node).next);
            if prev.is_null() {
                self.head = next;
            } else {
                (*prev).next = next;
            }
            if !next.is_null() {
                (*next).prev = prev;
            }
        }
        self.pool.free(node as usize);
        self.len -= 1;
    }

    /// Marca `events` como prontos em `fd`. Retorna se algo foi marcado.
    pub fn notify(&mut self, fd: usize, events: EpollEvents) -> bool {
        let Some(node) = self.find(fd) else {
            return false;
        };
        // SAFETY: nó vivo da lista
        let node = unsafe { &mut *node };
        let hit = events & node.interest;
        node.ready |= hit;
        !hit.is_empty()
    }

    /// Copia os eventos prontos para `out` e os consome.
    pub fn collect(&mut self, out: &mut [EpollEvent]) -> usize {
        let mut n = 0;
        let mut p = self.head;
        while !p.is_null() && n < out.len() {
            // SAFETY: nó vivo da lista
            let node = unsafe { &mut *p };
            if !node.ready.is_empty() {
                out[n] = EpollEvent {
                    events: node.ready.bits(),
                    data: node.data,
                };
                n += 1;
                node.ready = EpollEvents::empty();
                if node.interest.contains(EpollEvents::ONESHOT) {
                    node.interest = EpollEvents::empty();
                }
            }
            p = node.next;
        }
        n
    }
}

impl Default for EpollSet {
    fn default() -> Self {
        Self::new()
    }
}

static EPOLL: Spinlock<EpollSet> = Spinlock::new(EpollSet::new());

/// Disparada a cada `notify` que marcou algo.
static READY: Note = Note::new();

fn check_fd(epfd: usize) -> SysResult<()> {
    if epfd != EPOLL_FD {
        return Err(Errno::EBADF);
    }
    Ok(())
}

/// epoll_create / epoll_create1: sempre a mesma instância.
pub fn create() -> SysResult {
    Ok(EPOLL_FD)
}

pub fn ctl(epfd: usize, op: usize, fd: usize, event: Option<EpollEvent>) -> SysResult {
    check_fd(epfd)?;
    EPOLL.lock().ctl(op, fd, event)
}

/// Chamado por colaboradores quando `fd` muda de estado.
pub fn notify(fd: usize, events: EpollEvents) {
    let hit = EPOLL.lock().notify(fd, events);
    if hit {
        READY.wakeup();
    }
}

/// epoll_wait. `timeout_ms < 0` espera para sempre; `0` só consulta.
pub fn wait(epfd: usize, out: &mut [EpollEvent], timeout_ms: isize) -> SysResult {
    check_fd(epfd)?;
    Ok(wait_on(&EPOLL, &READY, out, timeout_ms, sched::sleepon))
}

/// Laço do `wait` sobre um conjunto e uma nota quaisquer. `park` dorme na
/// chave recebida.
fn wait_on(
    set: &Spinlock<EpollSet>,
    ready: &Note,
    out: &mut [EpollEvent],
    timeout_ms: isize,
    mut park: impl FnMut(SleepKey),
) -> usize {
    let deadline = (timeout_ms > 0).then(|| nanosecond().saturating_add((timeout_ms as i64).saturating_mul(MS)));
    loop {
        ready.clear();
        let n = set.lock().collect(out);
        if n > 0 || timeout_ms == 0 {
            return n;
        }
        if !ready.sleep_with(deadline, &mut park) {
            return 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(events: EpollEvents, data: u64) -> Option<EpollEvent> {
        Some(EpollEvent::new(events, data))
    }

    #[test]
    fn notify_then_wait_reports_user_data() {
        let mut set = EpollSet::new();
        set.ctl(EPOLL_CTL_ADD, 9, ev(EpollEvents::IN, 0xDEAD)).unwrap();
        assert!(set.notify(9, EpollEvents::IN));

        let mut out = [EpollEvent::default(); 4];
        assert_eq!(set.collect(&mut out), 1);
        let got = out[0];
        assert_eq!({ got.data }, 0xDEAD);
        assert_eq!({ got.events }, EpollEvents::IN.bits());
        // consumido: sem novo notify não há evento
        assert_eq!(set.collect(&mut out), 0);
    }

    #[test]
    fn uninterested_events_are_dropped() {
        let mut set = EpollSet::new();
        set.ctl(EPOLL_CTL_ADD, 5, ev(EpollEvents::IN, 1)).unwrap();
        assert!(!set.notify(5, EpollEvents::OUT));
        assert!(!set.notify(6, EpollEvents::IN));
        // HUP sempre interessa
        assert!(set.notify(5, EpollEvents::HUP));
    }

    #[test]
    fn ctl_errors() {
        let mut set = EpollSet::new();
        assert_eq!(set.ctl(EPOLL_CTL_MOD, 4, ev(EpollEvents::IN, 0)), Err(Errno::EINVAL));
        assert_eq!(set.ctl(EPOLL_CTL_DEL, 4, None), Err(Errno::EINVAL));
        set.ctl(EPOLL_CTL_ADD, 4, ev(EpollEvents::IN, 0)).unwrap();
        assert_eq!(set.ctl(EPOLL_CTL_ADD, 4, ev(EpollEvents::IN, 0)), Err(Errno::EEXIST));
        assert_eq!(set.ctl(99, 4, None), Err(Errno::EINVAL));
    }

    #[test]
    fn del_unlinks_from_middle() {
        let mut set = EpollSet::new();
        for fd in 10..13 {
            set.ctl(EPOLL_CTL_ADD, fd, ev(EpollEvents::IN, fd as u64)).unwrap();
        }
        set.ctl(EPOLL_CTL_DEL, 11, None).unwrap();
        assert_eq!(set.len(), 2);
        assert!(!set.notify(11, EpollEvents::IN));
        assert!(set.notify(10, EpollEvents::IN));
        assert!(set.notify(12, EpollEvents::IN));
        let mut out = [EpollEvent::default(); 4];
        assert_eq!(set.collect(&mut out), 2);
    }

    #[test]
    fn del_head_and_tail_keeps_links() {
        let mut set = EpollSet::new();
        for fd in 30..34 {
            set.ctl(EPOLL_CTL_ADD, fd, ev(EpollEvents::IN, fd as u64)).unwrap();
        }
        // 33 é a cabeça, 30 a cauda
        set.ctl(EPOLL_CTL_DEL, 33, None).unwrap();
        set.ctl(EPOLL_CTL_DEL, 30, None).unwrap();
        set.ctl(EPOLL_CTL_ADD, 35, ev(EpollEvents::IN, 35)).unwrap();
        set.ctl(EPOLL_CTL_DEL, 31, None).unwrap();
        assert_eq!(set.len(), 2);

        for fd in [32, 35] {
            assert!(set.notify(fd, EpollEvents::IN));
        }
        let mut out = [EpollEvent::default(); 4];
        assert_eq!(set.collect(&mut out), 2);
        let mut seen = [{ out[0].data }, { out[1].data }];
        seen.sort_unstable();
        assert_eq!(seen, [32, 35]);
    }

    #[test]
    fn oneshot_disarms_after_delivery() {
        let mut set = EpollSet::new();
        set.ctl(EPOLL_CTL_ADD, 7, ev(EpollEvents::IN | EpollEvents::ONESHOT, 0)).unwrap();
        set.notify(7, EpollEvents::IN);
        let mut out = [EpollEvent::default(); 1];
        assert_eq!(set.collect(&mut out), 1);
        assert!(!set.notify(7, EpollEvents::IN));
        set.ctl(EPOLL_CTL_MOD, 7, ev(EpollEvents::IN, 0)).unwrap();
        assert!(set.notify(7, EpollEvents::IN));
    }

    #[test]
    fn second_wait_sleeps_until_timeout() {
        use crate::core::time::{jiffies, tick_key};
        use crate::sched::task::{ThreadState, ThreadTable};
        use alloc::boxed::Box;

        let set = Spinlock::new(EpollSet::new());
        let ready = Note::new();
        set.lock().ctl(EPOLL_CTL_ADD, 21, ev(EpollEvents::IN, 7)).unwrap();
        assert!(set.lock().notify(21, EpollEvents::IN));
        ready.wakeup();

        let mut table = Box::new(ThreadTable::new());
        let me = table.alloc();
        table.get_mut(me).state = ThreadState::Running;
        let mut parks = 0;
        let mut out = [EpollEvent::default(); 2];

        // primeira espera: evento já pronto, não dorme
        let n = wait_on(&set, &ready, &mut out, 50, |_| parks += 1);
        assert_eq!((n, parks), (1, 0));

        // segunda: nada pronto, dorme tick a tick até o prazo de 50 ms
        let start = nanosecond();
        let n = wait_on(&set, &ready, &mut out, 50, |key| {
            assert_eq!(key, tick_key());
            table.sleep(me, key);
            assert_eq!(table.get(me).state, ThreadState::Sleeping);
            jiffies::tick();
            assert_eq!(table.wakeup(key, -1), 1);
            assert_eq!(table.get(me).state, ThreadState::Runnable);
            parks += 1;
        });
        assert_eq!(n, 0);
        assert!(parks <= 5);
        assert!(nanosecond() >= start + 50 * MS);
    }

    #[test]
    fn global_instance_poll() {
        assert_eq!(create(), Ok(EPOLL_FD));
        ctl(EPOLL_FD, EPOLL_CTL_ADD, 1000, ev(EpollEvents::IN, 42)).unwrap();
        notify(1000, EpollEvents::IN);

        let mut out = [EpollEvent::default(); 2];
        assert_eq!(wait(EPOLL_FD, &mut out, 0), Ok(1));
        assert_eq!({ out[0].data }, 42);
        // segunda consulta sem notify: nada
        assert_eq!(wait(EPOLL_FD, &mut out, 0), Ok(0));
        assert_eq!(wait(8, &mut out, 0), Err(Errno::EBADF));
        ctl(EPOLL_FD, EPOLL_CTL_DEL, 1000, None).unwrap();
    }
}
