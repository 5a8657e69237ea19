//! # IPC
//!
//! Primitivas de espera usadas pelo runtime e pelos colaboradores:
//!
//! - `futex`: espera e acordar sobre uma palavra de 32 bits, mais `Note`
//! - `epoll`: instância única com notificação explícita por fd
//! - `pipe`: buffer circular não bloqueante integrado ao epoll
//!
//! Tudo é construído sobre `sched::sleepon`/`sched::wakeup`.

pub mod epoll;
pub mod futex;
pub mod pipe;

#[cfg(feature = "self_test")]
pub mod test;

pub use epoll::{notify, EpollEvent, EpollEvents};
pub use futex::Note;

pub fn init() {
    crate::kinfo!("(IPC) epoll fd=", epoll::EPOLL_FD);
    crate::kinfo!("(IPC) pipes disponíveis=", pipe::MAX_PIPES);
}
