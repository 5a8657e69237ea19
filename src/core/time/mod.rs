//! Tempo e Timers
//!
//! `jiffies` conta ticks, `clock` converte para ns/tempo de parede e
//! `timer` trata o tick e as esperas temporizadas.

pub mod clock;
pub mod jiffies;
pub mod timer;

pub use clock::{clocktime, nanosecond, Timespec};
pub use jiffies::{get_jiffies, HZ};
pub use timer::{nanosleep, sleep_until, tick_key};

/// Inicializa subsistema de tempo
pub fn init() {
    timer::init();
}
