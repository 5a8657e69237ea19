//! Arquivo: core/time/clock.rs
//!
//! Propósito: Tempo monotônico em nanossegundos e relógio de parede.
//!
//! Detalhes de Implementação:
//! - Monotônico: `jiffies * (1s / HZ)` mais a correção sub-tick lida do
//!   contador regressivo do PIT.
//! - Parede: snapshot do RTC tirado uma vez depois do boot, deslocado
//!   pelos ticks decorridos desde então.

use core::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use super::jiffies::{get_jiffies, HZ};
use crate::drivers::timer::BASE_FREQUENCY as PIT_HZ;

pub const NS: i64 = 1;
pub const MS: i64 = 1_000_000 * NS;
pub const SECOND: i64 = 1_000 * MS;

/// Duração de um tick em ns.
pub const TICK_NS: i64 = SECOND / HZ as i64;

/// `struct timespec` do Linux x86_64.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timespec {
    pub tv_sec: i64,
    pub tv_nsec: i64,
}

impl Timespec {
    pub const fn new(tv_sec: i64, tv_nsec: i64) -> Self {
        Self { tv_sec, tv_nsec }
    }

    /// Duração em ns, saturando em `i64::MAX`/`i64::MIN`.
    #[inline]
    pub const fn as_nanos(&self) -> i64 {
        self.tv_sec.saturating_mul(SECOND).saturating_add(self.tv_nsec)
    }

    /// Duração aceitável como argumento de syscall: `tv_sec >= 0` e
    /// `tv_nsec` em `[0, 1s)`.
    #[inline]
    pub const fn is_valid_duration(&self) -> bool {
        self.tv_sec >= 0 && self.tv_nsec >= 0 && self.tv_nsec < SECOND
    }

    pub const fn from_nanos(ns: i64) -> Self {
        Self {
            tv_sec: ns / SECOND,
            tv_nsec: ns % SECOND,
        }
    }
}

// Unix time lido do CMOS e o valor de jiffies naquele instante
static BASE_UNIX_TIME: AtomicI64 = AtomicI64::new(0);
static CLOCK_BASE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Nanossegundos de monotônico para `ticks` mais `pit_pulses` sub-tick.
#[inline]
pub const fn monotonic_ns(ticks: u64, pit_pulses: u32) -> i64 {
    ticks as i64 * TICK_NS + pit_pulses as i64 * SECOND / PIT_HZ as i64
}

/// Relógio de parede para um instante dado.
pub fn wallclock_at(ticks: u64, base_ticks: u64, base_unix: i64, pit_pulses: u32) -> Timespec {
    let n = ticks.saturating_sub(base_ticks) as i64;
    let hz = HZ as i64;
    let mut ts = Timespec {
        tv_sec: n / hz + base_unix,
        tv_nsec: (n % hz) * TICK_NS + pit_pulses as i64 * SECOND / PIT_HZ as i64,
    };
    if ts.tv_nsec >= SECOND {
        ts.tv_sec += 1;
        ts.tv_nsec -= SECOND;
    }
    ts
}

/// Nanossegundos desde o boot.
pub fn nanosecond() -> i64 {
    monotonic_ns(get_jiffies(), crate::drivers::timer::latch_elapsed(HZ as u32))
}

/// Tempo de parede (CLOCK_REALTIME).
pub fn clocktime() -> Timespec {
    wallclock_at(
        get_jiffies(),
        CLOCK_BASE_COUNTER.load(Ordering::Relaxed),
        BASE_UNIX_TIME.load(Ordering::Relaxed),
        crate::drivers::timer::latch_elapsed(HZ as u32),
    )
}

/// Ancora o relógio de parede no RTC.
pub fn init_base() {
    let t = crate::drivers::cmos::read_time();
    BASE_UNIX_TIME.store(t.unix_seconds(), Ordering::Relaxed);
    CLOCK_BASE_COUNTER.store(get_jiffies(), Ordering::Relaxed);
    crate::kinfo!("(Time) Relógio de parede (unix)=", t.unix_seconds());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn huge_durations_saturate() {
        assert_eq!(Timespec::new(1 << 62, 0).as_nanos(), i64::MAX);
        assert_eq!(Timespec::new(i64::MAX / 2, SECOND - 1).as_nanos(), i64::MAX);
        assert_eq!(Timespec::new(2, 5).as_nanos(), 2 * SECOND + 5);
    }

    #[test]
    fn duration_validation() {
        assert!(Timespec::new(0, 0).is_valid_duration());
        assert!(Timespec::new(1 << 62, SECOND - 1).is_valid_duration());
        assert!(!Timespec::new(-1, 0).is_valid_duration());
        assert!(!Timespec::new(0, -1).is_valid_duration());
        assert!(!Timespec::new(0, SECOND).is_valid_duration());
    }

    #[test]
    fn monotonic_counts_ticks_and_pit_pulses() {
        assert_eq!(monotonic_ns(1, 0), 10 * MS);
        assert_eq!(monotonic_ns(100, 0), SECOND);
        // meio tick em pulsos do PIT
        let half = (PIT_HZ / HZ as u32) / 2;
        let ns = monotonic_ns(0, half);
        assert!((ns - 5 * MS).abs() < 1_000, "ns={}", ns);
    }

    #[test]
    fn wallclock_offsets_base() {
        let ts = wallclock_at(1_250, 1_000, 1_600_000_000, 0);
        assert_eq!(ts, Timespec::new(1_600_000_002, 500 * MS));
    }

    #[test]
    fn wallclock_normalizes_nanos() {
        let ts = wallclock_at(99, 0, 0, 2 * (PIT_HZ / HZ as u32));
        assert_eq!(ts.tv_sec, 1);
        assert!(ts.tv_nsec < SECOND);
    }

    #[test]
    fn timespec_nanos() {
        let ts = Timespec::new(0, 500 * MS);
        assert_eq!(ts.as_nanos(), 500 * MS);
        assert_eq!(Timespec::from_nanos(1_500 * MS), Timespec::new(1, 500 * MS));
    }
}
