/// Arquivo: core/time/timer.rs
///
/// Propósito: Tick periódico e espera temporizada.
///
/// Detalhes de Implementação:
/// - O tick é a única fonte de preempção: incrementa jiffies, acorda quem
///   dorme em `TICK_KEY` e força um yield.
/// - Esperas com prazo dormem em `TICK_KEY` e rechecam o prazo a cada
///   tick. Nunca há cancelamento da operação subjacente.
use super::clock::{nanosecond, Timespec};
use super::jiffies::{self, HZ};
use crate::arch::TrapFrame;
use crate::drivers::pic;
use crate::sched::{self, SleepKey};

/// Vetor do timer (IRQ 0 remapeada).
pub const TIMER_VECTOR: usize = pic::IRQ_BASE as usize + pic::LINE_TIMER as usize;

// Endereço usado como chave de sleep dos que esperam por ticks
static TICK_SLEEP: u8 = 0;

/// Chave de sleep acordada a cada tick.
#[inline]
pub fn tick_key() -> SleepKey {
    sched::key_of(&TICK_SLEEP)
}

/// Prazo absoluto (ns monotônicos) para uma duração relativa.
#[inline]
pub fn deadline_after(now: i64, duration: &Timespec) -> i64 {
    now.saturating_add(duration.as_nanos())
}

/// Handler do vetor 0x20.
pub fn timer_intr(_tf: &mut TrapFrame) {
    jiffies::tick();
    sched::wakeup(tick_key(), -1);
    pic::eoi(TIMER_VECTOR);
    sched::yield_now();
}

/// Dorme até `deadline` (ns monotônicos).
pub fn sleep_until(deadline: i64) {
    while nanosecond() < deadline {
        sched::sleepon(tick_key());
    }
}

/// nanosleep(2): dorme pelo menos `duration`.
pub fn nanosleep(duration: &Timespec) {
    sleep_until(deadline_after(nanosecond(), duration));
}

/// Programa o PIT e registra o handler do tick.
pub fn init() {
    if crate::drivers::timer::init(HZ as u32).is_err() {
        crate::core::panic::throw("(Time) frequência de tick inválida");
    }
    crate::trap::register_trap(TIMER_VECTOR, timer_intr);
    pic::enable_irq(pic::LINE_TIMER);
    crate::kinfo!("(Time) Tick habilitado, HZ=", HZ);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::clock::MS;

    #[test]
    fn deadline_adds_duration() {
        let d = deadline_after(1_000, &Timespec::new(0, 500 * MS));
        assert_eq!(d, 1_000 + 500 * MS);
    }

    #[test]
    fn deadline_saturates() {
        assert_eq!(deadline_after(i64::MAX - 1, &Timespec::new(10, 0)), i64::MAX);
    }

    #[test]
    fn half_second_sleep_follows_the_ticks() {
        use crate::sched::task::{ThreadState, ThreadTable};
        use alloc::boxed::Box;

        let mut table = Box::new(ThreadTable::new());
        let me = table.alloc();
        table.get_mut(me).state = ThreadState::Running;
        let other = 0u8;

        let deadline = deadline_after(nanosecond(), &Timespec::new(0, 500 * MS));
        let mut ticks = 0;
        // o mesmo laço de `sleep_until`, com o tick simulado
        while nanosecond() < deadline {
            table.sleep(me, tick_key());
            assert_eq!(table.get(me).state, ThreadState::Sleeping);
            // outra chave não acorda
            assert_eq!(table.wakeup(sched::key_of(&other), -1), 0);
            assert_eq!(table.get(me).state, ThreadState::Sleeping);

            jiffies::tick();
            ticks += 1;
            assert_eq!(table.wakeup(tick_key(), -1), 1);
            assert_eq!(table.get(me).state, ThreadState::Runnable);
            table.get_mut(me).state = ThreadState::Running;
        }
        assert!(ticks <= 50);
        assert!(nanosecond() >= deadline);
    }
}
