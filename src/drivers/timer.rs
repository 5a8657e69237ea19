//! Driver do PIT (Programmable Interval Timer) - Intel 8253/8254.
//!
//! Gera o "heartbeat" do sistema (vetor 0x20) e fornece a correção
//! sub-tick lida do próprio contador regressivo do canal 0.
//!
//! A contagem de ticks e o que fazer a cada tick ficam em `core::time`.

use crate::arch::x86_64::ports::Port;
use crate::sys::Errno;

/// Frequência base do oscilador do PIT.
pub const BASE_FREQUENCY: u32 = 1_193_180;

// Portas de I/O do PIT
const PORT_CHANNEL0: u16 = 0x40; // Canal 0 (System Timer)
const PORT_COMMAND: u16 = 0x43; // Registrador de Comando

/// Canal 0, lobyte/hibyte, modo 3 (square wave)
const CMD_SQUARE_WAVE: u8 = 0x36;
/// Canal 0, latch do contador atual
const CMD_LATCH: u8 = 0x00;

/// Driver do Programmable Interval Timer.
pub struct Pit {
    channel0: Port<u8>,
    command: Port<u8>,
}

impl Pit {
    pub const fn new() -> Self {
        Self {
            channel0: Port::new(PORT_CHANNEL0),
            command: Port::new(PORT_COMMAND),
        }
    }

    /// Programa o canal 0 com o divisor para `freq` Hz.
    pub fn set_frequency(&self, freq: u32) -> Result<u32, Errno> {
        let divisor = divisor_for(freq)?;

        self.command.write(CMD_SQUARE_WAVE);
        self.channel0.write((divisor & 0xFF) as u8);
        self.channel0.write((divisor >> 8) as u8);

        let actual = BASE_FREQUENCY / divisor;
        crate::kinfo!("(PIT) Frequência configurada (Hz): ", actual);
        Ok(actual)
    }

    /// Valor corrente do contador regressivo.
    pub fn latch(&self) -> u16 {
        self.command.write(CMD_LATCH);
        let lo = self.channel0.read() as u16;
        let hi = self.channel0.read() as u16;
        (hi << 8) | lo
    }
}

/// Divisor do PIT para uma frequência.
pub fn divisor_for(freq: u32) -> Result<u32, Errno> {
    if freq == 0 || freq > BASE_FREQUENCY {
        return Err(Errno::EINVAL);
    }
    let divisor = BASE_FREQUENCY / freq;
    // O divisor deve caber em 16 bits
    if divisor > 0xFFFF {
        return Err(Errno::EINVAL);
    }
    Ok(divisor)
}

pub static PIT: Pit = Pit::new();

/// Inicializa o PIT com a frequência de tick do kernel.
pub fn init(hz: u32) -> Result<u32, Errno> {
    PIT.set_frequency(hz)
}

/// Pulsos do PIT decorridos desde o último tick.
pub fn latch_elapsed(hz: u32) -> u32 {
    let div = BASE_FREQUENCY / hz;
    div.saturating_sub(PIT.latch() as u32)
}
