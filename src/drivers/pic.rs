//! Driver do 8259 PIC (Programmable Interrupt Controller).
//!
//! Gerencia as interrupções de hardware (IRQs) antes de chegarem à CPU.
//!
//! # Remapeamento
//! Por padrão, o PIC usa vetores 0-15, que conflitam com exceções da CPU.
//! Remapeamos para 32-47. Todas as linhas começam mascaradas, exceto a
//! cascata (linha 2); drivers habilitam as suas com `enable_irq`.

use crate::arch::x86_64::ports::{io_wait, Port};

const PIC1_CMD: u16 = 0x20;
const PIC1_DATA: u16 = 0x21;
const PIC2_CMD: u16 = 0xA0;
const PIC2_DATA: u16 = 0xA1;

const PIC_EOI: u8 = 0x20;
const ICW1_INIT: u8 = 0x11;
const ICW4_8086: u8 = 0x01;

/// Primeiro vetor do PIC master.
pub const IRQ_BASE: u8 = 0x20;

/// Primeiro vetor do PIC slave.
pub const IRQ_SLAVE_BASE: u8 = IRQ_BASE + 8;

pub const LINE_TIMER: u8 = 0;
pub const LINE_KBD: u8 = 1;
pub const LINE_CASCADE: u8 = 2;
pub const LINE_COM1: u8 = 4;
pub const LINE_NIC: u8 = 11;
pub const LINE_MOUSE: u8 = 12;

struct Pic {
    offset: u8,
    command: Port<u8>,
    data: Port<u8>,
}

/// Cadeia de PICs (Master + Slave).
pub struct ChainedPics {
    pics: [Pic; 2],
}

impl ChainedPics {
    pub const fn new(offset1: u8, offset2: u8) -> Self {
        Self {
            pics: [
                Pic {
                    offset: offset1,
                    command: Port::new(PIC1_CMD),
                    data: Port::new(PIC1_DATA),
                },
                Pic {
                    offset: offset2,
                    command: Port::new(PIC2_CMD),
                    data: Port::new(PIC2_DATA),
                },
            ],
        }
    }

    /// Inicializa e remapeia o PIC, mascarando todas as linhas.
    pub fn init(&self) {
        crate::kdebug!("(PIC) init: Remapeando IRQs para vetores 32-47...");

        // ICW1: início da sequência de inicialização
        self.pics[0].command.write(ICW1_INIT);
        io_wait();
        self.pics[1].command.write(ICW1_INIT);
        io_wait();

        // ICW2: offsets dos vetores
        self.pics[0].data.write(self.pics[0].offset);
        io_wait();
        self.pics[1].data.write(self.pics[1].offset);
        io_wait();

        // ICW3: cascata
        self.pics[0].data.write(1 << LINE_CASCADE); // IRQ2 tem slave
        io_wait();
        self.pics[1].data.write(LINE_CASCADE); // identidade do slave
        io_wait();

        // ICW4: modo 8086
        self.pics[0].data.write(ICW4_8086);
        io_wait();
        self.pics[1].data.write(ICW4_8086);
        io_wait();

        // Tudo mascarado
        self.pics[0].data.write(0xFF);
        self.pics[1].data.write(0xFF);

        self.enable_irq(LINE_CASCADE);
        crate::ktrace!("(PIC) init: pronto, master=", self.pics[0].offset);
    }

    /// (porta de dados, bit) de uma linha.
    fn line(&self, line: u8) -> (&Port<u8>, u8) {
        if line >= 8 {
            (&self.pics[1].data, line - 8)
        } else {
            (&self.pics[0].data, line)
        }
    }

    pub fn enable_irq(&self, line: u8) {
        let (port, bit) = self.line(line);
        port.write(port.read() & !(1 << bit));
    }

    pub fn disable_irq(&self, line: u8) {
        let (port, bit) = self.line(line);
        port.write(port.read() | (1 << bit));
    }

    /// End Of Interrupt para o vetor (o slave primeiro, se for dele).
    pub fn eoi(&self, vector: u8) {
        if vector >= self.pics[1].offset {
            self.pics[1].command.write(PIC_EOI);
        }
        self.pics[0].command.write(PIC_EOI);
    }
}

/// Instância global. Acesso apenas com interrupções desabilitadas ou de
/// dentro do caminho de trap.
pub static PICS: ChainedPics = ChainedPics::new(IRQ_BASE, IRQ_SLAVE_BASE);

pub fn init() {
    PICS.init();
}

pub fn enable_irq(line: u8) {
    PICS.enable_irq(line);
}

pub fn disable_irq(line: u8) {
    PICS.disable_irq(line);
}

pub fn eoi(vector: usize) {
    PICS.eoi(vector as u8);
}

/// Linha do PIC correspondente a um vetor, se houver.
pub fn line_of(vector: usize) -> Option<u8> {
    let base = IRQ_BASE as usize;
    if (base..base + 16).contains(&vector) {
        Some((vector - base) as u8)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_map_back_to_lines() {
        assert_eq!(line_of(0x20), Some(LINE_TIMER));
        assert_eq!(line_of(0x2B), Some(LINE_NIC));
        assert_eq!(line_of(0x2F), Some(15));
        assert_eq!(line_of(0x30), None);
        assert_eq!(line_of(0x80), None);
    }
}
