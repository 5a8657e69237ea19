/// Arquivo: x86_64/idt.rs
///
/// Propósito: Gerenciamento da Interrupt Descriptor Table (IDT).
/// Todos os 256 vetores apontam para stubs gerados em `interrupts.rs`, que
/// montam um `TrapFrame` uniforme e chamam o despachante comum.
///
/// Detalhes de Implementação:
/// - Define `IdtEntry` conforme especificação AMD64/Intel 64.
/// - O vetor da syscall (0x80) recebe DPL 3 para aceitar `int 0x80` de Ring 3.
use super::gdt::KERNEL_CODE_SEL;
use super::{NVECTORS, SYSCALL_VECTOR};
use core::mem::size_of;

/// Endereço de um stub de entrada (código assembly).
pub type HandlerFunc = u64;

/// Present, Interrupt Gate (IF é limpo na entrada)
const GATE_INTERRUPT: u8 = 0x8E;

/// Entrada da IDT (16 bytes em 64-bit)
#[derive(Debug, Clone, Copy)]
#[repr(C, packed)]
pub struct IdtEntry {
    offset_low: u16,
    selector: u16,
    ist_reserved_legacy: u8, // Bits 0-2: IST, 3-7: Reservado
    type_attr: u8,           // Gate Type, DPL, Present
    offset_mid: u16,
    offset_high: u32,
    reserved: u32,
}

impl IdtEntry {
    /// Cria uma entrada vazia (não presente)
    pub const fn missing() -> Self {
        Self {
            offset_low: 0,
            selector: 0,
            ist_reserved_legacy: 0,
            type_attr: 0,
            offset_mid: 0,
            offset_high: 0,
            reserved: 0,
        }
    }

    /// Cria uma interrupt gate apontando para `handler`.
    ///
    /// `dpl`: privilégio mínimo para disparar o vetor via `int n`.
    pub fn new(handler: HandlerFunc, dpl: u8) -> Self {
        let addr = handler;
        Self {
            offset_low: (addr & 0xFFFF) as u16,
            selector: KERNEL_CODE_SEL.0,
            ist_reserved_legacy: 0,
            type_attr: GATE_INTERRUPT | ((dpl & 3) << 5),
            offset_mid: ((addr >> 16) & 0xFFFF) as u16,
            offset_high: (addr >> 32) as u32,
            reserved: 0,
        }
    }

    /// DPL da entrada.
    pub fn dpl(&self) -> u8 {
        (self.type_attr >> 5) & 3
    }

    /// Endereço do handler.
    pub fn handler(&self) -> u64 {
        (self.offset_low as u64) | ((self.offset_mid as u64) << 16) | ((self.offset_high as u64) << 32)
    }
}

const _: () = assert!(size_of::<IdtEntry>() == 16);

/// A Tabela IDT propriamente dita
#[repr(C, align(16))]
pub struct Idt {
    entries: [IdtEntry; NVECTORS],
}

impl Idt {
    pub const fn new() -> Self {
        Self {
            entries: [IdtEntry::missing(); NVECTORS],
        }
    }

    /// Define o stub de um vetor.
    pub fn set_handler(&mut self, vector: u8, handler: HandlerFunc, dpl: u8) {
        self.entries[vector as usize] = IdtEntry::new(handler, dpl);
    }

    /// Preenche todos os vetores a partir da base da tabela de stubs.
    pub fn fill(&mut self, vector_base: u64) {
        for v in 0..NVECTORS {
            let dpl = if v == SYSCALL_VECTOR { 3 } else { 0 };
            let stub = vector_base + (v as u64) * super::interrupts::STUB_ALIGN as u64;
            self.set_handler(v as u8, stub, dpl);
        }
    }

    pub fn entry(&self, vector: u8) -> &IdtEntry {
        &self.entries[vector as usize]
    }

    /// Carrega a IDT na CPU (lidt)
    ///
    /// # Safety
    ///
    /// `lidt` é unsafe. A tabela deve ter tempo de vida 'static.
    pub unsafe fn load(&'static self) {
        let descriptor = IdtDescriptor {
            limit: (size_of::<Self>() - 1) as u16,
            base: (self as *const Self) as u64,
        };
        core::arch::asm!("lidt [{}]", in(reg) &descriptor, options(readonly, nostack, preserves_flags));
    }
}

/// Descritor para LIDT
#[repr(C, packed)]
struct IdtDescriptor {
    limit: u16,
    base: u64,
}

// Global IDT (mutável apenas na init)
static mut IDT: Idt = Idt::new();

/// Aponta os 256 vetores para os stubs e carrega a IDT.
///
/// # Safety
///
/// Boot, uma única vez, com interrupções desabilitadas.
pub unsafe fn init() {
    let idt = &mut *(&raw mut IDT);
    idt.fill(super::interrupts::vector_base() as u64);
    (&*(&raw const IDT)).load();
    crate::ktrace!("(Arch) IDT carregada, stubs em ", super::interrupts::vector_base());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syscall_gate_is_reachable_from_ring3() {
        let mut idt = Idt::new();
        idt.fill(0x10_0000);
        assert_eq!(idt.entry(0x80).dpl(), 3);
        assert_eq!(idt.entry(14).dpl(), 0);
        assert_eq!(idt.entry(0x20).handler(), 0x10_0000 + 0x20 * 16);
    }

    #[test]
    fn entry_splits_high_addresses() {
        let e = IdtEntry::new(0xFFFF_8000_1234_5678, 0);
        assert_eq!(e.handler(), 0xFFFF_8000_1234_5678);
    }
}
