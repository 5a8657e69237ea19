//! Implementação x86_64

pub mod cpu;
pub mod frame;
pub mod gdt;
pub mod idt;
pub mod interrupts;
pub mod ports;

pub use cpu::X64Cpu as Cpu;

/// Número de vetores da IDT.
pub const NVECTORS: usize = 256;

/// Vetor da syscall (`int 0x80`).
pub const SYSCALL_VECTOR: usize = 0x80;

/// Inicializa o básico da arquitetura: FPU, GDT/TSS e IDT.
///
/// # Safety
///
/// Deve ser chamado no início do boot, com interrupções desabilitadas.
pub unsafe fn init_basics() {
    cpu::X64Cpu::init_sse();
    gdt::init();
    idt::init();

    crate::kinfo!("(Arch) Basics initialized (FPU, GDT, TSS, IDT)");
}
