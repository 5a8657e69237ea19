//! # Hardware Abstraction Layer (HAL)
//!
//! O módulo `arch` é a **única** ponte entre a lógica do núcleo e o hardware.
//! Registradores, instruções privilegiadas, stubs de trap e o layout exato do
//! `TrapFrame` ficam aqui.
//!
//! ## Arquitetura e Fluxo
//! 1. O resto do kernel importa `crate::arch::Cpu`.
//! 2. `Cpu` é um *type alias* para a implementação concreta (`x86_64::cpu::X64Cpu`).
//! 3. `Cpu::halt()`, `Cpu::disable_interrupts()` viram `hlt`, `cli`.
//!
//! Código alcançável a partir da entrada de trap ou da troca de contexto roda
//! num contexto **não reentrante e sem alocação**: interrupções desabilitadas,
//! nenhuma chamada ao heap, nenhuma espera além de `sleepon`.

pub mod traits;

// Seleção de Arquitetura: x86_64
#[cfg(target_arch = "x86_64")]
pub mod x86_64;

#[cfg(target_arch = "x86_64")]
pub use x86_64 as platform;

pub use platform::Cpu;
pub use platform::frame::TrapFrame;
pub use traits::*;

/// Executa `f` com interrupções desabilitadas, restaurando o estado anterior.
///
/// Usado pelas threads de kernel (que rodam com IF=1) para tocar estado
/// global compartilhado com o caminho de trap.
#[inline]
pub fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    let enabled = Cpu::are_interrupts_enabled();
    if enabled {
        Cpu::disable_interrupts();
    }
    let ret = f();
    if enabled {
        Cpu::enable_interrupts();
    }
    ret
}
