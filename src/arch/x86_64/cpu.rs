//! Implementação x86_64 das operações de CPU (HAL).
//!
//! Usa Assembly inline para controle de interrupções, MSRs, registradores de
//! controle e salvamento do estado de FPU.
//!
//! # Segurança
//! Assume modo longo (64-bit) e nível de privilégio de kernel (Ring 0).

use crate::arch::traits::cpu::CpuOps;
use core::arch::asm;

/// MSR: base do segmento FS (TLS do runtime hospedado).
pub const MSR_FS_BASE: u32 = 0xC000_0100;

/// Bit IF do RFLAGS.
pub const FLAGS_IF: usize = 0x200;

/// IOPL=3: o runtime hospedado pode usar portas de I/O diretamente.
pub const FLAGS_IOPL_USER: usize = 0x3000;

pub struct X64Cpu;

impl X64Cpu {
    /// Lê um Model Specific Register (MSR).
    ///
    /// # Safety
    /// Ler um MSR reservado causa #GP.
    #[inline]
    pub unsafe fn rdmsr(msr: u32) -> u64 {
        let (high, low): (u32, u32);
        asm!(
            "rdmsr",
            in("ecx") msr,
            out("eax") low,
            out("edx") high,
            options(nomem, nostack, preserves_flags),
        );
        ((high as u64) << 32) | (low as u64)
    }

    /// Escreve um Model Specific Register (MSR).
    ///
    /// # Safety
    /// Escrever um MSR inválido causa #GP.
    #[inline]
    pub unsafe fn wrmsr(msr: u32, value: u64) {
        asm!(
            "wrmsr",
            in("ecx") msr,
            in("eax") value as u32,
            in("edx") (value >> 32) as u32,
            options(nomem, nostack, preserves_flags),
        );
    }

    /// Endereço que causou o último page fault.
    #[inline]
    #[cfg(not(test))]
    pub fn cr2() -> usize {
        let cr2: usize;
        unsafe {
            asm!("mov {}, cr2", out(reg) cr2, options(nomem, nostack, preserves_flags));
        }
        cr2
    }

    #[inline]
    #[cfg(test)]
    pub fn cr2() -> usize {
        0
    }

    /// Carrega a raiz da tabela de páginas (também invalida a TLB).
    ///
    /// # Safety
    /// `root` deve apontar para uma PML4 válida que mapeie o código atual.
    #[inline]
    pub unsafe fn load_cr3(root: usize) {
        asm!("mov cr3, {}", in(reg) root, options(nostack, preserves_flags));
    }

    /// Seletor de código atual.
    #[inline]
    pub fn cs() -> usize {
        let cs: usize;
        unsafe {
            asm!("mov {:x}, cs", out(reg) cs, options(nomem, nostack, preserves_flags));
        }
        cs & 0xFFFF
    }

    /// Frame pointer atual (para backtraces).
    #[inline(always)]
    pub fn rbp() -> usize {
        let rbp: usize;
        unsafe {
            asm!("mov {}, rbp", out(reg) rbp, options(nomem, nostack, preserves_flags));
        }
        rbp
    }

    /// Salva o estado x87/SSE em `area` (512 bytes, alinhado a 16).
    ///
    /// # Safety
    /// `area` deve ser válido para escrita de 512 bytes.
    #[inline]
    pub unsafe fn fxsave(area: usize) {
        asm!("fxsave64 [{}]", in(reg) area, options(nostack, preserves_flags));
    }

    /// Restaura o estado x87/SSE de `area`.
    ///
    /// # Safety
    /// `area` deve conter uma imagem produzida por `fxsave`.
    #[inline]
    pub unsafe fn fxrstor(area: usize) {
        asm!("fxrstor64 [{}]", in(reg) area, options(nostack, preserves_flags));
    }

    /// Define a base do FS (TLS) da thread corrente.
    #[inline]
    #[cfg(not(test))]
    pub fn set_fs_base(addr: usize) {
        unsafe { Self::wrmsr(MSR_FS_BASE, addr as u64) };
    }

    #[cfg(test)]
    pub fn set_fs_base(_addr: usize) {}

    /// Inicializa a FPU/SSE.
    ///
    /// O kernel é compilado sem SSE, mas o runtime hospedado usa XMM
    /// livremente; sem OSFXSR o primeiro `movaps` dele gera #UD.
    ///
    /// # Safety
    /// Deve ser chamado uma vez, no boot, em Ring 0.
    pub unsafe fn init_sse() {
        let mut cr0: u64;
        let mut cr4: u64;

        // CR0: limpar EM (bit 2) e TS (bit 3), setar MP (bit 1)
        asm!("mov {}, cr0", out(reg) cr0, options(nomem, nostack, preserves_flags));
        cr0 &= !(1 << 2);
        cr0 &= !(1 << 3);
        cr0 |= 1 << 1;
        asm!("mov cr0, {}", in(reg) cr0, options(nomem, nostack, preserves_flags));

        // CR4: OSFXSR (bit 9) e OSXMMEXCPT (bit 10)
        asm!("mov {}, cr4", out(reg) cr4, options(nomem, nostack, preserves_flags));
        cr4 |= 1 << 9;
        cr4 |= 1 << 10;
        asm!("mov cr4, {}", in(reg) cr4, options(nomem, nostack, preserves_flags));

        asm!("fninit", options(nomem, nostack, preserves_flags));

        // Todas as exceções SIMD mascaradas, round-to-nearest
        let mxcsr: u32 = 0x1F80;
        asm!("ldmxcsr [{}]", in(reg) &mxcsr, options(nostack, preserves_flags));

        crate::ktrace!("(Arch) FPU/SSE habilitado (CR0.MP=1, CR4.OSFXSR=1, MXCSR=0x1F80)");
    }
}

// Nos testes de host (Ring 3) `cli`/`sti` gerariam #GP: viram no-ops.
impl CpuOps for X64Cpu {
    #[inline]
    fn halt() {
        unsafe {
            asm!("hlt", options(nomem, nostack, preserves_flags));
        }
    }

    #[inline]
    fn relax() {
        unsafe {
            asm!("pause", options(nomem, nostack, preserves_flags));
        }
    }

    #[inline]
    fn disable_interrupts() {
        #[cfg(not(test))]
        unsafe {
            asm!("cli", options(nomem, nostack, preserves_flags));
        }
    }

    #[inline]
    fn enable_interrupts() {
        #[cfg(not(test))]
        unsafe {
            asm!("sti", options(nomem, nostack, preserves_flags));
        }
    }

    #[inline]
    #[cfg(test)]
    fn are_interrupts_enabled() -> bool {
        false
    }

    #[inline]
    #[cfg(not(test))]
    fn are_interrupts_enabled() -> bool {
        let rflags: u64;
        unsafe {
            asm!("pushfq; pop {}", out(reg) rflags, options(nomem, preserves_flags));
        }
        (rflags & FLAGS_IF as u64) != 0
    }
}
