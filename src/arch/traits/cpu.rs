//! Interface Abstrata de CPU (HAL).
//! Define as operações que qualquer arquitetura deve implementar.

pub trait CpuOps {
    /// Para a execução da CPU até a próxima interrupção (instrução HLT).
    fn halt();

    /// Dica de spin-loop (PAUSE).
    fn relax();

    /// Desabilita interrupções globalmente (CLI).
    /// Crítico para seções atômicas no kernel: com uma única CPU,
    /// "interrupções desabilitadas" substitui qualquer lock.
    fn disable_interrupts();

    /// Habilita interrupções globalmente (STI).
    fn enable_interrupts();

    /// Verifica se as interrupções estão habilitadas.
    fn are_interrupts_enabled() -> bool;

    /// Entra em loop infinito de halt com interrupções desabilitadas.
    /// Usado em pânicos irrecuperáveis.
    fn hang() -> ! {
        Self::disable_interrupts();
        loop {
            Self::halt();
        }
    }
}
