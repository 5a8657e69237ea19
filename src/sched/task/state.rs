//! Estados de thread

/// Estado de um slot da tabela de threads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadState {
    /// Slot nunca usado
    #[default]
    Unused,
    /// Alocado, frame inicial ainda sendo montado
    Initing,
    /// Dormindo numa chave de sleep
    Sleeping,
    /// Pronta para executar
    Runnable,
    /// Executando agora
    Running,
    /// Terminada; o slot pode ser reciclado
    Exit,
}

impl ThreadState {
    /// O slot pode receber uma thread nova?
    pub const fn is_free(self) -> bool {
        matches!(self, Self::Unused | Self::Exit)
    }
}
