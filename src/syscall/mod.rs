//! Sistema de Syscalls do eggOS
//!
//! O runtime hospedado emite syscalls Linux x86_64 cruas via `int 0x80`.
//! O kernel atende uma fatia pequena no próprio trap e encaminha o resto
//! para colaboradores registrados por número.
//!
//! # Módulos
//!
//! - `abi`: Convenção de chamada, `SyscallArgs`, `SyscallRequest`
//! - `error`: Palavra de retorno (valor ou -errno)
//! - `numbers`: Numeração Linux + primitivas internas
//! - `classify`: Inline ou encaminhada
//! - `dispatch`: Handler do vetor 0x80 e tabela inline
//! - `forward` / `service`: Caixa de chamadas e serviço de syscalls
//! - `registry`: Handlers encaminhados
//! - `memory`, `process`, `signal`, `time`, `event`, `io`: implementações
//! - `raw`: Syscalls emitidas pelas threads de kernel

pub mod abi;
pub mod classify;
pub mod dispatch;
pub mod error;
pub mod forward;
pub mod numbers;
pub mod raw;
pub mod registry;
pub mod service;

// Módulos de implementação
pub mod event;
pub mod io;
pub mod memory;
pub mod process;
pub mod signal;
pub mod time;


// Re-exports principais
pub use abi::{SyscallArgs, SyscallRequest};
pub use dispatch::syscall_intr;
pub use error::{Errno, SysResult};
pub use registry::{register_syscall, SyscallHandler};

/// Instala o vetor 0x80 e os handlers embutidos.
pub fn init() {
    crate::trap::register_trap(crate::arch::platform::SYSCALL_VECTOR, syscall_intr);
    io::register_builtins();
    crate::kinfo!("(Syscall) Vetor 0x80 pronto");
}
