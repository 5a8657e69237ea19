//! Constantes de configuração do Scheduler

/// Capacidade da tabela de threads
pub const NTHREADS: usize = 20;

/// Tarefas de syscall encaminhada vivas ao mesmo tempo. Sobra espaço na
/// tabela para thread0, idle, os dois serviços e os clones do runtime.
pub const MAX_SYSCALL_HANDLERS: usize = 8;

/// Tamanho da pilha de cada thread (kernel e usuário)
pub const THREAD_STACK_SIZE: usize = 32 << 10;

/// Folga deixada no topo da pilha mapeada
pub const THREAD_STACK_GUARD_OFFSET: usize = 1 << 10;

/// Área de `fxsave` (x87 + SSE)
pub const FPU_STATE_SIZE: usize = 512;
