//! eggOS Kernel Library.
//!
//! Núcleo de execução do eggOS: despacho de traps, escalonador cooperativo,
//! interceptação e encaminhamento de syscalls, paginação e a emulação de
//! timer/epoll/pipe/sinais construída sobre um único primitivo de
//! sleep/wakeup.
//!
//! Em builds de teste (`cargo test --lib`) a biblioteca é compilada para o
//! host com `std`, e apenas a lógica independente de hardware é exercitada.

#![cfg_attr(not(test), no_std)]

// Heap do kernel (Box/Vec para objetos de colaboradores)
extern crate alloc;

// --- Módulos de Baixo Nível (Hardware) ---
pub mod arch; // HAL (CPU, GDT, IDT, stubs de trap)
pub mod drivers; // Serial, PIC, PIT, CMOS

// --- Módulos Centrais ---
pub mod core; // Boot, entry, logging, panic, tempo
pub mod klib; // Utilitários internos e framework de testes
pub mod mm; // Páginas físicas, tabela de páginas, pool, heap
pub mod sync; // Spinlock com interrupções desabilitadas
pub mod sys; // Errno

// --- Subsistemas ---
pub mod ipc; // Futex, epoll, pipe
pub mod sched; // Threads, troca de contexto, sinais
pub mod syscall; // Classificação, encaminhamento, handlers
pub mod trap; // Registro e despacho de traps, IRQs adiadas

pub use crate::core::boot::multiboot::BootInfo;
pub use crate::core::entry::{kernel_main, HostedRuntime};
