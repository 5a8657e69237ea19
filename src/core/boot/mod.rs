//! # Boot - Inicialização do Sistema
//!
//! Handoff do bootloader (Multiboot v1) e preparação da pilha inicial do
//! runtime hospedado.

pub mod cmdline;
pub mod multiboot;
