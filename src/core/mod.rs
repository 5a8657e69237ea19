//! Core Module
//!
//! Contém a lógica central do kernel, independente de arquitetura,
//! mas fundamental para o funcionamento do sistema.

pub mod boot;
pub mod entry;
pub mod logging;
pub mod panic;
pub mod time;

#[cfg(feature = "self_test")]
pub mod test;
