//! Context switching module
//!
//! A troca cooperativa salva apenas os registradores callee-saved e o
//! endereço de retorno. É a única peça do escalonador escrita em assembly.

pub mod switch;

pub use switch::{switch, CpuContext};
