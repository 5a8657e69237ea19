//! Traits da HAL.

pub mod cpu;

pub use cpu::CpuOps;
