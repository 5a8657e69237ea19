//! Scheduler core

pub mod idle;
pub mod scheduler;
