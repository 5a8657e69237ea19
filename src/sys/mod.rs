//! System Definitions (ABI).
//!
//! Constantes e tipos que o runtime hospedado espera ver, no formato Linux.

pub mod error;

pub use error::{Errno, SysResult};
