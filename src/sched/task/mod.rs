//! Task management module

pub mod lifecycle;
pub mod state;
pub mod table;
pub mod thread;

pub use state::ThreadState;
pub use table::ThreadTable;
pub use thread::{Thread, ThreadId};
