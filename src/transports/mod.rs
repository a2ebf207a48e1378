//! Transport implementations

pub mod http;
pub mod memory;

pub use http::HttpTransport;
pub use memory::{MemoryTransport, StubResponse};

// Re-export the trait next to its implementations
pub use crate::core::Transport;
