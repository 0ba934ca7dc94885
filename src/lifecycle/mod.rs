//! Lifecycle management for the demo server.
//!
//! # Data Flow
//! ```text
//! Ctrl+C → Shutdown::trigger
//!     → axum graceful shutdown (stop accepting, drain in-flight requests)
//!     → Client::flush (bounded) → exit
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
