//! Request pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → exchange.rs (method, path, headers, security context)
//!     → handler.rs (stages in order, each Continue or Terminated)
//!         composer → authentication → token issuer → token service → access gate
//!     → Terminated: exchange becomes the response
//!     → Continue: request is forwarded upstream
//! ```
//!
//! # Design Decisions
//! - Chain built once at startup, immutable afterwards
//! - Per-request state lives only on the exchange
//! - Errors are returned, never written to the client verbatim

pub mod exchange;
pub mod handler;

pub use exchange::Exchange;
pub use handler::{Outcome, Pipeline, PipelineBuilder, PipelineHandler};
