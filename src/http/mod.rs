//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, gateway handler)
//!     → request.rs (request ID assigned or kept)
//!     → pipeline (authenticate, issue tokens, token API, access gate)
//!     → proxy.rs (forward to upstream, buffer response)
//!     → interceptors (mutate buffered response)
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod server;

pub use proxy::Forwarder;
pub use request::{request_id, MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, GatewayServer};
