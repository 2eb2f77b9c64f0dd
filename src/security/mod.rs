//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (exchange with a fresh SecurityContext):
//!     → composer.rs (attach the configured mechanisms, in order)
//!     → authenticator.rs (try them; first success sets the principal)
//!     → [tokens: issue + stamp, token service]
//!     → gate.rs (anonymous requests never reach the upstream)
//! ```
//!
//! # Design Decisions
//! - Mechanisms are opaque: only ordering and composition live here
//! - Fail closed: no principal means 401 on proxied paths
//! - Credential comparison is constant-time

pub mod authenticator;
pub mod basic;
pub mod composer;
pub mod context;
pub mod gate;
pub mod mechanism;

pub use authenticator::{send_unauthorized, AuthenticationStage, NO_AUTH_CHALLENGE};
pub use basic::{BasicArgs, BasicAuthMechanism, BasicUser};
pub use composer::MechanismComposer;
pub use context::{Principal, SecurityContext};
pub use gate::AccessGate;
pub use mechanism::{AuthMechanism, AuthOutcome};
