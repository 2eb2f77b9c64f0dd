//! Authentication token subsystem.
//!
//! # Data Flow
//! ```text
//! Authenticated exchange
//!     → issuer.rs (issue or reuse a token, stamp response headers)
//!     → service.rs (GET / DELETE / OPTIONS on {base}/{principal})
//!
//! Later request with `Authorization: Bearer <token>`
//!     → mechanism.rs → manager.rs → store.rs (constant-time match, deadline check)
//!
//! Background
//!     → sweeper.rs (drop expired entries on an interval)
//! ```
//!
//! # Design Decisions
//! - At most one live token per principal
//! - Token values are never logged
//! - Expiry is enforced on read; sweeping only reclaims memory

pub mod issuer;
pub mod manager;
pub mod mechanism;
pub mod service;
pub mod store;
pub mod sweeper;

pub use issuer::TokenIssuer;
pub use manager::{
    stamp_token_headers, strip_token_headers, RandomTokenManager, ReissuePolicy, TokenManager,
    AUTH_TOKEN_HEADER, AUTH_TOKEN_LOCATION_HEADER, AUTH_TOKEN_VALID_HEADER,
};
pub use mechanism::TokenAuthMechanism;
pub use service::TokenService;
pub use store::{IssueKind, IssuedToken, TokenStore};
pub use sweeper::ExpirySweeper;
