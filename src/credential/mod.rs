//! Authentication credential capture and replay.
//!
//! # Data Flow
//! ```text
//! upstream response
//!     → capture.rs (scan Set-Cookie for the configured name)
//!     → store.rs (atomic adopt under the capture policy)
//!
//! next inbound request
//!     → store.rs (snapshot)
//!     → http/rewrite.rs (append as Cookie)
//! ```
//!
//! # Design Decisions
//! - The store is owned by the proxy and injected at construction
//! - The cookie value is opaque: it is never inspected or logged
//! - Capture failures are silent and never block the response

pub mod capture;
pub mod store;

pub use capture::{find_cookie, CookieCapture, ResponseInterceptor};
pub use store::{Adoption, CapturePolicy, Credential, CredentialStore};
