//! Access-token lifecycle: cache-first lookup with one pluggable provider per
//! service type.
//!
//! Adding a backend only requires registering another `TokenProvider`; the
//! dispatcher depends on nothing but the `AccessToken` shape.

pub mod credentials;
pub mod providers;
pub mod service;

pub use credentials::CredentialStore;
pub use service::{Clock, IssuedToken, SystemClock, TokenProvider, TokenService};
