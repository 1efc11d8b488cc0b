//! Built-in token providers.
//!
//! - `internal`: email/password login against the resource service.
//! - `static_key`: the backend API key is itself the bearer credential.
//! - `signed_assertion`: service-account JWT exchanged for an OAuth token.

pub mod internal;
pub mod signed_assertion;
pub mod static_key;

pub use internal::InternalAuthProvider;
pub use signed_assertion::SignedAssertionProvider;
pub use static_key::StaticKeyProvider;
