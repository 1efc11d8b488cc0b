//! Domain model shared by the gateway layers.
//!
//! - `conduit`: the read-only conduit snapshot plus its access-control rules.
//! - `method`: the closed set of HTTP methods a conduit can enable.
//! - `token`: upstream access tokens and the service types that mint them.

pub mod conduit;
pub mod method;
pub mod token;

pub use conduit::{
    normalize_host, AllowListEntry, BackendType, Conduit, ConduitStatus, CredentialRef,
    EntryStatus, HiddenFieldPolicy, HiddenFieldRule,
};
pub use method::HttpMethod;
pub use token::{AccessToken, ServiceType, EXPIRY_MARGIN_SECS};
