//! Conduit routing: host -> conduit table and its out-of-band refresher.
//!
//! Request handling only ever reads the table; the refresher task is the
//! single writer.

pub mod cache;
pub mod refresher;

pub use cache::{RefreshStats, RoutingCache};
pub use refresher::{ConduitSource, RoutingRefresher};
