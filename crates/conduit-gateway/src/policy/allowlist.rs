//! Caller IP allow-list matching.
//!
//! An empty list is open. A list made only of inactive entries is also open:
//! it counts as not yet enforced. Otherwise only active entries admit.

use std::net::IpAddr;

use conduit_core::error::ConduitError;
use conduit_core::model::{AllowListEntry, EntryStatus};

use super::engine::StageOutcome;
use crate::context::RequestContext;

pub fn is_allowed(list: &[AllowListEntry], caller: IpAddr) -> bool {
    let caller = caller.to_canonical();
    if list.is_empty() || caller.is_loopback() {
        return true;
    }

    let mut any_active = false;
    for entry in list {
        if entry.status != EntryStatus::Active {
            continue;
        }
        if entry.ip.to_canonical() == caller {
            return true;
        }
        any_active = true;
    }

    // All entries disabled.
    !any_active
}

pub fn check(ctx: &mut RequestContext) -> StageOutcome {
    if is_allowed(&ctx.conduit.allow_list, ctx.client_ip) {
        StageOutcome::Continue
    } else {
        StageOutcome::Reject(ConduitError::Forbidden(format!(
            "{} is not on the allow list",
            ctx.client_ip
        )))
    }
}
