//! Hidden form field (anti-spam) rules.
//!
//! A tripped rule absorbs the submission: the caller gets a normal 200 and
//! nothing reaches the backend.

use std::sync::Arc;

use serde_json::Value;

use conduit_core::model::{HiddenFieldPolicy, HiddenFieldRule, HttpMethod};

use super::engine::StageOutcome;
use crate::context::RequestContext;

pub fn check(ctx: &mut RequestContext) -> StageOutcome {
    if ctx.method != Some(HttpMethod::Post) || ctx.conduit.hidden_field_rules.is_empty() {
        return StageOutcome::Continue;
    }

    let conduit = Arc::clone(&ctx.conduit);
    let Some(fields) = ctx.first_fields_mut() else {
        return StageOutcome::Continue;
    };

    for rule in &conduit.hidden_field_rules {
        if trips(rule, fields.get(&rule.field_name)) {
            tracing::debug!(
                conduit = %conduit.id,
                field = %rule.field_name,
                policy = ?rule.policy,
                "hidden field rule tripped; absorbing submission"
            );
            return StageOutcome::Absorb;
        }
        if !rule.include {
            fields.remove(&rule.field_name);
        }
    }

    StageOutcome::Continue
}

fn trips(rule: &HiddenFieldRule, value: Option<&Value>) -> bool {
    match rule.policy {
        HiddenFieldPolicy::DropIfFilled => is_filled(value),
        HiddenFieldPolicy::PassIfMatch => !matches_value(value, &rule.value),
    }
}

/// Falsy scalars (null, "", false, 0) count as empty.
fn is_filled(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Bool(b)) => *b,
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
    }
}

/// Scalars compare by their rendered text; strings must match exactly.
fn matches_value(value: Option<&Value>, expected: &str) -> bool {
    match value {
        Some(Value::String(s)) => s == expected,
        Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string() == expected,
        _ => false,
    }
}
