//! Body-shape compliance.
//!
//! Writes must carry `records[0].fields`; record-targeted writes also need
//! `records[0].id`. Reads and deletes never forward a body.

use serde_json::Value;

use conduit_core::error::{ConduitError, Result};
use conduit_core::model::HttpMethod;

use super::engine::StageOutcome;
use crate::context::RequestContext;

pub fn check(ctx: &mut RequestContext) -> StageOutcome {
    let Some(method) = ctx.method else {
        return StageOutcome::Continue;
    };

    if !method.carries_body() {
        ctx.body = None;
        ctx.malformed_body = None;
        return StageOutcome::Continue;
    }

    if let Some(reason) = &ctx.malformed_body {
        return StageOutcome::Reject(ConduitError::UnprocessableEntity(format!(
            "request body is not valid JSON: {reason}"
        )));
    }

    match validate(ctx.body.as_ref(), method) {
        Ok(()) => StageOutcome::Continue,
        Err(e) => StageOutcome::Reject(e),
    }
}

pub fn validate(body: Option<&Value>, method: HttpMethod) -> Result<()> {
    let records = body
        .and_then(|b| b.get("records"))
        .and_then(Value::as_array)
        .ok_or_else(|| ConduitError::missing_body_part("records"))?;

    let first = records
        .first()
        .ok_or_else(|| ConduitError::missing_body_part("fields"))?;

    if !first.get("fields").is_some_and(Value::is_object) {
        return Err(ConduitError::missing_body_part("fields"));
    }

    if method.targets_record() && first.get("id").map_or(true, Value::is_null) {
        return Err(ConduitError::missing_body_part("id"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn missing(res: Result<()>) -> String {
        match res {
            Err(ConduitError::UnprocessableEntity(msg)) => msg,
            other => format!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn post_requires_records() {
        assert!(missing(validate(None, HttpMethod::Post)).contains("`records`"));
        let body = json!({"fields": {"a": 1}});
        assert!(missing(validate(Some(&body), HttpMethod::Post)).contains("`records`"));
        let body = json!({"records": {"fields": {}}});
        assert!(missing(validate(Some(&body), HttpMethod::Post)).contains("`records`"));
    }

    #[test]
    fn first_record_requires_fields() {
        let body = json!({"records": []});
        assert!(missing(validate(Some(&body), HttpMethod::Post)).contains("`fields`"));
        let body = json!({"records": [{"id": "rec1"}]});
        assert!(missing(validate(Some(&body), HttpMethod::Post)).contains("`fields`"));
        let body = json!({"records": [{"fields": "name=x"}]});
        assert!(missing(validate(Some(&body), HttpMethod::Post)).contains("`fields`"));
    }

    #[test]
    fn updates_require_id() {
        let body = json!({"records": [{"fields": {"name": "x"}}]});
        assert!(validate(Some(&body), HttpMethod::Post).is_ok());
        assert!(missing(validate(Some(&body), HttpMethod::Patch)).contains("`id`"));
        assert!(missing(validate(Some(&body), HttpMethod::Put)).contains("`id`"));

        let body = json!({"records": [{"id": "rec1", "fields": {"name": "x"}}]});
        assert!(validate(Some(&body), HttpMethod::Put).is_ok());
    }
}
