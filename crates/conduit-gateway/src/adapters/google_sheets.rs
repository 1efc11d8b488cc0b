//! Spreadsheet values backend.
//!
//! The container key is `spreadsheetId[/Sheet]`. Row 1 holds the column
//! names; records map onto rows by those names and a record id is its row
//! number. Header rows are cached per container after the first write.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use serde_json::{json, Map, Value};

use conduit_core::error::{ConduitError, Result};
use conduit_core::model::{AccessToken, BackendType, HttpMethod};

use super::{
    bearer_headers, parse_base, send_call, split_record_ids, AdapterRequest, BackendCall,
    BackendResponse, GatewayResponse, IntegrationAdapter,
};
use crate::upstream::{ensure_success, read_body, transport_error};

const DEFAULT_SHEET: &str = "Sheet1";
const VALUE_INPUT: &str = "USER_ENTERED";

pub struct GoogleSheetsAdapter {
    base_url: String,
    http: Client,
    headers: DashMap<String, Arc<Vec<String>>>,
}

impl GoogleSheetsAdapter {
    pub fn new(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
            headers: DashMap::new(),
        }
    }

    /// Forget the cached header row (e.g. after columns were renamed).
    pub fn invalidate_headers(&self, container_key: &str) {
        self.headers.remove(container_key);
    }

    pub fn cached_header_count(&self) -> usize {
        self.headers.len()
    }

    fn url(&self, spreadsheet_id: &str, tail: &[&str]) -> Result<String> {
        let mut url = parse_base(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| {
                ConduitError::Internal(format!("backend base url cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", spreadsheet_id])
            .extend(tail);
        Ok(url.to_string())
    }

    async fn header_row(&self, container_key: &str, token: &AccessToken) -> Result<Arc<Vec<String>>> {
        if let Some(cached) = self.headers.get(container_key).map(|e| Arc::clone(e.value())) {
            return Ok(cached);
        }

        let (spreadsheet_id, sheet) = split_container(container_key);
        let url = self.url(spreadsheet_id, &["values", format!("{}!1:1", quote_sheet(sheet)).as_str()])?;
        let resp = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, token.authorization())
            .send()
            .await
            .map_err(|e| transport_error("sheet header fetch", e))?;
        let data = read_body(ensure_success(resp).await?).await;

        let row: Vec<String> = data["values"]
            .get(0)
            .and_then(Value::as_array)
            .map(|cells| cells.iter().map(cell_text).collect())
            .unwrap_or_default();
        if row.is_empty() {
            return Err(ConduitError::UnprocessableEntity(format!(
                "sheet `{sheet}` has no header row"
            )));
        }

        tracing::debug!(container = %container_key, columns = row.len(), "sheet header row cached");
        let row = Arc::new(row);
        self.headers.insert(container_key.to_string(), Arc::clone(&row));
        Ok(row)
    }
}

#[async_trait]
impl IntegrationAdapter for GoogleSheetsAdapter {
    fn backend(&self) -> BackendType {
        BackendType::GoogleSheets
    }

    async fn map_in(&self, req: AdapterRequest) -> Result<BackendCall> {
        let (spreadsheet_id, sheet) = split_container(&req.container_key);
        let sheet_range = quote_sheet(sheet);
        let origin = req.method;
        let headers = bearer_headers(&req.token, origin != HttpMethod::Get);

        let (method, url, query, body) = match origin {
            HttpMethod::Get => (
                HttpMethod::Get,
                self.url(spreadsheet_id, &["values", sheet_range.as_str()])?,
                req.query,
                None,
            ),
            HttpMethod::Post => {
                let columns = self.header_row(&req.container_key, &req.token).await?;
                let rows = records(&req.body)
                    .iter()
                    .map(|r| to_row(&columns, r, Value::String(String::new())))
                    .collect::<Vec<_>>();
                (
                    HttpMethod::Post,
                    self.url(spreadsheet_id, &["values", format!("{sheet_range}:append").as_str()])?,
                    vec![
                        ("valueInputOption".to_string(), VALUE_INPUT.to_string()),
                        ("insertDataOption".to_string(), "INSERT_ROWS".to_string()),
                    ],
                    Some(json!({ "values": rows })),
                )
            }
            HttpMethod::Put | HttpMethod::Patch => {
                let columns = self.header_row(&req.container_key, &req.token).await?;
                // PATCH leaves absent cells alone (null), PUT clears them.
                let fill = if origin == HttpMethod::Patch {
                    Value::Null
                } else {
                    Value::String(String::new())
                };
                let data = records(&req.body)
                    .iter()
                    .map(|r| -> Result<Value> {
                        let row = row_number(r.get("id"))?;
                        Ok(json!({
                            "range": format!("{sheet_range}!A{row}"),
                            "values": [to_row(&columns, r, fill.clone())],
                        }))
                    })
                    .collect::<Result<Vec<_>>>()?;
                (
                    HttpMethod::Post,
                    self.url(spreadsheet_id, &["values:batchUpdate"])?,
                    Vec::new(),
                    Some(json!({ "valueInputOption": VALUE_INPUT, "data": data })),
                )
            }
            HttpMethod::Delete => {
                let (ids, _) = split_record_ids(&req.query);
                if ids.is_empty() {
                    return Err(ConduitError::missing_body_part("records"));
                }
                let ranges = ids
                    .iter()
                    .map(|id| -> Result<String> {
                        let row = row_number(Some(&Value::String(id.clone())))?;
                        Ok(format!("{sheet_range}!{row}:{row}"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                (
                    HttpMethod::Post,
                    self.url(spreadsheet_id, &["values:batchClear"])?,
                    Vec::new(),
                    Some(json!({ "ranges": ranges })),
                )
            }
        };

        Ok(BackendCall {
            method,
            url,
            query,
            headers,
            body,
            origin,
            container_key: req.container_key,
        })
    }

    async fn transmit(&self, call: BackendCall) -> Result<BackendResponse> {
        let container = call.container_key.clone();
        let resp = send_call(&self.http, call).await?;
        if resp.origin != HttpMethod::Get && !(200..300).contains(&resp.status) {
            // Columns may have moved; fetch the header row again next write.
            self.invalidate_headers(&container);
        }
        Ok(resp)
    }

    /// Reads come back as a value grid; reshape them into records.
    async fn map_out(&self, resp: BackendResponse) -> Result<GatewayResponse> {
        if resp.origin != HttpMethod::Get || !(200..300).contains(&resp.status) {
            return Ok(GatewayResponse {
                status: resp.status,
                data: resp.data,
            });
        }
        Ok(GatewayResponse {
            status: resp.status,
            data: grid_to_records(&resp.data),
        })
    }
}

fn split_container(key: &str) -> (&str, &str) {
    match key.split_once('/') {
        Some((id, sheet)) if !sheet.is_empty() => (id, sheet),
        Some((id, _)) => (id, DEFAULT_SHEET),
        None => (key, DEFAULT_SHEET),
    }
}

/// A1 sheet reference, quoted so names with spaces or punctuation work.
fn quote_sheet(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

fn records(body: &Option<Value>) -> Vec<Value> {
    body.as_ref()
        .and_then(|b| b.get("records"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn to_row(columns: &[String], record: &Value, fill: Value) -> Vec<Value> {
    let empty = Map::new();
    let fields = record
        .get("fields")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    columns
        .iter()
        .map(|c| fields.get(c).cloned().unwrap_or_else(|| fill.clone()))
        .collect()
}

/// Record ids are sheet row numbers; row 1 is the header.
fn row_number(id: Option<&Value>) -> Result<u64> {
    let n = match id {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    n.filter(|row| *row >= 2).ok_or_else(|| {
        ConduitError::UnprocessableEntity("record id must be a data row number (>= 2)".into())
    })
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn grid_to_records(data: &Value) -> Value {
    let rows = data["values"].as_array().cloned().unwrap_or_default();
    let Some((header, body)) = rows.split_first() else {
        return json!({ "records": [] });
    };
    let columns: Vec<String> = header
        .as_array()
        .map(|cells| cells.iter().map(cell_text).collect())
        .unwrap_or_default();

    let records: Vec<Value> = body
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut fields = Map::new();
            for (col, cell) in columns.iter().zip(row.as_array().into_iter().flatten()) {
                if col.is_empty() || cell_text(cell).is_empty() {
                    continue;
                }
                fields.insert(col.clone(), cell.clone());
            }
            json!({ "id": (i + 2).to_string(), "fields": fields })
        })
        .collect();

    json!({ "records": records })
}
