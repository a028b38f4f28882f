//! Users page parser
//!
//! Only the envelope and the two fields the engine relies on are checked;
//! everything else in a record is carried through untouched.

use crate::fetcher::{FetcherError, FetcherResult};
use crate::resume::Cursor;
use crate::{Page, UserRecord};
use serde_json::{Map, Value};

/// Parse a `{data: [...], next_cursor: string|null}` body
pub fn parse_page(body: &str) -> FetcherResult<Page> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| FetcherError::MalformedResponse(format!("body is not JSON: {e}")))?;

    let envelope = value
        .as_object()
        .ok_or_else(|| FetcherError::MalformedResponse("body is not an object".to_string()))?;

    let data = envelope
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| FetcherError::MalformedResponse("missing `data` array".to_string()))?;

    let next_cursor = match envelope.get("next_cursor") {
        None => {
            return Err(FetcherError::MalformedResponse(
                "missing `next_cursor`".to_string(),
            ))
        }
        Some(Value::Null) => None,
        Some(Value::String(s)) => Cursor::from_stored(s),
        Some(other) => {
            return Err(FetcherError::MalformedResponse(format!(
                "`next_cursor` must be a string or null, got {other}"
            )))
        }
    };

    let records = data
        .iter()
        .enumerate()
        .map(|(index, item)| parse_record(index, item))
        .collect::<FetcherResult<Vec<_>>>()?;

    Ok(Page {
        records,
        next_cursor,
    })
}

fn parse_record(index: usize, item: &Value) -> FetcherResult<UserRecord> {
    let object = item.as_object().ok_or_else(|| {
        FetcherError::MalformedResponse(format!("record {index} is not an object"))
    })?;

    let id = object
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| FetcherError::MalformedResponse(format!("record {index} has no string `id`")))?;

    let created_at = object
        .get("created_at")
        .and_then(Value::as_i64)
        .ok_or_else(|| {
            FetcherError::MalformedResponse(format!("record {id} has no integer `created_at`"))
        })?;

    let attributes: Map<String, Value> = object
        .iter()
        .filter(|(key, _)| key.as_str() != "id" && key.as_str() != "created_at")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(UserRecord {
        id: id.to_string(),
        created_at,
        attributes,
    })
}
