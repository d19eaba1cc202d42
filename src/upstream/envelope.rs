//! The JSON envelopes of the bus information endpoints.
//!
//! The Seoul API wraps its results in `msgHeader`/`msgBody.itemList`, the
//! national API in `response.header`/`response.body.items.item`. Either list
//! arrives as an array, as a single object when there is one result, as
//! `null`, or as an empty string when there are none.

use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;

use super::UpstreamError;

const HEADER_OK: &str = "0";
const HEADER_NO_RESULT: &str = "4";

const RESULT_OK: &str = "00";
const RESULT_NO_DATA: &str = "03";

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct Envelope<T> {
    #[serde(rename = "msgHeader")]
    header: Option<MsgHeader>,
    #[serde(rename = "msgBody")]
    body: Option<MsgBody<T>>,
}

#[derive(Debug, Deserialize)]
struct MsgHeader {
    #[serde(rename = "headerCd", default, deserialize_with = "lenient_string")]
    code: Option<String>,
    #[serde(rename = "headerMsg", default, deserialize_with = "lenient_string")]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct MsgBody<T> {
    #[serde(rename = "itemList", default = "OneOrMany::empty")]
    items: OneOrMany<T>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
    Text(String),
    Null,
}

impl<T> OneOrMany<T> {
    fn empty() -> Self {
        OneOrMany::Null
    }

    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
            OneOrMany::Text(text) => {
                if !text.trim().is_empty() {
                    tracing::debug!(%text, "item list holds text instead of items");
                }
                Vec::new()
            }
            OneOrMany::Null => Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct PortalEnvelope<T> {
    response: Option<PortalResponse<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct PortalResponse<T> {
    header: Option<PortalHeader>,
    body: Option<PortalBody<T>>,
}

#[derive(Debug, Deserialize)]
struct PortalHeader {
    #[serde(rename = "resultCode", default, deserialize_with = "lenient_string")]
    code: Option<String>,
    #[serde(rename = "resultMsg", default, deserialize_with = "lenient_string")]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct PortalBody<T> {
    #[serde(default = "OneOrMany::empty")]
    items: OneOrMany<ItemField<T>>,
}

/// The `{"item": ...}` wrapper around the national API's results.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct ItemField<T> {
    #[serde(default = "OneOrMany::empty")]
    item: OneOrMany<T>,
}

/// Decode a response body into its items, mapping header error codes.
pub(crate) fn parse_items<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, UpstreamError> {
    let envelope: Envelope<T> = serde_json::from_str(body)?;

    if envelope.header.is_none() && envelope.body.is_none() {
        return Err(UpstreamError::Malformed(
            "response has neither msgHeader nor msgBody".to_string(),
        ));
    }

    if let Some(MsgHeader { code, message }) = envelope.header {
        match code.as_deref() {
            None | Some(HEADER_OK) => {}
            Some(HEADER_NO_RESULT) => return Ok(Vec::new()),
            Some(code) => {
                return Err(UpstreamError::Api {
                    code: code.to_string(),
                    message: message.unwrap_or_default(),
                });
            }
        }
    }

    Ok(envelope
        .body
        .map(|body| body.items.into_vec())
        .unwrap_or_default())
}

/// Decode a national API response body into its items, mapping result codes.
pub(crate) fn parse_portal_items<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, UpstreamError> {
    let envelope: PortalEnvelope<T> = serde_json::from_str(body)?;
    let Some(response) = envelope.response else {
        return Err(UpstreamError::Malformed("response has no response object".to_string()));
    };

    if let Some(PortalHeader { code, message }) = response.header {
        match code.as_deref() {
            None | Some(RESULT_OK) => {}
            Some(RESULT_NO_DATA) => return Ok(Vec::new()),
            Some(code) => {
                return Err(UpstreamError::Api {
                    code: code.to_string(),
                    message: message.unwrap_or_default(),
                });
            }
        }
    }

    Ok(response
        .body
        .map(|body| {
            body.items
                .into_vec()
                .into_iter()
                .flat_map(|field| field.item.into_vec())
                .collect()
        })
        .unwrap_or_default())
}

/// Accept strings, numbers or null; blank strings become `None`.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}
