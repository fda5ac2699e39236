//! Inbound wire decoding.
//!
//! Every backend message is a JSON object whose fields are all optional and
//! independent. Decoding turns it into an ordered list of [`Classified`]
//! effects (identity, then data, then notice) or rejects it as a whole.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::{MonitorError, Result};
use crate::state::ServiceIdentity;

/// Wire shape of an inbound message.
///
/// `service_url` and `body` are accepted as aliases so the reference backend
/// (which also sends an ignored `counter`) decodes without translation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    #[serde(default, alias = "service_url")]
    service_identity: Option<String>,
    #[serde(default, alias = "body")]
    data: Option<String>,
    #[serde(default)]
    notice: Option<String>,
}

/// One effect carried by an inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classified {
    Heartbeat(ServiceIdentity),
    Frame(String),
    Notice(String),
}

/// Decode one raw inbound message.
///
/// Returns an empty list for an object with none of the known fields.
/// Anything that is not a JSON object, or has a known field of the wrong
/// type, is [`MonitorError::MalformedMessage`].
pub fn classify(raw: &str) -> Result<Vec<Classified>> {
    let value: Value = serde_json::from_str(raw)?;
    if !value.is_object() {
        return Err(MonitorError::MalformedMessage(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    }
    let wire: WireMessage = serde_json::from_value(value)?;

    let mut effects = Vec::with_capacity(3);
    if let Some(url) = wire.service_identity {
        effects.push(Classified::Heartbeat(ServiceIdentity::new(url)));
    }
    if let Some(payload) = wire.data {
        effects.push(Classified::Frame(payload));
    }
    if let Some(text) = wire.notice {
        effects.push(Classified::Notice(text));
    }
    Ok(effects)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
