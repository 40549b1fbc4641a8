//! Response body classification shared by both transports

use http::StatusCode;
use serde_json::Value;

use crate::error::{Error, Result};

/// Parse a complete response body.
///
/// An empty body decodes to `null`. A body whose `object` discriminator is
/// `"error"` becomes [`Error::Api`] whatever the status code; anything that is
/// not JSON becomes [`Error::InvalidResponse`].
pub fn decode_body(status: StatusCode, body: &[u8]) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    let data: Value = serde_json::from_slice(body)
        .map_err(|e| Error::invalid_response(Some(status.as_u16()), e))?;

    if is_error_object(&data) {
        return Err(Error::Api {
            status: status.as_u16(),
            error_type: error_field(&data, "type"),
            code: error_field(&data, "code"),
            message: error_field(&data, "message"),
        });
    }

    Ok(data)
}

fn is_error_object(data: &Value) -> bool {
    data.get("object").and_then(Value::as_str) == Some("error")
}

/// Field of an error body as text. Numbers and booleans keep their JSON form;
/// missing or null fields are empty.
fn error_field(data: &Value, name: &str) -> String {
    match data.get(name) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
