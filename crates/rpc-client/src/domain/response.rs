//! Response unwrapping.
//!
//! The server answers with a bare JSON value, the literal `null`, or either
//! of them framed as `<callback>(<value>);`. Grammar, applied to the trimmed
//! text:
//!
//! ```text
//! ""                               -> Empty
//! "<callback>(null);"              -> Empty   (case-insensitive)
//! "<callback>(" payload ")" [";"]  -> payload (up to the last ')')
//! payload ");"                     -> payload (bare suffix, no prefix)
//! "null"                           -> Empty   (case-insensitive)
//! anything else                    -> JSON value, or MalformedResponse
//! ```
//!
//! When the call was made without a token the callback name is `null`.
//! The bare `);` rule also fires for text that merely ends in `);`; such
//! text is then parsed without its last two characters.

use serde_json::Value;
use thiserror::Error;

use crate::domain::correlation::{CorrelationToken, NO_CALLBACK};
use crate::domain::error::ErrorEnvelope;

/// Unwrapped response body
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    /// No content or literal `null`
    Empty,
    /// Application error returned by the server
    Error(ErrorEnvelope),
    /// Successful value
    Value(Value),
}

/// The body violates the response grammar
#[derive(Debug, Error)]
pub enum UnwrapError {
    /// Remaining text is not valid JSON
    #[error("malformed response: {source}")]
    Malformed {
        /// Text that failed to parse
        text: String,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },
}

/// Unwrap a raw response body.
///
/// `token` is the token sent with the call, `None` when the call was made
/// without one.
pub fn unwrap_response(
    text: &str,
    token: Option<&CorrelationToken>,
) -> Result<ParsedResponse, UnwrapError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(ParsedResponse::Empty);
    }

    let callback = token.map(CorrelationToken::as_str).unwrap_or(NO_CALLBACK);
    if text.eq_ignore_ascii_case(&format!("{}(null);", callback)) {
        return Ok(ParsedResponse::Empty);
    }

    let payload = strip_callback(text, callback);
    if payload.trim().eq_ignore_ascii_case("null") {
        return Ok(ParsedResponse::Empty);
    }

    let value: Value = serde_json::from_str(payload).map_err(|source| UnwrapError::Malformed {
        text: payload.to_string(),
        source,
    })?;

    Ok(interpret_value(value))
}

/// Sort a parsed value into empty / application error / value.
pub fn interpret_value(value: Value) -> ParsedResponse {
    if value.is_null() {
        return ParsedResponse::Empty;
    }
    match ErrorEnvelope::from_application_value(&value) {
        Some(error) => ParsedResponse::Error(error),
        None => ParsedResponse::Value(value),
    }
}

/// Remove the callback framing, if any.
fn strip_callback<'a>(text: &'a str, callback: &str) -> &'a str {
    if let Some(inner) = text
        .strip_prefix(callback)
        .and_then(|rest| rest.strip_prefix('('))
    {
        if let Some(end) = inner.rfind(')') {
            return &inner[..end];
        }
    }

    text.strip_suffix(");").unwrap_or(text)
}
