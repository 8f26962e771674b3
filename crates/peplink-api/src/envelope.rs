//! Outer response envelope
//!
//! Every device API reply, success or failure, is wrapped as:
//!
//! ```json
//! {"stat": "ok" | "fail", "response": <payload>, "code": 401, "message": "...", "notice": {...}}
//! ```
//!
//! `code` and `message` only appear on failure. The payload is kept as raw
//! JSON so each endpoint can decode it into its own shape.

use serde::Deserialize;
use serde_json::value::RawValue;

use crate::error::{Error, Result};

/// Envelope status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Fail,
    /// Missing or unrecognised `stat`; treated as a failure.
    Unknown,
}

/// Decoded outer envelope, payload still raw.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub stat: String,
    #[serde(default)]
    pub response: Option<Box<RawValue>>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    /// Extra information about the request, never part of the payload
    #[serde(default)]
    pub notice: Option<serde_json::Value>,
}

impl Envelope {
    /// Parse an envelope from a response body.
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| Error::Schema(format!("response is not an API envelope: {e}")))
    }

    pub fn status(&self) -> Status {
        match self.stat.as_str() {
            "ok" => Status::Ok,
            "fail" => Status::Fail,
            _ => Status::Unknown,
        }
    }

    /// Unwrap the payload, or turn a non-ok status into `Error::Envelope`.
    ///
    /// A successful envelope may carry no `response`; that is `Ok(None)`.
    pub fn into_payload(self) -> Result<Option<Box<RawValue>>> {
        if self.status() != Status::Ok {
            return Err(Error::Envelope {
                stat: self.stat,
                code: self.code,
                message: self.message,
            });
        }
        Ok(self.response)
    }
}

/// Parse `body` as an envelope and return its payload.
pub fn unwrap_envelope(body: &str) -> Result<Option<Box<RawValue>>> {
    Envelope::parse(body)?.into_payload()
}
