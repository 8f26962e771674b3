//! Typed client for the Peplink device API
//!
//! Wraps the device's REST API behind a `Client` that authenticates on
//! construction and keeps its access token fresh in the background (see
//! `peplink_auth`). Every reply is an envelope (`envelope`); collections are
//! sent as ordered-index objects (`ordered`).
//!
//! Request flow:
//! 1. `Client::connect()` validates `ClientConfig`, grants the first token and spawns renewal
//! 2. `Client::execute()` sends GET/POST with the current token as `accessToken`
//! 3. The envelope is unwrapped; `stat != "ok"` becomes `Error::Envelope`
//! 4. Typed helpers decode the payload (`get`, `post`, `get_ordered`)
//! 5. `Client::shutdown()` cancels and joins the renewal task

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod firmware;
pub mod ordered;
pub mod wan;

#[cfg(test)]
mod test_support;

pub use client::Client;
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use envelope::{Envelope, Status, unwrap_envelope};
pub use error::{Error, Result};
pub use firmware::{FIRMWARE_PATH, Firmware, select_in_use};
pub use ordered::{Ordered, decode_ordered, decode_ordered_items};
pub use reqwest::Method;
pub use wan::{WAN_STATUS_PATH, WanStatus};
