//! Error types for device API calls
//!
//! Each variant names the stage that failed, so a caller can tell a network
//! problem from a device-side refusal from a response it could not interpret.

use reqwest::Method;

/// Errors from device API operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The HTTP exchange itself failed (connect, timeout, unreadable body).
    #[error("transport error: {0}")]
    Transport(String),

    /// The device answered with an envelope whose `stat` is not `ok`.
    #[error("device returned stat='{stat}' code={} message='{}'", display_code(.code), .message.as_deref().unwrap_or(""))]
    Envelope {
        stat: String,
        code: Option<i64>,
        message: Option<String>,
    },

    /// The payload does not have the expected shape (e.g. missing `order`).
    #[error("schema error: {0}")]
    Schema(String),

    /// The payload, or one item of an ordered collection (`index`), does
    /// not decode into the requested type.
    #[error("decode error{}: {source}", display_index(.index))]
    Decode {
        index: Option<u64>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A selection policy found no matching item.
    #[error("not found: {0}")]
    NotFound(String),

    /// Only GET and POST are supported by the executor.
    #[error("unsupported method {0}: only GET and POST are supported")]
    UnsupportedMethod(Method),

    #[error(transparent)]
    Auth(#[from] peplink_auth::Error),

    #[error(transparent)]
    Config(#[from] common::Error),

    /// The renewal task could not be joined at shutdown.
    #[error("renewal task did not shut down cleanly: {0}")]
    Shutdown(String),
}

fn display_index(index: &Option<u64>) -> String {
    index.map_or_else(String::new, |i| format!(" at index {i}"))
}

fn display_code(code: &Option<i64>) -> String {
    code.map_or_else(|| "-".to_string(), |c| c.to_string())
}

/// Result alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn envelope_error_includes_code_and_message() {
        let err = Error::Envelope {
            stat: "fail".into(),
            code: Some(401),
            message: Some("Unauthorized".into()),
        };
        assert_eq!(
            err.to_string(),
            "device returned stat='fail' code=401 message='Unauthorized'"
        );
    }

    #[test]
    fn envelope_error_without_code() {
        let err = Error::Envelope {
            stat: "".into(),
            code: None,
            message: None,
        };
        assert_eq!(err.to_string(), "device returned stat='' code=- message=''");
    }

    #[test]
    fn decode_error_names_index_and_chains_source() {
        let cause = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err = Error::Decode {
            index: Some(3),
            source: Box::new(cause),
        };
        assert!(err.to_string().starts_with("decode error at index 3"));
        assert!(err.source().is_some());
    }

    #[test]
    fn whole_payload_decode_error_has_no_index() {
        let cause = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err = Error::Decode {
            index: None,
            source: Box::new(cause),
        };
        assert!(err.to_string().starts_with("decode error: invalid type"), "got: {err}");
    }

    #[test]
    fn unsupported_method_names_verb() {
        let err = Error::UnsupportedMethod(Method::DELETE);
        assert!(err.to_string().contains("DELETE"));
    }

    #[test]
    fn auth_errors_pass_through() {
        let err: Error = peplink_auth::Error::Auth("stat='fail'".into()).into();
        assert_eq!(err.to_string(), "authentication failed: stat='fail'");
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
