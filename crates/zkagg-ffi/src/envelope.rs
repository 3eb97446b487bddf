//! JSON result envelope returned through owned buffers.
//!
//! ```json
//! {"ok":true,"kind":null,"message":"<payload>","error":null}
//! {"ok":false,"kind":"malformed_input","message":null,"error":"size mismatch: ..."}
//! ```
//! `kind` is one of `configuration`, `unknown_artifact`, `malformed_input`, `backend`.

use serde::{Deserialize, Serialize};
use zkagg_core::{Error, ErrorKind};

use crate::buffer::OwnedBuffer;

/// Outcome of a buffer-returning gateway call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Error category when `ok` is false.
    pub kind: Option<String>,
    /// Payload on success (proof JSON, chunk info JSON, hex VK, ...).
    pub message: Option<String>,
    /// Error text when `ok` is false.
    pub error: Option<String>,
}

impl Envelope {
    /// Success carrying `message`.
    #[must_use]
    pub const fn success(message: String) -> Self {
        Self {
            ok: true,
            kind: None,
            message: Some(message),
            error: None,
        }
    }

    /// Failure of category `kind`.
    #[must_use]
    pub fn failure(kind: ErrorKind, error: String) -> Self {
        Self {
            ok: false,
            kind: Some(kind.as_str().to_owned()),
            message: None,
            error: Some(error),
        }
    }

    /// Serialize and hand out as an owned buffer.
    #[must_use]
    pub fn into_buffer(self) -> OwnedBuffer {
        let js = serde_json::to_string(&self).unwrap_or_else(|e| {
            format!(r#"{{"ok":false,"kind":"backend","message":null,"error":"envelope encoding failed: {e}"}}"#)
        });
        OwnedBuffer::new(js)
    }
}

impl From<Result<String, Error>> for Envelope {
    fn from(r: Result<String, Error>) -> Self {
        match r {
            Ok(m) => Self::success(m),
            Err(e) => Self::failure(e.kind(), e.to_string()),
        }
    }
}
