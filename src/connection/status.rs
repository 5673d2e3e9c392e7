//! Translation of response statuses into errors.

use crate::error::StatusError;
use crate::transport::messages::{StatusCode, TStatus};

/// Message fragment servers send when they do not recognize the requested
/// protocol version.
const PROTOCOL_UNSET_MARKER: &str = "'client_protocol' is unset";

/// Accept `SUCCESS` and `SUCCESS_WITH_INFO`; anything else is an error
/// carrying the full status detail.
pub fn check_status(status: &TStatus) -> Result<(), StatusError> {
    match status.code() {
        Some(StatusCode::Success) | Some(StatusCode::SuccessWithInfo) => Ok(()),
        _ => Err(StatusError::from(status.clone())),
    }
}

/// Whether a failure message reports an unsupported protocol version.
pub(crate) fn is_protocol_mismatch(message: &str) -> bool {
    message
        .to_ascii_lowercase()
        .contains(PROTOCOL_UNSET_MARKER)
}
