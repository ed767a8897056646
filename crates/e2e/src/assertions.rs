//! Response assertions

use crate::error::{E2eError, E2eResult};

/// Body every `async-io` endpoint answers with
pub const EXPECTED_BODY: &str = "OK";

/// Byte-for-byte body comparison
pub fn assert_body(expected: &str, actual: &str) -> E2eResult<()> {
    if expected.as_bytes() == actual.as_bytes() {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}
