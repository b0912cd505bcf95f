//! Common API response wrapper types.

use serde::Serialize;

/// Standard envelope for successful responses.
///
/// The `success` field is always `true`; failures are rendered by
/// [`ApiError`](crate::error::ApiError) with `success: false`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl ApiResponse<()> {
    /// A successful response with no payload.
    pub fn empty() -> Self {
        ApiResponse {
            success: true,
            data: None,
        }
    }
}
