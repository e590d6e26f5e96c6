//! Error taxonomy for the transfer core.
//!
//! Every error is recoverable-and-reported: callers receive a stable code
//! plus a message. Only storage failures during an atomic commit abort the
//! triggering request; they roll the whole commit back.

use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("validation failed: {0}")]
    Validation(String),

    /// The requested transition does not exist in the workflow table.
    #[error("transition is not part of the transfer workflow")]
    InvalidTransferWorkflow,

    /// The transition exists but the transfer is not in its source state.
    #[error("action is not allowed in the transfer's current state")]
    TransferInvalidState,

    #[error("item is not available for this operation")]
    ItemNotAvailable,

    #[error("confirmation token has expired")]
    TokenExpired,

    #[error("confirmation signature is invalid")]
    InvalidSignature,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("item is already at the destination location")]
    MovementSameLocation,

    #[error("destination location is not valid for this movement")]
    MovementInvalidLocation,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("config error: {0}")]
    Config(String),
}

impl CoreError {
    /// Stable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::InvalidTransferWorkflow => "INVALID_TRANSFER_WORKFLOW",
            CoreError::TransferInvalidState => "TRANSFER_INVALID_STATE",
            CoreError::ItemNotAvailable => "ITEM_NOT_AVAILABLE",
            CoreError::TokenExpired => "TOKEN_EXPIRED",
            CoreError::InvalidSignature => "INVALID_SIGNATURE",
            CoreError::PermissionDenied(_) => "PERMISSION_DENIED",
            CoreError::MovementSameLocation => "MOVEMENT_SAME_LOCATION",
            CoreError::MovementInvalidLocation => "MOVEMENT_INVALID_LOCATION",
            CoreError::Storage(_) => "STORAGE_ERROR",
            CoreError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// HTTP status code suggestion for presentation layers.
    pub fn http_status(&self) -> u16 {
        match self {
            CoreError::NotFound(_) => 404,
            CoreError::Validation(_) => 400,
            CoreError::InvalidTransferWorkflow | CoreError::TransferInvalidState => 409,
            CoreError::ItemNotAvailable
            | CoreError::MovementSameLocation
            | CoreError::MovementInvalidLocation => 422,
            CoreError::TokenExpired | CoreError::InvalidSignature => 401,
            CoreError::PermissionDenied(_) => 403,
            CoreError::Storage(_) | CoreError::Config(_) => 500,
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        CoreError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CoreError::NotFound("transfer").code(), "NOT_FOUND");
        assert_eq!(CoreError::TokenExpired.code(), "TOKEN_EXPIRED");
        assert_eq!(CoreError::InvalidSignature.code(), "INVALID_SIGNATURE");
        assert_eq!(
            CoreError::TransferInvalidState.code(),
            "TRANSFER_INVALID_STATE"
        );
        assert_eq!(
            CoreError::MovementSameLocation.code(),
            "MOVEMENT_SAME_LOCATION"
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(CoreError::NotFound("item").http_status(), 404);
        assert_eq!(CoreError::Validation("bad".into()).http_status(), 400);
        assert_eq!(CoreError::TransferInvalidState.http_status(), 409);
        assert_eq!(CoreError::ItemNotAvailable.http_status(), 422);
        assert_eq!(CoreError::PermissionDenied("x".into()).http_status(), 403);
        assert_eq!(CoreError::Storage("io".into()).http_status(), 500);
    }

    #[test]
    fn test_display() {
        assert_eq!(CoreError::NotFound("unit").to_string(), "unit not found");
        assert_eq!(
            CoreError::TokenExpired.to_string(),
            "confirmation token has expired"
        );
    }
}
