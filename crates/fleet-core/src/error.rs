//! Error kinds surfaced by the store and the command dispatcher.

use crate::models::VehicleId;

/// Failures reported by a vehicle store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("vehicle {0} not found")]
    NotFound(VehicleId),
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Failures returned synchronously by a command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("access denied")]
    AccessDenied,
    #[error("vehicle is not activated")]
    NotActivated,
    #[error("vehicle {0} not found")]
    NotFound(VehicleId),
    #[error("invalid command: {0}")]
    InvalidState(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for CommandError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => CommandError::NotFound(id),
            other => CommandError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_to_command_not_found() {
        let err: CommandError = StoreError::NotFound(7).into();
        assert!(matches!(err, CommandError::NotFound(7)));

        let err: CommandError = StoreError::Backend("disk full".into()).into();
        assert!(matches!(err, CommandError::Store(_)));
        assert_eq!(err.to_string(), "store backend failure: disk full");
    }
}
