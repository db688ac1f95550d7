//! Error types returned by the allocators and the arena.

use crate::gpu::traits::DeviceError;

/// Why a creation call failed.
///
/// Every variant leaves the allocator in a consistent, reusable state:
/// nothing created during the failed call survives it. Running out of upload
/// budget is not an error; ring allocation returns `None` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    /// The request was rejected before touching the device.
    Validation(&'static str),
    /// The allocator or its device is not initialized.
    NotInitialized,
    /// A native creation step failed and was rolled back.
    ResourceCreation(DeviceError),
}

impl ArenaError {
    /// Whether the failure happened before any native object was created.
    pub fn is_validation(&self) -> bool {
        matches!(self, ArenaError::Validation(_) | ArenaError::NotInitialized)
    }
}

impl std::fmt::Display for ArenaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArenaError::Validation(what) => write!(f, "invalid request: {}", what),
            ArenaError::NotInitialized => write!(f, "not initialized"),
            ArenaError::ResourceCreation(err) => write!(f, "resource creation failed: {}", err),
        }
    }
}

impl std::error::Error for ArenaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArenaError::ResourceCreation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DeviceError> for ArenaError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::NotInitialized => ArenaError::NotInitialized,
            other => ArenaError::ResourceCreation(other),
        }
    }
}
