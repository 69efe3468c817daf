//! Error types and handling for the allocators

/// Result type alias for allocator operations
pub type Result<T> = std::result::Result<T, AllocError>;

/// Error types for the pool and stack allocators.
///
/// Every variant reports either an exhausted capacity or a caller contract
/// violation. None of these conditions is transient; retrying the same call
/// never succeeds.
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    /// Invalid parameters or configuration
    #[error("invalid parameter: {parameter} - {message}")]
    InvalidParameter {
        parameter: &'static str,
        message: &'static str,
    },

    /// Pool free list is empty
    #[error("pool exhausted: all {capacity} slots are live")]
    CapacityExhausted { capacity: usize },

    /// Insufficient space for a stack allocation
    #[error("insufficient space: requested {requested}, available {available}")]
    InsufficientSpace { requested: usize, available: usize },

    /// Handle does not belong to this pool
    #[error("foreign handle: index {index} outside pool of capacity {capacity}")]
    ForeignHandle { index: usize, capacity: usize },

    /// Handle refers to a slot that is currently on the free list
    #[error("slot {index} is not allocated (double free?)")]
    SlotNotAllocated { index: usize },

    /// Marker was already consumed or rolled past
    #[error("stale marker: its scope is no longer outstanding")]
    StaleMarker,
}

impl AllocError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: &'static str, message: &'static str) -> Self {
        Self::InvalidParameter { parameter, message }
    }

    /// Create an insufficient space error
    pub fn insufficient_space(requested: usize, available: usize) -> Self {
        Self::InsufficientSpace {
            requested,
            available,
        }
    }
}
