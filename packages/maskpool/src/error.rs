//! Errors returned by the entity manager and its pools.

use thiserror::Error;

/// Everything that can go wrong when registering, storing or querying
/// components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Every component type id below the configured limit is taken.
    #[error("cannot register {name}: all {max} component type ids are in use")]
    TooManyComponentTypes { name: &'static str, max: usize },

    /// The component type was used before `register_component` was called.
    #[error("component type {name} has not been registered")]
    TypeNotRegistered { name: &'static str },

    /// An explicit entity lookup named an id which was never created.
    #[error("entity {id} is out of range (entity count is {count})")]
    OutOfRange { id: usize, count: usize },

    /// The allocator could not provide another pool chunk.
    #[error("failed to allocate a {bytes} byte pool chunk")]
    AllocationFailure { bytes: usize },

    /// The configured chunk size cannot hold a single element.
    #[error("a {chunk_size} byte chunk cannot hold an element with a stride of {stride} bytes")]
    ChunkTooSmall { chunk_size: usize, stride: usize },

    /// A query listed the same component type more than once.
    #[error("component type {name} appears more than once in a query")]
    DuplicateQueryType { name: &'static str },
}

/// Result alias used throughout this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
