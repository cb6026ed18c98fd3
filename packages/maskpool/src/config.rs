//! Startup settings for an `EntityManager`.

use crate::mask::MAX_COMPONENT_TYPES;
use crate::pool::DEFAULT_CHUNK_SIZE;

/// Settings which are fixed once an `EntityManager` is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// The number of bytes in each pool chunk, unless overridden when a
    /// component type is registered.
    pub chunk_size: usize,

    /// The number of component types which may be registered. Never more than
    /// `MAX_COMPONENT_TYPES`.
    pub max_component_types: usize,
}

impl Config {
    /// Set the default pool chunk size in bytes.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Config {
        self.chunk_size = chunk_size;
        self
    }

    /// Lower the number of component types which may be registered.
    ///
    /// Values above `MAX_COMPONENT_TYPES` are clamped.
    pub fn with_max_component_types(mut self, max_component_types: usize) -> Config {
        self.max_component_types = max_component_types.min(MAX_COMPONENT_TYPES);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_component_types: MAX_COMPONENT_TYPES,
        }
    }
}
