//! An entity component store.
//!
//! Entities are dense integer ids. Every registered component type owns a
//! chunked pool indexed by entity id, and every entity carries a `Mask` of
//! the component types it currently has. Queries are answered by comparing
//! masks, and dispatch hands out mutable references straight into the pools.

pub use component::{
    Component,
    ComponentRegistration,
    ComponentRegistry,
    ComponentTypeID,
};
pub use config::Config;
pub use entity::{Entity, EntityID, EntityMut};
pub use error::{Error, Result};
pub use manager::EntityManager;
pub use mask::{Mask, MAX_COMPONENT_TYPES};
pub use pool::{Pool, PoolTable, DEFAULT_CHUNK_SIZE};
pub use query::{Query, QueryIter};
pub use typed_pool::{TypedPool, TypedPoolMut};

pub mod component;
pub mod config;
pub mod entity;
pub mod error;
pub mod mask;

pub mod pool;
pub mod typed_pool;

pub mod manager;
pub mod query;
