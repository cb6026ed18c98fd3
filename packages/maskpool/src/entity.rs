//! Entity ids and handles.
//!
//! An entity has no data of its own. The handles here are just an id paired
//! with a borrow of the `EntityManager` which stores everything.

use std::fmt::{self, Debug, Formatter};

use crate::component::Component;
use crate::error::Result;
use crate::manager::EntityManager;
use crate::mask::Mask;

/// The ID of a single entity.
///
/// Entity IDs are dense and assigned in creation order starting at 0. They
/// are unique per `EntityManager` and are never reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityID(usize);

impl EntityID {
    /// Create a new EntityID given the inner index.
    pub fn new(id: usize) -> EntityID {
        EntityID(id)
    }

    /// Return the inner index.
    pub fn id(&self) -> usize {
        self.0
    }
}

impl From<usize> for EntityID {
    fn from(id: usize) -> Self {
        EntityID(id)
    }
}

impl From<EntityID> for usize {
    fn from(id: EntityID) -> Self {
        id.0
    }
}

/// A read-only handle to an entity.
#[derive(Clone, Copy)]
pub struct Entity<'a> {
    manager: &'a EntityManager,
    id: EntityID,
}

impl<'a> Entity<'a> {
    /// The caller must have checked that `id` exists in `manager`.
    pub(crate) fn new(manager: &'a EntityManager, id: EntityID) -> Entity<'a> {
        Entity { manager, id }
    }

    /// Get the ID of this entity.
    pub fn id(&self) -> EntityID {
        self.id
    }

    /// Return the presence mask of this entity.
    pub fn mask(&self) -> Mask {
        self.manager.masks()[self.id.0]
    }

    /// Returns true if this entity currently has a `T`.
    pub fn has_component<T: Component>(&self) -> Result<bool> {
        self.manager.has_component::<T>(self.id)
    }

    /// Get this entity's `T`.
    ///
    /// See `EntityManager::get_component`.
    pub fn get_component<T: Component>(&self) -> Result<Option<&'a T>> {
        self.manager.get_component::<T>(self.id)
    }
}

impl<'a> PartialEq for Entity<'a> {
    fn eq(&self, other: &Entity<'a>) -> bool {
        std::ptr::eq(self.manager, other.manager) && self.id == other.id
    }
}

impl<'a> Eq for Entity<'a> {}

impl<'a> Debug for Entity<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}, {:?})", self.id.0, self.mask())
    }
}

/// A handle to an entity which can add and remove components.
pub struct EntityMut<'a> {
    manager: &'a mut EntityManager,
    id: EntityID,
}

impl<'a> EntityMut<'a> {
    /// The caller must have checked that `id` exists in `manager`.
    pub(crate) fn new(manager: &'a mut EntityManager, id: EntityID) -> EntityMut<'a> {
        EntityMut { manager, id }
    }

    /// Get the ID of this entity.
    pub fn id(&self) -> EntityID {
        self.id
    }

    /// Reborrow this handle as a read-only one.
    pub fn as_entity(&self) -> Entity<'_> {
        Entity::new(self.manager, self.id)
    }

    /// Add a component to this entity, overwriting any existing `T`.
    ///
    /// Returns the handle again so that calls can be chained.
    pub fn add_component<T: Component>(&mut self, component: T) -> Result<&mut Self> {
        self.manager.add_component(self.id, component)?;
        Ok(self)
    }

    /// Returns true if this entity currently has a `T`.
    pub fn has_component<T: Component>(&self) -> Result<bool> {
        self.manager.has_component::<T>(self.id)
    }

    /// Get this entity's `T`.
    pub fn get_component<T: Component>(&self) -> Result<Option<&T>> {
        self.manager.get_component::<T>(self.id)
    }

    /// Get a mutable reference to this entity's `T`.
    pub fn get_component_mut<T: Component>(&mut self) -> Result<Option<&mut T>> {
        self.manager.get_component_mut::<T>(self.id)
    }

    /// Remove the `T` from this entity.
    pub fn remove_component<T: Component>(&mut self) -> Result<&mut Self> {
        self.manager.remove_component::<T>(self.id)?;
        Ok(self)
    }
}

impl<'a> Debug for EntityMut<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.as_entity().fmt(f)
    }
}
