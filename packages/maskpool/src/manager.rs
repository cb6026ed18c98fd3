//! The entity manager, which owns every entity, presence mask and pool.

use std::any::type_name;
use std::fmt::{self, Debug, Formatter};
use std::ops::RangeBounds;

use log::{debug, trace};

use crate::component::{Component, ComponentRegistry, ComponentTypeID};
use crate::config::Config;
use crate::entity::{Entity, EntityID, EntityMut};
use crate::error::{Error, Result};
use crate::mask::Mask;
use crate::pool::{Pool, PoolTable};
use crate::query::{clamp_range, filter_mask, query_mask, Query, QueryIter};
use crate::typed_pool::{TypedPool, TypedPoolMut};

/// Stores entities and their components.
///
/// Component types must be registered before use. Each registered type gets
/// its own chunked `Pool`, indexed by entity id, and each entity has a `Mask`
/// recording which of those pools currently hold one of its components.
///
/// ```
/// use maskpool::{component, EntityManager};
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// struct Position(i32, i32);
/// component!(Position);
///
/// let mut manager = EntityManager::new();
/// manager.register_component::<Position>()?;
///
/// let id = manager.create_entity().add_component(Position(3, 5))?.id();
/// let found = manager.get_entities::<Position>()?;
/// assert_eq!(found.len(), 1);
/// assert_eq!(manager.get_component::<Position>(id)?, Some(&Position(3, 5)));
/// # Ok::<(), maskpool::Error>(())
/// ```
pub struct EntityManager {
    config: Config,
    components: ComponentRegistry,
    masks: Vec<Mask>,
    pools: PoolTable,
}

impl EntityManager {
    /// Create a new entity manager with the default settings.
    pub fn new() -> EntityManager {
        EntityManager::with_config(Config::default())
    }

    /// Create a new entity manager with the given default pool chunk size.
    pub fn with_chunk_size(chunk_size: usize) -> EntityManager {
        EntityManager::with_config(Config::default().with_chunk_size(chunk_size))
    }

    /// Create a new entity manager with the given settings.
    pub fn with_config(config: Config) -> EntityManager {
        debug!("creating entity manager with {:?}", config);

        EntityManager {
            config,
            components: ComponentRegistry::with_limit(config.max_component_types),
            masks: Vec::new(),
            pools: PoolTable::new(),
        }
    }

    /// Return the settings this manager was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Return the registry of component types.
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Return the table of component pools.
    pub fn pools(&self) -> &PoolTable {
        &self.pools
    }

    pub(crate) fn masks(&self) -> &[Mask] {
        &self.masks
    }

    /// Get the total number of entities created so far.
    pub fn entity_count(&self) -> usize {
        self.masks.len()
    }

    /// Register a component type, allocating its pool with the default chunk
    /// size.
    ///
    /// Registering a type which is already registered returns the existing id
    /// and leaves its pool untouched.
    pub fn register_component<T: Component>(&mut self) -> Result<ComponentTypeID> {
        self.register_component_with_chunk_size::<T>(self.config.chunk_size)
    }

    /// Register a component type whose pool uses `chunk_size` byte chunks.
    ///
    /// The chunk size is ignored if the type is already registered.
    pub fn register_component_with_chunk_size<T: Component>(&mut self, chunk_size: usize) -> Result<ComponentTypeID> {
        if let Some(id) = self.components.id_of::<T>() {
            trace!("component type {} is already registered as #{}", type_name::<T>(), id.id());
            return Ok(id);
        }

        let pool = Pool::new(chunk_size, T::layout())?;
        let id = self.components.register::<T>()?;
        let pool = self.pools.install(id, pool);

        debug!("registered component type {} as #{} ({} byte stride, {} byte chunks)",
               type_name::<T>(), id.id(), pool.stride(), pool.chunk_size());
        Ok(id)
    }

    /// Return the id of a component type, if it has been registered.
    pub fn component_id<T: Component>(&self) -> Option<ComponentTypeID> {
        self.components.id_of::<T>()
    }

    /// Create a new entity with no components.
    ///
    /// The new entity's id is the number of entities created before it.
    pub fn create_entity(&mut self) -> EntityMut<'_> {
        let id = EntityID::new(self.masks.len());
        self.masks.push(Mask::empty());
        EntityMut::new(self, id)
    }

    fn check(&self, id: EntityID) -> Result<usize> {
        if id.id() < self.masks.len() {
            Ok(id.id())
        } else {
            Err(Error::OutOfRange { id: id.id(), count: self.masks.len() })
        }
    }

    /// Get a handle to an existing entity.
    pub fn get_entity(&self, id: EntityID) -> Result<Entity<'_>> {
        self.check(id)?;
        Ok(Entity::new(self, id))
    }

    /// Get a mutable handle to an existing entity.
    pub fn entity_mut(&mut self, id: EntityID) -> Result<EntityMut<'_>> {
        self.check(id)?;
        Ok(EntityMut::new(self, id))
    }

    /// Return the presence mask of an entity.
    pub fn mask(&self, id: EntityID) -> Result<Mask> {
        let index = self.check(id)?;
        Ok(self.masks[index])
    }

    fn typed_pool<T: Component>(&self) -> Result<(ComponentTypeID, TypedPool<'_, T>)> {
        let type_id = self.components.require::<T>()?;
        let pool = self.pools.get(type_id)
            .ok_or(Error::TypeNotRegistered { name: type_name::<T>() })?;
        Ok((type_id, unsafe { TypedPool::new_unchecked(pool) }))
    }

    fn typed_pool_mut<T: Component>(&mut self) -> Result<(ComponentTypeID, TypedPoolMut<'_, T>)> {
        let type_id = self.components.require::<T>()?;
        let pool = self.pools.get_mut(type_id)
            .ok_or(Error::TypeNotRegistered { name: type_name::<T>() })?;
        Ok((type_id, unsafe { TypedPoolMut::new_unchecked(pool) }))
    }

    /// Get a read-only view of the pool storing `T`.
    pub fn pool<T: Component>(&self) -> Result<TypedPool<'_, T>> {
        self.typed_pool::<T>().map(|(_, pool)| pool)
    }

    /// Add a component to an entity.
    ///
    /// If the entity already has a `T` it is overwritten in place.
    pub fn add_component<T: Component>(&mut self, id: EntityID, component: T) -> Result<()> {
        let index = self.check(id)?;
        let (type_id, mut pool) = self.typed_pool_mut::<T>()?;
        pool.construct(index, component)?;
        self.masks[index].set(type_id);
        Ok(())
    }

    /// Get an entity's `T`.
    ///
    /// This reads the pool slot without consulting the entity's mask, so after
    /// `remove_component` it still returns the last value stored. It is only
    /// `None` if the entity never had a `T`.
    pub fn get_component<T: Component>(&self, id: EntityID) -> Result<Option<&T>> {
        let index = self.check(id)?;
        let (_, pool) = self.typed_pool::<T>()?;
        Ok(pool.at(index))
    }

    /// Get a mutable reference to an entity's `T`.
    ///
    /// Like `get_component` this ignores the entity's mask.
    pub fn get_component_mut<T: Component>(&mut self, id: EntityID) -> Result<Option<&mut T>> {
        let index = self.check(id)?;
        let (_, pool) = self.typed_pool_mut::<T>()?;
        Ok(pool.into_mut(index))
    }

    /// Returns true if the entity currently has a `T`.
    pub fn has_component<T: Component>(&self, id: EntityID) -> Result<bool> {
        let index = self.check(id)?;
        let type_id = self.components.require::<T>()?;
        Ok(self.masks[index].contains(type_id))
    }

    /// Remove the `T` from an entity.
    ///
    /// Only the presence bit is cleared: the pool slot keeps its value and is
    /// not reclaimed.
    pub fn remove_component<T: Component>(&mut self, id: EntityID) -> Result<()> {
        let index = self.check(id)?;
        let type_id = self.components.require::<T>()?;
        self.masks[index].clear(type_id);
        Ok(())
    }

    /// Return every entity which has all the components in `Q`, in ascending
    /// id order.
    ///
    /// Listing a component type more than once is the same as listing it
    /// once.
    pub fn get_entities<Q: Query>(&self) -> Result<Vec<Entity<'_>>> {
        let required = filter_mask::<Q>(&self.components)?;

        Ok(self.masks.iter()
            .enumerate()
            .filter(|(_, mask)| mask.includes_all(&required))
            .map(|(idx, _)| Entity::new(self, EntityID::new(idx)))
            .collect())
    }

    /// Iterate over the entities in `range` which have all the components in
    /// `Q`, yielding mutable references to those components.
    ///
    /// The range is clamped to the existing entities.
    pub fn query<Q: Query>(&mut self, range: impl RangeBounds<usize>) -> Result<QueryIter<'_, Q>> {
        let required = query_mask::<Q>(&self.components)?;
        let state = Q::resolve(&self.components, &self.pools)?;
        let (start, end) = clamp_range(range, self.masks.len());

        Ok(unsafe { QueryIter::new(&self.masks[start..end], start, required, state) })
    }

    /// Call `f` for every entity in `range` which has all the components in
    /// `Q`.
    ///
    /// `f` receives the entity id and one `&mut` per component type in `Q`,
    /// in the order they are listed. The pools are looked up once, before the
    /// scan, and nothing is allocated.
    pub fn for_each<'m, Q, F>(&'m mut self, range: impl RangeBounds<usize>, mut f: F) -> Result<()>
        where Q: Query,
              F: FnMut(EntityID, Q::Item<'m>)
    {
        for (id, item) in self.query::<Q>(range)? {
            f(id, item);
        }

        Ok(())
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        EntityManager::new()
    }
}

impl Debug for EntityManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityManager")
            .field("entities", &self.masks.len())
            .field("components", &self.components.iter().collect::<Vec<_>>())
            .field("pools", &self.pools)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::component;
    use crate::mask::MAX_COMPONENT_TYPES;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Pos {
        x: i32,
        y: i32,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Vel(f32);

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Tag;

    component!(Pos, Vel, Tag);

    fn manager() -> EntityManager {
        let mut manager = EntityManager::new();
        manager.register_component::<Pos>().unwrap();
        manager.register_component::<Vel>().unwrap();
        manager
    }

    fn ids(entities: &[Entity<'_>]) -> Vec<usize> {
        entities.iter().map(|e| e.id().id()).collect()
    }

    #[test]
    fn test_create_entity() {
        let mut manager = manager();
        for expected in 0..10 {
            assert_eq!(manager.create_entity().id(), EntityID::new(expected));
        }
        assert_eq!(manager.entity_count(), 10);
        assert!(manager.mask(EntityID::new(9)).unwrap().is_empty());
    }

    #[test]
    fn test_out_of_range() {
        let mut manager = manager();
        manager.create_entity();

        let err = Error::OutOfRange { id: 1, count: 1 };
        let id = EntityID::new(1);
        assert_eq!(manager.get_entity(id).unwrap_err(), err);
        assert_eq!(manager.entity_mut(id).unwrap_err(), err);
        assert_eq!(manager.add_component(id, Vel(1.0)), Err(err.clone()));
        assert_eq!(manager.get_component::<Vel>(id), Err(err.clone()));
        assert_eq!(manager.remove_component::<Vel>(id), Err(err.clone()));
        assert_eq!(manager.has_component::<Vel>(id), Err(err));
        assert!(manager.get_entity(EntityID::new(0)).is_ok());
    }

    #[test]
    fn test_not_registered() {
        let mut manager = manager();
        let id = manager.create_entity().id();

        let err = Error::TypeNotRegistered { name: type_name::<Tag>() };
        assert_eq!(manager.add_component(id, Tag), Err(err.clone()));
        assert_eq!(manager.get_component::<Tag>(id), Err(err.clone()));
        assert_eq!(manager.remove_component::<Tag>(id), Err(err.clone()));
        assert_eq!(manager.get_entities::<(Pos, Tag)>().unwrap_err(), err);
        assert!(manager.mask(id).unwrap().is_empty());
    }

    #[test]
    fn test_reregister_keeps_data() {
        let mut manager = manager();
        let id = manager.create_entity().id();
        manager.add_component(id, Pos { x: 1, y: 2 }).unwrap();

        let first = manager.component_id::<Pos>().unwrap();
        let second = manager.register_component::<Pos>().unwrap();
        assert_eq!(first, second);
        assert_eq!(manager.components().len(), 2);
        assert_eq!(manager.get_component::<Pos>(id).unwrap(), Some(&Pos { x: 1, y: 2 }));
        assert_eq!(ids(&manager.get_entities::<Pos>().unwrap()), vec![0]);
    }

    #[test]
    fn test_too_many_types() {
        let mut manager = EntityManager::with_config(Config::default().with_max_component_types(1));
        manager.register_component::<Pos>().unwrap();
        assert_eq!(
            manager.register_component::<Vel>(),
            Err(Error::TooManyComponentTypes { name: type_name::<Vel>(), max: 1 }));
        assert!(manager.pools().get(ComponentTypeID::new(1)).is_none());
    }

    #[test]
    fn test_chunk_size_override() {
        let mut manager = EntityManager::with_chunk_size(8192);
        manager.register_component::<Pos>().unwrap();
        manager.register_component_with_chunk_size::<Vel>(64).unwrap();

        assert_eq!(manager.pool::<Pos>().unwrap().pool().chunk_size(), 8192);
        assert_eq!(manager.pool::<Vel>().unwrap().pool().chunk_size(), 64);

        // Zero-sized components never allocate, so any chunk size will do.
        assert_eq!(
            manager.register_component_with_chunk_size::<Tag>(0),
            Ok(ComponentTypeID::new(2)));

        // A chunk which cannot fit a single element is rejected without using
        // up a type id.
        let mut manager = EntityManager::new();
        assert_eq!(
            manager.register_component_with_chunk_size::<Pos>(4),
            Err(Error::ChunkTooSmall { chunk_size: 4, stride: 8 }));
        assert!(manager.components().is_empty());
    }

    #[test]
    fn test_add_get_remove() {
        let mut manager = manager();
        let id = manager.create_entity().id();

        assert_eq!(manager.get_component::<Pos>(id).unwrap(), None);
        assert!(!manager.has_component::<Pos>(id).unwrap());

        manager.add_component(id, Pos { x: 3, y: 5 }).unwrap();
        assert!(manager.has_component::<Pos>(id).unwrap());
        assert_eq!(manager.get_component::<Pos>(id).unwrap(), Some(&Pos { x: 3, y: 5 }));

        manager.get_component_mut::<Pos>(id).unwrap().unwrap().x = 10;
        assert_eq!(manager.get_component::<Pos>(id).unwrap(), Some(&Pos { x: 10, y: 5 }));

        manager.remove_component::<Pos>(id).unwrap();
        assert!(!manager.has_component::<Pos>(id).unwrap());
        assert!(manager.get_entities::<Pos>().unwrap().is_empty());

        // The slot is left as it was.
        assert_eq!(manager.get_component::<Pos>(id).unwrap(), Some(&Pos { x: 10, y: 5 }));
    }

    #[test]
    fn test_readd_keeps_mask() {
        let mut manager = manager();
        let id = manager.create_entity().id();
        manager.add_component(id, Vel(1.0)).unwrap();
        let before = manager.mask(id).unwrap();

        manager.add_component(id, Vel(2.0)).unwrap();
        assert_eq!(manager.mask(id).unwrap(), before);
        assert_eq!(manager.get_component::<Vel>(id).unwrap(), Some(&Vel(2.0)));
    }

    #[test]
    fn test_entity_handles() {
        let mut manager = manager();
        manager.create_entity()
            .add_component(Pos { x: 1, y: 1 }).unwrap()
            .add_component(Vel(0.5)).unwrap();

        let mut entity = manager.entity_mut(EntityID::new(0)).unwrap();
        entity.get_component_mut::<Vel>().unwrap().unwrap().0 = 1.5;
        entity.remove_component::<Pos>().unwrap();
        assert!(!entity.has_component::<Pos>().unwrap());
        assert_eq!(entity.get_component::<Vel>().unwrap(), Some(&Vel(1.5)));

        let entity = manager.get_entity(EntityID::new(0)).unwrap();
        assert!(entity.has_component::<Vel>().unwrap());
        assert_eq!(entity.mask().len(), 1);
        assert_eq!(entity.get_component::<Vel>().unwrap(), Some(&Vel(1.5)));
        assert_eq!(entity, manager.get_entities::<Vel>().unwrap()[0]);
    }

    #[test]
    fn test_query_range() {
        let mut manager = manager();
        for i in 0..10 {
            let mut entity = manager.create_entity();
            if i % 2 == 0 {
                entity.add_component(Pos { x: i, y: 0 }).unwrap();
            }
        }

        let found = manager.query::<Pos>(3..8).unwrap()
            .map(|(id, pos)| {
                assert_eq!(pos.x as usize, id.id());
                id.id()
            })
            .collect::<Vec<_>>();
        assert_eq!(found, vec![4, 6]);

        // Ranges past the end are clamped.
        let mut seen = Vec::new();
        manager.for_each::<Pos, _>(5..100, |id, _| seen.push(id.id())).unwrap();
        assert_eq!(seen, vec![6, 8]);

        assert_eq!(manager.query::<Pos>(20..30).unwrap().count(), 0);
    }

    #[test]
    fn test_query_duplicate() {
        let mut manager = manager();
        manager.create_entity().add_component(Pos { x: 1, y: 1 }).unwrap();
        manager.create_entity().add_component(Vel(1.0)).unwrap();

        assert_eq!(
            manager.for_each::<(Pos, Pos), _>(.., |_, _| {}),
            Err(Error::DuplicateQueryType { name: type_name::<Pos>() }));
        assert!(manager.query::<(Vel, (Pos, Vel))>(..).is_err());

        // Plain lookups hand out no references, so repeats just merge.
        let once = ids(&manager.get_entities::<Pos>().unwrap());
        assert_eq!(ids(&manager.get_entities::<(Pos, Pos)>().unwrap()), once);
        assert_eq!(ids(&manager.get_entities::<(Pos, (Pos, Pos))>().unwrap()), vec![0]);
    }

    #[test]
    fn test_query_required_mask() {
        let mut manager = manager();
        let pos = manager.component_id::<Pos>().unwrap();
        let vel = manager.component_id::<Vel>().unwrap();

        let iter = manager.query::<(Vel, Pos)>(..).unwrap();
        assert_eq!(iter.required().iter().collect::<Vec<_>>(), vec![pos, vel]);
    }

    macro_rules! declare_components {
        ($($name:ident),*) => {
            $(
                #[derive(Debug, Clone, Copy, PartialEq)]
                struct $name(u8);
            )*
            component!($($name),*);
        };
    }

    macro_rules! register_components {
        ($manager:ident; $($name:ident),*) => {
            $( $manager.register_component::<$name>().unwrap(); )*
        };
    }

    declare_components!(T00, T01, T02, T03, T04, T05, T06, T07, T08, T09, T10, T11, T12, T13, T14, T15, T16, T17, T18, T19, T20, T21, T22, T23, T24, T25, T26, T27, T28, T29, T30, T31, T32, T33, T34, T35, T36, T37, T38, T39, T40, T41, T42, T43, T44, T45, T46, T47, T48, T49, T50, T51, T52, T53, T54, T55, T56, T57, T58, T59, T60, T61, T62, T63, T64);

    #[test]
    fn test_default_type_limit() {
        let mut manager = EntityManager::new();
        register_components!(manager; T00, T01, T02, T03, T04, T05, T06, T07, T08, T09, T10, T11, T12, T13, T14, T15, T16, T17, T18, T19, T20, T21, T22, T23, T24, T25, T26, T27, T28, T29, T30, T31, T32, T33, T34, T35, T36, T37, T38, T39, T40, T41, T42, T43, T44, T45, T46, T47, T48, T49, T50, T51, T52, T53, T54, T55, T56, T57, T58, T59, T60, T61, T62, T63);
        assert_eq!(manager.components().len(), MAX_COMPONENT_TYPES);

        assert_eq!(
            manager.register_component::<T64>(),
            Err(Error::TooManyComponentTypes { name: type_name::<T64>(), max: 64 }));
        assert_eq!(manager.component_id::<T64>(), None);

        let last = manager.component_id::<T63>().unwrap();
        assert_eq!(last.id(), 63);

        manager.create_entity();
        manager.create_entity()
            .add_component(T63(7)).unwrap()
            .add_component(T00(1)).unwrap();

        assert!(manager.mask(EntityID::new(1)).unwrap().contains(last));
        assert_eq!(ids(&manager.get_entities::<T63>().unwrap()), vec![1]);

        let mut seen = Vec::new();
        manager.for_each::<(T00, T63), _>(.., |id, (first, last)| {
            last.0 += first.0;
            seen.push(id.id());
        }).unwrap();
        assert_eq!(seen, vec![1]);
        assert_eq!(manager.get_component::<T63>(EntityID::new(1)).unwrap(), Some(&T63(8)));
    }

    #[test]
    fn test_zero_sized_component() {
        let mut manager = manager();
        manager.register_component::<Tag>().unwrap();
        for _ in 0..3 {
            manager.create_entity().add_component(Tag).unwrap();
        }

        assert_eq!(ids(&manager.get_entities::<Tag>().unwrap()), vec![0, 1, 2]);
        assert_eq!(manager.get_component::<Tag>(EntityID::new(2)).unwrap(), Some(&Tag));
        assert_eq!(manager.pool::<Tag>().unwrap().chunk_count(), 0);
    }
}
