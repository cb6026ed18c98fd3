//! Base definitions for components.
//!
//! Entities in this library are nothing more than an index. All of their data
//! lives in components, which are plain `Copy` records stored in one pool per
//! component type.
//!
//! Each component type is assigned a small dense `ComponentTypeID` when it is
//! registered with a `ComponentRegistry`. That id indexes the pool table and
//! the presence bit in every entity's `Mask`. There is a macro (`component`) to
//! declare component types.

use std::alloc::Layout;
use std::any::{type_name, TypeId};
use std::cmp::{Ord, Ordering};
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};

use crate::error::{Error, Result};
use crate::mask::MAX_COMPONENT_TYPES;

/// A component type ID which is unique for a specific component type within
/// one registry.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentTypeID(usize);

impl ComponentTypeID {
    /// Construct a new `ComponentTypeID` from the inner value.
    pub(crate) fn new(inner: usize) -> ComponentTypeID {
        ComponentTypeID(inner)
    }

    /// Return the inner dense ID.
    pub fn id(&self) -> usize {
        self.0
    }
}

impl Debug for ComponentTypeID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTypeID(#{})", self.0)
    }
}

/// The component trait is implemented on all component types.
///
/// Components are stored by bitwise copy into untyped pool memory and are
/// never dropped, hence the `Copy` bound. Use the `component!` macro to
/// implement this, since it also allows the type to be used as a single
/// element query.
pub trait Component: Copy + 'static {
    /// Get the memory layout of an instance of this component.
    fn layout() -> Layout {
        Layout::new::<Self>()
    }
}

/// A ComponentRegistration is the dynamic description of a registered
/// component type.
#[derive(Clone, Copy)]
pub struct ComponentRegistration {
    type_id: ComponentTypeID,
    layout: Layout,
    name: &'static str,
}

impl ComponentRegistration {
    /// Create a ComponentRegistration for a static type.
    pub fn new<T: Component>(type_id: ComponentTypeID) -> ComponentRegistration {
        ComponentRegistration {
            type_id,
            layout: T::layout(),
            name: type_name::<T>(),
        }
    }

    /// Return the id assigned to this component type.
    pub fn type_id(&self) -> ComponentTypeID {
        self.type_id
    }

    /// Return the memory layout of a single instance of this component.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Get the name of this component type.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ComponentRegistration {
    fn eq(&self, other: &ComponentRegistration) -> bool {
        self.type_id.eq(&other.type_id)
    }
}

impl Eq for ComponentRegistration {}

impl PartialOrd for ComponentRegistration {
    fn partial_cmp(&self, other: &ComponentRegistration) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComponentRegistration {
    fn cmp(&self, other: &ComponentRegistration) -> Ordering {
        self.type_id.cmp(&other.type_id)
    }
}

impl Debug for ComponentRegistration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<ComponentRegistration #{} {}>", self.type_id.id(), self.name)
    }
}

/// Assigns dense ids to component types in registration order.
///
/// Registration is idempotent: registering a type a second time returns the
/// id it was given the first time.
#[derive(Debug)]
pub struct ComponentRegistry {
    limit: usize,
    ids: HashMap<TypeId, ComponentTypeID>,
    registrations: Vec<ComponentRegistration>,
}

impl ComponentRegistry {
    /// Create a registry which can hold up to `MAX_COMPONENT_TYPES` types.
    pub fn new() -> ComponentRegistry {
        ComponentRegistry::with_limit(MAX_COMPONENT_TYPES)
    }

    /// Create a registry with a lower limit on the number of component types.
    ///
    /// Limits above `MAX_COMPONENT_TYPES` are clamped.
    pub fn with_limit(limit: usize) -> ComponentRegistry {
        ComponentRegistry {
            limit: limit.min(MAX_COMPONENT_TYPES),
            ids: HashMap::new(),
            registrations: Vec::new(),
        }
    }

    /// Return the maximum number of component types this registry accepts.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Return the number of registered component types.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns true if no component types have been registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Assign the next free id to `T`, or return the id it already has.
    pub fn register<T: Component>(&mut self) -> Result<ComponentTypeID> {
        if let Some(id) = self.id_of::<T>() {
            return Ok(id);
        }

        let next = self.registrations.len();
        if next >= self.limit {
            return Err(Error::TooManyComponentTypes {
                name: type_name::<T>(),
                max: self.limit,
            });
        }

        let id = ComponentTypeID(next);
        self.ids.insert(TypeId::of::<T>(), id);
        self.registrations.push(ComponentRegistration::new::<T>(id));
        Ok(id)
    }

    /// Return the id of `T`, if it has been registered.
    pub fn id_of<T: Component>(&self) -> Option<ComponentTypeID> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    /// Return the id of `T`, failing if it has not been registered.
    pub fn require<T: Component>(&self) -> Result<ComponentTypeID> {
        self.id_of::<T>().ok_or(Error::TypeNotRegistered {
            name: type_name::<T>(),
        })
    }

    /// Fetch the registration information for a component type id.
    pub fn registration(&self, id: ComponentTypeID) -> Option<&ComponentRegistration> {
        self.registrations.get(id.0)
    }

    /// Iterate over all registrations in id order.
    pub fn iter(&self) -> impl Iterator<Item=&ComponentRegistration> {
        self.registrations.iter()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        ComponentRegistry::new()
    }
}

/// Implement the `Component` trait on one or more types.
///
/// This also lets each type be used on its own as a query, so
/// `get_entities::<Position>()` works alongside tuple queries such as
/// `get_entities::<(Position, Velocity)>()`.
///
/// Component types must implement Copy.
#[macro_export]
macro_rules! component {
    ($($i:ty),+ $(,)?) => {
        $(
            impl $crate::component::Component for $i {}

            unsafe impl $crate::query::Query for $i {
                type State = $crate::query::PoolRef<$i>;
                type Item<'a> = &'a mut $i;

                fn collect_mask(
                    components: &$crate::component::ComponentRegistry,
                    mask: &mut $crate::mask::Mask,
                ) -> $crate::error::Result<()> {
                    $crate::query::PoolRef::<$i>::collect_mask(components, mask)
                }

                fn union_mask(
                    components: &$crate::component::ComponentRegistry,
                    mask: &mut $crate::mask::Mask,
                ) -> $crate::error::Result<()> {
                    $crate::query::PoolRef::<$i>::union_mask(components, mask)
                }

                fn resolve(
                    components: &$crate::component::ComponentRegistry,
                    pools: &$crate::pool::PoolTable,
                ) -> $crate::error::Result<Self::State> {
                    $crate::query::PoolRef::<$i>::resolve(components, pools)
                }

                unsafe fn fetch<'a>(state: &Self::State, index: usize) -> Self::Item<'a> {
                    state.fetch(index)
                }
            }
        )+
    };
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_uniqueness() {
        #[derive(Debug, Clone, Copy)]
        struct A;
        #[derive(Debug, Clone, Copy)]
        struct B;

        component!(A, B);

        let mut registry = ComponentRegistry::new();
        let a = registry.register::<A>().unwrap();
        let b = registry.register::<B>().unwrap();

        assert_eq!(a.id(), 0);
        assert_eq!(b.id(), 1);
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_idempotent() {
        #[derive(Debug, Clone, Copy)]
        struct A(u8);

        component!(A);

        let mut registry = ComponentRegistry::new();
        let first = registry.register::<A>().unwrap();
        let second = registry.register::<A>().unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registration() {
        #[derive(Debug, Clone, Copy)]
        struct A(u32, u8);

        component!(A);

        let mut registry = ComponentRegistry::new();
        assert_eq!(
            registry.require::<A>(),
            Err(Error::TypeNotRegistered { name: type_name::<A>() }));

        let id = registry.register::<A>().unwrap();
        let registration = registry.registration(id).unwrap();
        assert_eq!(registration.type_id(), id);
        assert_eq!(registration.layout(), Layout::new::<A>());
        assert!(registration.name().ends_with("A"));
    }

    #[test]
    fn test_limit() {
        #[derive(Debug, Clone, Copy)]
        struct A;
        #[derive(Debug, Clone, Copy)]
        struct B;
        #[derive(Debug, Clone, Copy)]
        struct C;

        component!(A, B, C);

        let mut registry = ComponentRegistry::with_limit(2);
        registry.register::<A>().unwrap();
        registry.register::<B>().unwrap();
        assert_eq!(
            registry.register::<C>(),
            Err(Error::TooManyComponentTypes { name: type_name::<C>(), max: 2 }));

        // Already registered types are still fine.
        assert!(registry.register::<A>().is_ok());
        assert_eq!(ComponentRegistry::with_limit(1000).limit(), MAX_COMPONENT_TYPES);
    }
}
