//! Queries over entities by component type.
//!
//! A query is a Rust type naming the component types an entity must have:
//! either a single component declared with `component!`, or a tuple of up to
//! eight queries. The component types are turned into a `Mask` once, and each
//! entity is then matched with a single mask comparison.
//!
//! Dispatch goes one step further and resolves the pool of every queried type
//! before scanning, handing out `&mut` references for each match without any
//! further lookups.

use std::any::type_name;
use std::iter::Enumerate;
use std::marker::PhantomData;
use std::ops::{Bound, RangeBounds};
use std::ptr::NonNull;
use std::slice;

use crate::component::{Component, ComponentRegistry};
use crate::entity::EntityID;
use crate::error::{Error, Result};
use crate::mask::Mask;
use crate::pool::{Pool, PoolTable};

/// A compile-time list of component types.
///
/// # Safety
/// `fetch` hands out references into pool memory. Implementations must only
/// fetch from pools they resolved, and `collect_mask` must set the bit of
/// every component type they fetch, failing on duplicates, so that a matched
/// entity is guaranteed to have an initialised slot in each of them and no
/// slot is handed out twice.
pub unsafe trait Query {
    /// The resolved pool pointers used to fetch items.
    type State;

    /// What a match yields, e.g. `(&'a mut Position, &'a mut Velocity)`.
    type Item<'a>;

    /// Add the bits of every component type in this query to `mask`.
    ///
    /// A type listed more than once is an error.
    fn collect_mask(components: &ComponentRegistry, mask: &mut Mask) -> Result<()>;

    /// Add the bits of every component type in this query to `mask`,
    /// merging repeated types.
    fn union_mask(components: &ComponentRegistry, mask: &mut Mask) -> Result<()>;

    /// Look up the pools of every component type in this query.
    fn resolve(components: &ComponentRegistry, pools: &PoolTable) -> Result<Self::State>;

    /// Fetch the item for the entity at `index`.
    ///
    /// # Safety
    /// The entity at `index` must have every component in this query, and
    /// nothing else may access those components for the lifetime `'a`.
    unsafe fn fetch<'a>(state: &Self::State, index: usize) -> Self::Item<'a>;
}

/// Build the required mask for a query which hands out references.
pub fn query_mask<Q: Query>(components: &ComponentRegistry) -> Result<Mask> {
    let mut mask = Mask::empty();
    Q::collect_mask(components, &mut mask)?;
    Ok(mask)
}

/// Build the required mask for a query which only filters entities.
pub fn filter_mask<Q: Query>(components: &ComponentRegistry) -> Result<Mask> {
    let mut mask = Mask::empty();
    Q::union_mask(components, &mut mask)?;
    Ok(mask)
}

/// A resolved reference to the pool of a single component type.
///
/// This is the query state of a single component.
pub struct PoolRef<T> {
    pool: NonNull<Pool>,
    _marker: PhantomData<*mut T>,
}

impl<T: Component> PoolRef<T> {
    /// Set the bit for `T` in `mask`.
    pub fn collect_mask(components: &ComponentRegistry, mask: &mut Mask) -> Result<()> {
        let id = components.require::<T>()?;
        if mask.contains(id) {
            return Err(Error::DuplicateQueryType { name: type_name::<T>() });
        }

        mask.set(id);
        Ok(())
    }

    /// Set the bit for `T` in `mask`, which may already contain it.
    pub fn union_mask(components: &ComponentRegistry, mask: &mut Mask) -> Result<()> {
        mask.set(components.require::<T>()?);
        Ok(())
    }

    /// Resolve the pool for `T`.
    pub fn resolve(components: &ComponentRegistry, pools: &PoolTable) -> Result<PoolRef<T>> {
        let id = components.require::<T>()?;
        let pool = pools.get(id)
            .ok_or(Error::TypeNotRegistered { name: type_name::<T>() })?;

        Ok(PoolRef {
            pool: NonNull::from(pool),
            _marker: PhantomData,
        })
    }

    /// Fetch the component in slot `index`.
    ///
    /// # Safety
    /// Slot `index` must have been constructed, the pool must outlive `'a` and
    /// nothing else may access the slot during `'a`.
    #[inline]
    pub unsafe fn fetch<'a>(&self, index: usize) -> &'a mut T {
        let slot = self.pool.as_ref().slot_unchecked(index);
        &mut *slot.cast::<T>().as_ptr()
    }
}

macro_rules! impl_query_tuple {
    ($($Q:ident),*) => {
        unsafe impl<$($Q: Query),*> Query for ($($Q,)*) {
            type State = ($($Q::State,)*);
            type Item<'a> = ($($Q::Item<'a>,)*);

            fn collect_mask(components: &ComponentRegistry, mask: &mut Mask) -> Result<()> {
                $($Q::collect_mask(components, mask)?;)*
                Ok(())
            }

            fn union_mask(components: &ComponentRegistry, mask: &mut Mask) -> Result<()> {
                $($Q::union_mask(components, mask)?;)*
                Ok(())
            }

            fn resolve(components: &ComponentRegistry, pools: &PoolTable) -> Result<Self::State> {
                Ok(($($Q::resolve(components, pools)?,)*))
            }

            #[allow(non_snake_case)]
            unsafe fn fetch<'a>(state: &Self::State, index: usize) -> Self::Item<'a> {
                let ($($Q,)*) = state;
                ($($Q::fetch($Q, index),)*)
            }
        }
    };
}

impl_query_tuple!(Q1);
impl_query_tuple!(Q1, Q2);
impl_query_tuple!(Q1, Q2, Q3);
impl_query_tuple!(Q1, Q2, Q3, Q4);
impl_query_tuple!(Q1, Q2, Q3, Q4, Q5);
impl_query_tuple!(Q1, Q2, Q3, Q4, Q5, Q6);
impl_query_tuple!(Q1, Q2, Q3, Q4, Q5, Q6, Q7);
impl_query_tuple!(Q1, Q2, Q3, Q4, Q5, Q6, Q7, Q8);

/// Clamp a range of entity ids to `[0, count)`.
pub(crate) fn clamp_range(range: impl RangeBounds<usize>, count: usize) -> (usize, usize) {
    let start = match range.start_bound() {
        Bound::Unbounded => 0,
        Bound::Included(x) => *x,
        Bound::Excluded(x) => x.saturating_add(1),
    };
    let end = match range.end_bound() {
        Bound::Unbounded => count,
        Bound::Included(x) => x.saturating_add(1),
        Bound::Excluded(x) => *x,
    };

    let end = end.min(count);
    (start.min(end), end)
}

/// An iterator over the entities in a range which match a query.
///
/// Yields each matching entity's id along with one `&mut` reference per
/// queried component type.
pub struct QueryIter<'m, Q: Query> {
    masks: Enumerate<slice::Iter<'m, Mask>>,
    offset: usize,
    required: Mask,
    state: Q::State,
    _marker: PhantomData<&'m mut PoolTable>,
}

impl<'m, Q: Query> QueryIter<'m, Q> {
    /// Create a query iterator.
    ///
    /// # Safety
    /// `state` must have been resolved from pools which are exclusively
    /// borrowed for `'m`, `masks` must be the presence masks of the entities
    /// starting at id `offset`, and `required` must come from
    /// `Q::collect_mask`.
    pub(crate) unsafe fn new(
        masks: &'m [Mask],
        offset: usize,
        required: Mask,
        state: Q::State,
    ) -> QueryIter<'m, Q> {
        QueryIter {
            masks: masks.iter().enumerate(),
            offset,
            required,
            state,
            _marker: PhantomData,
        }
    }

    /// Return the mask every yielded entity satisfies.
    pub fn required(&self) -> &Mask {
        &self.required
    }
}

impl<'m, Q: Query> Iterator for QueryIter<'m, Q> {
    type Item = (EntityID, Q::Item<'m>);

    fn next(&mut self) -> Option<Self::Item> {
        let required = &self.required;
        let (idx, _) = self.masks.find(|(_, mask)| mask.includes_all(required))?;
        let index = self.offset + idx;

        // Every entity is visited once and its presence bits guarantee that
        // each queried slot was constructed.
        let item = unsafe { Q::fetch(&self.state, index) };
        Some((EntityID::new(index), item))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.masks.size_hint().1)
    }
}
