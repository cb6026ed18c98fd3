//! Typed views over untyped pools.

use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use crate::component::Component;
use crate::error::Result;
use crate::pool::Pool;

/// A shared, typed view of the `Pool` which stores components of type `T`.
pub struct TypedPool<'a, T> {
    pool: &'a Pool,
    _marker: PhantomData<&'a T>,
}

impl<'a, T: Component> TypedPool<'a, T> {
    /// Wrap a pool.
    ///
    /// # Safety
    /// `pool` must have been created for elements of type `T`.
    pub(crate) unsafe fn new_unchecked(pool: &'a Pool) -> TypedPool<'a, T> {
        debug_assert_eq!(pool.stride(), mem::size_of::<T>());
        TypedPool {
            pool,
            _marker: PhantomData,
        }
    }

    /// Return the underlying untyped pool.
    pub fn pool(&self) -> &'a Pool {
        self.pool
    }

    /// Return the number of slots currently backed by memory.
    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Return the number of chunks allocated so far.
    pub fn chunk_count(&self) -> usize {
        self.pool.chunk_count()
    }

    /// Get the component stored in slot `index`.
    ///
    /// This does not consult any presence mask: a slot whose component was
    /// removed still returns its last value. Only slots which were never
    /// constructed return `None`.
    pub fn at(&self, index: usize) -> Option<&'a T> {
        if self.pool.is_written(index) {
            Some(unsafe { &*self.pool.slot_unchecked(index).cast::<T>().as_ptr() })
        } else {
            None
        }
    }

    /// Return a raw pointer to slot `index`.
    ///
    /// The pointer remains valid for as long as the pool exists, regardless of
    /// further growth.
    pub fn as_ptr(&self, index: usize) -> Option<NonNull<T>> {
        self.pool.slot(index).map(NonNull::cast)
    }
}

impl<'a, T> Clone for TypedPool<'a, T> {
    fn clone(&self) -> Self {
        TypedPool {
            pool: self.pool,
            _marker: PhantomData,
        }
    }
}

impl<'a, T> Copy for TypedPool<'a, T> {}

impl<'a, T> Debug for TypedPool<'a, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "TypedPool<{}>({:?})", std::any::type_name::<T>(), self.pool)
    }
}

/// An exclusive, typed view of the `Pool` which stores components of type `T`.
pub struct TypedPoolMut<'a, T> {
    pool: &'a mut Pool,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T: Component> TypedPoolMut<'a, T> {
    /// Wrap a pool.
    ///
    /// # Safety
    /// `pool` must have been created for elements of type `T`.
    pub(crate) unsafe fn new_unchecked(pool: &'a mut Pool) -> TypedPoolMut<'a, T> {
        debug_assert_eq!(pool.stride(), mem::size_of::<T>());
        TypedPoolMut {
            pool,
            _marker: PhantomData,
        }
    }

    /// Reborrow this view as a shared one.
    pub fn as_shared(&self) -> TypedPool<'_, T> {
        unsafe { TypedPool::new_unchecked(self.pool) }
    }

    /// Construct `value` in place in slot `index`, growing the pool first if
    /// required.
    ///
    /// Whatever occupied the slot before is overwritten without being dropped.
    pub fn construct(&mut self, index: usize, value: T) -> Result<&mut T> {
        self.pool.ensure_capacity(index)?;

        let ptr = unsafe { self.pool.slot_unchecked(index).cast::<T>() };
        unsafe { ptr.as_ptr().write(value) };
        self.pool.mark_written(index);

        Ok(unsafe { &mut *ptr.as_ptr() })
    }

    /// Get the component stored in slot `index`.
    pub fn at(&self, index: usize) -> Option<&T> {
        self.as_shared().at(index)
    }

    /// Get a mutable reference to the component stored in slot `index`.
    pub fn at_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slot_mut(index)
    }

    /// Convert this view into a mutable reference to slot `index`.
    pub fn into_mut(self, index: usize) -> Option<&'a mut T> {
        self.slot_mut(index)
    }

    fn slot_mut<'b>(&self, index: usize) -> Option<&'b mut T> {
        if self.pool.is_written(index) {
            Some(unsafe { &mut *self.pool.slot_unchecked(index).cast::<T>().as_ptr() })
        } else {
            None
        }
    }

    /// Return a raw pointer to slot `index`.
    pub fn as_ptr(&self, index: usize) -> Option<NonNull<T>> {
        self.pool.slot(index).map(NonNull::cast)
    }
}

impl<'a, T> Debug for TypedPoolMut<'a, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "TypedPoolMut<{}>({:?})", std::any::type_name::<T>(), self.pool)
    }
}
