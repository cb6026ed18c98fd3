//! Chunked byte arenas which back component storage.
//!
//! A `Pool` hands out fixed-stride slots addressed by index. Memory is
//! allocated a whole chunk at a time and a chunk is never moved or freed
//! while the pool is alive, so a pointer to a slot stays valid however much
//! the pool grows afterwards.

use std::alloc::{self, Layout};
use std::fmt::{self, Debug, Formatter};
use std::ptr::NonNull;

use bit_vec::BitVec;
use log::{error, trace};
use once_cell::unsync::OnceCell;

use crate::component::ComponentTypeID;
use crate::error::{Error, Result};
use crate::mask::MAX_COMPONENT_TYPES;

/// The default number of bytes in each pool chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 16384;

/// An untyped, chunked arena of fixed-stride element slots.
pub struct Pool {
    chunks: Vec<NonNull<u8>>,
    written: BitVec,
    element: Layout,
    chunk_layout: Layout,
    stride: usize,
    elements_per_chunk: usize,
}

impl Pool {
    /// Create an empty pool for elements of the given layout.
    ///
    /// Each chunk is `chunk_size` bytes and holds `chunk_size / stride`
    /// elements. No memory is allocated until the first call to
    /// `ensure_capacity`.
    pub fn new(chunk_size: usize, element: Layout) -> Result<Pool> {
        let element = element.pad_to_align();
        let stride = element.size();

        let elements_per_chunk = if stride == 0 {
            usize::MAX
        } else {
            chunk_size / stride
        };
        if elements_per_chunk == 0 {
            return Err(Error::ChunkTooSmall { chunk_size, stride });
        }

        let chunk_layout = Layout::from_size_align(chunk_size, element.align())
            .map_err(|_| Error::AllocationFailure { bytes: chunk_size })?;

        Ok(Pool {
            chunks: Vec::new(),
            written: BitVec::new(),
            element,
            chunk_layout,
            stride,
            elements_per_chunk,
        })
    }

    /// Return the distance in bytes between consecutive slots.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Return the size of a single chunk in bytes.
    pub fn chunk_size(&self) -> usize {
        self.chunk_layout.size()
    }

    /// Return the layout of a single element.
    pub fn element_layout(&self) -> Layout {
        self.element
    }

    /// Return how many slots fit in one chunk.
    pub fn elements_per_chunk(&self) -> usize {
        self.elements_per_chunk
    }

    /// Return the number of chunks allocated so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Return the number of slots currently backed by memory.
    ///
    /// Zero-sized elements need no memory, so their capacity is unbounded.
    pub fn capacity(&self) -> usize {
        if self.stride == 0 {
            usize::MAX
        } else {
            self.chunks.len() * self.elements_per_chunk
        }
    }

    /// Grow the pool until slot `index` is backed by memory.
    ///
    /// This allocates one chunk at a time and never shrinks the pool.
    pub fn ensure_capacity(&mut self, index: usize) -> Result<()> {
        if self.stride == 0 {
            return Ok(());
        }

        while index >= self.capacity() {
            self.expand()?;
        }

        Ok(())
    }

    fn expand(&mut self) -> Result<()> {
        let raw = unsafe { alloc::alloc(self.chunk_layout) };
        let ptr = match NonNull::new(raw) {
            Some(ptr) => ptr,
            None => {
                error!("failed to allocate {} byte pool chunk", self.chunk_layout.size());
                return Err(Error::AllocationFailure { bytes: self.chunk_layout.size() });
            }
        };

        self.chunks.push(ptr);
        trace!("pool grew to {} chunks ({} slots of {} bytes)",
               self.chunks.len(), self.capacity(), self.stride);
        Ok(())
    }

    /// Return the address of slot `index`, or `None` if the pool has not
    /// grown that far.
    pub fn slot(&self, index: usize) -> Option<NonNull<u8>> {
        if index < self.capacity() {
            Some(unsafe { self.slot_unchecked(index) })
        } else {
            None
        }
    }

    /// Return the address of slot `index` without checking capacity.
    ///
    /// # Safety
    /// `index` must be below `capacity()`.
    #[inline]
    pub unsafe fn slot_unchecked(&self, index: usize) -> NonNull<u8> {
        if self.stride == 0 {
            return NonNull::new_unchecked(self.element.align() as *mut u8);
        }

        let chunk = *self.chunks.get_unchecked(index / self.elements_per_chunk);
        let offset = (index % self.elements_per_chunk) * self.stride;
        NonNull::new_unchecked(chunk.as_ptr().add(offset))
    }

    /// Returns true if an element has ever been constructed in slot `index`.
    pub fn is_written(&self, index: usize) -> bool {
        self.written.get(index).unwrap_or(false)
    }

    /// Record that slot `index` now holds an initialised element.
    pub(crate) fn mark_written(&mut self, index: usize) {
        let len = self.written.len();
        if index >= len {
            self.written.grow(index + 1 - len, false);
        }
        self.written.set(index, true);
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        for chunk in self.chunks.drain(..) {
            unsafe { alloc::dealloc(chunk.as_ptr(), self.chunk_layout) };
        }
    }
}

impl Debug for Pool {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f,
               "Pool {{ stride: {}, chunk_size: {}, chunks: {} }}",
               self.stride,
               self.chunk_layout.size(),
               self.chunks.len())
    }
}

/// The fixed table of pools owned by an `EntityManager`, indexed by
/// component type id.
///
/// Each entry is filled exactly once, when its component type is registered,
/// and is never replaced afterwards.
pub struct PoolTable {
    cells: [OnceCell<Pool>; MAX_COMPONENT_TYPES],
}

impl PoolTable {
    /// Create a table with every entry empty.
    pub fn new() -> PoolTable {
        PoolTable {
            cells: std::array::from_fn(|_| OnceCell::new()),
        }
    }

    /// Install the pool for a component type, returning the pool now stored
    /// in that entry.
    ///
    /// If the entry was already filled the existing pool is kept and `pool`
    /// is discarded.
    pub(crate) fn install(&mut self, id: ComponentTypeID, pool: Pool) -> &Pool {
        self.cells[id.id()].get_or_init(|| pool)
    }

    /// Get the pool for a component type id.
    pub fn get(&self, id: ComponentTypeID) -> Option<&Pool> {
        self.cells.get(id.id()).and_then(OnceCell::get)
    }

    /// Get a mutable reference to the pool for a component type id.
    pub fn get_mut(&mut self, id: ComponentTypeID) -> Option<&mut Pool> {
        self.cells.get_mut(id.id()).and_then(OnceCell::get_mut)
    }

    /// Iterate over every installed pool along with its component type id.
    pub fn iter(&self) -> impl Iterator<Item=(ComponentTypeID, &Pool)> {
        self.cells.iter()
            .enumerate()
            .filter_map(|(idx, cell)| cell.get().map(|pool| (ComponentTypeID::new(idx), pool)))
    }
}

impl Default for PoolTable {
    fn default() -> Self {
        PoolTable::new()
    }
}

impl Debug for PoolTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(id, pool)| (id.id(), pool)))
            .finish()
    }
}
