//! Fixed-capacity pool allocator backed by an index-threaded free list

use std::sync::Arc;

use crate::backing::{BackingAllocator, HeapBacking};
use crate::error::{AllocError, Result};

/// Capacity used by [`PoolAllocator::with_default_capacity`].
pub const POOL_DEFAULT_CAPACITY: usize = 1024;

/// Sentinel index terminating the free list.
const FREE_LIST_END: usize = usize::MAX;

/// A storage cell of the pool: either a live value or a link to the next
/// free cell, never both.
///
/// The free list is threaded through the slots themselves by index, so an
/// empty pool needs no side storage beyond the slot array. Callers never
/// construct slots directly; the type is public only because it names the
/// element type a [`BackingAllocator`] supplies to a pool.
#[derive(Debug)]
pub enum Slot<T> {
    /// Slot is on the free list; `next` is the index of the next free slot
    /// or the end-of-list sentinel.
    Free { next: usize },
    /// Slot holds a live value.
    Occupied(T),
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::Free {
            next: FREE_LIST_END,
        }
    }
}

/// Handle to an object allocated from a [`PoolAllocator`].
///
/// Handles are opaque indices rather than raw addresses, so a handle can
/// never dangle into freed memory; at worst it names a slot that has since
/// been recycled, which [`PoolAllocator::deallocate`] reports as an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    index: usize,
}

/// Fixed-capacity allocator reusing uniformly-sized slots via a free list.
///
/// Allocation and deallocation are both O(1): allocate pops the free-list
/// head, deallocate pushes the slot back onto it. Capacity is fixed at
/// construction; the `(N+1)`-th simultaneous allocation reports
/// [`AllocError::CapacityExhausted`] instead of growing.
///
/// The pool is a single-owner value type with no internal synchronization.
/// Use one pool per thread, or wrap it in a lock.
///
/// # Example
///
/// ```
/// use stackpool::PoolAllocator;
///
/// let mut pool: PoolAllocator<u32> = PoolAllocator::new(8).unwrap();
/// let handle = pool.allocate(42).unwrap();
/// assert_eq!(pool.get(handle), Some(&42));
/// assert_eq!(pool.deallocate(handle).unwrap(), 42);
/// ```
#[derive(Debug)]
pub struct PoolAllocator<T> {
    /// Slot array acquired from the backing allocator. Emptied by `Drop`.
    slots: Box<[Slot<T>]>,
    /// Index of the first free slot, or `FREE_LIST_END`.
    free_head: usize,
    /// Number of currently live allocations.
    open_allocations: usize,
    /// Total number of slots.
    capacity: usize,
    /// Delegate that supplied `slots` and takes them back at destruction.
    backing: Arc<dyn BackingAllocator<Slot<T>>>,
}

impl<T> PoolAllocator<T> {
    /// Create a pool of `capacity` slots using the default heap backing.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_backing(capacity, HeapBacking::shared())
    }

    /// Create a pool of [`POOL_DEFAULT_CAPACITY`] slots.
    pub fn with_default_capacity() -> Result<Self> {
        Self::new(POOL_DEFAULT_CAPACITY)
    }

    /// Create a pool whose slot array comes from the given backing
    /// allocator.
    ///
    /// The pool calls `backing.acquire` exactly once here and
    /// `backing.release` exactly once when it is dropped.
    pub fn with_backing(
        capacity: usize,
        backing: Arc<dyn BackingAllocator<Slot<T>>>,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(AllocError::invalid_parameter(
                "capacity",
                "pool must hold at least one slot",
            ));
        }

        let mut slots = backing.acquire(capacity)?;
        let capacity = slots.len();
        if capacity == 0 {
            return Err(AllocError::invalid_parameter(
                "backing",
                "backing allocator returned an empty block",
            ));
        }

        // One-time O(N) link-up of every slot into the initial free list.
        // The last slot keeps its default FREE_LIST_END link.
        for (i, slot) in slots.iter_mut().take(capacity - 1).enumerate() {
            *slot = Slot::Free { next: i + 1 };
        }

        Ok(Self {
            slots,
            free_head: 0,
            open_allocations: 0,
            capacity,
            backing,
        })
    }

    /// Returns the total number of slots.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of currently live allocations.
    #[inline]
    #[must_use]
    pub const fn allocated_count(&self) -> usize {
        self.open_allocations
    }

    /// Returns the number of free slots.
    #[inline]
    #[must_use]
    pub const fn free_count(&self) -> usize {
        self.capacity - self.open_allocations
    }

    /// Store `value` in the slot at the free-list head.
    ///
    /// O(1). Fails with [`AllocError::CapacityExhausted`] when every slot
    /// is live; the free list is left untouched in that case.
    pub fn allocate(&mut self, value: T) -> Result<PoolHandle> {
        let index = self.free_head;
        if index == FREE_LIST_END {
            return Err(AllocError::CapacityExhausted {
                capacity: self.capacity,
            });
        }

        match std::mem::replace(&mut self.slots[index], Slot::Occupied(value)) {
            Slot::Free { next } => {
                self.free_head = next;
                self.open_allocations += 1;
                Ok(PoolHandle { index })
            }
            // The free-list head always names a free slot.
            Slot::Occupied(_) => unreachable!("free list head pointed at an occupied slot"),
        }
    }

    /// Destroy the object named by `handle` and push its slot back onto
    /// the free list, returning the stored value.
    ///
    /// O(1). A handle from another pool (index out of range) fails with
    /// [`AllocError::ForeignHandle`]; a handle whose slot is already free
    /// fails with [`AllocError::SlotNotAllocated`]. Neither failure mutates
    /// the pool.
    pub fn deallocate(&mut self, handle: PoolHandle) -> Result<T> {
        let index = handle.index;
        if index >= self.capacity {
            return Err(AllocError::ForeignHandle {
                index,
                capacity: self.capacity,
            });
        }

        let new_link = Slot::Free {
            next: self.free_head,
        };
        match std::mem::replace(&mut self.slots[index], new_link) {
            Slot::Occupied(value) => {
                self.free_head = index;
                self.open_allocations -= 1;
                Ok(value)
            }
            Slot::Free { next } => {
                // Put the original link back so the free list stays intact.
                self.slots[index] = Slot::Free { next };
                Err(AllocError::SlotNotAllocated { index })
            }
        }
    }

    /// Gets a reference to the object named by `handle`, if it is live.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        match self.slots.get(handle.index)? {
            Slot::Occupied(value) => Some(value),
            Slot::Free { .. } => None,
        }
    }

    /// Gets a mutable reference to the object named by `handle`, if it is
    /// live.
    #[inline]
    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        match self.slots.get_mut(handle.index)? {
            Slot::Occupied(value) => Some(value),
            Slot::Free { .. } => None,
        }
    }
}

impl<T> Drop for PoolAllocator<T> {
    fn drop(&mut self) {
        // Dropping a pool with live allocations is a caller bug, not a
        // runtime condition to recover from.
        if self.open_allocations != 0 && !std::thread::panicking() {
            panic!(
                "pool allocator dropped with {} live allocations",
                self.open_allocations
            );
        }
        let block = std::mem::take(&mut self.slots);
        if !block.is_empty() {
            self.backing.release(block);
        }
    }
}
