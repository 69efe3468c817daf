//! Backing allocators supplying the raw storage blocks

use std::fmt;
use std::sync::Arc;

use crate::error::{AllocError, Result};

/// Delegate that supplies and reclaims the raw storage block a pool or
/// stack allocator manages.
///
/// An allocator calls [`acquire`](Self::acquire) exactly once at
/// construction and [`release`](Self::release) exactly once at destruction,
/// with the same block and count. Implementations may recycle released
/// blocks; the default [`HeapBacking`] simply returns them to the heap.
///
/// Backing allocators are shared between allocator instances through
/// `Arc<dyn BackingAllocator<T>>`.
pub trait BackingAllocator<T>: Send + Sync + fmt::Debug {
    /// Acquire a block of `count` slots
    fn acquire(&self, count: usize) -> Result<Box<[T]>>;

    /// Release a block previously returned by [`acquire`](Self::acquire)
    fn release(&self, block: Box<[T]>);
}

/// Bulk heap-backed allocator used when the caller supplies no delegate.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapBacking;

impl HeapBacking {
    /// Create a shared heap backing
    pub fn shared() -> Arc<Self> {
        Arc::new(Self)
    }
}

impl<T: Default> BackingAllocator<T> for HeapBacking {
    fn acquire(&self, count: usize) -> Result<Box<[T]>> {
        if count == 0 {
            return Err(AllocError::invalid_parameter(
                "count",
                "block must hold at least one slot",
            ));
        }
        Ok((0..count).map(|_| T::default()).collect())
    }

    fn release(&self, block: Box<[T]>) {
        drop(block);
    }
}
