//! Scoped stack (bump) allocator with marker-based rollback

use std::mem;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::align::next_multiple;
use crate::backing::{BackingAllocator, HeapBacking};
use crate::error::{AllocError, Result};

/// Buffer size used by [`StackAllocator::with_default_size`].
pub const STACK_DEFAULT_SIZE: usize = 1024;

/// Global scope-id sequence, so markers from different allocators can never
/// be mistaken for one another.
static SCOPE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn next_scope_id() -> u64 {
    SCOPE_SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

/// Deferred finalizer for one non-trivially-destructible allocation.
///
/// Borrows the object's location; the stack allocator owns the underlying
/// bytes. Lives only between the allocation and the rollback that reclaims
/// it.
#[derive(Debug)]
struct Finalizer {
    location: NonNull<u8>,
    finalize: unsafe fn(NonNull<u8>),
}

/// Drops the `T` at `location` in place.
unsafe fn finalize_in_place<T>(location: NonNull<u8>) {
    std::ptr::drop_in_place(location.cast::<T>().as_ptr());
}

/// Opaque snapshot of a [`StackAllocator`]'s bump head and pending
/// finalizer count.
///
/// A marker is valid until the allocator rolls back to it or past it;
/// rolling back to a consumed marker fails with
/// [`AllocError::StaleMarker`]. Markers must be rolled back in reverse
/// order of acquisition; rolling back an outer marker consumes every
/// marker nested inside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Marker {
    head: usize,
    finalizer_len: usize,
    scope: u64,
}

/// Stack allocator serving requests by advancing a single cursor through a
/// preallocated buffer, reclaimed only in LIFO order.
///
/// Allocation is a bump of the head cursor. Reclamation happens through
/// [`rollback_to`](Self::rollback_to) / [`rollback_all`](Self::rollback_all),
/// which fire the deferred finalizers registered for
/// non-trivially-destructible objects in reverse allocation order, then
/// reset the head.
///
/// The allocator is a single-owner value type with no internal
/// synchronization; it is deliberately neither `Send` nor `Sync`. Use one
/// per thread.
///
/// # Example
///
/// ```
/// use stackpool::StackAllocator;
///
/// let mut stack = StackAllocator::new(1024).unwrap();
/// let marker = stack.get_marker();
///
/// let ptr = stack.allocate_object(7u32).unwrap();
/// unsafe { assert_eq!(ptr.as_ptr().read(), 7) };
///
/// stack.rollback_to(marker).unwrap();
/// assert_eq!(stack.used(), 0);
/// ```
#[derive(Debug)]
pub struct StackAllocator {
    /// Raw storage block; turned back into a `Box` for release in `Drop`.
    buf: NonNull<[u8]>,
    /// Base address of the buffer.
    base: NonNull<u8>,
    /// Buffer size in bytes.
    size: usize,
    /// Bump head as a byte offset from `base`. Only increases, except
    /// during rollback.
    head: usize,
    /// Deferred finalizers, ordered by allocation time.
    finalizers: Vec<Finalizer>,
    /// Scope ids of outstanding markers, oldest first.
    scopes: Vec<u64>,
    /// Delegate that supplied the buffer and takes it back at destruction.
    backing: Arc<dyn BackingAllocator<u8>>,
}

impl StackAllocator {
    /// Create a stack allocator over `size` bytes from the default heap
    /// backing.
    pub fn new(size: usize) -> Result<Self> {
        Self::with_backing(size, HeapBacking::shared())
    }

    /// Create a stack allocator over [`STACK_DEFAULT_SIZE`] bytes.
    pub fn with_default_size() -> Result<Self> {
        Self::new(STACK_DEFAULT_SIZE)
    }

    /// Create a stack allocator whose buffer comes from the given backing
    /// allocator.
    ///
    /// The allocator calls `backing.acquire` exactly once here and
    /// `backing.release` exactly once when it is dropped.
    pub fn with_backing(size: usize, backing: Arc<dyn BackingAllocator<u8>>) -> Result<Self> {
        if size == 0 {
            return Err(AllocError::invalid_parameter(
                "size",
                "buffer must hold at least one byte",
            ));
        }

        let block = backing.acquire(size)?;
        let size = block.len();
        let raw = Box::into_raw(block);
        // Box pointers are never null.
        let buf = unsafe { NonNull::new_unchecked(raw) };

        Ok(Self {
            buf,
            base: buf.cast::<u8>(),
            size,
            head: 0,
            finalizers: Vec::new(),
            scopes: Vec::new(),
            backing,
        })
    }

    /// Returns the buffer size in bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.size
    }

    /// Returns the current head offset, i.e. the number of bytes in use.
    #[inline]
    #[must_use]
    pub const fn used(&self) -> usize {
        self.head
    }

    /// Returns the number of bytes between the head and the buffer end.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.size - self.head
    }

    /// Returns the number of deferred finalizers waiting to run.
    #[inline]
    #[must_use]
    pub fn pending_finalizers(&self) -> usize {
        self.finalizers.len()
    }

    /// Check whether `ptr` points into this allocator's buffer.
    #[must_use]
    pub fn owns(&self, ptr: NonNull<u8>) -> bool {
        let addr = ptr.as_ptr() as usize;
        let base = self.base.as_ptr() as usize;
        addr >= base && addr < base + self.size
    }

    /// Reserve `size` bytes at the next address satisfying `align`.
    ///
    /// Returns the reserved location. Fails with
    /// [`AllocError::InsufficientSpace`] when the advanced head would
    /// exceed the buffer end; the head is left unmodified on failure.
    ///
    /// The returned location is valid until a rollback reclaims it. No
    /// finalizer is registered; the bytes are reclaimed wholesale.
    pub fn allocate(&mut self, size: usize, align: usize) -> Result<NonNull<u8>> {
        if size == 0 {
            return Err(AllocError::invalid_parameter(
                "size",
                "size must be greater than 0",
            ));
        }
        let offset = self.reserve(size, align)?;
        // In-bounds offset from a non-null base.
        Ok(unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset)) })
    }

    /// Construct `value` in the buffer, aligned for `T`.
    ///
    /// If `T` needs dropping, one deferred finalizer is registered and will
    /// run when a rollback reclaims the object.
    pub fn allocate_object<T>(&mut self, value: T) -> Result<NonNull<T>> {
        let ptr = self.reserve_array::<T>(1)?;
        unsafe { ptr.write(value) };
        if mem::needs_drop::<T>() {
            self.push_finalizer::<T>(ptr);
        }
        Ok(unsafe { NonNull::new_unchecked(ptr) })
    }

    /// Construct `count` instances of `T`, each produced by `init`, in one
    /// contiguous reservation aligned for `T`.
    ///
    /// Returns the location of the first instance. If `T` needs dropping,
    /// one deferred finalizer is registered per instance; trivially
    /// destructible types register none, which never affects the byte
    /// range reclaimed on rollback.
    pub fn allocate_objects_with<T, F>(&mut self, count: usize, mut init: F) -> Result<NonNull<T>>
    where
        F: FnMut() -> T,
    {
        if count == 0 {
            return Err(AllocError::invalid_parameter(
                "count",
                "must construct at least one object",
            ));
        }

        let first = self.reserve_array::<T>(count)?;
        for i in 0..count {
            let ptr = unsafe { first.add(i) };
            unsafe { ptr.write(init()) };
            if mem::needs_drop::<T>() {
                self.push_finalizer::<T>(ptr);
            }
        }
        Ok(unsafe { NonNull::new_unchecked(first) })
    }

    /// Capture the current head and pending-finalizer count.
    ///
    /// The marker opens a scope; [`rollback_to`](Self::rollback_to) closes
    /// it. Scopes nest and must close in reverse order of opening.
    pub fn get_marker(&mut self) -> Marker {
        let scope = next_scope_id();
        self.scopes.push(scope);
        Marker {
            head: self.head,
            finalizer_len: self.finalizers.len(),
            scope,
        }
    }

    /// Roll back to `marker`: fire every finalizer registered since it was
    /// taken, last-registered-first, then reset the head to its snapshot.
    ///
    /// Consumes the marker's scope along with any scopes nested inside it;
    /// their markers become stale. Rolling back to a marker that was
    /// already consumed fails with [`AllocError::StaleMarker`] and changes
    /// nothing.
    pub fn rollback_to(&mut self, marker: Marker) -> Result<()> {
        let pos = self
            .scopes
            .iter()
            .rposition(|&scope| scope == marker.scope)
            .ok_or(AllocError::StaleMarker)?;

        // An outstanding marker was taken at or below the current head.
        debug_assert!(marker.head <= self.head);
        debug_assert!(marker.finalizer_len <= self.finalizers.len());

        self.scopes.truncate(pos);
        self.run_finalizers_down_to(marker.finalizer_len);
        self.head = marker.head;
        Ok(())
    }

    /// Roll back to the construction-time state: fire every pending
    /// finalizer in reverse registration order and reset the head to the
    /// buffer start.
    ///
    /// Every outstanding marker becomes stale. A no-op on a fresh
    /// allocator.
    pub fn rollback_all(&mut self) {
        self.scopes.clear();
        self.run_finalizers_down_to(0);
        self.head = 0;
    }

    /// Bump the head for `size` bytes at `align`, returning the aligned
    /// offset. State is untouched on failure.
    fn reserve(&mut self, size: usize, align: usize) -> Result<usize> {
        if align == 0 {
            return Err(AllocError::invalid_parameter(
                "align",
                "alignment must be positive",
            ));
        }

        let base_addr = self.base.as_ptr() as usize;
        let aligned = next_multiple(align, base_addr + self.head) - base_addr;
        let new_head = aligned
            .checked_add(size)
            .ok_or_else(|| AllocError::insufficient_space(size, self.remaining()))?;

        if new_head > self.size {
            return Err(AllocError::insufficient_space(size, self.remaining()));
        }

        self.head = new_head;
        Ok(aligned)
    }

    /// Reserve space for `count` instances of `T`, aligned for `T`.
    fn reserve_array<T>(&mut self, count: usize) -> Result<*mut T> {
        let total = mem::size_of::<T>().checked_mul(count).ok_or_else(|| {
            AllocError::invalid_parameter("count", "object array size overflows")
        })?;

        let offset = if total == 0 {
            // Zero-sized types reserve nothing; they still get an aligned
            // location at the current head.
            let base_addr = self.base.as_ptr() as usize;
            next_multiple(mem::align_of::<T>(), base_addr + self.head) - base_addr
        } else {
            self.reserve(total, mem::align_of::<T>())?
        };

        Ok(unsafe { self.base.as_ptr().add(offset).cast::<T>() })
    }

    fn push_finalizer<T>(&mut self, ptr: *mut T) {
        self.finalizers.push(Finalizer {
            // Just written through, so non-null.
            location: unsafe { NonNull::new_unchecked(ptr.cast::<u8>()) },
            finalize: finalize_in_place::<T>,
        });
    }

    fn run_finalizers_down_to(&mut self, len: usize) {
        while self.finalizers.len() > len {
            if let Some(record) = self.finalizers.pop() {
                unsafe { (record.finalize)(record.location) };
            }
        }
    }
}

impl Drop for StackAllocator {
    fn drop(&mut self) {
        // A non-zero head means un-run finalizers and live references; a
        // caller bug, not a runtime condition to recover from.
        if self.head != 0 && !std::thread::panicking() {
            panic!(
                "stack allocator dropped with {} bytes still allocated",
                self.head
            );
        }
        debug_assert!(self.finalizers.is_empty() || std::thread::panicking());

        // Reconstructs the block acquired at construction.
        let block = unsafe { Box::from_raw(self.buf.as_ptr()) };
        self.backing.release(block);
    }
}
