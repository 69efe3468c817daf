//! # Stackpool - Pool and Scoped Stack Allocators
//!
//! Two manual memory-management primitives for performance-sensitive,
//! allocation-heavy code:
//!
//! - [`PoolAllocator`]: fixed-capacity, O(1) allocation and deallocation of
//!   same-type objects through an index-threaded free list
//! - [`StackAllocator`]: LIFO bump allocator with marker-based scoped
//!   rollback and deferred finalization for non-trivially-destructible
//!   objects
//!
//! Both constrain allocation patterns to O(1) operations with a predictable
//! lifetime discipline, avoiding general-purpose heap overhead and
//! fragmentation.
//!
//! ## Design
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │  PoolAllocator<T>        │  StackAllocator      │
//! │  - slot array            │  - byte buffer       │
//! │  - free list (indices)   │  - bump head         │
//! │  - opaque handles        │  - markers + scopes  │
//! │                          │  - deferred drops    │
//! └────────────┬─────────────┴──────────┬───────────┘
//!              ▼                        ▼
//!        ┌──────────────────────────────────┐
//!        │  BackingAllocator (acquire /     │
//!        │  release, default HeapBacking)   │
//!        └──────────────────────────────────┘
//! ```
//!
//! Misuse is reported, not papered over: exhaustion and overflow are
//! recoverable [`AllocError`] values, freeing a foreign or already-free
//! handle is an explicit error, rolling back to a consumed marker is
//! rejected, and dropping an allocator that still holds live allocations
//! panics.
//!
//! Neither allocator is thread-safe; both are single-owner value types.
//! Use one instance per thread or arena.
//!
//! ## Example
//!
//! ```
//! use stackpool::{PoolAllocator, StackAllocator};
//!
//! let mut stack = StackAllocator::new(4096)?;
//! let marker = stack.get_marker();
//! let values = stack.allocate_objects_with(10, || 0u64)?;
//! unsafe { values.as_ptr().write(42) };
//! stack.rollback_to(marker)?;
//!
//! let mut pool: PoolAllocator<String> = PoolAllocator::new(16)?;
//! let handle = pool.allocate("hello".to_string())?;
//! pool.deallocate(handle)?;
//! # Ok::<(), stackpool::AllocError>(())
//! ```

pub mod align;
pub mod backing;
pub mod error;
pub mod pool;
pub mod stack;

pub use align::next_multiple;
pub use backing::{BackingAllocator, HeapBacking};
pub use error::{AllocError, Result};
pub use pool::{PoolAllocator, PoolHandle, Slot, POOL_DEFAULT_CAPACITY};
pub use stack::{Marker, StackAllocator, STACK_DEFAULT_SIZE};
