//! Integration tests for the pool allocator

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use stackpool::{AllocError, BackingAllocator, PoolAllocator, Result, Slot};

/// Backing delegate that counts acquire/release calls.
#[derive(Debug, Default)]
struct CountingBacking {
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl<T: Default> BackingAllocator<T> for CountingBacking {
    fn acquire(&self, count: usize) -> Result<Box<[T]>> {
        self.acquired.fetch_add(1, Ordering::Relaxed);
        Ok((0..count).map(|_| T::default()).collect())
    }

    fn release(&self, block: Box<[T]>) {
        self.released.fetch_add(1, Ordering::Relaxed);
        drop(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_allocations_never_exceed_capacity() {
        const CAPACITY: usize = 16;
        let mut pool: PoolAllocator<u64> = PoolAllocator::new(CAPACITY).unwrap();
        let mut handles = Vec::new();

        for i in 0..CAPACITY {
            handles.push(pool.allocate(i as u64).unwrap());
            assert!(pool.allocated_count() <= CAPACITY);
        }

        // The (N+1)-th simultaneous allocation reports exhaustion.
        assert!(matches!(
            pool.allocate(99),
            Err(AllocError::CapacityExhausted { capacity: CAPACITY })
        ));

        // The free list survived the failure: release everything, then
        // refill the whole pool.
        for handle in handles.drain(..) {
            pool.deallocate(handle).unwrap();
        }
        for i in 0..CAPACITY {
            handles.push(pool.allocate(i as u64).unwrap());
        }
        for handle in handles {
            pool.deallocate(handle).unwrap();
        }
    }

    #[test]
    fn test_freed_slots_are_reused() {
        let mut pool: PoolAllocator<String> = PoolAllocator::new(8).unwrap();

        let h1 = pool.allocate("first".to_string()).unwrap();
        assert_eq!(pool.deallocate(h1).unwrap(), "first");

        let h2 = pool.allocate("second".to_string()).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(pool.get(h2).map(String::as_str), Some("second"));
        pool.deallocate(h2).unwrap();
    }

    #[test]
    fn test_failed_allocation_mutates_nothing() {
        let mut pool: PoolAllocator<u8> = PoolAllocator::new(1).unwrap();
        let handle = pool.allocate(1).unwrap();

        let count_before = pool.allocated_count();
        let free_before = pool.free_count();
        assert!(pool.allocate(2).is_err());
        assert_eq!(pool.allocated_count(), count_before);
        assert_eq!(pool.free_count(), free_before);

        pool.deallocate(handle).unwrap();
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut pool: PoolAllocator<Vec<u32>> = PoolAllocator::new(4).unwrap();
        let handle = pool.allocate(vec![1, 2]).unwrap();

        pool.get_mut(handle).unwrap().push(3);
        assert_eq!(pool.get(handle).unwrap(), &[1, 2, 3]);

        pool.deallocate(handle).unwrap();
    }

    #[test]
    fn test_backing_acquired_and_released_exactly_once() {
        let backing = Arc::new(CountingBacking::default());

        {
            let mut pool: PoolAllocator<u32> =
                PoolAllocator::with_backing(
                    8,
                    Arc::clone(&backing) as Arc<dyn BackingAllocator<Slot<u32>>>,
                )
                .unwrap();
            let handle = pool.allocate(1).unwrap();
            pool.deallocate(handle).unwrap();
            assert_eq!(backing.acquired.load(Ordering::Relaxed), 1);
            assert_eq!(backing.released.load(Ordering::Relaxed), 0);
        }

        assert_eq!(backing.acquired.load(Ordering::Relaxed), 1);
        assert_eq!(backing.released.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_backing_shared_between_pools() {
        let backing = Arc::new(CountingBacking::default());

        let mut a: PoolAllocator<u8> = PoolAllocator::with_backing(
            4,
            Arc::clone(&backing) as Arc<dyn BackingAllocator<Slot<u8>>>,
        )
        .unwrap();
        let mut b: PoolAllocator<u8> = PoolAllocator::with_backing(
            4,
            Arc::clone(&backing) as Arc<dyn BackingAllocator<Slot<u8>>>,
        )
        .unwrap();
        assert_eq!(backing.acquired.load(Ordering::Relaxed), 2);

        let ha = a.allocate(1).unwrap();
        let hb = b.allocate(2).unwrap();

        // Handles are per-pool: `ha` names slot 0 of `a`, not of `b`.
        assert_eq!(a.get(ha), Some(&1));
        assert_eq!(b.get(hb), Some(&2));

        a.deallocate(ha).unwrap();
        b.deallocate(hb).unwrap();
    }

    #[test]
    fn test_non_copy_values_round_trip() {
        let mut pool: PoolAllocator<Box<u32>> = PoolAllocator::new(2).unwrap();
        let handle = pool.allocate(Box::new(7)).unwrap();
        let value = pool.deallocate(handle).unwrap();
        assert_eq!(*value, 7);
    }
}
