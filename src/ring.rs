// src/ring.rs
//! Bounded lock-free SPSC ring buffer.
//!
//! Single producer, single consumer, capacity fixed at compile time to a
//! power of two. Each slot carries its own sequence counter (the SPSC
//! reduction of the Vyukov MPMC protocol), so the hot path needs no CAS:
//! only atomic loads and stores with acquire/release pairing.
//!
//! Slot state at position `pos` (indexing with `pos & (N - 1)`):
//! - `seq == pos`: slot free, producer may write.
//! - `seq == pos + 1`: slot full, consumer may read.
//! - after a pop the slot is re-armed with `seq = pos + N` for the next lap.
//!
//! The producer's release store of `seq` publishes the value write; the
//! consumer's acquire load of `seq` synchronizes with it. `head` and `tail`
//! are each owned by exactly one thread and stay relaxed; they are padded to
//! separate cache lines from each other and from the slot array.
//!
//! [`channel`] hands back a `(Producer, Consumer)` pair. Single-producer and
//! single-consumer use is enforced by ownership: the handles are not `Clone`
//! and their methods take `&mut self`.
//!
//! Blocking variants spin with a CPU pause hint instead of parking. The
//! expected occupancy gap between the two endpoints is a few slots, so an OS
//! park/unpark would dominate the hand-off latency.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;

/// Ring capacity used by the pipeline.
pub const DEFAULT_CAPACITY: usize = 4096;

#[repr(align(64))]
struct Slot<T> {
    seq: AtomicU64,
    value: UnsafeCell<MaybeUninit<T>>,
}

struct Ring<T, const N: usize> {
    /// Next position the producer will write. Monotonic, never wrapped.
    head: CachePadded<AtomicU64>,
    /// Next position the consumer will read. Monotonic, never wrapped.
    tail: CachePadded<AtomicU64>,
    slots: Box<[Slot<T>]>,
}

// The ring is shared between exactly two threads through the handles below.
// Slot contents are published via the per-slot seq (release/acquire), so the
// usual Sync requirement of T: Sync does not apply: each value is accessed by
// one thread at a time.
unsafe impl<T: Send, const N: usize> Send for Ring<T, N> {}
unsafe impl<T: Send, const N: usize> Sync for Ring<T, N> {}

impl<T, const N: usize> Ring<T, N> {
    const MASK: u64 = N as u64 - 1;

    // Evaluated at compile time when `new` is instantiated.
    const CAPACITY_IS_POW2: () = assert!(N.is_power_of_two(), "capacity must be a power of two");

    fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::CAPACITY_IS_POW2;

        let slots = (0..N as u64)
            .map(|i| Slot {
                seq: AtomicU64::new(i),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect();

        Self {
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
            slots,
        }
    }

    #[inline(always)]
    fn slot(&self, pos: u64) -> &Slot<T> {
        &self.slots[(pos & Self::MASK) as usize]
    }
}

impl<T, const N: usize> Drop for Ring<T, N> {
    fn drop(&mut self) {
        // Both handles are gone; drop whatever was pushed but never popped.
        let mut pos = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        while pos < head {
            let slot = self.slot(pos);
            if slot.seq.load(Ordering::Relaxed) == pos + 1 {
                unsafe { (*slot.value.get()).assume_init_drop() };
            }
            pos += 1;
        }
    }
}

/// Create a bounded SPSC ring of capacity `N` (compile-time power of two).
pub fn channel<T: Send, const N: usize>() -> (Producer<T, N>, Consumer<T, N>) {
    let ring = Arc::new(Ring::new());
    (Producer { ring: Arc::clone(&ring) }, Consumer { ring })
}

/// Write end of the ring. Owned by exactly one thread.
pub struct Producer<T, const N: usize> {
    ring: Arc<Ring<T, N>>,
}

/// Read end of the ring. Owned by exactly one thread.
pub struct Consumer<T, const N: usize> {
    ring: Arc<Ring<T, N>>,
}

impl<T: Send, const N: usize> Producer<T, N> {
    /// Non-blocking push. Returns the item back when the ring is full.
    #[inline]
    pub fn try_push(&mut self, item: T) -> Result<(), T> {
        let pos = self.ring.head.load(Ordering::Relaxed);
        let slot = self.ring.slot(pos);
        if slot.seq.load(Ordering::Acquire) != pos {
            return Err(item);
        }
        self.ring.head.store(pos + 1, Ordering::Relaxed);
        unsafe { (*slot.value.get()).write(item) };
        slot.seq.store(pos + 1, Ordering::Release);
        Ok(())
    }

    /// Blocking push. Spins with a pause hint until the slot frees up.
    #[inline]
    pub fn push(&mut self, item: T) {
        let pos = self.ring.head.load(Ordering::Relaxed);
        let slot = self.ring.slot(pos);
        while slot.seq.load(Ordering::Acquire) != pos {
            std::hint::spin_loop();
        }
        self.ring.head.store(pos + 1, Ordering::Relaxed);
        unsafe { (*slot.value.get()).write(item) };
        slot.seq.store(pos + 1, Ordering::Release);
    }

    /// Total number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        N
    }
}

impl<T: Send, const N: usize> Consumer<T, N> {
    /// Non-blocking pop. `None` when the ring is empty.
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        let pos = self.ring.tail.load(Ordering::Relaxed);
        let slot = self.ring.slot(pos);
        if slot.seq.load(Ordering::Acquire) != pos + 1 {
            return None;
        }
        Some(self.take(pos))
    }

    /// Blocking pop with a close flag. Spins until an element arrives;
    /// returns `None` only once `closed` is set and the ring is drained.
    #[inline]
    pub fn pop(&mut self, closed: &AtomicBool) -> Option<T> {
        let pos = self.ring.tail.load(Ordering::Relaxed);
        let slot = self.ring.slot(pos);
        loop {
            if slot.seq.load(Ordering::Acquire) == pos + 1 {
                break;
            }
            if closed.load(Ordering::Acquire) {
                // The producer may have written the slot between the two
                // checks; look once more before giving up.
                if slot.seq.load(Ordering::Acquire) == pos + 1 {
                    break;
                }
                return None;
            }
            std::hint::spin_loop();
        }
        Some(self.take(pos))
    }

    /// Total number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        N
    }

    #[inline(always)]
    fn take(&mut self, pos: u64) -> T {
        let slot = self.ring.slot(pos);
        self.ring.tail.store(pos + 1, Ordering::Relaxed);
        // The acquire load of seq == pos + 1 ordered the producer's write
        // before this read; the slot is initialized and exclusively ours.
        let item = unsafe { (*slot.value.get()).assume_init_read() };
        slot.seq.store(pos + N as u64, Ordering::Release);
        item
    }
}
