//! Circular-buffer bookkeeping.
//!
//! The sample storage is externally owned: the capture source writes into it
//! and this crate only tracks logical cursors in `[0, capacity)`. Every
//! distance and slice computation must be wrap-aware — a read that crosses
//! the capacity boundary is always expressed as two contiguous ranges, never
//! as a single one.

pub mod chunk;
pub mod segmenter;

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Wrap-aware forward distance from `prev` to `next` on a ring of
/// `capacity` samples. Never negative; `distance(a, a) == 0`.
pub fn distance(prev: usize, next: usize, capacity: usize) -> usize {
    debug_assert!(capacity > 0);
    debug_assert!(prev < capacity && next < capacity);
    if next >= prev {
        next - prev
    } else {
        capacity - prev + next
    }
}

/// How many valid samples the buffer holds.
///
/// Before the first wrap the recorded length equals the write cursor
/// (zero right after start); once the capture has lapped, the whole
/// capacity is valid.
pub fn buffered_len(write_pos: usize, made_loop_lap: bool, capacity: usize) -> usize {
    if made_loop_lap {
        capacity
    } else {
        write_pos
    }
}

/// One or two contiguous index ranges describing a wrap-aware read.
///
/// The two-range form is returned in temporal order: `[start, capacity)`
/// first, then `[0, rest)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceSpan {
    One(Range<usize>),
    Two(Range<usize>, Range<usize>),
}

impl SliceSpan {
    pub fn total_len(&self) -> usize {
        match self {
            SliceSpan::One(r) => r.len(),
            SliceSpan::Two(a, b) => a.len() + b.len(),
        }
    }
}

/// Resolve a read of `len` samples starting at `start` into contiguous
/// ranges. Splits at the capacity boundary when the read wraps.
pub fn read_slice(start: usize, len: usize, capacity: usize) -> SliceSpan {
    debug_assert!(capacity > 0);
    debug_assert!(start < capacity);
    debug_assert!(len <= capacity);
    if start + len <= capacity {
        SliceSpan::One(start..start + len)
    } else {
        SliceSpan::Two(start..capacity, 0..start + len - capacity)
    }
}

/// Read access to externally-owned circular sample storage.
///
/// Implementors only need to serve contiguous ranges; the provided
/// [`SampleSource::read`] handles the wraparound split.
pub trait SampleSource: Send + Sync {
    /// Total capacity of the ring in samples.
    fn capacity(&self) -> usize;

    /// Append one contiguous range (guaranteed not to cross the capacity
    /// boundary) to `out`.
    fn copy_range(&self, range: Range<usize>, out: &mut Vec<f32>);

    /// Read `len` samples starting at logical position `start`, splitting
    /// at the capacity boundary when necessary.
    fn read(&self, start: usize, len: usize) -> Vec<f32> {
        let cap = self.capacity();
        let len = len.min(cap);
        let mut out = Vec::with_capacity(len);
        if len == 0 || cap == 0 {
            return out;
        }
        match read_slice(start % cap, len, cap) {
            SliceSpan::One(r) => self.copy_range(r, &mut out),
            SliceSpan::Two(a, b) => {
                self.copy_range(a, &mut out);
                self.copy_range(b, &mut out);
            }
        }
        out
    }
}

struct RingInner {
    samples: RwLock<Vec<f32>>,
    write_pos: AtomicUsize,
}

/// A fixed-capacity circular sample buffer shared between the capture
/// callback (sole writer) and a recording session (sole reader).
///
/// Writes advance the cursor modulo capacity and overwrite the oldest
/// audio; the buffer never grows. Cheap to clone — all clones view the
/// same storage.
#[derive(Clone)]
pub struct SharedRing {
    inner: Arc<RingInner>,
}

impl SharedRing {
    /// Allocate a ring of `capacity` samples, zero-filled.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RingInner {
                samples: RwLock::new(vec![0.0; capacity.max(1)]),
                write_pos: AtomicUsize::new(0),
            }),
        }
    }

    /// Current write cursor in `[0, capacity)`.
    pub fn write_pos(&self) -> usize {
        self.inner.write_pos.load(Ordering::Acquire)
    }

    /// Write samples at the cursor, wrapping and overwriting the oldest
    /// data. Called from the capture side.
    pub fn push(&self, data: &[f32]) {
        if data.is_empty() {
            return;
        }
        let mut samples = self.inner.samples.write();
        let cap = samples.len();
        let mut pos = self.inner.write_pos.load(Ordering::Acquire);
        for &s in data {
            samples[pos] = s;
            pos = (pos + 1) % cap;
        }
        self.inner.write_pos.store(pos, Ordering::Release);
    }
}

impl SampleSource for SharedRing {
    fn capacity(&self) -> usize {
        self.inner.samples.read().len()
    }

    fn copy_range(&self, range: Range<usize>, out: &mut Vec<f32>) {
        let samples = self.inner.samples.read();
        out.extend_from_slice(&samples[range]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_of_equal_cursors_is_zero() {
        assert_eq!(distance(0, 0, 100), 0);
        assert_eq!(distance(42, 42, 100), 0);
    }

    #[test]
    fn distance_wraps_forward() {
        assert_eq!(distance(10, 30, 100), 20);
        assert_eq!(distance(90, 10, 100), 20);
        assert_eq!(distance(99, 0, 100), 1);
    }

    #[test]
    fn opposite_distances_sum_to_capacity_modulo_capacity() {
        let capacity = 97;
        for a in [0usize, 1, 13, 48, 96] {
            for b in [0usize, 5, 47, 95] {
                let sum = distance(a, b, capacity) + distance(b, a, capacity);
                assert_eq!(sum % capacity, 0, "a={a} b={b}");
            }
        }
    }

    #[test]
    fn buffered_len_before_and_after_wrap() {
        assert_eq!(buffered_len(0, false, 1000), 0);
        assert_eq!(buffered_len(250, false, 1000), 250);
        assert_eq!(buffered_len(250, true, 1000), 1000);
        assert_eq!(buffered_len(0, true, 1000), 1000);
    }

    #[test]
    fn read_slice_splits_at_the_boundary() {
        assert_eq!(read_slice(10, 50, 100), SliceSpan::One(10..60));
        assert_eq!(read_slice(50, 50, 100), SliceSpan::One(50..100));
        assert_eq!(read_slice(80, 50, 100), SliceSpan::Two(80..100, 0..30));
        assert_eq!(read_slice(80, 50, 100).total_len(), 50);
    }

    #[test]
    fn shared_ring_wraps_and_reads_across_the_boundary() {
        let ring = SharedRing::new(8);
        let data: Vec<f32> = (0..10).map(|i| i as f32).collect();
        ring.push(&data);

        // Cursor wrapped: 10 mod 8 = 2.
        assert_eq!(ring.write_pos(), 2);

        // The last 8 samples survive; a read starting at the cursor walks
        // them oldest-first across the boundary.
        let read = ring.read(2, 8);
        assert_eq!(read, vec![2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn shared_ring_read_clamps_to_capacity() {
        let ring = SharedRing::new(4);
        ring.push(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(ring.read(0, 16).len(), 4);
        assert!(ring.read(0, 0).is_empty());
    }
}
