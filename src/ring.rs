//! The shared ring state: storage, indices, and the `_l` ("lock held")
//! primitives both the producer loop and the consumer API call under the
//! mutex.

use parking_lot::{ Condvar, Mutex };
use std::sync::Arc;

use crate::constants::{ COND_POLL_TIME, RW_GAP, SEEK_GAP };
use crate::error::CacheError;

fn default_gaps() -> (u64, u64) {
    (RW_GAP as u64, SEEK_GAP as u64)
}

/// Outcome of a blocking wait.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum WaitOutcome {
    /// The predicate the caller was waiting for now holds.
    Ready,
    /// `abort` or `error` was observed; the caller should treat this as the
    /// interrupted sentinel.
    Interrupted,
}

/// A pending seek request. At most one is outstanding; a newer request
/// overwrites an older unacknowledged one.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SeekRequest {
    pub(crate) seek_pos: u64,
    pub(crate) seek_pending: bool,
}

/// Everything the producer and consumer share, protected by one mutex.
///
/// Ring storage is `block_count` separately allocated equal-size blocks, so
/// `block = pos / block_size`, `offset = pos % block_size` addresses byte
/// `pos` without one large contiguous allocation.
pub(crate) struct RingState {
    blocks: Vec<Box<[u8]>>,
    block_size: usize,
    capacity: u64,
    /// Reserved free bytes the producer always keeps available, so it can
    /// resolve a pending seek without waiting on the consumer. Defaults to
    /// [`RW_GAP`]/[`SEEK_GAP`]; only shrunk in tests that need a small
    /// capacity to exercise wrap-around and cache-slide logic.
    rw_gap: u64,
    seek_gap: u64,

    pub(crate) read_index: u64,
    pub(crate) write_index: u64,
    pub(crate) buffer_size: u64,

    pub(crate) cache_index: u64,
    pub(crate) cache_size: u64,
    pub(crate) cache_offset: u64,

    pub(crate) stream_offset: u64,

    pub(crate) seek: SeekRequest,

    pub(crate) abort: bool,
    pub(crate) error: bool,
    pub(crate) buffered_eos: bool,

    /// The source failure that set `error`, if any. `None` while the cache
    /// is healthy, and also `None` when `error` is still false or when
    /// shutdown came from `abort` instead of a source failure.
    pub(crate) last_error: Option<Arc<CacheError>>,
}

/// The mutex-guarded state plus the two condition variables, shared between
/// the producer thread and every consumer call via `Arc<Shared>`.
pub(crate) struct Shared {
    pub(crate) state: Mutex<RingState>,
    /// Signaled by the producer after it adds bytes or completes a seek;
    /// waited on by `wait_for_read`.
    pub(crate) consumer_wakeup: Condvar,
    /// Signaled by the consumer after it frees bytes or posts a seek;
    /// waited on by `wait_for_write` and the EOS park.
    pub(crate) producer_wakeup: Condvar,
}

impl RingState {
    pub(crate) fn new(block_size: usize, block_count: usize, stream_offset: u64) -> Self {
        let (rw_gap, seek_gap) = default_gaps();
        Self::with_gaps(block_size, block_count, stream_offset, rw_gap, seek_gap)
    }

    /// As [`RingState::new`], but with explicit gap sizes. Exists so tests
    /// can shrink `RW_GAP`/`SEEK_GAP` alongside a small capacity; production
    /// callers always go through `new`.
    pub(crate) fn with_gaps(block_size: usize, block_count: usize, stream_offset: u64, rw_gap: u64, seek_gap: u64) -> Self {
        let blocks = (0..block_count).map(|_| vec![0u8; block_size].into_boxed_slice()).collect();
        Self {
            blocks,
            block_size,
            capacity: (block_size * block_count) as u64,
            rw_gap,
            seek_gap,
            read_index: stream_offset % ((block_size * block_count) as u64),
            write_index: stream_offset % ((block_size * block_count) as u64),
            buffer_size: 0,
            cache_index: 0,
            cache_size: 0,
            cache_offset: stream_offset,
            stream_offset,
            seek: SeekRequest::default(),
            abort: false,
            error: false,
            buffered_eos: false,
            last_error: None,
        }
    }

    pub(crate) fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Copy `n` bytes starting at ring position `pos`, wrapping at block
    /// boundaries, into `dst[..n]`.
    fn copy_from_ring(&self, pos: u64, dst: &mut [u8]) {
        let mut pos = pos;
        let mut written = 0usize;
        let n = dst.len();
        while written < n {
            let block_idx = (pos / self.block_size as u64) as usize;
            let offset = (pos % self.block_size as u64) as usize;
            let block = &self.blocks[block_idx];
            let take = (self.block_size - offset).min(n - written);
            dst[written..written + take].copy_from_slice(&block[offset..offset + take]);
            written += take;
            pos = (pos + take as u64) % self.capacity;
        }
    }

    /// Copy `src` into the ring starting at position `pos`, wrapping at
    /// block boundaries.
    fn copy_into_ring(&mut self, pos: u64, src: &[u8]) {
        let mut pos = pos;
        let mut read = 0usize;
        let n = src.len();
        while read < n {
            let block_idx = (pos / self.block_size as u64) as usize;
            let offset = (pos % self.block_size as u64) as usize;
            let block = &mut self.blocks[block_idx];
            let take = (self.block_size - offset).min(n - read);
            block[offset..offset + take].copy_from_slice(&src[read..read + take]);
            read += take;
            pos = (pos + take as u64) % self.capacity;
        }
    }
}

impl Shared {
    pub(crate) fn new(block_size: usize, block_count: usize, stream_offset: u64) -> Self {
        Self {
            state: Mutex::new(RingState::new(block_size, block_count, stream_offset)),
            consumer_wakeup: Condvar::new(),
            producer_wakeup: Condvar::new(),
        }
    }

    /// As [`Shared::new`], but with explicit gap sizes. Exists so this
    /// module's own `#[cfg(test)]` tests can exercise wrap-around and
    /// cache-slide arithmetic at a small capacity; production callers always
    /// go through `new`.
    pub(crate) fn with_gaps(block_size: usize, block_count: usize, stream_offset: u64, rw_gap: u64, seek_gap: u64) -> Self {
        Self {
            state: Mutex::new(RingState::with_gaps(block_size, block_count, stream_offset, rw_gap, seek_gap)),
            consumer_wakeup: Condvar::new(),
            producer_wakeup: Condvar::new(),
        }
    }

    /// Block until `buffer_size >= n`, `buffered_eos`, `abort`, or `error`
    /// holds, ignoring the wait entirely while a seek is pending (a seek
    /// invalidates the live window and takes priority). Periodically nudges
    /// the producer in case it is itself parked waiting for free space.
    pub(crate) fn wait_for_read(&self, n: u64) -> WaitOutcome {
        let mut guard = self.state.lock();
        loop {
            if guard.abort || guard.error {
                return WaitOutcome::Interrupted;
            }
            if guard.seek.seek_pending {
                // A seek is in flight; the live window is about to change
                // out from under us. Keep waiting for the producer to
                // resolve it rather than racing on a stale buffer_size.
                self.producer_wakeup.notify_all();
                self.consumer_wakeup.wait_for(&mut guard, COND_POLL_TIME);
                continue;
            }
            if guard.buffer_size >= n || guard.buffered_eos {
                return WaitOutcome::Ready;
            }
            self.producer_wakeup.notify_all();
            self.consumer_wakeup.wait_for(&mut guard, COND_POLL_TIME);
        }
    }

    /// Copy up to `min(n, buffer_size)` bytes from `read_index` into `dst`
    /// without advancing `read_index`. Returns the number of bytes copied,
    /// or `None` if interrupted.
    pub(crate) fn peek_from_ring(&self, dst: &mut [u8]) -> Option<usize> {
        let n = dst.len() as u64;
        if self.wait_for_read(n) == WaitOutcome::Interrupted {
            return None;
        }
        let guard = self.state.lock();
        let available = guard.buffer_size.min(n) as usize;
        guard.copy_from_ring(guard.read_index, &mut dst[..available]);
        Some(available)
    }

    /// `peek_from_ring` followed by advancing `read_index`/`stream_offset`
    /// and decrementing `buffer_size` by the bytes copied; then wakes the
    /// producer since free space may have increased.
    pub(crate) fn read_from_ring(&self, dst: &mut [u8]) -> Option<usize> {
        let n = dst.len() as u64;
        if self.wait_for_read(n) == WaitOutcome::Interrupted {
            return None;
        }
        let mut guard = self.state.lock();
        let available = guard.buffer_size.min(n) as usize;
        let read_index = guard.read_index;
        guard.copy_from_ring(read_index, &mut dst[..available]);
        guard.read_index = (guard.read_index + available as u64) % guard.capacity;
        guard.buffer_size -= available as u64;
        guard.stream_offset += available as u64;
        drop(guard);
        self.producer_wakeup.notify_all();
        Some(available)
    }

    /// Block until there is room for `n` more bytes: normally that means
    /// `buffer_size + n <= capacity - RW_GAP - SEEK_GAP`, but while a seek
    /// is pending the producer may consume into the seek-gap
    /// (`buffer_size + n <= capacity - RW_GAP`) so it can always make
    /// progress resolving the seek without deadlocking against a consumer
    /// that is waiting behind that very seek.
    pub(crate) fn wait_for_write(&self, n: u64) -> WaitOutcome {
        let mut guard = self.state.lock();
        loop {
            if guard.abort || guard.error {
                return WaitOutcome::Interrupted;
            }
            let capacity = guard.capacity();
            let normal_limit = capacity - guard.rw_gap - guard.seek_gap;
            let seek_limit = capacity - guard.rw_gap;
            let fits = if guard.seek.seek_pending {
                guard.buffer_size + n <= seek_limit
            } else {
                guard.buffer_size + n <= normal_limit
            };
            if fits {
                return WaitOutcome::Ready;
            }
            self.consumer_wakeup.notify_all();
            self.producer_wakeup.wait_for(&mut guard, COND_POLL_TIME);
        }
    }

    /// `wait_for_write` then copy `src` into the ring at `write_index`,
    /// advance `write_index`/`buffer_size`, and slide the cache window
    /// forward, evicting the oldest bytes if it grew past capacity.
    pub(crate) fn write_to_ring(&self, src: &[u8]) -> WaitOutcome {
        let n = src.len() as u64;
        if n == 0 {
            return WaitOutcome::Ready;
        }
        if self.wait_for_write(n) == WaitOutcome::Interrupted {
            return WaitOutcome::Interrupted;
        }
        let mut guard = self.state.lock();
        let write_index = guard.write_index;
        guard.copy_into_ring(write_index, src);
        guard.write_index = (guard.write_index + n) % guard.capacity();
        guard.buffer_size += n;

        guard.cache_size += n;
        let capacity = guard.capacity();
        // Evict back down to `capacity - rw_gap - seek_gap`, not just to
        // `capacity`: this deliberately evicts more than the strict
        // overflow so a cushion stays available for the next write, which
        // is why `cache_size` can drop substantially below `capacity` right
        // after a slide.
        let cushion_floor = capacity - guard.rw_gap - guard.seek_gap;
        if guard.cache_size > capacity {
            let diff = guard.cache_size - cushion_floor;
            guard.cache_index = (guard.cache_index + diff) % capacity;
            guard.cache_offset += diff;
            guard.cache_size -= diff;
        }

        let seek_pending = guard.seek.seek_pending;
        drop(guard);
        if !seek_pending {
            self.consumer_wakeup.notify_all();
        }
        WaitOutcome::Ready
    }
}
