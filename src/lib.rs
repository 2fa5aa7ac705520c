//! ringcache - bounded in-memory ring buffer cache for seekable byte streams
//!
//! Wraps any [`Source`] in a fixed-size circular buffer serviced by a
//! background producer thread that reads ahead of the consumer. Sequential
//! reads, non-advancing peeks, and repositioning are all served from memory
//! whenever the target falls inside the cache window; only a seek that
//! lands well outside it costs a real reseek of the underlying stream.

pub mod config;
pub mod constants;
pub mod error;
mod producer;
pub(crate) mod ring;
pub mod source;

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

pub use config::Config;
pub use error::{ CacheError, Result };
pub use source::{ SeekableSource, Source };

use ring::Shared;

/// A source's producer-backed ring cache.
///
/// The wrapped [`Source`] is moved onto the producer thread at
/// [`RingCache::open`] and is not reachable from the handle afterwards;
/// all consumer-facing operations go through the shared ring state, which
/// is why `read`, `set_position`, and `close` only need `&self`: a second
/// caller closing the cache while another is blocked in `read` is exactly
/// the shutdown path this is meant to support, not a data race (the ring's
/// own mutex serializes every access).
pub struct RingCache {
    shared: Arc<Shared>,
    producer: Mutex<Option<thread::JoinHandle<()>>>,
    scratch: Mutex<Vec<u8>>,
    can_seek: bool,
    size: u64,
}

impl RingCache {
    /// Opens `source` behind a ring cache sized by `config`, spawning the
    /// producer thread.
    ///
    /// Fails with [`CacheError::Disabled`] if `config.enabled` is false,
    /// [`CacheError::UnknownSize`] if `source.len()` is zero, or
    /// [`CacheError::Spawn`] if the producer thread cannot be started.
    pub fn open<S: Source + 'static>(source: S, config: Config) -> Result<Self> {
        if !config.enabled {
            return Err(CacheError::Disabled);
        }
        if source.len() == 0 {
            return Err(CacheError::UnknownSize);
        }

        let can_seek = source.can_seek();
        let size = source.len();
        let stream_offset = source.position();
        let shared = Arc::new(Shared::new(config.block_size, config.block_count, stream_offset));

        let thread_shared = Arc::clone(&shared);
        let producer = thread::Builder
            ::new()
            .name("ringcache-producer".to_string())
            .spawn(move || producer::run(thread_shared, source))
            .map_err(CacheError::Spawn)?;

        Ok(Self {
            shared,
            producer: Mutex::new(Some(producer)),
            scratch: Mutex::new(Vec::new()),
            can_seek,
            size,
        })
    }

    /// Reads up to `dst.len()` bytes, returning the number actually copied
    /// (`< dst.len()` once the cache has drained at end-of-stream), or
    /// `None` if interrupted by [`RingCache::close`] or a source failure.
    pub fn read(&self, dst: &mut [u8]) -> Option<usize> {
        self.shared.read_from_ring(dst)
    }

    /// Returns up to `n` bytes starting at the current position without
    /// advancing it. `n == 0` returns an empty slice immediately. The
    /// returned copy is independent of any later call into this cache.
    pub fn peek(&self, n: usize) -> Option<Vec<u8>> {
        if n == 0 {
            return Some(Vec::new());
        }
        let mut scratch = self.scratch.lock();
        if scratch.len() < n {
            scratch.resize(n, 0);
        }
        let copied = self.shared.peek_from_ring(&mut scratch[..n])?;
        Some(scratch[..copied].to_vec())
    }

    /// Always `false`: this cache never advertises fast-seek downstream.
    pub fn can_fastseek(&self) -> bool {
        false
    }

    /// The source's seekability, captured at [`RingCache::open`].
    pub fn can_seek(&self) -> bool {
        self.can_seek
    }

    /// The current absolute stream position: the pending seek target while
    /// a seek hasn't been resolved yet, else `stream_offset`.
    pub fn position(&self) -> u64 {
        let guard = self.shared.state.lock();
        if guard.seek.seek_pending { guard.seek.seek_pos } else { guard.stream_offset }
    }

    /// Posts a seek request and returns without blocking on its
    /// resolution. A second call before the producer resolves the first
    /// overwrites the pending target. Requires [`RingCache::can_seek`].
    pub fn set_position(&self, pos: u64) -> Result<()> {
        if !self.can_seek {
            return Err(CacheError::NotSeekable);
        }
        {
            let mut guard = self.shared.state.lock();
            guard.seek.seek_pos = pos;
            guard.seek.seek_pending = true;
        }
        self.shared.producer_wakeup.notify_all();
        Ok(())
    }

    /// The source size captured at [`RingCache::open`].
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The highest offset reachable without blocking:
    /// `stream_offset + buffer_size`.
    pub fn cached_size(&self) -> u64 {
        let guard = self.shared.state.lock();
        guard.stream_offset + guard.buffer_size
    }

    /// The source failure that put this cache into its terminal error
    /// state, if any. `None` while the cache is healthy, and also `None`
    /// when shutdown came from [`RingCache::close`] rather than a source
    /// read or seek failure: the interrupted sentinel alone doesn't
    /// distinguish the two, so callers that care should check this after
    /// a `read`/`peek` returns `None`.
    pub fn last_error(&self) -> Option<Arc<CacheError>> {
        self.shared.state.lock().last_error.clone()
    }

    /// Signals shutdown, wakes both condition variables so any call blocked
    /// in `read`/`peek` returns `None` promptly, and joins the producer
    /// thread. Idempotent: a second call is a no-op. Called automatically
    /// on drop, but exposed directly so a caller holding an `Arc<RingCache>`
    /// from another thread can unblock a concurrent blocked read.
    pub fn close(&self) {
        {
            let mut guard = self.shared.state.lock();
            guard.abort = true;
        }
        self.shared.consumer_wakeup.notify_all();
        self.shared.producer_wakeup.notify_all();
        let handle = self.producer.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl Drop for RingCache {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn source(len: usize) -> SeekableSource<Cursor<Vec<u8>>> {
        let data: Vec<u8> = (0..len).map(|i| (i % 256) as u8).collect();
        SeekableSource::new(Cursor::new(data)).unwrap()
    }

    #[test]
    fn open_rejects_a_disabled_config() {
        let err = RingCache::open(source(4096), Config::new().with_enabled(false)).unwrap_err();
        assert!(matches!(err, CacheError::Disabled));
    }

    #[test]
    fn open_rejects_an_empty_source() {
        let err = RingCache::open(source(0), Config::new()).unwrap_err();
        assert!(matches!(err, CacheError::UnknownSize));
    }

    #[test]
    fn sequential_reads_match_source_content() {
        let config = Config::new().with_block_layout(65536, 32).unwrap();
        let cache = RingCache::open(source(8192), config).unwrap();

        let mut out = vec![0u8; 4096];
        let n = cache.read(&mut out).unwrap();
        assert_eq!(n, 4096);
        let expected: Vec<u8> = (0..4096u32).map(|i| (i % 256) as u8).collect();
        assert_eq!(out, expected);
        assert_eq!(cache.position(), 4096);
    }

    #[test]
    fn set_position_is_rejected_for_a_non_seekable_source() {
        struct NeverSeeks(Cursor<Vec<u8>>);
        impl Source for NeverSeeks {
            fn len(&self) -> u64 {
                self.0.get_ref().len() as u64
            }
            fn can_seek(&self) -> bool {
                false
            }
            fn position(&self) -> u64 {
                self.0.position()
            }
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                std::io::Read::read(&mut self.0, buf)
            }
            fn seek(&mut self, offset: u64) -> std::io::Result<()> {
                std::io::Seek::seek(&mut self.0, std::io::SeekFrom::Start(offset)).map(|_| ())
            }
        }

        let data = vec![0u8; 4096];
        let config = Config::new().with_block_layout(65536, 32).unwrap();
        let cache = RingCache::open(NeverSeeks(Cursor::new(data)), config).unwrap();
        assert!(!cache.can_seek());
        assert!(matches!(cache.set_position(0), Err(CacheError::NotSeekable)));
    }

    #[test]
    fn peek_does_not_advance_position() {
        let config = Config::new().with_block_layout(65536, 32).unwrap();
        let cache = RingCache::open(source(8192), config).unwrap();

        let peeked = cache.peek(16).unwrap();
        assert_eq!(peeked, (0..16u32).map(|i| (i % 256) as u8).collect::<Vec<_>>());
        assert_eq!(cache.position(), 0);

        let mut out = vec![0u8; 16];
        cache.read(&mut out).unwrap();
        assert_eq!(out, peeked);
    }

    #[test]
    fn close_unblocks_a_pending_read_from_another_thread() {
        struct NeverEnds;
        impl Source for NeverEnds {
            fn len(&self) -> u64 {
                1024 * 1024 * 1024
            }
            fn can_seek(&self) -> bool {
                false
            }
            fn position(&self) -> u64 {
                0
            }
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                // Never reports real data, but returns quickly each call so
                // the producer loop revisits its cancellation check often
                // instead of blocking inside a single uninterruptible call.
                std::thread::sleep(std::time::Duration::from_millis(20));
                Ok(0)
            }
            fn seek(&mut self, _offset: u64) -> std::io::Result<()> {
                Ok(())
            }
        }

        let config = Config::new().with_block_layout(65536, 32).unwrap();
        let cache = std::sync::Arc::new(RingCache::open(NeverEnds, config).unwrap());

        let reader = std::thread::spawn({
            let cache = std::sync::Arc::clone(&cache);
            move || {
                let mut buf = vec![0u8; 16];
                cache.read(&mut buf)
            }
        });

        std::thread::sleep(std::time::Duration::from_millis(50));
        cache.close();

        let result = reader.join().expect("reader thread must not panic");
        assert_eq!(result, None);
    }

    #[test]
    fn a_source_read_failure_is_surfaced_through_last_error() {
        struct AlwaysFails;
        impl Source for AlwaysFails {
            fn len(&self) -> u64 {
                1024 * 1024
            }
            fn can_seek(&self) -> bool {
                false
            }
            fn position(&self) -> u64 {
                0
            }
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::from(std::io::ErrorKind::Other))
            }
            fn seek(&mut self, _offset: u64) -> std::io::Result<()> {
                Ok(())
            }
        }

        let config = Config::new().with_block_layout(65536, 32).unwrap();
        let cache = RingCache::open(AlwaysFails, config).unwrap();

        let mut out = vec![0u8; 16];
        assert_eq!(cache.read(&mut out), None);
        assert!(matches!(cache.last_error().as_deref(), Some(CacheError::SourceRead(_))));
    }
}
