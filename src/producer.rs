//! The background thread that reads ahead of the consumer and resolves
//! pending seeks against the cache window.

use std::sync::Arc;

use tracing::{ debug, warn };

use crate::constants::{ COND_POLL_TIME, SEEK_THRESHOLD, STEP };
use crate::error::CacheError;
use crate::ring::{ Shared, WaitOutcome };
use crate::source::Source;

/// Runs the producer loop until `abort` or `error` is observed on `shared`,
/// or `source` itself fails. The caller joins the thread this runs on.
pub(crate) fn run<S: Source>(shared: Arc<Shared>, mut source: S) {
    let mut step = vec![0u8; STEP];
    loop {
        if cancelled(&shared) {
            break;
        }
        mark_eof_if_reached(&shared, &source);
        if !park_at_eos(&shared) {
            break;
        }
        if !resolve_pending_seek(&shared, &mut source) {
            break;
        }
        if !read_one_step(&shared, &mut source, &mut step) {
            break;
        }
    }
    debug!("producer loop exiting");
}

fn cancelled(shared: &Shared) -> bool {
    let guard = shared.state.lock();
    guard.abort || guard.error
}

fn mark_eof_if_reached<S: Source>(shared: &Shared, source: &S) {
    if source.position() >= source.len() {
        shared.state.lock().buffered_eos = true;
    }
}

/// Parks while `buffered_eos` holds and no seek is pending. Returns `false`
/// if the loop should exit; otherwise a pending seek (if any) is left for
/// `resolve_pending_seek`, with `buffered_eos` cleared on the way out.
fn park_at_eos(shared: &Shared) -> bool {
    let mut guard = shared.state.lock();
    loop {
        if guard.abort || guard.error {
            return false;
        }
        if !guard.buffered_eos || guard.seek.seek_pending {
            if guard.seek.seek_pending {
                guard.buffered_eos = false;
            }
            return true;
        }
        shared.producer_wakeup.wait_for(&mut guard, COND_POLL_TIME);
    }
}

/// Classifies and resolves a pending seek, if any, against the cache
/// window. Returns `false` only when the long-seek path fails to reposition
/// the source, which is a terminal error.
fn resolve_pending_seek<S: Source>(shared: &Shared, source: &mut S) -> bool {
    let (seek_pos, cache_offset, cache_size) = {
        let guard = shared.state.lock();
        if !guard.seek.seek_pending {
            return true;
        }
        (guard.seek.seek_pos, guard.cache_offset, guard.cache_size)
    };

    if seek_pos >= cache_offset && seek_pos < cache_offset + cache_size {
        let mut guard = shared.state.lock();
        let capacity = guard.capacity();
        guard.read_index = (guard.cache_index + (seek_pos - guard.cache_offset)) % capacity;
        guard.buffer_size = (guard.write_index + capacity - guard.read_index) % capacity;
        guard.stream_offset = seek_pos;
        guard.seek.seek_pending = false;
        drop(guard);
        shared.consumer_wakeup.notify_all();
        debug!(seek_pos, "seek resolved as short");
        true
    } else if seek_pos < cache_offset || seek_pos >= cache_offset + cache_size + SEEK_THRESHOLD {
        if let Err(err) = source.seek(seek_pos) {
            warn!(%err, "source seek failed, entering error state");
            let mut guard = shared.state.lock();
            guard.error = true;
            guard.last_error = Some(Arc::new(CacheError::SourceSeek(err)));
            drop(guard);
            shared.consumer_wakeup.notify_all();
            return false;
        }
        let mut guard = shared.state.lock();
        let capacity = guard.capacity();
        guard.read_index = seek_pos % capacity;
        guard.write_index = seek_pos % capacity;
        guard.buffer_size = 0;
        guard.cache_index = 0;
        guard.cache_size = 0;
        guard.cache_offset = seek_pos;
        guard.stream_offset = seek_pos;
        guard.seek.seek_pending = false;
        drop(guard);
        shared.consumer_wakeup.notify_all();
        debug!(seek_pos, "seek resolved as long");
        true
    } else {
        let mut guard = shared.state.lock();
        guard.read_index = guard.write_index;
        guard.buffer_size = 0;
        drop(guard);
        debug!(seek_pos, "seek resolved as middle, continuing");
        true
    }
}

/// Reads up to `buf.len()` bytes from `source` and writes them into the
/// ring. A short read marks `buffered_eos` for the next iteration; a
/// failed read is terminal.
fn read_one_step<S: Source>(shared: &Shared, source: &mut S, buf: &mut [u8]) -> bool {
    match source.read(buf) {
        Ok(n) => {
            if n < buf.len() {
                shared.state.lock().buffered_eos = true;
            }
            if n == 0 {
                return true;
            }
            shared.write_to_ring(&buf[..n]) != WaitOutcome::Interrupted
        }
        Err(err) => {
            warn!(%err, "source read failed, entering error state");
            let mut guard = shared.state.lock();
            guard.error = true;
            guard.last_error = Some(Arc::new(CacheError::SourceRead(err)));
            drop(guard);
            shared.consumer_wakeup.notify_all();
            false
        }
    }
}
