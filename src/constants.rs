//! Ring cache tuning constants

/// Default block size: one ring block is this many bytes.
pub const BLOCK_SIZE: usize = 1024 * 1024;

/// Default number of blocks in the ring.
pub const BLOCK_COUNT: usize = 10;

/// Reserved free bytes so the producer can always resolve a pending seek
/// without waiting on the consumer to free space.
pub const RW_GAP: usize = 1024;

/// Reserved free bytes beyond `RW_GAP`, consumed only while a seek is
/// pending, that closes the deadlock window described in the design notes.
pub const SEEK_GAP: usize = 1024 * 1024;

/// A seek target this far past the cache window's end is classified long
/// rather than middle.
pub const SEEK_THRESHOLD: u64 = 1024 * 1024;

/// Bytes read from the source per producer loop iteration.
pub const STEP: usize = 32 * 1024;

/// Timeout used by every blocking wait in the ring, so cancellation and
/// shutdown are observed even without a spurious or real wakeup.
pub const COND_POLL_TIME: std::time::Duration = std::time::Duration::from_secs(1);
