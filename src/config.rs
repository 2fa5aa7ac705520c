//! Configuration for the ring cache filter

use crate::constants::{ BLOCK_COUNT, BLOCK_SIZE };
use crate::error::{ CacheError, Result };

/// Identity name advertised for explicit selection of this filter by a host
/// application, mirroring the "shortcut name" named in the external
/// interfaces section of the design.
pub const SHORTCUT_NAME: &str = "ringcache";

/// Configuration for a [`crate::RingCache`].
///
/// The only behavior-affecting flag a host sets is `enabled`; the block
/// layout knobs exist so tests can exercise wrap-around and cache-slide
/// logic without allocating the 10 MiB default capacity.
#[derive(Debug, Clone)]
pub struct Config {
    /// When `false`, `RingCache::open` fails with [`CacheError::Disabled`]
    /// and the filter is bypassed entirely.
    pub enabled: bool,
    /// Size in bytes of one ring block.
    pub block_size: usize,
    /// Number of ring blocks. Total capacity is `block_size * block_count`.
    pub block_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            block_size: BLOCK_SIZE,
            block_count: BLOCK_COUNT,
        }
    }
}

impl Config {
    /// Create a new configuration with the library's default block layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the filter.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Override the block size and count, validating the gap invariant
    /// (`RW_GAP + SEEK_GAP < capacity`) that the producer's seek resolution
    /// depends on for deadlock freedom.
    pub fn with_block_layout(mut self, block_size: usize, block_count: usize) -> Result<Self> {
        let capacity = block_size.saturating_mul(block_count);
        if block_size == 0 || block_count == 0 {
            return Err(CacheError::config("block_size and block_count must both be non-zero"));
        }
        if capacity <= crate::constants::RW_GAP + crate::constants::SEEK_GAP {
            return Err(CacheError::config("block_size * block_count must exceed RW_GAP + SEEK_GAP"));
        }
        self.block_size = block_size;
        self.block_count = block_count;
        Ok(self)
    }

    /// Total ring capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.block_size * self.block_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_enabled_with_ten_megabytes() {
        let config = Config::default();
        assert!(config.enabled);
        assert_eq!(config.capacity(), 10 * 1024 * 1024);
    }

    #[test]
    fn disabling_is_explicit() {
        let config = Config::new().with_enabled(false);
        assert!(!config.enabled);
    }

    #[test]
    fn block_layout_rejects_capacity_too_small_for_the_gaps() {
        assert!(Config::new().with_block_layout(64, 4).is_err());
    }

    #[test]
    fn block_layout_accepts_a_small_but_valid_capacity() {
        // 2 MiB, comfortably above RW_GAP + SEEK_GAP (~1.001 MiB) but far
        // below the 10 MiB default, so tests stay cheap to allocate.
        let config = Config::new().with_block_layout(65536, 32).unwrap();
        assert_eq!(config.capacity(), 65536 * 32);
    }
}
