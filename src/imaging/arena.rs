//! Block-pooling memory arena for image storage.
//!
//! Region reads happen repeatedly against the same slide at similar sizes
//! (tiling a viewport, walking a grid), so every image buffer comes from and
//! returns to a [`MemoryArena`]. Released blocks are cached up to a bound and
//! handed out again LIFO, resized when the requested size differs.
//!
//! A [`Block`] owns its bytes. [`MemoryArena::release`] consumes it, so a
//! block can be returned at most once and cannot be touched afterwards.
//!
//! The arena is not synchronized. Hosts reading regions from several threads
//! keep one arena per thread or wrap a shared one in a `Mutex`.

use tracing::trace;

use crate::error::ArenaError;

/// Default row alignment in bytes.
pub const DEFAULT_ALIGNMENT: usize = 1;

/// Default preferred block size: 16MB.
/// Larger released blocks are shrunk to this size before being cached.
pub const DEFAULT_BLOCK_SIZE: usize = 16 * 1024 * 1024;

/// Default maximum number of cached blocks.
pub const DEFAULT_MAX_CACHED_BLOCKS: usize = 16;

// =============================================================================
// Block
// =============================================================================

/// A contiguous chunk of memory handed out by a [`MemoryArena`].
#[derive(Debug, Default)]
pub struct Block {
    data: Vec<u8>,
}

impl Block {
    /// A block with no storage. Never cached.
    pub fn empty() -> Self {
        Self { data: Vec::new() }
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn allocate(size: usize) -> Result<Self, ArenaError> {
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| ArenaError::AllocationFailure { requested: size })?;
        data.resize(size, 0);
        Ok(Self { data })
    }

    fn resize(&mut self, size: usize) -> Result<(), ArenaError> {
        if size > self.data.len() {
            self.data
                .try_reserve_exact(size - self.data.len())
                .map_err(|_| ArenaError::AllocationFailure { requested: size })?;
            self.data.resize(size, 0);
        } else {
            self.data.truncate(size);
        }
        Ok(())
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Monotonic arena counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArenaStats {
    /// Blocks freshly allocated because the pool was empty
    pub allocated: u64,
    /// Blocks handed out from the pool
    pub reused: u64,
    /// Pooled blocks resized before being handed out
    pub reallocated: u64,
    /// Blocks dropped (pool full, cache cleared, failed resize)
    pub freed: u64,
    /// Images created on top of arena storage
    pub new_images: u64,
}

// =============================================================================
// Configuration
// =============================================================================

/// Arena tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Row alignment in bytes (power of two)
    pub alignment: usize,
    /// Preferred size of a cached block in bytes
    pub block_size: usize,
    /// Maximum number of blocks kept in the pool
    pub max_cached_blocks: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            alignment: DEFAULT_ALIGNMENT,
            block_size: DEFAULT_BLOCK_SIZE,
            max_cached_blocks: DEFAULT_MAX_CACHED_BLOCKS,
        }
    }
}

// =============================================================================
// Memory Arena
// =============================================================================

/// Pool of reusable memory blocks backing image storage.
///
/// # Example
///
/// ```
/// use wsi_region::imaging::MemoryArena;
///
/// let mut arena = MemoryArena::new();
/// let block = arena.acquire(1024, false).unwrap();
/// arena.release(block);
///
/// let block = arena.acquire(1024, false).unwrap();
/// assert!(block.as_slice().iter().all(|&b| b == 0));
/// assert_eq!(arena.stats().reused, 1);
/// ```
#[derive(Debug)]
pub struct MemoryArena {
    alignment: usize,
    block_size: usize,
    max_cached_blocks: usize,
    pool: Vec<Block>,
    stats: ArenaStats,
}

impl MemoryArena {
    /// Create an arena with default settings.
    pub fn new() -> Self {
        Self::with_config(ArenaConfig::default())
    }

    /// Create an arena with the given settings.
    ///
    /// A non power-of-two alignment is rounded up to the next power of two.
    pub fn with_config(config: ArenaConfig) -> Self {
        Self {
            alignment: config.alignment.max(1).next_power_of_two(),
            block_size: config.block_size,
            max_cached_blocks: config.max_cached_blocks,
            pool: Vec::with_capacity(config.max_cached_blocks),
            stats: ArenaStats::default(),
        }
    }

    /// Row alignment in bytes.
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Preferred block size in bytes.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Maximum number of cached blocks.
    pub fn max_cached_blocks(&self) -> usize {
        self.max_cached_blocks
    }

    /// Number of blocks currently sitting in the pool.
    pub fn cached_blocks(&self) -> usize {
        self.pool.len()
    }

    /// Snapshot of the arena counters.
    pub fn stats(&self) -> ArenaStats {
        self.stats
    }

    /// Change the row alignment used for images created from now on.
    pub fn set_alignment(&mut self, alignment: usize) {
        self.alignment = alignment.max(1).next_power_of_two();
    }

    /// Change the preferred size of cached blocks.
    pub fn set_block_size(&mut self, block_size: usize) {
        self.block_size = block_size;
    }

    /// Get a block of exactly `size` bytes.
    ///
    /// Reuses the most recently released block when one is cached, resizing it
    /// if needed. The block is zero-filled unless `dirty` is set. A zero-byte
    /// request returns [`Block::empty`] and leaves the pool and counters alone.
    pub fn acquire(&mut self, size: usize, dirty: bool) -> Result<Block, ArenaError> {
        // Zero-byte requests carry no storage and are not counted.
        if size == 0 {
            return Ok(Block::empty());
        }

        let Some(mut block) = self.pool.pop() else {
            let block = Block::allocate(size)?;
            self.stats.allocated += 1;
            trace!(size, "arena: allocated new block");
            return Ok(block);
        };

        if block.len() != size {
            if let Err(err) = block.resize(size) {
                // The pooled block is dropped along with the failed request.
                self.stats.freed += 1;
                return Err(err);
            }
            self.stats.reallocated += 1;
        }

        if !dirty {
            block.data.fill(0);
        }

        self.stats.reused += 1;
        trace!(size, cached = self.pool.len(), "arena: reused block");
        Ok(block)
    }

    /// Return a block to the arena.
    ///
    /// The block is cached (shrunk to the preferred block size first) when the
    /// pool has room, dropped otherwise.
    pub fn release(&mut self, mut block: Block) {
        if block.data.capacity() == 0 {
            return;
        }

        if self.pool.len() < self.max_cached_blocks {
            if block.len() > self.block_size {
                block.data.truncate(self.block_size);
                block.data.shrink_to_fit();
            }
            self.pool.push(block);
        } else {
            drop(block);
            self.stats.freed += 1;
        }
    }

    /// Drop cached blocks until at most `keep` remain.
    pub fn clear_cache(&mut self, keep: usize) {
        while self.pool.len() > keep {
            self.pool.pop();
            self.stats.freed += 1;
        }
    }

    /// Change the maximum number of cached blocks.
    ///
    /// Evicts blocks beyond the new bound, then resizes the pool storage. If
    /// growing the pool storage fails the previous bound is kept.
    pub fn set_capacity(&mut self, max_blocks: usize) -> Result<(), ArenaError> {
        self.clear_cache(max_blocks);

        if max_blocks > self.pool.capacity() {
            let additional = max_blocks - self.pool.len();
            self.pool
                .try_reserve_exact(additional)
                .map_err(|_| ArenaError::AllocationFailure {
                    requested: max_blocks.saturating_mul(std::mem::size_of::<Block>()),
                })?;
        } else {
            self.pool.shrink_to(max_blocks);
        }

        self.max_cached_blocks = max_blocks;
        Ok(())
    }

    pub(crate) fn record_new_image(&mut self) {
        self.stats.new_images += 1;
    }
}

impl Default for MemoryArena {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
