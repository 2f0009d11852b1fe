use std::collections::HashMap;

use crate::render::backend::FrameRgba;

/// Pool configuration for retained frame buffers.
#[derive(Debug, Clone, Copy)]
pub struct FramePoolOpts {
    /// Maximum bytes retained across all buckets.
    pub max_pool_bytes: usize,
    /// Maximum number of retained buffers per (w, h) bucket.
    pub max_frames_per_bucket: usize,
}

impl Default for FramePoolOpts {
    fn default() -> Self {
        Self {
            max_pool_bytes: 256 * 1024 * 1024,
            max_frames_per_bucket: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FrameKey {
    w: u32,
    h: u32,
}

impl FrameKey {
    fn byte_len(self) -> usize {
        (self.w as usize)
            .saturating_mul(self.h as usize)
            .saturating_mul(4)
    }
}

/// Allocation counters for a [`FramePool`].
#[derive(Debug, Default, Clone)]
pub struct FramePoolStats {
    /// Buffers currently held by the pool.
    pub retained_frames: usize,
    /// Bytes currently held by the pool.
    pub retained_bytes: usize,
    /// Fresh allocations performed.
    pub alloc_frames: u64,
    /// Bytes freshly allocated.
    pub alloc_bytes: u64,
    /// Buffers dropped on release because a cap was hit.
    pub dropped_on_release: u64,
}

struct Bucket {
    frames: Vec<Vec<u8>>,
}

/// Bounded pooled allocator for frame buffers.
///
/// The compositing driver borrows one buffer per tick and releases it only
/// after the sink confirms consumption, so a buffer is never reused across
/// ticks while still in flight. Borrowed buffers come back zeroed.
pub struct FramePool {
    opts: FramePoolOpts,
    stats: FramePoolStats,
    buckets: HashMap<FrameKey, Bucket>,
}

impl FramePool {
    /// Create a pool with the given caps.
    pub fn new(opts: FramePoolOpts) -> Self {
        Self {
            opts,
            stats: FramePoolStats::default(),
            buckets: HashMap::new(),
        }
    }

    /// Current counters.
    pub fn stats(&self) -> FramePoolStats {
        self.stats.clone()
    }

    /// Take a zeroed `width x height` buffer, reusing a retained one if
    /// available.
    pub fn borrow(&mut self, width: u32, height: u32) -> FrameRgba {
        let key = FrameKey {
            w: width,
            h: height,
        };

        if let Some(bucket) = self.buckets.get_mut(&key)
            && let Some(mut data) = bucket.frames.pop()
        {
            self.stats.retained_frames = self.stats.retained_frames.saturating_sub(1);
            self.stats.retained_bytes = self.stats.retained_bytes.saturating_sub(key.byte_len());
            data.fill(0);
            return FrameRgba {
                width,
                height,
                data,
            };
        }

        self.stats.alloc_frames = self.stats.alloc_frames.saturating_add(1);
        self.stats.alloc_bytes = self.stats.alloc_bytes.saturating_add(key.byte_len() as u64);
        FrameRgba::new(width, height)
    }

    /// Return a consumed buffer to the pool.
    ///
    /// Buffers beyond the byte or bucket caps are dropped instead.
    pub fn release(&mut self, frame: FrameRgba) {
        if self.opts.max_pool_bytes == 0 || self.opts.max_frames_per_bucket == 0 {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        let key = FrameKey {
            w: frame.width,
            h: frame.height,
        };
        let bytes = key.byte_len();
        if frame.data.len() != bytes {
            // Size-lied buffer; never retain it.
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        if self.stats.retained_bytes.saturating_add(bytes) > self.opts.max_pool_bytes {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        let bucket = self
            .buckets
            .entry(key)
            .or_insert_with(|| Bucket { frames: Vec::new() });
        if bucket.frames.len() >= self.opts.max_frames_per_bucket {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        bucket.frames.push(frame.data);
        self.stats.retained_frames = self.stats.retained_frames.saturating_add(1);
        self.stats.retained_bytes = self.stats.retained_bytes.saturating_add(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_reuses_released_buffers_zeroed() {
        let mut p = FramePool::new(FramePoolOpts::default());
        let mut a = p.borrow(8, 8);
        a.fill([7, 7, 7, 255]);
        p.release(a);

        let b = p.borrow(8, 8);
        assert!(b.data.iter().all(|&x| x == 0));

        let st = p.stats();
        assert_eq!(st.alloc_frames, 1);
        assert_eq!(st.retained_frames, 0);
    }

    #[test]
    fn pool_honors_bucket_cap() {
        let mut p = FramePool::new(FramePoolOpts {
            max_pool_bytes: 1 << 30,
            max_frames_per_bucket: 1,
        });
        let a = p.borrow(8, 8);
        let b = p.borrow(8, 8);
        p.release(a);
        p.release(b);

        let st = p.stats();
        assert_eq!(st.retained_frames, 1);
        assert_eq!(st.dropped_on_release, 1);
    }

    #[test]
    fn pool_honors_global_byte_cap() {
        let bytes_8x8 = FrameKey { w: 8, h: 8 }.byte_len();
        let mut p = FramePool::new(FramePoolOpts {
            max_pool_bytes: bytes_8x8,
            max_frames_per_bucket: 8,
        });
        let a = p.borrow(8, 8);
        let b = p.borrow(8, 8);
        p.release(a);
        p.release(b);

        let st = p.stats();
        assert_eq!(st.retained_bytes, bytes_8x8);
        assert_eq!(st.retained_frames, 1);
        assert!(st.dropped_on_release >= 1);
    }

    #[test]
    fn mismatched_sizes_use_separate_buckets() {
        let mut p = FramePool::new(FramePoolOpts::default());
        let a = p.borrow(8, 8);
        p.release(a);
        let _b = p.borrow(16, 16);
        assert_eq!(p.stats().alloc_frames, 2);
        assert_eq!(p.stats().retained_frames, 1);
    }
}
