use qstream_frame::FrameConfig;

/// Consumed bytes tolerated at the front of the buffer before it is compacted.
pub const DEFAULT_COMPACT_THRESHOLD: usize = 64 * 1024;

/// Initial buffer capacity.
pub const DEFAULT_INITIAL_CAPACITY: usize = 8 * 1024;

/// Configuration for a [`StreamAssembler`](crate::StreamAssembler).
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Frame-level limits and checksum policy.
    pub frame: FrameConfig,
    /// Compact once the read cursor passes this many bytes and at least half
    /// the buffer. Default: 64 KiB.
    pub compact_threshold: usize,
    /// Initial buffer capacity. Default: 8 KiB.
    pub initial_capacity: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}

impl AssemblerConfig {
    /// Default configuration with CRC verification enabled.
    pub fn strict() -> Self {
        Self {
            frame: FrameConfig::strict(),
            ..Self::default()
        }
    }
}
