use std::time::Duration;

// Output stream parameters
pub const OUTPUT_SAMPLE_RATE: u32 = 48000; // 48 kHz sample rate
pub const BIT_DEPTH: u16 = 16; // 16 bits per sample
pub const CHANNELS: u16 = 2; // Stereo channel

/// Assumed Japanese speaking rate used to estimate live synthesis duration.
pub const CHARS_PER_SECOND: f64 = 8.0;

/// Shortest estimated duration for a live synthesis artifact.
pub const MIN_ESTIMATED_DURATION_SECS: f64 = 2.0;

/// Virtual clock resolution for live synthesis playback.
pub const LIVE_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// How often a buffered source reports its position, like a media element's timeupdate.
pub const BUFFERED_TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Hard limit for the local synthesis fallback path.
pub const LOCAL_SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest text file accepted by the input boundary.
pub const MAX_INPUT_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// Number of generations kept in the recent items list.
pub const MAX_RECENT_ITEMS: usize = 10;

/// Characters kept in a recent item's label before the ellipsis.
pub const RECENT_LABEL_CHARS: usize = 50;
