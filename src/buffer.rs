//! Decoded audio held in memory with a movable read position.
//!
//! A buffered source pushes its whole decoded clip here once; the output
//! pump pulls from the read position and seeking just moves it.

use crate::sources::Sample;

#[derive(Default)]
pub struct PlaybackBuffer {
    position: usize,
    buffer: Vec<Sample>,
    sample_rate: u32,
}

impl PlaybackBuffer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Default::default()
        }
    }

    pub fn clear(&mut self) {
        self.position = 0;
        self.buffer.clear();
    }

    pub fn push_samples<I: IntoIterator<Item = Sample>>(&mut self, samples: I) {
        self.buffer.extend(samples);
    }

    /// Read up to `count` samples, fewer when the end of the clip is reached.
    pub fn pull_samples(&mut self, count: usize) -> Vec<Sample> {
        let available = self.buffer.len().saturating_sub(self.position);
        let to_read = count.min(available);

        let samples = self.buffer[self.position..self.position + to_read].to_vec();
        self.position += to_read;

        samples
    }

    /// Moves the read position, clamped to the clip.
    pub fn seek_secs(&mut self, secs: f64) {
        let target = (secs.max(0.0) * self.sample_rate as f64) as usize;
        self.position = target.min(self.buffer.len());
    }

    pub fn rewind(&mut self) {
        self.position = 0;
    }

    pub fn position_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.position as f64 / self.sample_rate as f64
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.buffer.len() as f64 / self.sample_rate as f64
    }

    /// Check if buffer has audio data left to play
    pub fn has_data(&self) -> bool {
        self.position < self.buffer.len()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
