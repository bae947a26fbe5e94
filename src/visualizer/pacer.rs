//! Real-time pacing for recorded-session playback
//!
//! A file replay delivers buffers far faster than real time. After each
//! render the pacer sleeps long enough that output cadence approximates the
//! original capture's sample rate. Because the producer is blocked in the
//! dispatcher until the next `clear`, this sleep also throttles capture.

use std::thread;
use std::time::{Duration, Instant};

/// Sleep duration so that rendering `samples` samples takes as long as they
/// took to capture at `sample_rate` Hz. A rate of 0 disables pacing (live
/// hardware already arrives at real time).
fn render_delay(samples: u64, sample_rate: u64, elapsed: Duration) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    let expected_ns = samples as u128 * 1_000_000_000 / sample_rate as u128;
    Duration::from_nanos(expected_ns as u64).saturating_sub(elapsed)
}

pub struct PlaybackPacer {
    sample_rate: u64,
    samples_since_render: u64,
    last_rendered_at: Instant,
}

impl PlaybackPacer {
    pub fn new(sample_rate: u64) -> Self {
        Self {
            sample_rate,
            samples_since_render: 0,
            last_rendered_at: Instant::now(),
        }
    }

    /// Account for samples consumed since the last render.
    pub fn add_samples(&mut self, count: usize) {
        self.samples_since_render += count as u64;
    }

    /// Time since the last render, for the minimum-cadence refresh check.
    pub fn since_last_render(&self) -> Duration {
        self.last_rendered_at.elapsed()
    }

    /// To be called after every render. Sleeps off the difference between
    /// real-time capture duration and actual processing time, then resets
    /// the counter and timestamp (even when there was nothing to sleep off,
    /// as with a periodic refresh render of an unchanged frame).
    pub fn pause_after_render(&mut self) {
        let delay = render_delay(
            self.samples_since_render,
            self.sample_rate,
            self.last_rendered_at.elapsed(),
        );
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        self.samples_since_render = 0;
        self.last_rendered_at = Instant::now();
    }
}
