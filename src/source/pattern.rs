//! Synthetic composite test signal
//!
//! Stands in for live hardware: generates a PAL-timed frame of vsync and
//! hsync pulse trains plus a color-bar pattern on the data channels, then
//! feeds it through the dispatcher forever. Backpressure comes from the
//! single-slot handoff: the generator only advances as fast as the render
//! thread drains it, and the playback pacer on the render side holds the
//! whole pipeline at real time.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::VisualizerConfig;
use crate::dispatch::SampleDispatcher;
use crate::sample::{Sample, channel_mask};
use crate::source::{DataSource, dispatch_packet};
use crate::Result;

/// PAL line frequency: 64 us per scanline.
const LINE_RATE: u64 = 15_625;
/// Lines per (progressive) frame.
const LINES_PER_FRAME: usize = 312;
/// Lines at the top of the frame with vertical sync active.
const VSYNC_LINES: usize = 4;
/// Samples per dispatched packet.
const PACKET_SAMPLES: usize = 16_384;

/// The 8 color bars, brightest to darkest: white, yellow, cyan, green,
/// magenta, red, blue, black.
const BARS: [(bool, bool, bool); 8] = [
    (true, true, true),
    (true, true, false),
    (false, true, true),
    (false, true, false),
    (true, false, true),
    (true, false, false),
    (false, false, true),
    (false, false, false),
];

/// Which channel index carries which signal role.
#[derive(Debug, Clone, Copy)]
pub struct PatternChannels {
    pub vsync: u8,
    pub hsync: u8,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl From<&VisualizerConfig> for PatternChannels {
    fn from(config: &VisualizerConfig) -> Self {
        Self {
            vsync: config.vsync_channel,
            hsync: config.hsync_channel,
            red: config.red_channel,
            green: config.green_channel,
            blue: config.blue_channel,
        }
    }
}

pub struct PatternSource {
    dispatcher: Arc<SampleDispatcher>,
    sample_rate: u64,
    frame: Vec<Sample>,
}

impl PatternSource {
    pub fn new(
        dispatcher: Arc<SampleDispatcher>,
        sample_rate: u64,
        channels: PatternChannels,
    ) -> Self {
        Self {
            dispatcher,
            sample_rate,
            frame: build_frame(sample_rate, &channels),
        }
    }
}

impl DataSource for PatternSource {
    fn sample_rate(&self) -> u64 {
        self.sample_rate
    }

    fn run(&mut self) -> Result<()> {
        info!(
            "Generating synthetic test signal ({} samples per frame)",
            self.frame.len()
        );
        loop {
            for packet in self.frame.chunks(PACKET_SAMPLES) {
                if !dispatch_packet(&self.dispatcher, Arc::from(packet))? {
                    debug!("Channel closed, stopping test signal");
                    return Ok(());
                }
            }
        }
    }
}

/// Build one frame worth of samples at the given rate.
///
/// Each line starts with an hsync pulse (~4.7 us); the first [`VSYNC_LINES`]
/// lines additionally hold vsync active, so its falling edge lands at the
/// start of the first visible line. Color bars fill the visible region.
fn build_frame(sample_rate: u64, channels: &PatternChannels) -> Vec<Sample> {
    let line_samples = ((sample_rate / LINE_RATE) as usize).max(16);
    let hsync_samples = line_samples / 14;
    let visible_from = line_samples / 5;
    let visible = line_samples - visible_from;

    let vsync_mask = channel_mask(channels.vsync);
    let hsync_mask = channel_mask(channels.hsync);

    let mut frame = Vec::with_capacity(LINES_PER_FRAME * line_samples);
    for line in 0..LINES_PER_FRAME {
        for s in 0..line_samples {
            let mut sample: Sample = 0;
            if line < VSYNC_LINES {
                sample |= vsync_mask;
            }
            if s < hsync_samples {
                sample |= hsync_mask;
            }
            if line >= VSYNC_LINES && s >= visible_from {
                let (red, green, blue) = BARS[(s - visible_from) * BARS.len() / visible];
                if red {
                    sample |= channel_mask(channels.red);
                }
                if green {
                    sample |= channel_mask(channels.green);
                }
                if blue {
                    sample |= channel_mask(channels.blue);
                }
            }
            frame.push(sample);
        }
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels() -> PatternChannels {
        PatternChannels {
            vsync: 0,
            hsync: 1,
            red: 2,
            green: 3,
            blue: 4,
        }
    }

    #[test]
    fn test_frame_has_pal_line_count() {
        let frame = build_frame(12_000_000, &channels());
        let line_samples = 12_000_000 / LINE_RATE; // 768
        assert_eq!(frame.len(), LINES_PER_FRAME * line_samples as usize);
    }

    #[test]
    fn test_vsync_covers_exactly_the_leading_lines() {
        let frame = build_frame(1_000_000, &channels());
        let line_samples = (1_000_000 / LINE_RATE) as usize; // 64

        let vsync_mask = channel_mask(0);
        let last_vsync_sample = VSYNC_LINES * line_samples - 1;
        assert_ne!(frame[last_vsync_sample] & vsync_mask, 0);
        // The falling edge: first sample of the first visible line.
        assert_eq!(frame[last_vsync_sample + 1] & vsync_mask, 0);
        assert!(
            frame[last_vsync_sample + 1..]
                .iter()
                .all(|&s| s & vsync_mask == 0)
        );
    }

    #[test]
    fn test_every_line_starts_with_an_hsync_pulse() {
        let frame = build_frame(1_000_000, &channels());
        let line_samples = (1_000_000 / LINE_RATE) as usize;
        let hsync_mask = channel_mask(1);

        for line in 0..LINES_PER_FRAME {
            let start = line * line_samples;
            assert_ne!(frame[start] & hsync_mask, 0, "line {} lacks hsync", line);
            // Pulse ends before the visible region.
            assert_eq!(frame[start + line_samples / 2] & hsync_mask, 0);
        }
    }

    #[test]
    fn test_visible_region_walks_through_all_bars() {
        let frame = build_frame(1_000_000, &channels());
        let line_samples = (1_000_000 / LINE_RATE) as usize;
        let visible_from = line_samples / 5;

        // Sample one full visible line and collect the distinct data states.
        let line = VSYNC_LINES; // first visible line
        let start = line * line_samples + visible_from;
        let data_mask = channel_mask(2) | channel_mask(3) | channel_mask(4);
        let states: std::collections::BTreeSet<u8> = frame[start..(line + 1) * line_samples]
            .iter()
            .map(|&s| s & data_mask)
            .collect();
        assert_eq!(states.len(), BARS.len(), "expected all 8 color bars");
    }

    #[test]
    fn test_low_sample_rates_still_produce_lines() {
        let frame = build_frame(1000, &channels());
        assert_eq!(frame.len(), LINES_PER_FRAME * 16);
    }
}
