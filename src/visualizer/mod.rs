//! Render thread: fetches sample buffers, decodes them into the frame
//! buffer and presents the result
//!
//! The loop services three concerns on one thread: draining the dispatcher
//! (with a bounded wait so nothing here ever blocks for long), window event
//! polling, and a periodic re-render that keeps the display responsive even
//! when no new data arrives. In synced-rendering mode frames are presented
//! at vertical-sync edges instead of on the timer.

pub mod decoder;
pub mod pacer;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::Result;
use crate::config::VisualizerConfig;
use crate::dispatch::SampleDispatcher;
use crate::display::Surface;
use crate::sample::Sample;
use decoder::{ChannelMasks, RasterState, pixel_value};
use pacer::PlaybackPacer;

/// Lower bound between timer-driven renders (50 fps), and the dispatcher
/// read timeout. Bounding the read keeps event polling alive when the
/// capture side stalls.
const MINIMAL_RENDER_PAUSE: Duration = Duration::from_millis(20);

pub struct Visualizer<S: Surface> {
    dispatcher: Arc<SampleDispatcher>,
    config: VisualizerConfig,
    masks: ChannelMasks,
    state: RasterState,
    frame: Vec<u32>,
    surface: S,
    pacer: PlaybackPacer,
}

impl<S: Surface> Visualizer<S> {
    pub fn new(dispatcher: Arc<SampleDispatcher>, config: VisualizerConfig, surface: S) -> Self {
        let masks = ChannelMasks::from(&config);
        let frame = vec![0; config.width * config.height];
        let pacer = PlaybackPacer::new(config.sample_rate);
        Self {
            dispatcher,
            config,
            masks,
            state: RasterState::default(),
            frame,
            surface,
            pacer,
        }
    }

    /// Main loop. Returns when the user quits or the capture side closes
    /// the channel; the channel is left closed either way so a producer
    /// blocked in `put` wakes up.
    pub fn run(&mut self) -> Result<()> {
        info!("Render loop started");
        loop {
            if let Some(samples) = self.dispatcher.get(MINIMAL_RENDER_PAUSE) {
                self.process(&samples)?;
                self.dispatcher.clear();
            }

            if !self.config.synced_rendering
                && self.pacer.since_last_render() >= MINIMAL_RENDER_PAUSE
            {
                self.render()?;
            } else {
                self.surface.pump()?;
            }

            if self.surface.quit_requested() {
                info!("Quit requested");
                break;
            }
            if self.dispatcher.is_closed() {
                info!("Channel closed by capture side");
                break;
            }
        }
        self.dispatcher.close();
        Ok(())
    }

    /// Decode one sample buffer into the frame buffer. Buffers may start
    /// and end anywhere relative to scanline and frame boundaries; edge
    /// state carries over in `self.state`.
    fn process(&mut self, samples: &[Sample]) -> Result<()> {
        let pixels = self.frame.len();
        for &sample in samples {
            let sync = self.state.sync_state(sample, &self.masks, &self.config);
            if sync.horizontal_triggered {
                self.state.start_of_next_line(self.config.width, pixels);
            }
            if sync.vertical_triggered {
                self.state.start_of_frame();
                if self.config.synced_rendering {
                    // The frame is complete at this point; present it before
                    // the first pixel of the next one lands.
                    self.render()?;
                }
            }
            self.frame[self.state.position] =
                pixel_value(sync, sample, &self.masks, &self.config);
            self.state.advance(sync, pixels);
        }
        self.pacer.add_samples(samples.len());
        debug!(samples = samples.len(), "Processed buffer");
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        self.surface.present(&self.frame)?;
        self.pacer.pause_after_render();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SampleBuffer;

    /// Records every presented frame; never requests quit.
    struct RecordingSurface {
        presented: Vec<Vec<u32>>,
    }

    impl RecordingSurface {
        fn new() -> Self {
            Self {
                presented: Vec::new(),
            }
        }
    }

    impl Surface for RecordingSurface {
        fn present(&mut self, pixels: &[u32]) -> Result<()> {
            self.presented.push(pixels.to_vec());
            Ok(())
        }

        fn pump(&mut self) -> Result<()> {
            Ok(())
        }

        fn quit_requested(&self) -> bool {
            false
        }
    }

    fn visualizer(config: VisualizerConfig) -> Visualizer<RecordingSurface> {
        Visualizer::new(
            Arc::new(SampleDispatcher::new()),
            config,
            RecordingSurface::new(),
        )
    }

    fn small_config() -> VisualizerConfig {
        VisualizerConfig {
            width: 4,
            height: 2,
            ..VisualizerConfig::default()
        }
    }

    const VSYNC: u8 = 0b001;
    const HSYNC: u8 = 0b010;
    const DATA: u8 = 0b100;

    #[test]
    fn test_two_line_frame_matches_hand_computed_pixels() {
        // 4x2 raster fed with a synthetic two-line signal: vsync falling
        // edge at the first sample, hsync pulse mid-way through line 0.
        let mut vis = visualizer(small_config());

        // Arm the vsync edge detector.
        vis.process(&[VSYNC]).unwrap();

        let samples = [
            DATA,  // vsync falls -> position 0, white
            0,     // black at 1
            HSYNC, // hsync pulse (data suppressed) at 2
            DATA,  // hsync falls: position snaps 3 -> 4, white
            0,     // black at 5
            0,     // black at 6
            DATA,  // white at 7
        ];
        vis.process(&samples).unwrap();

        let w = 0xffffffffu32;
        // Position 3 was skipped by the sync edge and keeps its initial
        // (black) contents.
        assert_eq!(
            vis.frame,
            vec![w, 0, 0, 0, w, 0, 0, w],
            "decoded raster differs from hand-computed frame"
        );
    }

    #[test]
    fn test_horizontal_edge_snaps_position_to_line_start() {
        let mut vis = visualizer(small_config());

        // Three pixels into line 0, then an hsync pulse: the first
        // inactive sample after the pulse lands at position 4, not 3.
        vis.process(&[0, 0, HSYNC]).unwrap();
        assert_eq!(vis.state.position, 3);
        vis.process(&[0]).unwrap();
        assert_eq!(vis.state.position, 5, "edge should snap 3 -> 4 before writing");
    }

    #[test]
    fn test_position_resets_once_per_vsync_run() {
        let mut vis = visualizer(small_config());

        // vsync active for three samples, then inactive: exactly one reset.
        vis.process(&[VSYNC, VSYNC, VSYNC]).unwrap();
        let position_before_edge = vis.state.position;
        assert!(position_before_edge > 0);

        vis.process(&[0]).unwrap();
        // Reset to 0, then advanced past the written pixel.
        assert_eq!(vis.state.position, 1);

        // No further vsync edge, position keeps running.
        vis.process(&[0, 0]).unwrap();
        assert_eq!(vis.state.position, 3);
    }

    #[test]
    fn test_synced_rendering_presents_at_vsync_edge() {
        let config = VisualizerConfig {
            synced_rendering: true,
            ..small_config()
        };
        let mut vis = visualizer(config);

        vis.process(&[VSYNC, 0]).unwrap(); // one edge
        vis.process(&[VSYNC, 0]).unwrap(); // second edge
        assert_eq!(vis.surface.presented.len(), 2);
    }

    #[test]
    fn test_empty_buffer_is_a_no_op() {
        let mut vis = visualizer(small_config());
        let empty: SampleBuffer = Arc::from(&[][..]);
        vis.process(&empty).unwrap();
        assert_eq!(vis.state.position, 0);
        assert!(vis.frame.iter().all(|&p| p == 0));
    }

    #[test]
    fn test_edge_state_persists_across_buffers() {
        let mut vis = visualizer(small_config());

        // The vsync-active sample ends one buffer, the falling edge opens
        // the next; the edge must still be detected.
        vis.process(&[0, 0, VSYNC]).unwrap();
        assert_eq!(vis.state.position, 3);
        vis.process(&[0]).unwrap();
        assert_eq!(vis.state.position, 1, "edge across buffer boundary missed");
    }
}
