//! Per-sample signal decoding
//!
//! Maps one sample byte plus the configuration to sync-edge flags and a
//! pixel color. The only state carried between samples is the raster
//! position and the previous sync levels, which live in [`RasterState`] and
//! are owned exclusively by the render thread.
//!
//! Pixels are composed in RGBA8888 layout. Lines are detected by sync
//! edges, not by pixel counting, so drift between expected and actual line
//! length self-corrects at the next horizontal edge.

use crate::config::VisualizerConfig;
use crate::sample::{Sample, channel_mask};

/// Overlay color for an active vertical sync (dim red).
const VSYNC_HIGHLIGHT: u32 = 0x3f0000ff;
/// Overlay color for an active horizontal sync (dim blue).
const HSYNC_HIGHLIGHT: u32 = 0x00003fff;
const RED_ON: u32 = 0xff0000ff;
const GREEN_ON: u32 = 0x00ff00ff;
const BLUE_ON: u32 = 0x0000ffff;

/// Channel bit masks, precomputed from the configured channel indices.
#[derive(Debug, Clone, Copy)]
pub struct ChannelMasks {
    pub vsync: Sample,
    pub hsync: Sample,
    pub red: Sample,
    pub green: Sample,
    pub blue: Sample,
}

impl From<&VisualizerConfig> for ChannelMasks {
    fn from(config: &VisualizerConfig) -> Self {
        Self {
            vsync: channel_mask(config.vsync_channel),
            hsync: channel_mask(config.hsync_channel),
            red: channel_mask(config.red_channel),
            green: channel_mask(config.green_channel),
            blue: channel_mask(config.blue_channel),
        }
    }
}

/// Sync levels and edge flags derived from one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncState {
    pub vsync_active: bool,
    pub hsync_active: bool,
    pub vertical_triggered: bool,
    pub horizontal_triggered: bool,
}

/// Mutable decoding state owned by the render thread.
#[derive(Debug, Clone)]
pub struct RasterState {
    /// Flat index of the next pixel to write, always in `[0, width*height)`.
    pub position: usize,
    previous_vsync_active: bool,
    previous_hsync_active: bool,
}

impl Default for RasterState {
    fn default() -> Self {
        Self {
            position: 0,
            previous_vsync_active: false,
            previous_hsync_active: false,
        }
    }
}

impl RasterState {
    /// Derive sync levels (after inversion) and falling-edge triggers for
    /// one sample, against the levels of the immediately preceding sample.
    pub fn sync_state(&self, sample: Sample, masks: &ChannelMasks, config: &VisualizerConfig) -> SyncState {
        let vsync_active = config.invert_vsync != (sample & masks.vsync != 0);
        let hsync_active = config.invert_hsync != (sample & masks.hsync != 0);
        SyncState {
            vsync_active,
            hsync_active,
            vertical_triggered: !config.disable_vsync && self.previous_vsync_active && !vsync_active,
            horizontal_triggered: !config.disable_hsync
                && self.previous_hsync_active
                && !hsync_active,
        }
    }

    /// Advance to the start of the next scanline. `pixels` is the total
    /// pixel count; advancing past the last line wraps to the top.
    pub fn start_of_next_line(&mut self, width: usize, pixels: usize) {
        self.position = (self.position - self.position % width + width) % pixels;
    }

    /// Reset to the start of the frame.
    pub fn start_of_frame(&mut self) {
        self.position = 0;
    }

    /// Store the sync levels for edge detection on the next sample, then
    /// move past the pixel just written, wrapping at the end of the buffer.
    pub fn advance(&mut self, sync: SyncState, pixels: usize) {
        self.previous_vsync_active = sync.vsync_active;
        self.previous_hsync_active = sync.hsync_active;
        self.position = (self.position + 1) % pixels;
    }
}

/// Compose the 32-bit pixel color for one sample.
///
/// Highlight overlays are OR-ed in independently of data. Data contribution
/// is suppressed inside sync-active regions unless rendering hidden data is
/// requested; each enabled color component is fully on or off, so a
/// monochrome configuration yields white or black.
pub fn pixel_value(
    sync: SyncState,
    sample: Sample,
    masks: &ChannelMasks,
    config: &VisualizerConfig,
) -> u32 {
    let mut value = 0;
    if config.highlight_vsync && sync.vsync_active {
        value |= VSYNC_HIGHLIGHT;
    }
    if config.highlight_hsync && sync.hsync_active {
        value |= HSYNC_HIGHLIGHT;
    }
    if (!sync.vsync_active && !sync.hsync_active) || config.render_hidden_data {
        if (sample & masks.red != 0) != config.invert_data {
            value |= RED_ON;
        }
        if (sample & masks.green != 0) != config.invert_data {
            value |= GREEN_ON;
        }
        if (sample & masks.blue != 0) != config.invert_data {
            value |= BLUE_ON;
        }
    }
    value
}
