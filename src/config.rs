//! Immutable configuration passed into both threads at startup
//!
//! Both structs are plain value objects. They are validated once before any
//! thread is spawned and never mutated afterwards, so no synchronization is
//! needed for configuration itself.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::sample::SAMPLE_BITS;
use crate::{Result, VidscopeError};

/// Rendering and decoding parameters. Defaults should be OK for PAL video.
#[derive(Debug, Clone)]
pub struct VisualizerConfig {
    pub width: usize,
    pub height: usize,
    pub vsync_channel: u8,
    pub hsync_channel: u8,
    pub red_channel: u8,
    pub green_channel: u8,
    pub blue_channel: u8,
    pub invert_data: bool,
    pub invert_vsync: bool,
    pub invert_hsync: bool,
    pub disable_vsync: bool,
    pub disable_hsync: bool,
    pub highlight_vsync: bool,
    pub highlight_hsync: bool,
    pub render_hidden_data: bool,
    pub synced_rendering: bool,
    /// Hz, for playback pacing only. Filled in from the source once known.
    pub sample_rate: u64,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 330,
            vsync_channel: 0,
            hsync_channel: 1,
            red_channel: 2,
            green_channel: 2,
            blue_channel: 2,
            invert_data: false,
            invert_vsync: false,
            invert_hsync: false,
            disable_vsync: false,
            disable_hsync: false,
            highlight_vsync: false,
            highlight_hsync: false,
            render_hidden_data: false,
            synced_rendering: false,
            sample_rate: 0,
        }
    }
}

impl VisualizerConfig {
    /// Every configured channel index must fit within the sample's bit
    /// width, and the raster needs at least one pixel. Violations are
    /// configuration errors, fatal at startup.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(VidscopeError::InvalidDimensions);
        }
        for channel in [
            self.vsync_channel,
            self.hsync_channel,
            self.red_channel,
            self.green_channel,
            self.blue_channel,
        ] {
            if channel >= SAMPLE_BITS {
                return Err(VidscopeError::InvalidChannel(channel));
            }
        }
        Ok(())
    }

    /// All channel indices the capture side needs to record.
    pub fn enabled_channels(&self) -> BTreeSet<u8> {
        BTreeSet::from([
            self.vsync_channel,
            self.hsync_channel,
            self.red_channel,
            self.green_channel,
            self.blue_channel,
        ])
    }
}

/// Capture-side parameters.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Requested sample rate in Hz. Recorded `.dsl` sessions override this
    /// with the rate stored in the file.
    pub sample_rate: u64,
    /// Recorded session to replay instead of generating a test signal.
    pub input_file: Option<PathBuf>,
    /// Channels that must be present in the capture.
    pub enabled_channels: BTreeSet<u8>,
    /// Keep capturing after the session ends. Loops forever in combination
    /// with recorded sessions.
    pub keep_going: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            sample_rate: 12_000_000,
            input_file: None,
            enabled_channels: BTreeSet::from([0, 1, 2]),
            keep_going: false,
        }
    }
}

/// Parse the `--data` argument: one digit maps the same channel to all three
/// colors (monochrome), three digits assign red, green and blue individually.
pub fn parse_data_channels(spec: &str) -> Result<(u8, u8, u8)> {
    let digits: Vec<u8> = spec
        .chars()
        .map(|c| {
            c.to_digit(10)
                .map(|d| d as u8)
                .ok_or_else(|| VidscopeError::InvalidDataChannels(spec.to_string()))
        })
        .collect::<Result<_>>()?;

    match digits.as_slice() {
        [mono] => Ok((*mono, *mono, *mono)),
        [red, green, blue] => Ok((*red, *green, *blue)),
        _ => Err(VidscopeError::InvalidDataChannels(spec.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_channels_monochrome() {
        assert_eq!(parse_data_channels("2").unwrap(), (2, 2, 2));
    }

    #[test]
    fn test_parse_data_channels_rgb() {
        assert_eq!(parse_data_channels("234").unwrap(), (2, 3, 4));
    }

    #[test]
    fn test_parse_data_channels_invalid() {
        assert!(parse_data_channels("").is_err());
        assert!(parse_data_channels("12345").is_err());
        assert!(parse_data_channels("ab").is_err());
        assert!(parse_data_channels("2x4").is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_channel() {
        let config = VisualizerConfig {
            vsync_channel: 8,
            ..VisualizerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(VidscopeError::InvalidChannel(8))
        ));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(VisualizerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_raster() {
        let config = VisualizerConfig {
            width: 0,
            ..VisualizerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(VidscopeError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_enabled_channels_deduplicates() {
        let config = VisualizerConfig::default(); // vsync 0, hsync 1, data 2/2/2
        let channels: Vec<u8> = config.enabled_channels().into_iter().collect();
        assert_eq!(channels, vec![0, 1, 2]);
    }
}
