//! Visualize video data captured by a logic analyzer
//!
//! This library decodes a raw multi-channel logic capture into a rasterized
//! image by interpreting designated channels as vertical sync, horizontal
//! sync, and data lines (PAL-style composite timing).
//!
//! # Architecture
//!
//! - **SampleDispatcher**: single-slot rendezvous channel moving sample
//!   buffers from the capture thread to the render thread, with backpressure
//! - **DataSource**: capture backends (recorded `.dsl`/raw sessions, or the
//!   built-in synthetic test signal)
//! - **Visualizer**: walks sample buffers bit-by-bit, detects sync edges,
//!   tracks the raster position and paints into the frame buffer
//! - **Surface**: pixel presentation (minifb window)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vidscope::{SampleDispatcher, SourceConfig, VisualizerConfig, Visualizer, WindowSurface};
//!
//! let viz_config = VisualizerConfig::default();
//! viz_config.validate()?;
//!
//! let dispatcher = Arc::new(SampleDispatcher::new());
//! let mut source = vidscope::source::create(
//!     Arc::clone(&dispatcher),
//!     &SourceConfig::default(),
//!     (&viz_config).into(),
//! )?;
//!
//! let surface = WindowSurface::new("vidscope", viz_config.width, viz_config.height)?;
//! let _producer = std::thread::spawn(move || source.run());
//!
//! Visualizer::new(Arc::clone(&dispatcher), viz_config, surface).run()?;
//! dispatcher.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use thiserror::Error;

pub mod config;
pub mod dispatch;
pub mod display;
pub mod sample;
pub mod source;
pub mod visualizer;
pub mod watchdog;

pub use config::{SourceConfig, VisualizerConfig, parse_data_channels};
pub use dispatch::{Dispatcher, SampleDispatcher};
pub use display::{Surface, WindowSurface};
pub use sample::{Sample, SampleBuffer};
pub use source::{DataSource, PatternChannels, PatternSource, RecordedSessionSource};
pub use visualizer::Visualizer;
pub use watchdog::Watchdog;

#[derive(Error, Debug)]
pub enum VidscopeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Header parsing error: {0}")]
    ParseHeader(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid channel number: {0} (channels 0-7 fit in a sample)")]
    InvalidChannel(u8),

    #[error("Window dimensions must be non-zero")]
    InvalidDimensions,

    #[error(
        "Invalid data channel spec '{0}': pass a single digit for monochrome or three digits for RGB (e.g. --data 2 or --data 234)"
    )]
    InvalidDataChannels(String),

    #[error("Sample rate is unknown; pass --sample-rate for raw captures")]
    UnknownSampleRate,

    #[error("Got packet with 0 samples")]
    EmptyPacket,

    #[error("Window error: {0}")]
    Window(#[from] minifb::Error),
}

pub type Result<T> = std::result::Result<T, VidscopeError>;
