//! vidscope - Visualize video data captured by a logic analyzer

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use tracing::{error, info};

use vidscope::source::{self, PatternChannels};
use vidscope::{
    Result, SampleDispatcher, SourceConfig, Visualizer, VisualizerConfig, Watchdog,
    WindowSurface, parse_data_channels,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Visualize video data captured by a logic analyzer", long_about = None)]
struct Args {
    /// Window width
    #[arg(long, default_value_t = 800)]
    width: usize,

    /// Window height
    #[arg(long, default_value_t = 330)]
    height: usize,

    /// Vertical sync channel number
    #[arg(long, default_value_t = 0)]
    vsync: u8,

    /// Horizontal sync channel number
    #[arg(long, default_value_t = 1)]
    hsync: u8,

    /// Data channel number(s): a single digit for monochrome or 3 digits
    /// for RGB color (e.g. --data 2 or --data 234)
    #[arg(long, default_value = "2")]
    data: String,

    /// Invert data channel input
    #[arg(long)]
    invert_data: bool,

    /// Invert vertical sync channel input
    #[arg(long)]
    invert_vsync: bool,

    /// Invert horizontal sync channel input
    #[arg(long)]
    invert_hsync: bool,

    /// Disable vertical synchronisation
    #[arg(long = "no-vsync")]
    no_vsync: bool,

    /// Disable horizontal synchronisation
    #[arg(long = "no-hsync")]
    no_hsync: bool,

    /// Visualize vertical synchronisation
    #[arg(long)]
    highlight_vsync: bool,

    /// Visualize horizontal synchronisation
    #[arg(long)]
    highlight_hsync: bool,

    /// Render (hidden) data in blanking areas
    #[arg(long = "hidden-data")]
    hidden_data: bool,

    /// Render image only on vertical syncs
    #[arg(long = "render-synced")]
    render_synced: bool,

    /// Sample rate in Hz (raw captures and the synthetic test signal;
    /// .dsl sessions carry their own rate)
    #[arg(short = 's', long, default_value_t = 12_000_000)]
    sample_rate: u64,

    /// Replay a recorded capture (DSLogic .dsl archive or raw
    /// one-byte-per-sample file) instead of generating a test signal
    #[arg(short = 'i', long)]
    input_file: Option<PathBuf>,

    /// Try to continue after the session has ended. Will loop forever in
    /// combination with recorded sessions (--input-file).
    #[arg(short = 'k', long)]
    keep_going: bool,
}

impl Args {
    /// Validate and split into the two thread configurations.
    fn into_configs(self) -> Result<(VisualizerConfig, SourceConfig)> {
        let (red, green, blue) = parse_data_channels(&self.data)?;

        let visualizer = VisualizerConfig {
            width: self.width,
            height: self.height,
            vsync_channel: self.vsync,
            hsync_channel: self.hsync,
            red_channel: red,
            green_channel: green,
            blue_channel: blue,
            invert_data: self.invert_data,
            invert_vsync: self.invert_vsync,
            invert_hsync: self.invert_hsync,
            disable_vsync: self.no_vsync,
            disable_hsync: self.no_hsync,
            highlight_vsync: self.highlight_vsync,
            highlight_hsync: self.highlight_hsync,
            render_hidden_data: self.hidden_data,
            synced_rendering: self.render_synced,
            sample_rate: 0,
        };
        visualizer.validate()?;

        let source = SourceConfig {
            sample_rate: self.sample_rate,
            input_file: self.input_file,
            enabled_channels: visualizer.enabled_channels(),
            keep_going: self.keep_going,
        };

        Ok((visualizer, source))
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Args::parse()) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let (mut viz_config, source_config) = args.into_configs()?;

    let watchdog = Watchdog::new();
    let monitor = watchdog.start_monitoring_thread();

    let dispatcher = Arc::new(SampleDispatcher::new().with_watchdog(&watchdog));

    let mut data_source = source::create(
        Arc::clone(&dispatcher),
        &source_config,
        PatternChannels::from(&viz_config),
    )?;
    viz_config.sample_rate = data_source.sample_rate();

    let surface = WindowSurface::new("vidscope", viz_config.width, viz_config.height)?;

    let producer_dispatcher = Arc::clone(&dispatcher);
    let capture_thread = thread::Builder::new()
        .name("capture".to_string())
        .spawn(move || {
            if let Err(e) = data_source.run() {
                error!("Capture error: {}", e);
                // Close so the render loop exits instead of hanging.
                producer_dispatcher.close();
            }
        })?;

    let mut visualizer = Visualizer::new(Arc::clone(&dispatcher), viz_config, surface);
    visualizer.run()?;

    dispatcher.close();
    if capture_thread.join().is_err() {
        error!("Capture thread panicked");
    }

    watchdog.stop();
    let _ = monitor.join();

    info!("Shutdown complete");
    Ok(())
}
