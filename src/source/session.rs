//! Recorded session replay
//!
//! Replays captures from disk instead of talking to hardware. Two on-disk
//! forms are supported:
//!
//! - DSLogic `.dsl` archives: a ZIP containing a `header` member with the
//!   capture metadata and one `L-<probe>/<block>` member per probe and
//!   block, each holding that probe's samples as packed bits (LSB-first).
//!   The per-probe bit streams of the enabled channels are interleaved back
//!   into one byte per sample, bit N carrying probe N. The sample rate
//!   comes from the file.
//! - Raw captures: one byte per sample, memory-mapped as-is. The sample
//!   rate must be supplied via configuration.
//!
//! Replay runs as fast as the render side accepts buffers; real-time
//! cadence is the playback pacer's job on the consuming end.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::config::SourceConfig;
use crate::dispatch::SampleDispatcher;
use crate::sample::SAMPLE_BITS;
use crate::source::{DataSource, dispatch_packet};
use crate::{Result, VidscopeError};

/// Samples per dispatched packet.
const PACKET_SAMPLES: usize = 65_536;

/// Header information from a `.dsl` archive
#[derive(Debug, Clone)]
pub struct DslHeader {
    pub total_probes: usize,
    pub sample_rate: u64,
    pub total_samples: u64,
    pub total_blocks: u64,
}

enum SessionData {
    Archive {
        archive: ZipArchive<File>,
        header: DslHeader,
    },
    Raw {
        map: Mmap,
    },
}

pub struct RecordedSessionSource {
    dispatcher: Arc<SampleDispatcher>,
    data: SessionData,
    channels: Vec<u8>,
    sample_rate: u64,
    keep_going: bool,
}

impl RecordedSessionSource {
    pub fn open(
        dispatcher: Arc<SampleDispatcher>,
        path: &Path,
        config: &SourceConfig,
    ) -> Result<Self> {
        let channels: Vec<u8> = config.enabled_channels.iter().copied().collect();
        for &channel in &channels {
            if channel >= SAMPLE_BITS {
                return Err(VidscopeError::InvalidChannel(channel));
            }
        }

        let is_archive = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("dsl"));

        if is_archive {
            let file = File::open(path)?;
            let mut archive = ZipArchive::new(file)?;
            let header = parse_header(&mut archive)?;
            for &channel in &channels {
                if channel as usize >= header.total_probes {
                    return Err(VidscopeError::InvalidChannel(channel));
                }
            }
            info!(
                "Replaying {} ({} samples, {} probes, {} Hz)",
                path.display(),
                header.total_samples,
                header.total_probes,
                header.sample_rate
            );
            Ok(Self {
                dispatcher,
                sample_rate: header.sample_rate,
                data: SessionData::Archive { archive, header },
                channels,
                keep_going: config.keep_going,
            })
        } else {
            if config.sample_rate == 0 {
                return Err(VidscopeError::UnknownSampleRate);
            }
            let file = File::open(path)?;
            // Safety: the capture file is treated as read-only for the
            // lifetime of the replay.
            let map = unsafe { Mmap::map(&file)? };
            info!(
                "Replaying raw capture {} ({} samples)",
                path.display(),
                map.len()
            );
            Ok(Self {
                dispatcher,
                sample_rate: config.sample_rate,
                data: SessionData::Raw { map },
                channels,
                keep_going: config.keep_going,
            })
        }
    }

    /// One full pass over the session. Returns `false` when the channel was
    /// closed by the render side mid-replay.
    fn replay(&mut self) -> Result<bool> {
        match &mut self.data {
            SessionData::Raw { map } => {
                for packet in map.chunks(PACKET_SAMPLES) {
                    if !dispatch_packet(&self.dispatcher, Arc::from(packet))? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            SessionData::Archive { archive, header } => {
                let mut remaining = header.total_samples;
                for block in 0..header.total_blocks {
                    if remaining == 0 {
                        break;
                    }
                    let samples =
                        read_block(archive, &self.channels, block, remaining as usize)?;
                    remaining -= samples.len() as u64;
                    for packet in samples.chunks(PACKET_SAMPLES) {
                        if !dispatch_packet(&self.dispatcher, Arc::from(packet))? {
                            return Ok(false);
                        }
                    }
                }
                Ok(true)
            }
        }
    }
}

impl DataSource for RecordedSessionSource {
    fn sample_rate(&self) -> u64 {
        self.sample_rate
    }

    fn run(&mut self) -> Result<()> {
        loop {
            if !self.replay()? {
                debug!("Channel closed, stopping replay");
                break;
            }
            if !self.keep_going {
                self.dispatcher.close();
                break;
            }
            debug!("Session ended, starting over");
        }
        Ok(())
    }
}

/// Read one block: fetch each enabled probe's packed bits and interleave
/// them into byte samples. The block length is bounded by the shortest
/// probe stream and by the number of samples the header still promises.
fn read_block(
    archive: &mut ZipArchive<File>,
    channels: &[u8],
    block: u64,
    remaining: usize,
) -> Result<Vec<u8>> {
    let mut samples: Option<Vec<u8>> = None;
    for &channel in channels {
        let name = format!("L-{}/{}", channel, block);
        let mut member = archive.by_name(&name)?;
        let mut packed = Vec::new();
        member.read_to_end(&mut packed)?;

        let bits = (packed.len() * 8).min(remaining);
        let samples = samples.get_or_insert_with(|| vec![0; bits]);
        if bits < samples.len() {
            samples.truncate(bits);
        }
        interleave_channel(&packed, channel, samples);
    }
    Ok(samples.unwrap_or_default())
}

/// OR one probe's packed bit stream (LSB-first within each byte) into the
/// interleaved sample bytes at the probe's bit position.
fn interleave_channel(packed: &[u8], channel: u8, samples: &mut [u8]) {
    for (i, sample) in samples.iter_mut().enumerate() {
        let bit = (packed[i / 8] >> (i % 8)) & 1;
        *sample |= bit << channel;
    }
}

fn parse_header(archive: &mut ZipArchive<File>) -> Result<DslHeader> {
    let mut header_file = archive
        .by_name("header")
        .map_err(|e| VidscopeError::ParseHeader(format!("Cannot find header file: {}", e)))?;

    let mut content = String::new();
    header_file.read_to_string(&mut content)?;
    drop(header_file);

    let mut total_probes: Option<usize> = None;
    let mut sample_rate: Option<String> = None;
    let mut total_samples: Option<u64> = None;
    let mut total_blocks: Option<u64> = None;

    for line in content.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("total probes = ") {
            total_probes = value.parse().ok();
        } else if let Some(value) = line.strip_prefix("samplerate = ") {
            sample_rate = Some(value.to_string());
        } else if let Some(value) = line.strip_prefix("total samples = ") {
            total_samples = value.parse().ok();
        } else if let Some(value) = line.strip_prefix("total blocks = ") {
            total_blocks = value.parse().ok();
        }
    }

    let total_probes =
        total_probes.ok_or_else(|| VidscopeError::MissingField("total probes".to_string()))?;
    let sample_rate =
        sample_rate.ok_or_else(|| VidscopeError::MissingField("samplerate".to_string()))?;
    let total_samples =
        total_samples.ok_or_else(|| VidscopeError::MissingField("total samples".to_string()))?;
    let total_blocks =
        total_blocks.ok_or_else(|| VidscopeError::MissingField("total blocks".to_string()))?;

    let sample_rate = parse_sample_rate(&sample_rate).ok_or_else(|| {
        VidscopeError::ParseHeader(format!("Invalid sample rate: {}", sample_rate))
    })?;

    Ok(DslHeader {
        total_probes,
        sample_rate,
        total_samples,
        total_blocks,
    })
}

/// Parse a sample rate like `"12 MHz"` or `"2.5 MHz"` into Hz.
fn parse_sample_rate(text: &str) -> Option<u64> {
    let (value, unit) = text.trim().split_once(' ')?;
    let multiplier = match unit {
        "Hz" => 1.0,
        "kHz" | "KHz" => 1e3,
        "MHz" => 1e6,
        "GHz" => 1e9,
        _ => return None,
    };
    let value: f64 = value.parse().ok()?;
    if value <= 0.0 {
        return None;
    }
    Some((value * multiplier) as u64)
}
