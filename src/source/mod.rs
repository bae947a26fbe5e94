//! Capture sources
//!
//! A source is whatever produces sample buffers on the capture thread:
//! a recorded session being replayed, or the built-in synthetic test signal
//! standing in for live hardware. The render side never depends on which
//! variant produced a buffer; everything funnels through the same packet
//! dispatch routine and the same [`SampleDispatcher`].

pub mod pattern;
pub mod session;

use std::sync::Arc;

pub use pattern::{PatternChannels, PatternSource};
pub use session::RecordedSessionSource;

use crate::config::SourceConfig;
use crate::dispatch::SampleDispatcher;
use crate::sample::SampleBuffer;
use crate::{Result, VidscopeError};

/// A capture backend driving the producer side of the dispatcher.
pub trait DataSource: Send {
    /// Effective sample rate in Hz, once known. 0 when unknown.
    fn sample_rate(&self) -> u64;

    /// Capture main loop. Runs until the data ends or the channel closes.
    /// On end of data the source closes the channel itself (unless the
    /// keep-going policy asks for looping), so the render loop always
    /// observes the shutdown.
    fn run(&mut self) -> Result<()>;
}

/// Create the source matching the configuration: a recorded session when an
/// input file was passed, the synthetic test signal otherwise.
pub fn create(
    dispatcher: Arc<SampleDispatcher>,
    config: &SourceConfig,
    signal: PatternChannels,
) -> Result<Box<dyn DataSource>> {
    match &config.input_file {
        Some(path) => Ok(Box::new(RecordedSessionSource::open(
            dispatcher, path, config,
        )?)),
        None => {
            if config.sample_rate == 0 {
                return Err(VidscopeError::UnknownSampleRate);
            }
            Ok(Box::new(PatternSource::new(
                dispatcher,
                config.sample_rate,
                signal,
            )))
        }
    }
}

/// Packet handling common to all sources. Validates the packet and hands it
/// to the dispatcher; the call blocks until the render thread is done with
/// it. Returns `false` when the channel has been closed and the source
/// should stop producing.
pub(crate) fn dispatch_packet(
    dispatcher: &SampleDispatcher,
    packet: SampleBuffer,
) -> Result<bool> {
    if packet.is_empty() {
        return Err(VidscopeError::EmptyPacket);
    }
    Ok(dispatcher.put(packet))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_dispatch_packet_rejects_empty_packets() {
        let dispatcher = SampleDispatcher::new();
        let empty: SampleBuffer = Arc::from(&[][..]);
        assert!(matches!(
            dispatch_packet(&dispatcher, empty),
            Err(VidscopeError::EmptyPacket)
        ));
    }

    #[test]
    fn test_dispatch_packet_reports_closed_channel() {
        let dispatcher = SampleDispatcher::new();
        dispatcher.close();
        let packet: SampleBuffer = Arc::from(&[1u8, 2, 3][..]);
        assert_eq!(dispatch_packet(&dispatcher, packet).unwrap(), false);
    }

    #[test]
    fn test_dispatch_packet_delivers_to_consumer() {
        let dispatcher = Arc::new(SampleDispatcher::new());
        let producer_side = Arc::clone(&dispatcher);

        let producer = thread::spawn(move || {
            let packet: SampleBuffer = Arc::from(&[9u8, 8, 7][..]);
            dispatch_packet(&producer_side, packet).unwrap()
        });

        let received = dispatcher.get(Duration::from_secs(2)).unwrap();
        assert_eq!(&received[..], &[9, 8, 7]);
        dispatcher.clear();
        assert!(producer.join().unwrap());
    }
}
