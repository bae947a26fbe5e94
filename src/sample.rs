//! Core data types for captured logic signals

use std::sync::Arc;

/// One capture instant: the simultaneous digital state of up to 8 logic
/// channels, one bit per channel.
pub type Sample = u8;

/// Number of logic channels a [`Sample`] can carry.
pub const SAMPLE_BITS: u8 = 8;

/// An immutable run of samples produced by one capture event.
///
/// Shared via `Arc` so the render thread can keep reading the buffer while
/// the slot of the dispatcher still holds it. Cloning is a refcount bump.
pub type SampleBuffer = Arc<[Sample]>;

/// Bit mask selecting a single channel within a [`Sample`].
#[inline]
pub fn channel_mask(channel: u8) -> Sample {
    1 << channel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_mask() {
        assert_eq!(channel_mask(0), 0b0000_0001);
        assert_eq!(channel_mask(3), 0b0000_1000);
        assert_eq!(channel_mask(7), 0b1000_0000);
    }
}
