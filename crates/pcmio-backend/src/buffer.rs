//! Transfer buffer shared between a device and its backend stream.

use pcmio_types::FormatType;

use crate::error::BackendError;
use crate::BackendResult;

/// Byte value of one silent sample.
///
/// Unsigned 8-bit audio is centred on 0x80; every other format is signed
/// or float and silent at zero.
pub fn silence_byte(format: FormatType) -> u8 {
    match format {
        FormatType::U8 => 0x80,
        _ => 0,
    }
}

/// Interleaved PCM storage of `periods` periods of `period_frames` frames.
#[derive(Debug)]
pub struct TransferBuffer {
    data: Vec<u8>,
    period_frames: u32,
    periods: u32,
    frames: u32,
    bytes_per_frame: usize,
    silence: u8,
}

impl TransferBuffer {
    /// Allocate a silent buffer.
    ///
    /// Fails if the size does not fit the frame counter or the address space.
    pub fn new(
        format: FormatType,
        channels: u32,
        period_frames: u32,
        periods: u32,
    ) -> BackendResult<Self> {
        let too_large = || {
            BackendError::Unsupported(format!(
                "transfer buffer of {} x {} frames is too large",
                periods, period_frames
            ))
        };

        let bytes_per_frame = format.bytes_per_frame(channels) as usize;
        let frames = period_frames.checked_mul(periods).ok_or_else(too_large)?;
        let len = (frames as usize)
            .checked_mul(bytes_per_frame)
            .ok_or_else(too_large)?;
        let silence = silence_byte(format);

        Ok(Self {
            data: vec![silence; len],
            period_frames,
            periods,
            frames,
            bytes_per_frame,
            silence,
        })
    }

    /// Frames per period.
    pub fn period_frames(&self) -> u32 {
        self.period_frames
    }

    /// Number of periods.
    pub fn periods(&self) -> u32 {
        self.periods
    }

    /// Total frames across all periods.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Size in bytes of one frame.
    pub fn bytes_per_frame(&self) -> usize {
        self.bytes_per_frame
    }

    /// Total size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The whole buffer.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// The whole buffer, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn period_range(&self, index: u32) -> std::ops::Range<usize> {
        let period_bytes = self.period_frames as usize * self.bytes_per_frame;
        let start = (index % self.periods.max(1)) as usize * period_bytes;
        start..start + period_bytes
    }

    /// One period, wrapping `index` around the period count.
    pub fn period(&self, index: u32) -> &[u8] {
        let range = self.period_range(index);
        &self.data[range]
    }

    /// One period, mutably, wrapping `index` around the period count.
    pub fn period_mut(&mut self, index: u32) -> &mut [u8] {
        let range = self.period_range(index);
        &mut self.data[range]
    }

    /// Overwrite everything with silence, discarding buffered samples.
    pub fn clear(&mut self) {
        self.data.fill(self.silence);
    }

    /// Overwrite one period with silence.
    pub fn clear_period(&mut self, index: u32) {
        let silence = self.silence;
        self.period_mut(index).fill(silence);
    }
}
