//! Sample producers and consumers that plug into device callbacks.

use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use pcmio_types::FormatType;

/// Default capacity of a [`ChannelSink`].
pub const CAPTURE_CHANNEL_CAPACITY: usize = 16;

/// Something that can produce interleaved PCM frames for playback.
///
/// Runs on the audio thread: implementations must not block.
pub trait SampleSource: Send {
    /// Write up to `frame_count` frames into `out` and return how many were
    /// written. Zero means the source is exhausted or starved.
    fn read_frames(&mut self, frame_count: u32, out: &mut [u8]) -> u32;
}

/// Something that accepts captured interleaved PCM frames.
///
/// Runs on the audio thread: implementations must not block.
pub trait SampleSink: Send {
    /// Consume `frame_count` frames held in `input`.
    fn write_frames(&mut self, frame_count: u32, input: &[u8]);
}

/// A [`SampleSource`] over any byte reader already producing PCM in the
/// device's format, such as a decoder.
pub struct ReaderSource<R> {
    reader: R,
    bytes_per_frame: usize,
    exhausted: bool,
}

impl<R: Read> ReaderSource<R> {
    /// Wrap `reader`, whose bytes are interleaved `format` samples with
    /// `channels` channels.
    pub fn new(reader: R, format: FormatType, channels: u32) -> Self {
        Self {
            reader,
            bytes_per_frame: format.bytes_per_frame(channels) as usize,
            exhausted: false,
        }
    }

    /// Returns true once the reader hit end of stream or failed.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Unwrap the reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Send> SampleSource for ReaderSource<R> {
    fn read_frames(&mut self, frame_count: u32, out: &mut [u8]) -> u32 {
        if self.exhausted || self.bytes_per_frame == 0 {
            return 0;
        }

        let wanted = (frame_count as usize * self.bytes_per_frame).min(out.len());
        let mut filled = 0;

        // Keep reading until the request is met; short reads are normal.
        while filled < wanted {
            match self.reader.read(&mut out[filled..wanted]) {
                Ok(0) => {
                    self.exhausted = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => {
                    self.exhausted = true;
                    break;
                }
            }
        }

        (filled / self.bytes_per_frame) as u32
    }
}

/// One captured period.
#[derive(Debug, Clone)]
pub struct CapturedChunk {
    /// Interleaved samples.
    pub data: Bytes,

    /// Frames in `data`.
    pub frames: u32,

    /// Monotonically increasing sequence number.
    pub sequence: u64,
}

/// A [`SampleSink`] that forwards captured periods into a bounded channel.
///
/// When the consumer falls behind, chunks are dropped instead of blocking
/// the audio thread. Gaps show up in the sequence numbers.
pub struct ChannelSink {
    sender: Sender<CapturedChunk>,
    sequence: u64,
    dropped: Arc<AtomicU64>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel.
    pub fn new(capacity: usize) -> (Self, Receiver<CapturedChunk>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        let sink = Self {
            sender,
            sequence: 0,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (sink, receiver)
    }

    /// Counter of chunks dropped because the channel was full.
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }
}

impl SampleSink for ChannelSink {
    fn write_frames(&mut self, frame_count: u32, input: &[u8]) {
        let chunk = CapturedChunk {
            data: Bytes::copy_from_slice(input),
            frames: frame_count,
            sequence: self.sequence,
        };
        self.sequence += 1;

        match self.sender.try_send(chunk) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}
