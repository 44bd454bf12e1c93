//! Sample stream boundary
//!
//! Moves 16-bit signed little-endian mono PCM through a channel in blocks of
//! `BLOCK_LEN` samples. A block is fully processed and written before the
//! next one is read, so per-sample channel state always sees the input in
//! order.

use std::io::{ErrorKind, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::channel::WattersonChannel;
use crate::error::{ChansimError, Result};
use crate::nco::Nco;

/// Samples per processing block
pub const BLOCK_LEN: usize = 512;

/// Output is limited to this magnitude before conversion to PCM
pub const CLIP_LEVEL: f32 = 0.999;

/// Default test tone frequency in Hz
pub const DEFAULT_TONE_HZ: f64 = 1800.0;

/// PCM peak of the test tone, low enough not to overdrive the channel
pub const TONE_PEAK: i16 = 2500;

const PCM_SCALE: f32 = 32768.0;

/// Convert a PCM sample to the channel's float range
#[inline]
pub fn pcm_to_sample(pcm: i16) -> f32 {
    pcm as f32 / PCM_SCALE
}

/// A producer of normalized input samples
pub trait SampleSource {
    /// Fill `block` from the front and return how many samples were written.
    /// Zero means the stream has ended.
    fn read_block(&mut self, block: &mut [f32]) -> Result<usize>;
}

/// Reads s16le PCM from any byte stream (stdin, a pipe, a file)
pub struct PipeSource<R: Read> {
    reader: R,
    bytes: Vec<u8>,
    total_samples: u64,
}

impl<R: Read> PipeSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            bytes: Vec::new(),
            total_samples: 0,
        }
    }

    /// Get total samples decoded.
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }
}

impl<R: Read> SampleSource for PipeSource<R> {
    fn read_block(&mut self, block: &mut [f32]) -> Result<usize> {
        self.bytes.resize(block.len() * 2, 0);

        // Short reads are normal on pipes; keep reading until full or EOF
        let mut filled = 0;
        while filled < self.bytes.len() {
            match self.reader.read(&mut self.bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        // A trailing odd byte cannot form a sample and is dropped
        let count = filled / 2;
        for (out, pair) in block.iter_mut().zip(self.bytes[..count * 2].chunks_exact(2)) {
            *out = pcm_to_sample(i16::from_le_bytes([pair[0], pair[1]]));
        }

        self.total_samples += count as u64;
        Ok(count)
    }
}

/// Synthetic test tone
pub struct ToneSource {
    nco: Nco,
    peak: i16,
    remaining: Option<u64>,
    pacing: Option<Pacing>,
}

struct Pacing {
    sample_rate: u32,
    deadline: Option<Instant>,
}

impl ToneSource {
    /// Unbounded tone at `freq_hz` with the default peak level
    pub fn new(freq_hz: f64, sample_rate: u32) -> Self {
        Self {
            nco: Nco::new(freq_hz, sample_rate),
            peak: TONE_PEAK,
            remaining: None,
            pacing: None,
        }
    }

    /// Stop after `samples` samples
    pub fn with_limit(mut self, samples: u64) -> Self {
        self.remaining = Some(samples);
        self
    }

    pub fn with_peak(mut self, peak: i16) -> Self {
        self.peak = peak;
        self
    }

    /// Release blocks no faster than real time at `sample_rate`
    pub fn paced(mut self, sample_rate: u32) -> Self {
        self.pacing = Some(Pacing { sample_rate, deadline: None });
        self
    }

    fn wait_for_slot(&mut self, samples: usize) {
        let Some(pacing) = self.pacing.as_mut() else {
            return;
        };

        let now = Instant::now();
        let deadline = pacing.deadline.unwrap_or(now);
        if deadline > now {
            thread::sleep(deadline - now);
        }

        let block = Duration::from_secs_f64(samples as f64 / pacing.sample_rate.max(1) as f64);
        pacing.deadline = Some(deadline.max(now) + block);
    }
}

impl SampleSource for ToneSource {
    fn read_block(&mut self, block: &mut [f32]) -> Result<usize> {
        let count = match self.remaining {
            Some(left) => (left.min(block.len() as u64)) as usize,
            None => block.len(),
        };
        if count == 0 {
            return Ok(0);
        }

        self.wait_for_slot(count);

        for out in block[..count].iter_mut() {
            // Quantized like a PCM capture
            let pcm = (self.peak as f32 * self.nco.next_phasor().re) as i16;
            *out = pcm_to_sample(pcm);
        }

        if let Some(left) = self.remaining.as_mut() {
            *left -= count as u64;
        }
        Ok(count)
    }
}

/// Counters for a stream run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub samples: u64,
    pub blocks: u64,
    pub positive_clips: u64,
    pub negative_clips: u64,
}

/// Writes channel output as s16le PCM, clamping out-of-range samples
pub struct PcmSink<W: Write> {
    writer: W,
    bytes: Vec<u8>,
    positive_clips: u64,
    negative_clips: u64,
}

impl<W: Write> PcmSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            bytes: Vec::with_capacity(BLOCK_LEN * 2),
            positive_clips: 0,
            negative_clips: 0,
        }
    }

    /// Convert, write and flush one block
    pub fn write_block(&mut self, samples: &[f32]) -> Result<()> {
        self.bytes.clear();
        for &x in samples {
            let clamped = if x > CLIP_LEVEL {
                self.positive_clips += 1;
                warn!(value = x, "positive clipping");
                CLIP_LEVEL
            } else if x < -CLIP_LEVEL {
                self.negative_clips += 1;
                warn!(value = x, "negative clipping");
                -CLIP_LEVEL
            } else {
                x
            };
            let pcm = (clamped * PCM_SCALE) as i16;
            self.bytes.extend_from_slice(&pcm.to_le_bytes());
        }

        self.writer.write_all(&self.bytes)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn positive_clips(&self) -> u64 {
        self.positive_clips
    }

    pub fn negative_clips(&self) -> u64 {
        self.negative_clips
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Run `source` through `channel` into `sink` until the source ends.
///
/// A closed output pipe ends the run quietly.
pub fn run_stream<S, W>(
    channel: &mut WattersonChannel,
    source: &mut S,
    sink: &mut PcmSink<W>,
) -> Result<StreamStats>
where
    S: SampleSource + ?Sized,
    W: Write,
{
    let mut block = [0.0_f32; BLOCK_LEN];
    let mut stats = StreamStats::default();
    let (pos_before, neg_before) = (sink.positive_clips(), sink.negative_clips());

    loop {
        let count = source.read_block(&mut block)?;
        if count == 0 {
            break;
        }

        channel.process_in_place(&mut block[..count]);

        match sink.write_block(&block[..count]) {
            Ok(()) => {}
            Err(ChansimError::Io(e)) if e.kind() == ErrorKind::BrokenPipe => {
                debug!("output closed");
                break;
            }
            Err(e) => return Err(e),
        }

        stats.samples += count as u64;
        stats.blocks += 1;
    }

    stats.positive_clips = sink.positive_clips() - pos_before;
    stats.negative_clips = sink.negative_clips() - neg_before;

    debug!(
        samples = stats.samples,
        blocks = stats.blocks,
        positive_clips = stats.positive_clips,
        negative_clips = stats.negative_clips,
        "stream finished"
    );

    Ok(stats)
}
