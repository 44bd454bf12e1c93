//! chansim: run 16-bit mono PCM through a Watterson HF channel
//!
//! Reads s16le samples from stdin (or generates a test tone) and writes the
//! faded, noisy result to stdout. Diagnostics go to stderr.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use std::io::{self, BufWriter};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hf_chansim::noise::DEFAULT_IMPULSE_THRESHOLD;
use hf_chansim::stream::DEFAULT_TONE_HZ;
use hf_chansim::{
    run_stream, ChannelParams, ChannelProfile, NoiseKind, PcmSink, PipeSource, ToneSource,
    WattersonChannel,
};

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
enum IoMode {
    /// Internal test tone
    #[value(alias = "0")]
    Nco,
    /// s16le PCM on stdin
    #[value(alias = "2")]
    Pipe,
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
enum NoiseArg {
    #[value(alias = "0")]
    Gaussian,
    #[value(alias = "1")]
    Laplacian,
    #[value(alias = "2")]
    Impulsive,
}

#[derive(Parser, Debug)]
#[command(name = "chansim", version, about = "Watterson HF channel simulator (s16le mono on stdin/stdout)")]
struct Args {
    /// Signal-to-noise ratio in dB
    #[arg(allow_negative_numbers = true)]
    snr: f32,

    /// Channel profile: 0 noise only, 1 flat 1, 2 flat 2, 3 CCIR good,
    /// 4 CCIR moderate, 5 CCIR poor, 6 CCIR flutter, 7 extreme
    profile: u8,

    /// Fixed signal RMS for noise scaling (0 = measure from the input)
    #[arg(short = 'a', long, default_value_t = 0.0)]
    amplitude: f32,

    /// Noise and channel bandwidth (Hz)
    #[arg(short = 'b', long, default_value_t = 3000.0)]
    bandwidth: f32,

    /// Test tone frequency (Hz)
    #[arg(short = 'f', long, default_value_t = DEFAULT_TONE_HZ)]
    nco_freq: f64,

    /// Input gain
    #[arg(short = 'g', long, default_value_t = 1.0)]
    gain: f32,

    /// Sample source
    #[arg(short = 'i', long, value_enum, default_value_t = IoMode::Pipe)]
    io: IoMode,

    /// Noise type
    #[arg(short = 'n', long, value_enum, default_value_t = NoiseArg::Gaussian)]
    noise: NoiseArg,

    /// Impulse threshold for impulsive noise (5 = crackle, 8 = rare clicks)
    #[arg(long, default_value_t = DEFAULT_IMPULSE_THRESHOLD)]
    impulse_threshold: f32,

    /// Frequency offset (Hz)
    #[arg(short = 'o', long, default_value_t = 0.0, allow_negative_numbers = true)]
    offset: f32,

    /// RNG seed (default: time and process id)
    #[arg(short = 'r', long)]
    seed: Option<u64>,

    /// Sample rate (Hz)
    #[arg(short = 's', long, default_value_t = 8000)]
    sample_rate: u32,

    /// Stop the test tone after this many seconds (default: run forever)
    #[arg(short = 'd', long)]
    duration: Option<f64>,

    /// Release test tone blocks no faster than real time
    #[arg(long)]
    realtime: bool,

    /// Debug logging (overrides RUST_LOG)
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // stdout carries samples
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn default_seed() -> u64 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    secs.wrapping_add(std::process::id() as u64)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let profile = ChannelProfile::from_index(args.profile).context("invalid channel profile")?;

    let noise = match args.noise {
        NoiseArg::Gaussian => NoiseKind::Gaussian,
        NoiseArg::Laplacian => NoiseKind::Laplacian,
        NoiseArg::Impulsive => NoiseKind::Impulsive { threshold: args.impulse_threshold },
    };

    let params = ChannelParams {
        sample_rate: args.sample_rate,
        snr_db: args.snr,
        profile,
        amplitude: args.amplitude,
        noise_bandwidth_hz: args.bandwidth,
        freq_offset_hz: args.offset,
        input_gain: args.gain,
        noise,
    };

    let seed = args.seed.unwrap_or_else(default_seed);
    info!(seed, "random seed");

    let mut channel = WattersonChannel::new(params, seed).context("failed to build channel")?;

    let stdout = io::stdout();
    let mut sink = PcmSink::new(BufWriter::new(stdout.lock()));

    let stats = match args.io {
        IoMode::Nco => {
            let mut source = ToneSource::new(args.nco_freq, args.sample_rate);
            if let Some(seconds) = args.duration {
                if !(seconds.is_finite() && seconds >= 0.0) {
                    bail!("duration must be a non-negative number of seconds, got {}", seconds);
                }
                source = source.with_limit((seconds * args.sample_rate as f64).round() as u64);
            }
            if args.realtime {
                source = source.paced(args.sample_rate);
            }
            run_stream(&mut channel, &mut source, &mut sink)
        }
        IoMode::Pipe => {
            if args.duration.is_some() || args.realtime {
                warn!("--duration and --realtime only apply to the test tone, ignoring");
            }
            let stdin = io::stdin();
            let mut source = PipeSource::new(stdin.lock());
            run_stream(&mut channel, &mut source, &mut sink)
        }
    }
    .context("channel stream failed")?;

    info!(
        samples = stats.samples,
        positive_clips = stats.positive_clips,
        negative_clips = stats.negative_clips,
        "done"
    );

    Ok(())
}
