//! # Banjo Tuner - Command-line host
//!
//! Drives the headless tuner core the way an app would: a worker thread
//! analyses sample blocks and hands the newest result to the main thread,
//! and reference tones are rendered as seamless loops for a player.
//!
//! Audio devices are out of scope here. Blocks come from a WAV recording or
//! a simulated string, and tones and sessions are written to WAV files.

mod latest;
mod source;
mod worker;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use banjo_tuner_core::catalogue::{self, Tuning, decode_tuning, encode_tuning, string_label};
use banjo_tuner_core::session::clamp_volume;
use banjo_tuner_core::synth::{TONE_SAMPLE_RATE, synthesize_tone};
use banjo_tuner_core::{
    BanjoString, ReferencePitch, Session, ToneBuffer, TunerConfig, TuningResult,
};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use latest::{LatestReceiver, latest_channel};
use source::{SampleSource, ToneSource, WavSource};
use worker::{AnalysisWorker, Target};

/// Lowest frequency rendered as a tone; anything below is not audible.
const MIN_TONE_HZ: f32 = 20.0;

/// Banjo tuner: pitch detection and reference tones
#[derive(Parser)]
#[command(name = "banjo-tuner")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// JSON configuration file (missing fields use defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// A4 reference pitch in Hz (432-446), overrides the config file
    #[arg(long, global = true)]
    reference: Option<u32>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one seamless loop of a reference tone to a WAV file
    Tone {
        /// Banjo string (D4, B3, G3, D3) or a frequency in Hz
        note: String,

        /// Output WAV path
        #[arg(short, long)]
        out: PathBuf,

        /// Sample rate of the rendered tone
        #[arg(long, default_value_t = TONE_SAMPLE_RATE)]
        sample_rate: u32,

        /// Number of back-to-back loops to write
        #[arg(long, default_value_t = 1)]
        repeat: usize,
    },

    /// Analyse audio block by block and print the newest tuning result
    Listen(ListenArgs),

    /// Render every string of a tuning in turn, quietly, to one WAV file
    Session(SessionArgs),

    /// List the built-in tunings
    Tunings {
        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct ListenArgs {
    /// WAV recording to analyse
    #[arg(short, long, conflicts_with = "simulate")]
    input: Option<PathBuf>,

    /// Simulate a string ringing at this frequency in Hz
    #[arg(long)]
    simulate: Option<f32>,

    /// Seconds of simulated audio
    #[arg(long, default_value_t = 3.0)]
    seconds: f32,

    /// Target banjo string (D4, B3, G3, D3)
    #[arg(short, long, conflicts_with_all = ["target", "tuning", "custom_tuning"])]
    string: Option<String>,

    /// Target frequency in Hz
    #[arg(long, conflicts_with_all = ["tuning", "custom_tuning"])]
    target: Option<f32>,

    /// Built-in tuning; each block is compared with its nearest string
    #[arg(long, conflicts_with = "custom_tuning")]
    tuning: Option<String>,

    /// Custom tuning as `name|note:freq,note:freq,...`
    #[arg(long)]
    custom_tuning: Option<String>,

    /// Deliver blocks at capture speed instead of as fast as possible
    #[arg(long)]
    realtime: bool,

    /// Stop listening after this many seconds
    #[arg(long)]
    duration: Option<f32>,
}

#[derive(Args)]
struct SessionArgs {
    /// Output WAV path
    #[arg(short, long)]
    out: PathBuf,

    /// Built-in tuning to play
    #[arg(long, default_value = "Standard DGBD", conflicts_with = "custom_tuning")]
    tuning: String,

    /// Custom tuning as `name|note:freq,note:freq,...`
    #[arg(long)]
    custom_tuning: Option<String>,

    /// Playback volume in [0, 1], overrides the config file
    #[arg(long)]
    volume: Option<f32>,

    /// Seconds each string rings, overrides the config file
    #[arg(long)]
    seconds_per_string: Option<f32>,

    /// Sample rate of the rendered session
    #[arg(long, default_value_t = TONE_SAMPLE_RATE)]
    sample_rate: u32,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => TunerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => TunerConfig::default(),
    };
    if let Some(reference) = cli.reference {
        config.reference_pitch = reference;
    }
    let reference = config.reference_pitch();
    if reference.hz() != config.reference_pitch {
        warn!(
            "Reference pitch {} Hz is out of range, using {} Hz",
            config.reference_pitch,
            reference.hz()
        );
    }

    match cli.command {
        Commands::Tone {
            note,
            out,
            sample_rate,
            repeat,
        } => run_tone(&note, &out, sample_rate, repeat, reference),
        Commands::Listen(args) => run_listen(args, &config, reference),
        Commands::Session(args) => run_session(args, &config, reference),
        Commands::Tunings { json } => run_tunings(json),
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "banjo_tuner=debug,banjo_tuner_core=debug"
    } else {
        "banjo_tuner=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves a banjo string name or a plain number to a concert-pitch frequency.
fn parse_note(note: &str) -> Result<f32> {
    if let Some(string) = BanjoString::from_name(note) {
        return Ok(string.frequency_hz());
    }
    let hz: f32 = note
        .parse()
        .with_context(|| format!("{note:?} is neither a banjo string nor a frequency"))?;
    positive_hz(hz, "frequency")
}

fn positive_hz(hz: f32, what: &str) -> Result<f32> {
    if !(hz.is_finite() && hz > 0.0) {
        bail!("{what} must be a positive frequency, got {hz}");
    }
    Ok(hz)
}

/// Like [`positive_hz`], but also rejects frequencies too low to render.
fn audible_hz(hz: f32, what: &str) -> Result<f32> {
    let hz = positive_hz(hz, what)?;
    if hz < MIN_TONE_HZ {
        bail!("{what} of {hz} Hz is below the {MIN_TONE_HZ} Hz tone range");
    }
    Ok(hz)
}

fn run_tone(
    note: &str,
    out: &Path,
    sample_rate: u32,
    repeat: usize,
    reference: ReferencePitch,
) -> Result<()> {
    if sample_rate == 0 {
        bail!("sample rate must be positive");
    }
    let frequency = audible_hz(reference.scale(parse_note(note)?), "tone")?;
    let tone = synthesize_tone(frequency, sample_rate);
    write_tone(&tone, out, repeat.max(1))?;

    info!("Wrote {} to {}", note, out.display());
    println!(
        "{:.2} Hz (A4 = {} Hz): loop of {} samples ({:.3} s) at {} Hz",
        frequency,
        reference.hz(),
        tone.loop_length,
        tone.duration_secs(),
        tone.sample_rate
    );
    Ok(())
}

/// Opens a mono 16-bit PCM WAV file for writing.
fn create_wav(path: &Path, sample_rate: u32) -> Result<hound::WavWriter<BufWriter<File>>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    hound::WavWriter::create(path, spec).with_context(|| format!("failed to create {}", path.display()))
}

/// Writes `repeat` copies of the tone loop as mono 16-bit PCM.
fn write_tone(tone: &ToneBuffer, path: &Path, repeat: usize) -> Result<()> {
    let mut writer = create_wav(path, tone.sample_rate)?;
    for _ in 0..repeat {
        for &sample in &tone.samples {
            writer.write_sample(sample)?;
        }
    }
    writer.finalize().context("failed to finalize WAV file")?;
    Ok(())
}

fn resolve_target(args: &ListenArgs, reference: ReferencePitch) -> Result<Target> {
    if let Some(name) = &args.string {
        let string = BanjoString::from_name(name)
            .with_context(|| format!("unknown banjo string {name:?}"))?;
        return Ok(Target::Fixed(reference.scale(string.frequency_hz())));
    }
    if let Some(hz) = args.target {
        return Ok(Target::Fixed(positive_hz(hz, "target")?));
    }

    let tuning = match (&args.tuning, &args.custom_tuning) {
        (Some(name), _) => catalogue::find_tuning(name)
            .cloned()
            .with_context(|| format!("unknown tuning {name:?}"))?,
        (None, Some(encoded)) => decode_tuning(encoded)?,
        (None, None) => catalogue::FOUR_STRING_BANJO.tunings[0].clone(),
    };
    info!("Comparing against the nearest string of {}", tuning.name);
    Ok(Target::Nearest(tuning.rescaled(reference)))
}

fn run_listen(args: ListenArgs, config: &TunerConfig, reference: ReferencePitch) -> Result<()> {
    let target = resolve_target(&args, reference)?;
    let deadline = match args.duration {
        Some(secs) => {
            let deadline = Duration::try_from_secs_f32(secs)
                .ok()
                .filter(|duration| !duration.is_zero())
                .and_then(|duration| Instant::now().checked_add(duration))
                .with_context(|| format!("duration must be a positive number of seconds, got {secs}"))?;
            Some(deadline)
        }
        None => None,
    };
    let source: Box<dyn SampleSource> = match (&args.input, args.simulate) {
        (Some(path), _) => Box::new(WavSource::open(path)?),
        (None, Some(hz)) => {
            let hz = audible_hz(hz, "simulated string")?;
            Box::new(ToneSource::new(hz, config.sample_rate, args.seconds))
        }
        (None, None) => bail!("pass --input FILE or --simulate HZ"),
    };

    let (results_tx, results_rx) = latest_channel();
    let worker = AnalysisWorker::spawn(source, config, target, args.realtime, results_tx)?;

    follow_results(&results_rx, deadline, |result| {
        println!("{}", format_result(result));
    });

    let blocks = worker.stop()?;
    // A block finished after the deadline may still sit in the slot.
    if let Some(result) = results_rx.latest() {
        println!("{}", format_result(&result));
    }
    info!("Analysed {} blocks", blocks);
    Ok(())
}

/// Hands each newest result to `on_result` until the worker finishes or
/// `deadline` passes. Returns how many results were handed over.
fn follow_results(
    results: &LatestReceiver<TuningResult>,
    deadline: Option<Instant>,
    mut on_result: impl FnMut(&TuningResult),
) -> usize {
    let mut seen = 0;
    loop {
        let next = match deadline {
            None => results.wait(),
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                results.wait_timeout(remaining).ok()
            }
        };
        let Some(result) = next else {
            break;
        };
        on_result(&result);
        seen += 1;
    }
    seen
}

fn run_session(args: SessionArgs, config: &TunerConfig, reference: ReferencePitch) -> Result<()> {
    if args.sample_rate == 0 {
        bail!("sample rate must be positive");
    }
    let tuning = match &args.custom_tuning {
        Some(encoded) => decode_tuning(encoded)?,
        None => catalogue::find_tuning(&args.tuning)
            .cloned()
            .with_context(|| format!("unknown tuning {:?}", args.tuning))?,
    }
    .rescaled(reference);
    for note in &tuning.notes {
        audible_hz(note.frequency, &note.name)?;
    }

    let seconds = args.seconds_per_string.unwrap_or(config.seconds_per_string);
    if !(seconds.is_finite() && seconds > 0.0) {
        bail!("seconds per string must be positive, got {seconds}");
    }
    let volume = args
        .volume
        .map(clamp_volume)
        .unwrap_or_else(|| config.session_volume());

    let string_count = tuning.notes.len();
    let name = tuning.name.clone();
    let session = Session::new(tuning, args.sample_rate)
        .with_volume(volume)
        .with_seconds_per_string(seconds);

    let mut writer = create_wav(&args.out, args.sample_rate)?;
    let mut total = 0;
    for step in session.steps() {
        info!(
            "String {} at {:.2} Hz for {:.1} s",
            string_label(step.index, &step.note.name, string_count),
            step.note.frequency,
            step.samples.len() as f64 / args.sample_rate as f64
        );
        for &sample in &step.samples {
            writer.write_sample(sample)?;
        }
        total += step.samples.len();
    }
    writer.finalize().context("failed to finalize WAV file")?;

    println!(
        "{}: {} strings at volume {:.2}, {:.1} s written to {}",
        name,
        string_count,
        volume,
        total as f64 / args.sample_rate as f64,
        args.out.display()
    );
    Ok(())
}

fn format_result(result: &TuningResult) -> String {
    match result.detected_hz {
        Some(detected) => format!(
            "{:8.2} Hz -> {:7.2} Hz  {:+6.1} cents  {}",
            detected,
            result.target_hz,
            result.cent_deviation,
            result.status.label()
        ),
        None => format!("{:>8}          {:>24}", "--", result.status.label()),
    }
}

fn run_tunings(json: bool) -> Result<()> {
    let instruments = catalogue::all_instruments();
    if json {
        println!("{}", serde_json::to_string_pretty(&instruments)?);
        return Ok(());
    }

    for instrument in instruments {
        println!("{}", instrument.name);
        for tuning in &instrument.tunings {
            print_tuning(tuning);
        }
    }
    Ok(())
}

fn print_tuning(tuning: &Tuning) {
    println!("  {}", tuning.name);
    let count = tuning.notes.len();
    for (index, note) in tuning.notes.iter().enumerate() {
        println!(
            "    {:<8} {:>8.2} Hz",
            string_label(index, &note.name, count),
            note.frequency
        );
    }
    println!("    code: {}", encode_tuning(tuning));
}
