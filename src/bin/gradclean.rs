use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use gradclean::{
    events,
    io::{write_cleaned, Precision, RawRecording},
    remove_gradients, BaselineSpec, GradientConfig, Recording, SpacingPolicy, WindowSpec,
};

#[derive(Parser, Debug)]
#[command(name = "gradclean", about = "Remove MR gradient artifacts by average artifact subtraction")]
struct Args {
    /// Recording safetensors (data, sfreq, marker_samples, marker_labels)
    #[arg(long)]
    input: PathBuf,

    /// Output safetensors path
    #[arg(long)]
    output: PathBuf,

    /// Label of the scanner trigger markers
    #[arg(long, default_value = "Gradient/G  1")]
    event_label: String,

    /// Sliding window length in volumes (even values are rounded up).
    /// Omit to average over all volumes.
    #[arg(long)]
    window_length: Option<usize>,

    /// Baseline-correct each template before subtraction
    #[arg(long)]
    baseline_correction: bool,

    /// Baseline interval start, seconds after cycle onset
    #[arg(long, requires = "baseline_end")]
    baseline_start: Option<f64>,

    /// Baseline interval end, seconds after cycle onset
    #[arg(long, requires = "baseline_start")]
    baseline_end: Option<f64>,

    /// Fail instead of warning when marker gaps differ from the first gap
    #[arg(long)]
    strict_spacing: bool,

    /// Allowed gap deviation in samples
    #[arg(long, default_value_t = 0)]
    spacing_tolerance: usize,

    /// Store cleaned data as F64 instead of F32
    #[arg(long)]
    full_precision: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let raw = RawRecording::load(&args.input)?;
    let (signal, markers) = raw.into_parts()?;
    log::info!(
        "Loaded {} ch × {} samples @ {} Hz ({:.1} s), {} markers",
        signal.n_channels(),
        signal.n_times(),
        signal.sfreq(),
        signal.duration_secs(),
        markers.len()
    );
    log::debug!("marker labels: {:?}", events::labels(&markers));

    let interval = args.baseline_start.zip(args.baseline_end);
    let cfg = GradientConfig {
        event_label: args.event_label,
        window: WindowSpec::from_length(args.window_length)?,
        baseline: BaselineSpec::from_args(args.baseline_correction, interval),
        spacing: if args.strict_spacing { SpacingPolicy::Strict } else { SpacingPolicy::Warn },
        spacing_tolerance: args.spacing_tolerance,
        cancel: None,
    };

    let out = remove_gradients(&signal, &markers, &cfg)?;
    println!(
        "Cleaned {} cycles of {} samples (TR = {:.3} s)",
        out.cycle_starts.len(),
        out.repetition.samples,
        out.repetition.seconds
    );

    let precision = if args.full_precision { Precision::F64 } else { Precision::F32 };
    write_cleaned(&out, &args.output, precision)?;
    println!("Written → {}", args.output.display());

    Ok(())
}
