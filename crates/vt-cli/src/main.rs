//! VoxTune - offline pitch correction
//!
//! Usage:
//!   voxtune vocals.wav                              - snap to nearest semitone
//!   voxtune vocals.wav -c scale -s "C:maj"          - snap to C major
//!   voxtune vocals.wav -c scale -s "F# minor" -p    - also dump contours as JSON
//!   voxtune vocals.wav --f-min E2 --f-max A5        - narrow the pitch search range
//!
//! Writes `<stem>_pitch_corrected.wav` next to the input.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use vt_file::{
    BitDepth, DiagnosticsReport, corrected_output_path, diagnostics_path, load_audio, save_wav,
    write_diagnostics,
};
use vt_pitch::detection::YinEstimator;
use vt_pitch::synthesis::PsolaResynthesizer;
use vt_pitch::{
    AnalysisParams, AutotuneConfig, AutotunePipeline, CorrectionMode, ScaleModel, hz_to_midi,
    midi_to_note_name, note_to_hz,
};

#[derive(Parser, Debug)]
#[command(name = "voxtune", version, about = "Offline pitch correction for vocal recordings")]
struct Cli {
    /// Vocal recording (WAV)
    vocals_file: PathBuf,

    /// Correction method
    #[arg(short, long = "correction-method", value_enum, default_value_t = Method::NearestSemitone)]
    correction_method: Method,

    /// Scale for nearest-scale-degree correction, e.g. "C:maj", "F# minor"
    #[arg(short, long)]
    scale: Option<String>,

    /// Write original/corrected contours as JSON next to the output
    #[arg(short, long)]
    plot: bool,

    /// Median smoothing window in frames (odd)
    #[arg(long)]
    smoothing_window: Option<usize>,

    /// Lowest note to detect, e.g. "E2"
    #[arg(long, value_name = "NOTE")]
    f_min: Option<String>,

    /// Highest note to detect, e.g. "A5"
    #[arg(long, value_name = "NOTE")]
    f_max: Option<String>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Method {
    /// Nearest semitone
    #[value(name = "nearest-semitone", alias = "closest")]
    NearestSemitone,
    /// Nearest degree of --scale
    #[value(name = "nearest-scale-degree", alias = "scale")]
    NearestScaleDegree,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    // Scale problems surface before any audio is touched
    let mode = resolve_mode(cli.correction_method, cli.scale.as_deref())?;
    let config = resolve_config(cli)?;

    let audio = load_audio(&cli.vocals_file)
        .with_context(|| format!("Failed to load {}", cli.vocals_file.display()))?;
    if audio.num_channels() > 1 {
        log::warn!(
            "{} has {} channels, correcting the first one only",
            cli.vocals_file.display(),
            audio.num_channels()
        );
    }
    log::info!(
        "Loaded {} ({:.2} s @ {} Hz)",
        cli.vocals_file.display(),
        audio.duration(),
        audio.sample_rate
    );

    let mode_name = mode.name();
    let pipeline = AutotunePipeline::new(
        config.clone(),
        mode,
        YinEstimator::new(&config),
        PsolaResynthesizer::new(&config),
    )?;

    let output = pipeline
        .run(audio.first_channel(), audio.sample_rate)
        .context("Pitch correction failed")?;

    if let Some(hz) = output.corrected.iter().flatten().next() {
        log::debug!("First corrected note: {}", midi_to_note_name(hz_to_midi(hz)));
    }

    let output_path = corrected_output_path(&cli.vocals_file);
    save_wav(
        &output_path,
        &output.audio,
        audio.sample_rate,
        audio.bit_depth.unwrap_or(BitDepth::Int16),
    )
    .with_context(|| format!("Failed to write {}", output_path.display()))?;
    log::info!("Wrote {}", output_path.display());

    if cli.plot {
        let report_path = diagnostics_path(&cli.vocals_file);
        let source = cli
            .vocals_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let report = DiagnosticsReport::new(
            source,
            audio.sample_rate,
            &config.analysis,
            mode_name,
            output.original,
            output.corrected,
        )?;
        write_diagnostics(&report_path, &report)
            .with_context(|| format!("Failed to write {}", report_path.display()))?;
        log::info!("Wrote {}", report_path.display());
    }

    Ok(())
}

/// Correction mode from the command line; scale mode requires a valid scale
fn resolve_mode(method: Method, scale: Option<&str>) -> Result<CorrectionMode> {
    match method {
        Method::NearestSemitone => {
            if let Some(scale) = scale {
                log::warn!("--scale {scale:?} ignored for nearest-semitone correction");
            }
            Ok(CorrectionMode::NearestSemitone)
        }
        Method::NearestScaleDegree => {
            let Some(spec) = scale else {
                bail!("nearest-scale-degree correction requires --scale");
            };
            let scale: ScaleModel = spec
                .parse()
                .with_context(|| format!("Invalid scale {spec:?}"))?;
            log::debug!("Scale {} degrees {:?}", scale.name(), scale.degrees());
            Ok(CorrectionMode::NearestScaleDegree(scale))
        }
    }
}

/// Defaults, then the JSON file, then command-line overrides
fn resolve_config(cli: &Cli) -> Result<AutotuneConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            AutotuneConfig::from_json(&json)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => AutotuneConfig::default(),
    };

    if let Some(window) = cli.smoothing_window {
        config = config.with_smoothing_window(window);
    }
    if cli.f_min.is_some() || cli.f_max.is_some() {
        let analysis = AnalysisParams {
            f_min: note_override(cli.f_min.as_deref(), config.analysis.f_min)?,
            f_max: note_override(cli.f_max.as_deref(), config.analysis.f_max)?,
            ..config.analysis
        };
        log::debug!("Search range {:.1} .. {:.1} Hz", analysis.f_min, analysis.f_max);
        config = config.with_analysis(analysis);
    }

    config.validate()?;
    Ok(config)
}

/// Frequency of a note name, or `current` when none was given
fn note_override(note: Option<&str>, current: f64) -> Result<f64> {
    match note {
        Some(name) => note_to_hz(name).with_context(|| format!("Invalid note {name:?}")),
        None => Ok(current),
    }
}
