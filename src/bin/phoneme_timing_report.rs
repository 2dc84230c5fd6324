use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use phoneme_timing_rs::audio::decode_audio_bytes;
use phoneme_timing_rs::report::{
    aggregate_reports, compute_utterance_report, Meta, Report, SpectralSummary, UtteranceReport,
    SCHEMA_VERSION,
};
use phoneme_timing_rs::{
    DurationPipeline, DurationPipelineBuilder, EstimatorConfig, EstimatorKind, PipelineConfig,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[path = "phoneme_timing_report/json_report_formatter.rs"]
mod json_report_formatter;

const AUDIO_EXTENSIONS: [&str; 2] = ["wav", "flac"];
const DURATION_SIDECAR_EXTENSION: &str = "duration";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Strategy {
    /// Linguistic prior reshaped by spectral-flux energy.
    Energy,
    /// Spectral-flux peaks mapped onto phoneme boundaries.
    Boundary,
}

impl Strategy {
    fn estimator_kind(self) -> EstimatorKind {
        match self {
            Self::Energy => EstimatorKind::EnergyRefined,
            Self::Boundary => EstimatorKind::BoundaryMapped,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "phoneme_timing_report")]
#[command(about = "Estimate per-phoneme durations for synthesized utterances and write a JSON report")]
struct Args {
    /// Audio files (WAV or FLAC) or directories to scan for them.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Transcript used for every input; otherwise each file's sibling `.txt`.
    #[arg(long, env = "PHONEME_TIMING_REPORT_TEXT")]
    text: Option<String>,
    #[arg(
        long,
        env = "PHONEME_TIMING_REPORT_STRATEGY",
        value_enum,
        default_value_t = Strategy::Energy
    )]
    strategy: Strategy,
    /// Estimator config JSON; missing fields take their defaults.
    #[arg(long, env = "PHONEME_TIMING_REPORT_CONFIG")]
    config: Option<PathBuf>,
    /// Pronunciation dictionary JSON; the bundled one is used otherwise.
    #[arg(long, env = "PHONEME_TIMING_REPORT_DICTIONARY")]
    dictionary: Option<PathBuf>,
    #[arg(long, env = "PHONEME_TIMING_REPORT_OUT")]
    out: Option<PathBuf>,
    #[arg(long, env = "PHONEME_TIMING_REPORT_LIMIT")]
    limit: Option<usize>,
}

#[derive(Debug)]
struct Case {
    id: String,
    audio_path: PathBuf,
    transcript: String,
    /// Seconds from a sibling `.duration` file, as a synthesis engine would report them.
    reported_duration_s: Option<f64>,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "phoneme_timing_rs=warn,phoneme_timing_report=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();

    let estimator_config = match args.config.as_ref() {
        Some(path) => EstimatorConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => EstimatorConfig::default(),
    };
    let pipeline_config = PipelineConfig {
        dictionary_path: args
            .dictionary
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned()),
        estimator: estimator_config,
    };
    let pipeline = DurationPipelineBuilder::new(pipeline_config)
        .with_estimator_kind(args.strategy.estimator_kind())
        .build()
        .map_err(|err| format!("Failed to build duration pipeline: {err}"))?;

    let mut cases = load_cases(&args.inputs, args.text.as_deref())?;
    if let Some(limit) = args.limit {
        cases.truncate(limit);
    }
    if cases.is_empty() {
        return Err("No cases selected after applying inputs/limit.".to_string());
    }

    let progress = ProgressBar::new(cases.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-"),
    );
    progress.set_message("starting...");

    let started = Instant::now();
    let mut utterances: Vec<UtteranceReport> = Vec::with_capacity(cases.len());
    for case in &cases {
        progress.set_message(case.id.clone());
        match process_case(&pipeline, case) {
            Ok(report) => utterances.push(report),
            Err(err) => {
                progress.suspend(|| tracing::warn!(case = %case.id, error = %err, "skipping case"))
            }
        }
        progress.inc(1);
    }
    progress.finish_with_message("done");

    if utterances.is_empty() {
        return Err("Every selected case failed; no report written.".to_string());
    }

    let aggregates = aggregate_reports(&utterances);
    tracing::info!(
        utterances = aggregates.counts.utterances,
        phonemes = aggregates.counts.phonemes,
        fallbacks = aggregates.counts.fallbacks,
        elapsed_s = format!("{:.3}", started.elapsed().as_secs_f64()),
        "estimation finished"
    );

    let config = pipeline.config();
    let report = Report {
        schema_version: SCHEMA_VERSION,
        meta: Meta {
            generated_at: Utc::now().to_rfc3339(),
            strategy: pipeline.estimator_kind().as_str().to_string(),
            dictionary: args
                .dictionary
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "bundled".to_string()),
            spectral: SpectralSummary {
                n_fft: config.spectral.n_fft,
                hop_length: config.spectral.hop_length,
                n_mels: config.spectral.n_mels,
                energy_factor_min: config.energy_factor_min,
                energy_factor_max: config.energy_factor_max,
            },
            case_count: utterances.len(),
        },
        utterances,
        aggregates,
    };

    let out_path = resolve_out_path(args.out.as_ref());
    json_report_formatter::write_report(&out_path, &report)?;
    println!("{}", out_path.display());
    Ok(())
}

fn process_case(pipeline: &DurationPipeline, case: &Case) -> Result<UtteranceReport, String> {
    let audio_bytes = fs::read(&case.audio_path).map_err(|err| {
        format!(
            "Failed to read audio '{}': {err}",
            case.audio_path.display()
        )
    })?;
    // Without a sidecar the decoded length stands in, so such audio must decode.
    let audio_duration_s = match case.reported_duration_s {
        Some(seconds) => seconds,
        None => decode_audio_bytes(&audio_bytes)
            .map_err(|err| {
                format!(
                    "{}: {err} (add a .{DURATION_SIDECAR_EXTENSION} file to report it as a fallback)",
                    case.audio_path.display()
                )
            })?
            .duration_s(),
    };

    let phonemes = pipeline
        .phonemize(&case.transcript)
        .map_err(|err| format!("{}: phonemize failed: {err}", case.id))?;
    let outcome = pipeline
        .estimate_outcome(&audio_bytes, &phonemes, audio_duration_s)
        .map_err(|err| format!("{}: estimate failed: {err}", case.id))?;
    compute_utterance_report(&case.id, &phonemes, &outcome, audio_duration_s)
        .map_err(|err| format!("{}: report failed: {err}", case.id))
}

fn load_cases(inputs: &[PathBuf], text: Option<&str>) -> Result<Vec<Case>, String> {
    let mut audio_files = Vec::new();
    for input in inputs {
        ensure_exists(input, "input")?;
        if input.is_dir() {
            collect_audio_files(input, &mut audio_files)?;
        } else {
            audio_files.push(input.clone());
        }
    }

    audio_files
        .into_iter()
        .map(|audio_path| {
            let transcript = match text {
                Some(text) => text.to_string(),
                None => read_sibling_transcript(&audio_path)?,
            };
            let id = audio_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| audio_path.display().to_string());
            let reported_duration_s = read_duration_sidecar(&audio_path)?;
            Ok(Case {
                id,
                audio_path,
                transcript,
                reported_duration_s,
            })
        })
        .collect()
}

fn collect_audio_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), String> {
    let mut entries = fs::read_dir(dir)
        .map_err(|err| format!("Failed to read directory '{}': {err}", dir.display()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| format!("Failed to list directory '{}': {err}", dir.display()))?;
    entries.sort_by_key(|entry| entry.path());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            collect_audio_files(&path, out)?;
        } else if has_audio_extension(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

fn read_sibling_transcript(audio_path: &Path) -> Result<String, String> {
    let transcript_path = audio_path.with_extension("txt");
    ensure_exists(&transcript_path, "transcript (or pass --text)")?;
    fs::read_to_string(&transcript_path)
        .map(|text| text.trim().to_string())
        .map_err(|err| {
            format!(
                "Failed to read transcript '{}': {err}",
                transcript_path.display()
            )
        })
}

fn resolve_out_path(out: Option<&PathBuf>) -> PathBuf {
    if let Some(path) = out {
        return path.clone();
    }

    let run_id = Utc::now().format("%Y%m%dT%H%M%SZ");
    PathBuf::from("target")
        .join("phoneme_timing_reports")
        .join(format!("phoneme-timing-report-{run_id}.json"))
}

fn read_duration_sidecar(audio_path: &Path) -> Result<Option<f64>, String> {
    let sidecar = audio_path.with_extension(DURATION_SIDECAR_EXTENSION);
    if !sidecar.is_file() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&sidecar)
        .map_err(|err| format!("Failed to read '{}': {err}", sidecar.display()))?;
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
        .map(Some)
        .ok_or_else(|| {
            format!(
                "'{}' must hold a positive duration in seconds, got '{}'",
                sidecar.display(),
                raw.trim()
            )
        })
}

fn ensure_exists(path: &Path, what: &str) -> Result<(), String> {
    match path.try_exists() {
        Ok(true) => Ok(()),
        Ok(false) => Err(format!("No {what} at '{}'", path.display())),
        Err(err) => Err(format!("Cannot access {what} at '{}': {err}", path.display())),
    }
}
