//! Worker entry point: run one narration job from a JSON file.
//!
//! ```text
//! narration-sync <job.json> [report.json]
//! ```
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Read the [`NarrationJob`].
//! 4. Create the [`tokio`] runtime.
//! 5. Build the provider adapters and the timing store from config.
//! 6. Wire Ctrl+C to the job's cancellation token.
//! 7. Run the pipeline and write the report (and audio, when an output path
//!    is given).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use narration_sync::{
    config::AppConfig,
    duration::EstimatorRegistry,
    pipeline::{NarrationJob, NarrationPipeline, NarrationReport},
    store::JsonFileTimingStore,
    stt::ApiTranscriber,
    tts::ApiSynthesizer,
};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

struct Args {
    job_path: PathBuf,
    output_path: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args_os().skip(1);
    let Some(job_path) = args.next() else {
        bail!("usage: narration-sync <job.json> [report.json]");
    };
    let output_path = args.next().map(PathBuf::from);
    if args.next().is_some() {
        bail!("usage: narration-sync <job.json> [report.json]");
    }
    Ok(Args {
        job_path: PathBuf::from(job_path),
        output_path,
    })
}

fn read_job(path: &Path) -> Result<NarrationJob> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading job file {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing job file {}", path.display()))
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn write_outputs(report: &NarrationReport, output: Option<&Path>, audio_format: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;

    let Some(output) = output else {
        println!("{json}");
        return Ok(());
    };

    std::fs::write(output, json).with_context(|| format!("writing report {}", output.display()))?;
    log::info!("report written to {}", output.display());

    if let Some(audio) = report.audio() {
        let audio_path = output.with_extension(audio_format);
        std::fs::write(&audio_path, audio)
            .with_context(|| format!("writing audio {}", audio_path.display()))?;
        log::info!("audio written to {}", audio_path.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Job
    let job = read_job(&args.job_path)?;
    log::info!(
        "narration-sync: job {:?} with {} units",
        job.project_id,
        job.units.len()
    );

    // 4. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating tokio runtime")?;

    // 5. Providers and store
    let registry = Arc::new(EstimatorRegistry::new(config.estimator.clone()));
    let mut pipeline = NarrationPipeline::new(
        config.clone(),
        registry,
        Arc::new(ApiSynthesizer::from_config(&config.tts)),
        Arc::new(
            ApiTranscriber::from_config(&config.stt).with_audio_format(&config.tts.response_format),
        ),
    );
    if config.storage.enabled {
        let dir = config.storage.resolved_dir();
        log::info!("timings will be stored under {}", dir.display());
        pipeline = pipeline.with_store(Arc::new(JsonFileTimingStore::new(dir)));
    }

    let report = rt.block_on(async {
        // 6. Ctrl+C → cancel between provider calls
        let cancel = pipeline.cancellation_token();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Ctrl+C received; cancelling after the current provider call");
                on_signal.cancel();
            }
        });

        // 7. Run
        pipeline.run(&job, &cancel).await
    })?;

    if !report.verification.success() {
        log::warn!(
            "narration-sync: job {:?} finished without accepted audio ({:?})",
            report.project_id,
            report.verification.outcome
        );
    }

    write_outputs(&report, args.output_path.as_deref(), &config.tts.response_format)
}
