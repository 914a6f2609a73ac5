//! Diagnostic entry point for the mastering pipeline. Mirrors
//! `fingerprint-server`'s role as the pipeline's front door, but
//! local-only — no network surface, no batch queue, no download endpoint
//! (all three are out of scope).
//!
//! Two subcommands exercise the two halves of the engine:
//! `analyze` runs fingerprinting + target generation on a whole file;
//! `stream` drives the full Chunked Stream Engine and writes `AURC`-framed
//! chunks to a file, the way a remote surface would consume them.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use auralis_fingerprint::{BatchExtractor, FingerprintExtractor};
use auralis_mastering::{generate, Preset};
use auralis_pcm::{PcmSource, SymphoniaSource, TrackId};
use auralis_stream::{encode_chunk, BitDepth, EngineConfig, StreamEngine};

#[derive(Parser)]
#[command(name = "auralis-cli", about = "Analyze or stream-master a track")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract a fingerprint and resolve a mastering target; prints JSON.
    Analyze {
        path: PathBuf,
        #[arg(long, default_value = "adaptive")]
        preset: String,
    },
    /// Stream a track through the full Chunked Stream Engine, writing
    /// `AURC`-framed chunks to `--out`.
    Stream {
        path: PathBuf,
        #[arg(long, default_value = "adaptive")]
        preset: String,
        #[arg(long, default_value_t = 1.0)]
        intensity: f32,
        #[arg(long, default_value = "out.aurc")]
        out: PathBuf,
        #[arg(long, default_value = "16")]
        bit_depth: u16,
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct Report {
    path: String,
    preset: String,
    confidence: f32,
    fingerprint: auralis_fingerprint::Fingerprint,
    target: auralis_mastering::MasteringTarget,
}

fn parse_preset(name: &str) -> Result<Preset> {
    match name.to_ascii_lowercase().as_str() {
        "adaptive" => Ok(Preset::Adaptive),
        "gentle" => Ok(Preset::Gentle),
        "warm" => Ok(Preset::Warm),
        "bright" => Ok(Preset::Bright),
        "punchy" => Ok(Preset::Punchy),
        other => anyhow::bail!("unknown preset '{other}' (expected adaptive, gentle, warm, bright, punchy)"),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let result = match Cli::parse().command {
        Command::Analyze { path, preset } => run_analyze(path, preset),
        Command::Stream { path, preset, intensity, out, bit_depth, cache_dir } => {
            run_stream(path, preset, intensity, out, bit_depth, cache_dir)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_analyze(path: PathBuf, preset_name: String) -> Result<()> {
    let preset = parse_preset(&preset_name)?;

    let source = SymphoniaSource::open(&path).with_context(|| format!("opening {}", path.display()))?;
    let result = BatchExtractor.analyze(&source).context("extracting fingerprint")?;
    let target = generate(&result.fingerprint, preset);

    let report = Report {
        path: path.display().to_string(),
        preset: preset_name,
        confidence: result.confidence,
        fingerprint: result.fingerprint,
        target,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_stream(
    path: PathBuf,
    preset_name: String,
    intensity: f32,
    out: PathBuf,
    bit_depth: u16,
    cache_dir: Option<PathBuf>,
) -> Result<()> {
    let preset = parse_preset(&preset_name)?;
    let bit_depth = match bit_depth {
        16 => BitDepth::Sixteen,
        24 => BitDepth::TwentyFour,
        other => anyhow::bail!("unsupported --bit-depth {other} (expected 16 or 24)"),
    };

    let cache_dir = cache_dir.unwrap_or_else(|| std::env::temp_dir().join("auralis-fingerprint-cache"));
    std::fs::create_dir_all(&cache_dir).with_context(|| format!("creating cache dir {}", cache_dir.display()))?;

    let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build()?;
    runtime.block_on(async move {
        let engine = StreamEngine::new(EngineConfig::default(), &cache_dir)
            .map_err(|err| anyhow::anyhow!(err.to_string()))?;

        let track_id = TrackId::from_path(&path).with_context(|| format!("stat-ing {}", path.display()))?;
        let source: Arc<dyn PcmSource> =
            Arc::new(SymphoniaSource::open(&path).with_context(|| format!("opening {}", path.display()))?);

        let session_id = engine.create_session().await;
        engine.load(session_id, track_id, source).await.map_err(|err| anyhow::anyhow!(err.to_string()))?;
        engine.set_preset(session_id, preset).await.map_err(|err| anyhow::anyhow!(err.to_string()))?;
        engine.set_intensity(session_id, intensity).await.map_err(|err| anyhow::anyhow!(err.to_string()))?;

        let mut file = File::create(&out).with_context(|| format!("creating {}", out.display()))?;
        let mut chunk_count = 0u32;
        while let Some(chunk) = engine.pull_next_chunk(session_id).await.map_err(|err| anyhow::anyhow!(err.to_string()))? {
            let bytes = encode_chunk(&chunk, bit_depth);
            file.write_all(&bytes).with_context(|| format!("writing chunk {} to {}", chunk.index, out.display()))?;
            chunk_count += 1;
        }

        let profile = engine.content_profile(session_id).await.map_err(|err| anyhow::anyhow!(err.to_string()))?;
        tracing::info!(
            chunks = chunk_count,
            preset = %preset_name,
            warning = profile.warning,
            out = %out.display(),
            "stream complete"
        );
        Ok(())
    })
}
