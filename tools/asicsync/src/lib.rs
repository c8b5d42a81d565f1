pub mod channel;
pub mod client;
pub mod config;
pub mod encoder;
pub mod entries;
pub mod errors;
pub mod replay;
pub mod runtime;
pub mod types;
pub mod waiter;

use clap::{error::ErrorKind, Parser};
use config::{load_config, CliOverrides, ClientConfig};
use errors::SyncError;
use replay::recording::SessionRecording;
use replay::replayer::reissue_recording;
use runtime::ProductionRuntime;
use std::path::PathBuf;

/// Exit code when a re-driven recording does not reproduce itself.
pub const EXIT_DRIFT: i32 = 2;

#[derive(Debug, Clone, Parser)]
#[command(name = "asicsync")]
#[command(about = "Synchronous set-request correlation over an ASIC state channel")]
pub struct Cli {
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    pub sync_mode: bool,
    #[arg(long, default_value_t = false)]
    pub record: bool,
    #[arg(long)]
    pub record_file: Option<PathBuf>,
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    #[arg(long, default_value_t = false)]
    pub print_config: bool,
    #[arg(long, conflicts_with = "verify")]
    pub replay: Option<PathBuf>,
    #[arg(long)]
    pub verify: Option<PathBuf>,
}

pub fn run() -> Result<i32, SyncError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let runtime = ProductionRuntime::new();
    run_with_runtime(&args, &runtime)
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    runtime: &ProductionRuntime,
) -> Result<i32, SyncError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(SyncError::Cli(error.to_string())),
        },
    };

    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        sync_mode: cli.sync_mode,
        record: cli.record,
        record_file: cli.record_file.clone(),
        timeout_ms: cli.timeout_ms,
    };
    let cfg = load_config(&overrides, runtime.file_system.as_ref())?;

    if cli.print_config {
        let rendered =
            serde_json::to_string_pretty(&cfg).map_err(|e| SyncError::Io(e.to_string()))?;
        runtime.terminal.write_line(&rendered)?;
        return Ok(0);
    }

    if let Some(path) = &cli.replay {
        let recording = load_recording(runtime, path)?;
        let summary = recording.summary();
        runtime.terminal.write_line(&format!(
            "set={} bulk_set={} responses={} failures={} fingerprint={}",
            summary.sets,
            summary.bulk_sets,
            summary.responses,
            summary.no_responses,
            recording.fingerprint()
        ))?;
        return Ok(0);
    }

    if let Some(path) = &cli.verify {
        let recording = load_recording(runtime, path)?;
        let report = reissue_recording(&recording)?;
        for mismatch in &report.mismatches {
            runtime.terminal.write_line(&format!(
                "request {} differs: expected={:?} actual={:?}",
                mismatch.position,
                mismatch.expected.as_ref().map(|m| m.key.as_str()),
                mismatch.actual.as_ref().map(|m| m.key.as_str()),
            ))?;
        }
        if report.identical && report.mismatches.is_empty() {
            runtime.terminal.write_line(&format!(
                "verify ok: requests={} lines={}",
                report.statuses.len(),
                report.regenerated.len()
            ))?;
            return Ok(0);
        }
        runtime.terminal.write_line(&format!(
            "verify drift: first differing line={}",
            first_divergence(recording.raw_lines(), &report.regenerated)
        ))?;
        return Ok(EXIT_DRIFT);
    }

    runtime.terminal.write_line(&describe_config(&cfg))?;
    Ok(0)
}

fn load_recording(
    runtime: &ProductionRuntime,
    path: &std::path::Path,
) -> Result<SessionRecording, SyncError> {
    let text = runtime.file_system.read_to_string(path)?;
    SessionRecording::parse(&text)
}

/// 1-based line number of the first difference.
fn first_divergence(recorded: &[String], regenerated: &[String]) -> usize {
    recorded
        .iter()
        .zip(regenerated)
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| recorded.len().min(regenerated.len()))
        + 1
}

pub fn describe_config(cfg: &ClientConfig) -> String {
    let recording = if cfg.recording.enabled {
        cfg.recording.path.display().to_string()
    } else {
        "off".to_string()
    };
    format!(
        "sync_mode={} timeout_ms={} recording={recording}",
        cfg.sync_mode, cfg.response_timeout_ms
    )
}
