//! Sabre action replay tool.
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

#[macro_use]
extern crate log;

#[macro_use]
extern crate serde_derive;

use anyhow::Context;
use docopt::Docopt;
use saber_action_ai::{
    ActionResult, DetectorManager, EngineConfig, PoseFrame, ReplayRecorder, TelemetryPacket,
    TelemetrySink,
};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::process::exit;

const USAGE: &str = "
Replays a recorded pose session through the sabre action detector.
The session file holds one JSON pose frame per line. `verify` re-runs a
saved recording and checks that it produces the same actions.

Usage:
  saber-replay <session> [--config=<path>] [--telemetry=<path>] [--record=<path>]
  saber-replay verify <recording> [--config=<path>]
  saber-replay (--version | -v)
  saber-replay (--help | -h)

Options:
    --config=<path>      YAML engine configuration. Missing keys keep their defaults.
    --telemetry=<path>   Append telemetry packets to this file, one JSON object per line.
    --record=<path>      Save the full session recording as JSON.
    --version, -v        Show version.
    --help, -h           Show this screen.
";

#[derive(Debug, Deserialize)]
struct Args {
    cmd_verify: bool,
    arg_session: Option<String>,
    arg_recording: Option<String>,
    flag_config: Option<String>,
    flag_telemetry: Option<String>,
    flag_record: Option<String>,
}

/// Telemetry sink writing JSON lines to a file.
struct JsonLinesSink {
    out: BufWriter<File>,
}

impl JsonLinesSink {
    fn open(path: &Path) -> Result<Self, anyhow::Error> {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .with_context(|| format!("Failed to open telemetry file {}", path.display()))?;
        Ok(JsonLinesSink {
            out: BufWriter::new(file),
        })
    }
}

impl TelemetrySink for JsonLinesSink {
    fn write(&mut self, pkt: &TelemetryPacket) -> Result<(), anyhow::Error> {
        let line = serde_json::to_string(pkt)?;
        writeln!(self.out, "{line}")?;
        Ok(())
    }
}

impl Drop for JsonLinesSink {
    fn drop(&mut self) {
        if let Err(e) = self.out.flush() {
            warn!("Failed to flush telemetry: {e}");
        }
    }
}

fn main() {
    let version = env!("CARGO_PKG_NAME").to_string() + ", version: " + env!("CARGO_PKG_VERSION");
    env_logger::init();

    let args: Args = Docopt::new(USAGE)
        .map(|d| d.help(true))
        .map(|d| d.version(Some(version)))
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    let outcome = match (&args.arg_session, &args.arg_recording) {
        (_, Some(recording)) if args.cmd_verify => verify(&args, recording),
        (Some(session), _) => run(&args, session),
        _ => Err(anyhow::anyhow!("Nothing to do")),
    };
    if let Err(e) = outcome {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        exit(1);
    }
}

fn load_config(path: Option<&str>) -> Result<EngineConfig, anyhow::Error> {
    match path {
        Some(path) => {
            let yaml = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {path}"))?;
            EngineConfig::from_yaml_str(&yaml).with_context(|| format!("Invalid config {path}"))
        }
        None => Ok(EngineConfig::default()),
    }
}

/// Saves a recording as JSON.
fn save_recording(recording: &ReplayRecorder, path: &Path) -> Result<(), anyhow::Error> {
    let f = BufWriter::new(File::create(path)?);
    serde_json::to_writer(f, recording)?;
    Ok(())
}

/// Loads a recording written by `save_recording`.
fn load_recording(path: &Path) -> Result<ReplayRecorder, anyhow::Error> {
    let f = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(f)?)
}

fn verify(args: &Args, path: &str) -> Result<(), anyhow::Error> {
    let recording = load_recording(Path::new(path))
        .with_context(|| format!("Failed to load recording {path}"))?;
    let config = load_config(args.flag_config.as_deref())?;
    let replayed = recording.replay(&mut DetectorManager::new(config)?);

    if replayed == recording.results {
        println!("{}: {} result(s) reproduced", path, replayed.len());
        return Ok(());
    }
    let first = replayed
        .iter()
        .zip(&recording.results)
        .position(|(a, b)| a != b)
        .unwrap_or(replayed.len().min(recording.results.len()));
    anyhow::bail!(
        "{}: replay diverges at result {} ({} recorded, {} replayed)",
        path,
        first,
        recording.results.len(),
        replayed.len()
    )
}

fn run(args: &Args, session: &str) -> Result<(), anyhow::Error> {
    let config = load_config(args.flag_config.as_deref())?;
    let mut manager = DetectorManager::new(config)?;
    if let Some(path) = &args.flag_telemetry {
        manager = manager.with_telemetry(Box::new(JsonLinesSink::open(Path::new(path))?));
    }
    if args.flag_record.is_some() {
        manager.enable_recording();
    }

    let session =
        File::open(session).with_context(|| format!("Failed to open session {session}"))?;
    let started = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%SZ");
    info!("Session {} started {}", manager.session_id(), started);

    let mut frames = 0usize;
    let mut completed: BTreeMap<&'static str, usize> = BTreeMap::new();
    for (number, line) in BufReader::new(session).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", number + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: PoseFrame = serde_json::from_str(&line)
            .with_context(|| format!("Line {} is not a pose frame", number + 1))?;
        let ts = frame.timestamp_ms();
        frames += 1;

        match manager.process(frame) {
            ActionResult::None => {}
            ActionResult::InProgress {
                action, confidence, ..
            } => {
                debug!("{:>8}ms  {} ({:.2})", ts, action.label(), confidence);
            }
            result @ ActionResult::Completed { .. } => {
                print_completed(&manager, ts, &result);
                if let Some(action) = result.action() {
                    *completed.entry(action.label()).or_default() += 1;
                }
            }
        }
    }

    println!("{} frame(s), stance at end: {}", frames, manager.stance());
    for (label, count) in &completed {
        println!("  {label}: {count}");
    }

    if let Some(path) = &args.flag_record {
        if let Some(recording) = manager.take_recording() {
            save_recording(&recording, Path::new(path))
                .with_context(|| format!("Failed to save recording {path}"))?;
            info!("Recording saved to {}", path);
        }
    }

    Ok(())
}

fn print_completed(manager: &DetectorManager, ts: u64, result: &ActionResult) {
    let ActionResult::Completed {
        action,
        quality,
        duration_ms,
        ..
    } = result
    else {
        return;
    };
    let clip = manager
        .clip_window(result, ts)
        .map(|w| format!("{}-{}ms", w.start_ms, w.end_ms))
        .unwrap_or_default();
    println!(
        "{:>8}ms  {:<16} {:<10} {:>5}ms  clip {}  {}",
        ts,
        action.label(),
        quality.as_str(),
        duration_ms,
        clip,
        result.feedback().unwrap_or("")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use saber_action_ai::{Landmark, LANDMARK_COUNT};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("saber-replay-{}-{}", std::process::id(), name))
    }

    #[test]
    fn recording_survives_a_file_round_trip() {
        let mut recording = ReplayRecorder::default();
        for ts in [0, 33, 66] {
            let frame = PoseFrame::new(vec![Landmark::new(0.5, 0.5); LANDMARK_COUNT], ts);
            recording.record_frame(&frame);
        }

        let path = temp_path("recording.json");
        save_recording(&recording, &path).unwrap();
        let loaded = load_recording(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(loaded.frames, recording.frames);
        assert!(loaded.results.is_empty());
    }

    #[test]
    fn missing_recording_is_an_error() {
        assert!(load_recording(&temp_path("missing.json")).is_err());
    }

    #[test]
    fn usage_parses_both_commands() {
        let args: Args = Docopt::new(USAGE)
            .and_then(|d| d.argv(["saber-replay", "verify", "rec.json"]).deserialize())
            .unwrap();
        assert!(args.cmd_verify);
        assert_eq!(args.arg_recording.as_deref(), Some("rec.json"));

        let args: Args = Docopt::new(USAGE)
            .and_then(|d| {
                d.argv(["saber-replay", "session.jsonl", "--record=out.json"])
                    .deserialize()
            })
            .unwrap();
        assert!(!args.cmd_verify);
        assert_eq!(args.arg_session.as_deref(), Some("session.jsonl"));
        assert_eq!(args.flag_record.as_deref(), Some("out.json"));
    }
}
