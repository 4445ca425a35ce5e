//! Scribe Player - headless playback harness
//!
//! Drives a simulated audio engine through a full session lifecycle,
//! including replay auditions while paused. Then renders a few seconds of
//! 60Hz playback through every playhead smoother and prints the smoothness
//! report for each.
//!
//! ## Command line flags
//!
//! - `--smoother <name>`: only score one smoother (`none`, `linear-interpolation`,
//!   `predictive-extrapolation`, `phase-locked-loop`)
//! - `--seconds <n>`: simulated playback length per smoother (default 5)
//! - `--config <path>`: config file (default `<config dir>/scribe/config.yaml`)
//! - `--help`: print usage

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use scribe_core::clock::{Clock, ManualClock};
use scribe_core::config::{default_config_path, load_config, ScribeConfig};
use scribe_core::engine::{AudioMetadata, SimulatedEngine};
use scribe_core::session::{SessionManager, SessionState};
use scribe_core::smoothing::{MetricsAwarePlayheadSmoother, PlayheadSmoother, SmootherKind};
use scribe_core::types::{frames_to_seconds, SeekDirection, NOMINAL_SAMPLE_RATE};

const HARNESS_FILE: &str = "harness.wav";
/// Ten minutes of audio at the nominal rate
const HARNESS_FRAMES: u64 = 600 * NOMINAL_SAMPLE_RATE as u64;
const RENDER_HZ: u64 = 60;
/// The simulated engine reports position every third paint
const REPORT_EVERY_TICKS: u64 = 3;

const USAGE: &str = "\
Usage: scribe-player [OPTIONS]

Options:
  --smoother <name>   Score only this smoother
                      (none, linear-interpolation, predictive-extrapolation, phase-locked-loop)
  --seconds <n>       Seconds of simulated playback per smoother [default: 5]
  --config <path>     Configuration file
  --help              Print this help";

struct Args {
    smoother: Option<SmootherKind>,
    seconds: u64,
    config_path: Option<PathBuf>,
    help: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args {
        smoother: None,
        seconds: 5,
        config_path: None,
        help: false,
    };

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => parsed.help = true,
            "--smoother" => {
                let name = args.next().context("--smoother requires a name")?;
                match SmootherKind::parse(&name) {
                    Some(kind) => parsed.smoother = Some(kind),
                    None => bail!("unknown smoother '{}'", name),
                }
            }
            "--seconds" => {
                let value = args.next().context("--seconds requires a value")?;
                parsed.seconds = value
                    .parse()
                    .with_context(|| format!("invalid --seconds value '{}'", value))?;
            }
            "--config" => {
                let value = args.next().context("--config requires a path")?;
                parsed.config_path = Some(PathBuf::from(value));
            }
            other => bail!("unexpected argument '{}'\n\n{}", other, USAGE),
        }
    }
    Ok(parsed)
}

fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        println!("{}", USAGE);
        return Ok(());
    }

    // Initialize logger - set RUST_LOG=debug for per-tick smoothing detail
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("scribe-player starting up");

    let config_path = args.config_path.clone().unwrap_or_else(default_config_path);
    let config: ScribeConfig = load_config(&config_path);

    walk_session(&config)?;

    let kinds = match args.smoother {
        Some(kind) => vec![kind],
        None => SmootherKind::ALL.to_vec(),
    };
    for kind in kinds {
        let report = score_smoother(kind, &config, args.seconds)?;
        println!();
        println!("=== {} ===", kind);
        println!("{}", report);
    }
    Ok(())
}

fn harness_engine() -> Arc<SimulatedEngine> {
    Arc::new(SimulatedEngine::new().with_file(
        HARNESS_FILE,
        AudioMetadata {
            sample_rate: NOMINAL_SAMPLE_RATE,
            frame_count: HARNESS_FRAMES,
        },
    ))
}

/// Run one session through every lifecycle intent and print each state
fn walk_session(config: &ScribeConfig) -> Result<()> {
    let engine = harness_engine();
    let session =
        SessionManager::with_event_capacity(engine.clone(), config.playback.event_capacity);
    let events = session.subscribe();

    session.load(HARNESS_FILE)?;
    session.play()?;
    let playback = session
        .context()
        .playback_handle()
        .context("no playback channel after play")?;
    engine.advance(playback, NOMINAL_SAMPLE_RATE as u64)?;

    session.seek_by_amount(SeekDirection::Forward, config.playback.seek_step_ms)?;
    session.pause()?;
    session.replay_last_millis(config.playback.replay_window_ms)?;
    session.step_and_replay(SeekDirection::Backward, config.playback.replay_window_ms)?;
    if let Some(audition) = session.audition_handle() {
        engine.advance(audition, NOMINAL_SAMPLE_RATE as u64)?;
    }
    session.resume()?;
    session.stop()?;

    while let Ok(event) = events.try_recv() {
        println!("event: {:?}", event);
    }
    println!(
        "session finished in {} at {:.3}s of {:.3}s",
        session.state(),
        session.playback_position_seconds(),
        session.total_duration_seconds()
    );
    session.close()?;
    Ok(())
}

/// Render `seconds` of 60Hz playback through `kind` and report its scores
fn score_smoother(kind: SmootherKind, config: &ScribeConfig, seconds: u64) -> Result<String> {
    let clock = Arc::new(ManualClock::new(0));
    let smoother = MetricsAwarePlayheadSmoother::new(
        kind.build(clock.clone()),
        config.smoothing.metrics_window,
        clock.clone(),
    )
    .with_log_interval(config.smoothing.metrics_log_interval);

    let engine = harness_engine();
    let session =
        SessionManager::with_event_capacity(engine.clone(), config.playback.event_capacity);
    session.load(HARNESS_FILE)?;
    session.play()?;
    let playback = session
        .context()
        .playback_handle()
        .context("no playback channel after play")?;

    let ticks = seconds * RENDER_HZ;
    let mut last_ms = clock.now_ms();
    let mut reported_frames = 0u64;
    for tick in 1..=ticks {
        clock.set(tick * 1000 / RENDER_HZ);
        let now = clock.now_ms();

        if tick % REPORT_EVERY_TICKS == 0 {
            let due = tick * NOMINAL_SAMPLE_RATE as u64 / RENDER_HZ;
            engine.advance(playback, due - reported_frames)?;
            reported_frames = due;
        }

        let ctx = session.context();
        if ctx.state() != SessionState::Playing {
            break;
        }
        let result = smoother.update_and_get_smoothed_position(
            ctx.playhead_frame(),
            now - last_ms,
            ctx.state(),
        );
        log::trace!(
            "tick {}: {:.4}s (target {:.4}s)",
            tick,
            frames_to_seconds(result.smoothed_frame, ctx.sample_rate()),
            frames_to_seconds(ctx.playhead_frame(), ctx.sample_rate())
        );
        last_ms = now;
    }

    session.stop()?;
    Ok(smoother.metrics_report())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_defaults() {
        let parsed = args(&[]).unwrap();
        assert_eq!(parsed.seconds, 5);
        assert!(parsed.smoother.is_none());
        assert!(!parsed.help);
    }

    #[test]
    fn test_parse_flags() {
        let parsed = args(&[
            "--smoother",
            "PHASE-LOCKED-LOOP",
            "--seconds",
            "2",
            "--config",
            "x.yaml",
        ])
        .unwrap();
        assert_eq!(parsed.smoother, Some(SmootherKind::PhaseLockedLoop));
        assert_eq!(parsed.seconds, 2);
        assert_eq!(parsed.config_path, Some(PathBuf::from("x.yaml")));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(args(&["--smoother", "cubic"]).is_err());
        assert!(args(&["--seconds"]).is_err());
        assert!(args(&["--verbose"]).is_err());
    }

    #[test]
    fn test_session_walk() {
        walk_session(&ScribeConfig::default()).unwrap();
    }

    #[test]
    fn test_scores_every_smoother() {
        let config = ScribeConfig::default();
        for kind in SmootherKind::ALL {
            let report = score_smoother(kind, &config, 1).unwrap();
            assert!(report.ends_with(&format!("Smoother Type: {}", kind.name())), "{}", report);
        }
    }
}
