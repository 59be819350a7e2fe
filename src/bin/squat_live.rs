use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use squat_judge::camera::OpenCvCamera;
use squat_judge::config::Config;
use squat_judge::judge::{JudgeSession, TopStatus};
use squat_judge::osc::OscSink;
use squat_judge::pose::PoseDetector;
use squat_judge::replay::LandmarkRecorder;
use squat_judge::telemetry::{JsonLinesSink, TelemetrySink};

const CONFIG_PATH: &str = "config.toml";

/// カメラまたは動画からリアルタイムにスクワットを判定する
#[derive(Parser, Debug)]
#[command(name = "squat_live", version, about = "Judge squats live from a camera or a video file")]
struct Args {
    /// TOML config file (defaults to ./config.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Read frames from a video file instead of the camera
    #[arg(long, value_name = "FILE")]
    video: Option<PathBuf>,

    /// Camera index (overrides camera.index)
    #[arg(long)]
    camera: Option<i32>,

    /// Record detected landmarks as JSON Lines for later replay
    #[arg(long, value_name = "FILE")]
    record: Option<PathBuf>,

    /// Write per-frame reports as JSON Lines
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Send per-frame reports over OSC to this address (overrides telemetry.osc_addr)
    #[arg(long, value_name = "ADDR")]
    osc: Option<String>,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::load_or_default(CONFIG_PATH),
    };

    println!("Squat Judge - live");
    let g = &config.geometry;
    println!(
        "Geometry: depth_margin={}, lockout_margin={}, torso<={}deg, side_visibility>={}",
        g.depth_margin, g.lockout_margin, g.torso_vertical_deg_threshold, g.min_side_visibility
    );
    println!("横向きに立ち、全身がカメラに収まるようにしてください");
    println!();

    let mut camera = match &args.video {
        Some(path) => OpenCvCamera::open_file(path)?,
        None => OpenCvCamera::open(
            args.camera.unwrap_or(config.camera.index),
            Some(config.camera.width),
            Some(config.camera.height),
        )?,
    };
    let (width, height) = camera.resolution();
    println!("Input: {}x{}", width, height);

    let mut detector = PoseDetector::from_config(&config.detector)?;
    println!("Model loaded: {}", config.detector.model_path);

    let mut sinks: Vec<Box<dyn TelemetrySink>> = Vec::new();
    if let Some(path) = &args.output {
        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        sinks.push(Box::new(JsonLinesSink::new(BufWriter::new(file))));
    }
    if let Some(addr) = args.osc.as_ref().or(config.telemetry.osc_addr.as_ref()) {
        sinks.push(Box::new(OscSink::new(addr, &config.telemetry.osc_prefix)?));
        println!("OSC telemetry -> {}", addr);
    }

    let mut recorder = match &args.record {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
            Some(LandmarkRecorder::new(BufWriter::new(file)))
        }
        None => None,
    };

    let mut session = JudgeSession::new(&config);
    let started = Instant::now();
    let mut last_status = TopStatus::Idle;
    let mut last_reps = 0;

    // FPS計測
    let mut fps_frames = 0u32;
    let mut fps_timer = Instant::now();

    loop {
        if args.max_frames.is_some_and(|max| session.stats().frames >= max) {
            break;
        }

        let frame = match or_stop("capture", camera.read_frame()) {
            Some(Some(f)) => f,
            Some(None) => {
                info!("end of video");
                break;
            }
            None => break,
        };

        let Some(landmarks) = or_stop("detection", detector.detect(&frame)) else {
            break;
        };
        if let Some(rec) = recorder.as_mut() {
            rec.record(landmarks.as_ref(), Some(started.elapsed().as_millis() as u64))?;
        }

        let report = session.process(landmarks.as_ref());
        for sink in sinks.iter_mut() {
            if let Err(e) = sink.publish(&report) {
                warn!("telemetry publish failed: {}", e);
            }
        }

        if report.top_status != last_status || report.rep_count != last_reps {
            println!(
                "Side:{:<5}  Reps:{}  State:{}",
                report.visible_side.as_str(),
                report.rep_count,
                report.top_status.as_str()
            );
            last_status = report.top_status;
            last_reps = report.rep_count;
        }

        fps_frames += 1;
        let elapsed = fps_timer.elapsed().as_secs_f32();
        if elapsed >= 5.0 {
            info!("FPS: {:.1}", fps_frames as f32 / elapsed);
            fps_frames = 0;
            fps_timer = Instant::now();
        }
    }

    for sink in sinks.iter_mut() {
        sink.flush()?;
    }
    if let Some(rec) = recorder {
        let frames = rec.frames();
        rec.finish()?;
        println!("Recorded {} frames", frames);
    }

    let stats = session.stats();
    println!();
    println!(
        "Reps: {}  ({} frames, {} detected, detection lost {} times)",
        stats.reps, stats.frames, stats.detected_frames, stats.sustained_dropouts
    );
    println!("Shutting down...");
    io::stdout().flush()?;
    Ok(())
}

/// カメラ・検出器のエラーはログに出してループを終える（集計は出力する）
fn or_stop<T>(stage: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            error!("{} stopped: {:#}", stage, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_stop_passes_values() {
        assert_eq!(or_stop("capture", Ok(Some(3))), Some(Some(3)));
        assert_eq!(or_stop::<Option<i32>>("capture", Ok(None)), Some(None));
    }

    #[test]
    fn test_or_stop_ends_on_any_stage_error() {
        assert_eq!(or_stop::<Option<i32>>("capture", Err(anyhow::anyhow!("camera unplugged"))), None);
        assert_eq!(or_stop::<Option<i32>>("detection", Err(anyhow::anyhow!("inference failed"))), None);
    }
}
