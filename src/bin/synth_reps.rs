use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use squat_judge::pose::{Landmark, LandmarkFrame, LandmarkName};
use squat_judge::replay::LandmarkRecorder;

/// カメラに向いている側
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FacingSide {
    Left,
    Right,
}

/// 合成スクワットのランドマーク記録を生成する
#[derive(Parser, Debug)]
#[command(name = "synth_reps", version, about = "Generate a synthetic squat landmark recording")]
struct Args {
    /// Output file ("-" for stdout)
    #[arg(short, long, default_value = "-")]
    output: PathBuf,

    /// Number of reps
    #[arg(long, default_value_t = 3)]
    reps: u32,

    /// Frames spent descending and again ascending
    #[arg(long, default_value_t = 15)]
    transit_frames: u32,

    /// Frames held at the bottom and at lockout
    #[arg(long, default_value_t = 10)]
    hold_frames: u32,

    /// Normalized hip height at lockout
    #[arg(long, default_value_t = 0.5)]
    standing_hip_y: f32,

    /// Normalized hip height at the bottom
    #[arg(long, default_value_t = 0.62)]
    bottom_hip_y: f32,

    /// Normalized knee height
    #[arg(long, default_value_t = 0.55)]
    knee_y: f32,

    /// Insert this many undetected frames at the bottom of every rep
    #[arg(long, default_value_t = 0)]
    dropout_frames: u32,

    #[arg(long, value_enum, default_value_t = FacingSide::Left)]
    side: FacingSide,

    /// Frame rate used for timestamps
    #[arg(long, default_value_t = 30.0)]
    fps: f64,
}

impl Args {
    /// 引数同士の整合性チェック
    fn check(&self) -> Result<(), clap::Error> {
        if self.standing_hip_y == self.bottom_hip_y {
            return Err(Args::command().error(
                ErrorKind::ArgumentConflict,
                "--standing-hip-y and --bottom-hip-y must differ",
            ));
        }
        if !(self.fps > 0.0) {
            return Err(Args::command().error(ErrorKind::InvalidValue, "--fps must be positive"));
        }
        Ok(())
    }
}

struct Synth<'a, W: Write> {
    args: &'a Args,
    recorder: LandmarkRecorder<W>,
}

impl<W: Write> Synth<'_, W> {
    fn timestamp(&self) -> u64 {
        (self.recorder.frames() as f64 * 1000.0 / self.args.fps).round() as u64
    }

    fn pose(&mut self, hip_y: f32) -> Result<()> {
        let frame = body(self.args, hip_y);
        let ts = self.timestamp();
        self.recorder.record(Some(&frame), Some(ts))?;
        Ok(())
    }

    fn gap(&mut self) -> Result<()> {
        let ts = self.timestamp();
        self.recorder.record(None, Some(ts))?;
        Ok(())
    }

    fn hold(&mut self, hip_y: f32) -> Result<()> {
        for _ in 0..self.args.hold_frames {
            self.pose(hip_y)?;
        }
        Ok(())
    }

    fn transit(&mut self, from: f32, to: f32) -> Result<()> {
        let n = self.args.transit_frames.max(1);
        for i in 1..=n {
            let t = i as f32 / n as f32;
            self.pose(from + (to - from) * t)?;
        }
        Ok(())
    }
}

/// 横向きに立った人物の片側（＋反対側は低可視性）
fn body(args: &Args, hip_y: f32) -> LandmarkFrame {
    let (near, far) = match args.side {
        FacingSide::Left => (0.95, 0.3),
        FacingSide::Right => (0.3, 0.95),
    };
    // 深くしゃがむほど胴体が前傾する
    let depth = ((hip_y - args.standing_hip_y) / (args.bottom_hip_y - args.standing_hip_y)).clamp(0.0, 1.0);
    let lean = 0.12 * depth;
    let hip_x = 0.5;
    let torso = 0.3;

    let mut frame = LandmarkFrame::new();
    for (hip, knee, shoulder, vis) in [
        (LandmarkName::LeftHip, LandmarkName::LeftKnee, LandmarkName::LeftShoulder, near),
        (LandmarkName::RightHip, LandmarkName::RightKnee, LandmarkName::RightShoulder, far),
    ] {
        frame.set(hip, Landmark::new(hip_x, hip_y, 0.0, vis));
        frame.set(knee, Landmark::new(hip_x + 0.08, args.knee_y, 0.0, vis));
        frame.set(shoulder, Landmark::new(hip_x + lean, hip_y - torso, 0.0, vis));
    }
    frame
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Err(e) = args.check() {
        e.exit();
    }

    let writer: Box<dyn Write> = if args.output.as_os_str() == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        let file = File::create(&args.output)
            .with_context(|| format!("Failed to create {}", args.output.display()))?;
        Box::new(BufWriter::new(file))
    };

    let mut synth = Synth {
        args: &args,
        recorder: LandmarkRecorder::new(writer),
    };

    let top = args.standing_hip_y;
    let bottom = args.bottom_hip_y;

    synth.hold(top)?;
    for _ in 0..args.reps {
        synth.transit(top, bottom)?;
        synth.hold(bottom)?;
        for _ in 0..args.dropout_frames {
            synth.gap()?;
        }
        synth.transit(bottom, top)?;
        synth.hold(top)?;
    }

    let frames = synth.recorder.frames();
    synth.recorder.finish()?;
    eprintln!("{} frames, {} reps", frames, args.reps);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let args = Args::try_parse_from(["synth_reps"]).unwrap();
        assert!(args.check().is_ok());
    }

    #[test]
    fn test_equal_hip_heights_rejected() {
        let args =
            Args::try_parse_from(["synth_reps", "--standing-hip-y", "0.6", "--bottom-hip-y", "0.6"]).unwrap();
        let err = args.check().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_bottom_pose_is_finite() {
        let args = Args::try_parse_from(["synth_reps"]).unwrap();
        let frame = body(&args, args.bottom_hip_y);
        let shoulder = frame.get(LandmarkName::LeftShoulder).unwrap();
        assert!(shoulder.x.is_finite());
        assert!(shoulder.x > 0.5);
    }
}
