use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use squat_judge::config::Config;
use squat_judge::judge::{JudgeSession, SessionStats};
use squat_judge::osc::OscSink;
use squat_judge::replay::ReplayReader;
use squat_judge::telemetry::{JsonLinesSink, TelemetrySink};
use squat_judge::JudgeError;

const CONFIG_PATH: &str = "config.toml";

/// 記録済みランドマークからスクワットを判定する
#[derive(Parser, Debug)]
#[command(name = "squat-judge", version, about = "Judge squat depth and lockout from a landmark recording")]
struct Args {
    /// Landmark recording (JSON Lines, one frame per line)
    input: PathBuf,

    /// TOML config file (defaults to ./config.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write per-frame reports as JSON Lines ("-" for stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Send per-frame reports over OSC to this address (overrides telemetry.osc_addr)
    #[arg(long, value_name = "ADDR")]
    osc: Option<String>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::load_or_default(CONFIG_PATH),
    };

    let input = File::open(&args.input).with_context(|| format!("Failed to open {}", args.input.display()))?;
    let reader = ReplayReader::new(BufReader::new(input));

    let report_to_stdout = args.output.as_deref() == Some(Path::new("-"));
    let mut sinks: Vec<Box<dyn TelemetrySink>> = Vec::new();
    match &args.output {
        Some(_) if report_to_stdout => {
            sinks.push(Box::new(JsonLinesSink::new(BufWriter::new(io::stdout()))));
        }
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
            sinks.push(Box::new(JsonLinesSink::new(BufWriter::new(file))));
        }
        None => {}
    }
    if let Some(addr) = args.osc.as_ref().or(config.telemetry.osc_addr.as_ref()) {
        sinks.push(Box::new(OscSink::new(addr, &config.telemetry.osc_prefix)?));
        info!("OSC telemetry -> {}", addr);
    }

    info!("replaying {}", args.input.display());
    let mut session = JudgeSession::new(&config);

    for item in reader {
        let frame = match item {
            Ok(frame) => frame,
            // 壊れた行はその1フレームを検出なしとして扱う
            Err(e @ JudgeError::Replay { .. }) => {
                warn!("{}", e);
                None
            }
            Err(e) => return Err(e).context("Failed to read recording"),
        };

        let report = session.process(frame.as_ref());
        for sink in sinks.iter_mut() {
            if let Err(e) = sink.publish(&report) {
                warn!("telemetry publish failed: {}", e);
            }
        }
    }

    for sink in sinks.iter_mut() {
        sink.flush()?;
    }

    let stats = session.stats();
    if report_to_stdout {
        print_summary(&mut io::stderr(), &stats)?;
    } else {
        print_summary(&mut io::stdout(), &stats)?;
    }
    Ok(())
}

fn print_summary(out: &mut dyn Write, stats: &SessionStats) -> io::Result<()> {
    writeln!(out, "=== Session summary ===")?;
    writeln!(out, "Reps:               {}", stats.reps)?;
    writeln!(out, "Frames:             {} ({} detected)", stats.frames, stats.detected_frames)?;
    writeln!(out, "Brief dropouts:     {} frames", stats.transient_dropouts)?;
    writeln!(out, "Detection lost:     {} times", stats.sustained_dropouts)?;
    Ok(())
}
