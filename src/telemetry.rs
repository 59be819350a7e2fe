//! フレームごとの判定出力と、その受け渡し先（オーバーレイ・ログ等）

use serde::Serialize;
use std::io::Write;

use crate::error::Result;
use crate::judge::{Direction, TopStatus};
use crate::pose::Side;

/// 判定とは別に表示側へ伝える通知
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notice {
    /// 短い検出欠落のため前回状態を保持中
    HoldingState,
    /// 持続的な検出ロスに入った（連続中は最初の1回だけ）
    DetectionLost,
}

impl Notice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HoldingState => "HOLDING_STATE",
            Self::DetectionLost => "DETECTION_LOST",
        }
    }
}

/// デバッグ表示用の連続値
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DebugSignals {
    pub hip_y: Option<f32>,
    pub knee_y: Option<f32>,
    pub depth_delta: Option<f32>,
    pub torso_angle_deg: Option<f32>,
    pub left_visibility: Option<f32>,
    pub right_visibility: Option<f32>,
    pub smoothed_hip_y: Option<f32>,
    pub direction: Option<Direction>,
    pub raw_depth_ok: bool,
    pub raw_lockout_ok: bool,
}

/// 1フレーム分の出力
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame_index: u64,
    pub top_status: TopStatus,
    pub rep_count: u32,
    pub visible_side: Side,
    /// 平滑化前の1フレーム判定
    pub raw_status: TopStatus,
    pub notice: Option<Notice>,
    pub debug: DebugSignals,
}

/// FrameReport の受け取り先
pub trait TelemetrySink {
    fn publish(&mut self, report: &FrameReport) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// 1行1フレームのJSONで書き出す
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TelemetrySink for JsonLinesSink<W> {
    fn publish(&mut self, report: &FrameReport) -> Result<()> {
        serde_json::to_writer(&mut self.writer, report)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// メモリ上に溜める（テスト・後処理用）
impl TelemetrySink for Vec<FrameReport> {
    fn publish(&mut self, report: &FrameReport) -> Result<()> {
        self.push(report.clone());
        Ok(())
    }
}
