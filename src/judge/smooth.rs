use serde::Serialize;

use super::geometry::GeometricEvaluation;
use super::window::SlidingWindow;
use crate::config::SmoothingConfig;

/// 腰の上下方向の動き
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// 下降（y増加）
    Descent,
    /// 上昇（y減少）
    Ascent,
    None,
}

/// 多数決後の信号
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedSignals {
    pub depth_stable: bool,
    pub lockout_stable: bool,
    pub direction: Direction,
    pub raw_direction: Direction,
    pub smoothed_hip_y: Option<f32>,
}

impl SmoothedSignals {
    pub fn cleared() -> Self {
        Self {
            depth_stable: false,
            lockout_stable: false,
            direction: Direction::None,
            raw_direction: Direction::None,
            smoothed_hip_y: None,
        }
    }
}

/// 生の判定をスライディングウィンドウの多数決で安定化する
///
/// - depth / lockout: ウィンドウ内の true が `stable_min_count` 件以上で安定
/// - hip_y: 単純移動平均
/// - 方向: 平滑化hip_yの前フレーム差分から生方向を出し、その最頻値
pub struct TemporalSmoother {
    depth_buf: SlidingWindow<bool>,
    lockout_buf: SlidingWindow<bool>,
    direction_buf: SlidingWindow<Direction>,
    hip_y_buf: SlidingWindow<f32>,
    prev_smoothed_hip_y: Option<f32>,
    last_raw_direction: Direction,
    stable_min_count: usize,
    direction_tolerance: f32,
}

impl TemporalSmoother {
    pub fn new(config: &SmoothingConfig) -> Self {
        Self {
            depth_buf: SlidingWindow::new(config.boolean_window),
            lockout_buf: SlidingWindow::new(config.boolean_window),
            direction_buf: SlidingWindow::new(config.direction_window),
            hip_y_buf: SlidingWindow::new(config.hip_window),
            prev_smoothed_hip_y: None,
            last_raw_direction: Direction::None,
            stable_min_count: config.stable_min_count,
            direction_tolerance: config.direction_tolerance,
        }
    }

    /// 検出フレームの生判定を積んで安定化した信号を返す
    pub fn push(&mut self, eval: &GeometricEvaluation) -> SmoothedSignals {
        if let Some(hip_y) = eval.hip_y() {
            self.hip_y_buf.push(hip_y);
        }
        self.depth_buf.push(eval.depth_ok);
        self.lockout_buf.push(eval.lockout_ok);

        let smoothed = self.hip_y_buf.mean();
        let raw_direction = self.motion_direction(smoothed);
        // 方向の有無に関わらず毎フレーム更新
        self.prev_smoothed_hip_y = smoothed;
        self.last_raw_direction = raw_direction;
        self.direction_buf.push(raw_direction);

        self.current()
    }

    /// 現在のウィンドウ内容から見た信号（バッファは変更しない）
    pub fn current(&self) -> SmoothedSignals {
        SmoothedSignals {
            depth_stable: self.depth_buf.stable_true(self.stable_min_count),
            lockout_stable: self.lockout_buf.stable_true(self.stable_min_count),
            direction: self.stable_direction(),
            raw_direction: self.last_raw_direction,
            smoothed_hip_y: self.prev_smoothed_hip_y,
        }
    }

    /// 全バッファと前回値を破棄
    pub fn reset(&mut self) {
        self.depth_buf.clear();
        self.lockout_buf.clear();
        self.direction_buf.clear();
        self.hip_y_buf.clear();
        self.prev_smoothed_hip_y = None;
        self.last_raw_direction = Direction::None;
    }

    pub fn buffered_frames(&self) -> usize {
        self.depth_buf.len()
    }

    fn motion_direction(&self, smoothed: Option<f32>) -> Direction {
        let (curr, prev) = match (smoothed, self.prev_smoothed_hip_y) {
            (Some(curr), Some(prev)) => (curr, prev),
            _ => return Direction::None,
        };
        let delta = curr - prev;
        if delta > self.direction_tolerance {
            Direction::Descent
        } else if delta < -self.direction_tolerance {
            Direction::Ascent
        } else {
            Direction::None
        }
    }

    fn stable_direction(&self) -> Direction {
        match self.direction_buf.mode() {
            Some((dir, count)) if count >= self.stable_min_count && dir != Direction::None => dir,
            _ => Direction::None,
        }
    }
}

impl Default for TemporalSmoother {
    fn default() -> Self {
        Self::new(&SmoothingConfig::default())
    }
}
