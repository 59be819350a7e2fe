use tracing::{debug, error, info, trace};

use super::continuity::{Continuity, DetectionContinuityTracker};
use super::geometry::{GeometricEvaluation, GeometricEvaluator};
use super::rep::{RepEvent, RepStateMachine, TopStatus};
use super::smooth::{Direction, SmoothedSignals, TemporalSmoother};
use crate::config::Config;
use crate::pose::{LandmarkFrame, Side, SideLandmarks, SideSelection, SideSelector};
use crate::telemetry::{DebugSignals, FrameReport, Notice};

/// セッション中の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub detected_frames: u64,
    /// 状態保持で乗り切った欠落フレーム数
    pub transient_dropouts: u64,
    /// 持続的な検出ロスに入った回数
    pub sustained_dropouts: u64,
    pub reps: u32,
}

/// 1セッション（カメラを開いてから閉じるまで）の判定状態
///
/// バッファ・カウンタはすべてこの構造体が所有し、フレームループから
/// `process` を1フレームずつ呼ぶ。並行に触ることは想定しない。
pub struct JudgeSession {
    selector: SideSelector,
    evaluator: GeometricEvaluator,
    continuity: DetectionContinuityTracker,
    smoother: TemporalSmoother,
    reps: RepStateMachine,
    reset_phase_on_dropout: bool,
    stats: SessionStats,
}

impl JudgeSession {
    pub fn new(config: &Config) -> Self {
        Self {
            selector: SideSelector::from_config(&config.geometry),
            evaluator: GeometricEvaluator::from_config(&config.geometry),
            continuity: DetectionContinuityTracker::from_config(&config.smoothing),
            smoother: TemporalSmoother::new(&config.smoothing),
            reps: RepStateMachine::new(),
            reset_phase_on_dropout: config.session.reset_phase_on_dropout,
            stats: SessionStats::default(),
        }
    }

    /// 1フレーム処理する。`None` は検出器が人物を返さなかったフレーム
    pub fn process(&mut self, frame: Option<&LandmarkFrame>) -> FrameReport {
        let frame_index = self.stats.frames;
        self.stats.frames += 1;

        // 腰・膝・肩が左右どちらでも揃わないフレームは検出なしと同じ扱い
        let frame = frame.filter(|f| SideLandmarks::any_resolvable(f));

        let continuity = self.continuity.observe(frame.is_some());
        match (continuity, frame) {
            (Continuity::Detected, Some(frame)) => {
                self.stats.detected_frames += 1;
                self.process_detected(frame_index, frame)
            }
            (Continuity::SustainedDropout { first }, _) => self.process_sustained_loss(frame_index, first),
            // Detected は frame がある時しか返らない
            (Continuity::TransientDropout, _) | (Continuity::Detected, None) => {
                self.process_transient_loss(frame_index)
            }
        }
    }

    pub fn status(&self) -> TopStatus {
        self.reps.status()
    }

    pub fn rep_count(&self) -> u32 {
        self.reps.rep_count()
    }

    pub fn state_machine(&self) -> &RepStateMachine {
        &self.reps
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            reps: self.reps.rep_count(),
            ..self.stats
        }
    }

    fn process_detected(&mut self, frame_index: u64, frame: &LandmarkFrame) -> FrameReport {
        let selection = self.selector.select(frame);
        let eval = self.evaluator.evaluate(&selection);
        let signals = self.smoother.push(&eval);

        match self.reps.update(&signals) {
            Some(RepEvent::DepthConfirmed) => debug!(frame = frame_index, "depth confirmed"),
            Some(RepEvent::RepCounted(count)) => info!(frame = frame_index, reps = count, "rep counted"),
            None => {}
        }

        trace!(
            frame = frame_index,
            side = selection.side.as_str(),
            depth_ok = eval.depth_ok,
            lockout_ok = eval.lockout_ok,
            depth_stable = signals.depth_stable,
            lockout_stable = signals.lockout_stable,
            direction = ?signals.direction,
            status = self.reps.status().as_str()
        );

        let debug = detected_debug(&selection, &eval, &signals);
        self.report(frame_index, selection.side, raw_status(&eval), None, debug)
    }

    fn process_transient_loss(&mut self, frame_index: u64) -> FrameReport {
        self.stats.transient_dropouts += 1;
        debug!(frame = frame_index, "brief detection dropout, holding state");

        let signals = self.smoother.current();
        let debug = DebugSignals {
            smoothed_hip_y: signals.smoothed_hip_y,
            direction: Some(signals.direction),
            ..Default::default()
        };
        self.report(frame_index, Side::None, TopStatus::Idle, Some(Notice::HoldingState), debug)
    }

    fn process_sustained_loss(&mut self, frame_index: u64, first: bool) -> FrameReport {
        self.smoother.reset();
        self.reps.enter_no_detection(self.reset_phase_on_dropout);

        let notice = if first {
            self.stats.sustained_dropouts += 1;
            error!("no landmarks detected; check camera view and lighting");
            if self.reset_phase_on_dropout {
                debug!(frame = frame_index, "rep phase reset to lockout");
            }
            Some(Notice::DetectionLost)
        } else {
            None
        };

        let debug = DebugSignals {
            direction: Some(Direction::None),
            ..Default::default()
        };
        self.report(frame_index, Side::None, TopStatus::NoDetection, notice, debug)
    }

    fn report(
        &self,
        frame_index: u64,
        visible_side: Side,
        raw_status: TopStatus,
        notice: Option<Notice>,
        debug: DebugSignals,
    ) -> FrameReport {
        FrameReport {
            frame_index,
            top_status: self.reps.status(),
            rep_count: self.reps.rep_count(),
            visible_side,
            raw_status,
            notice,
            debug,
        }
    }
}

impl Default for JudgeSession {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

/// 平滑化なしの1フレーム状態
fn raw_status(eval: &GeometricEvaluation) -> TopStatus {
    if eval.depth_ok {
        TopStatus::DepthOk
    } else if eval.lockout_ok {
        TopStatus::LockoutOk
    } else {
        TopStatus::Idle
    }
}

fn detected_debug(selection: &SideSelection, eval: &GeometricEvaluation, signals: &SmoothedSignals) -> DebugSignals {
    DebugSignals {
        hip_y: eval.geometry.map(|g| g.hip_y),
        knee_y: eval.geometry.map(|g| g.knee_y),
        depth_delta: eval.geometry.map(|g| g.depth_delta),
        torso_angle_deg: eval.geometry.map(|g| g.torso_angle_deg),
        left_visibility: Some(selection.left_visibility),
        right_visibility: Some(selection.right_visibility),
        smoothed_hip_y: signals.smoothed_hip_y,
        direction: Some(signals.direction),
        raw_depth_ok: eval.depth_ok,
        raw_lockout_ok: eval.lockout_ok,
    }
}
