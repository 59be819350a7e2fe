use serde::Serialize;

use crate::config::GeometryConfig;
use crate::pose::{Side, SideSelection};

/// atan2 の分母が0にならないための微小量
const TORSO_EPSILON: f32 = 1e-6;

/// 選択側の幾何量
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SideGeometry {
    pub hip_y: f32,
    pub knee_y: f32,
    /// hip_y - knee_y（正なら腰が膝より下）
    pub depth_delta: f32,
    /// 肩-腰の線の鉛直からの傾き（度）
    pub torso_angle_deg: f32,
}

/// 1フレーム分の生判定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricEvaluation {
    pub side: Side,
    pub depth_ok: bool,
    pub lockout_ok: bool,
    /// 側が選ばれなかったフレームでは `None`
    pub geometry: Option<SideGeometry>,
}

impl GeometricEvaluation {
    /// 側なし: 判定はすべて偽
    pub fn no_side() -> Self {
        Self {
            side: Side::None,
            depth_ok: false,
            lockout_ok: false,
            geometry: None,
        }
    }

    pub fn hip_y(&self) -> Option<f32> {
        self.geometry.map(|g| g.hip_y)
    }
}

/// 深さ・ロックアウトの1フレーム判定（状態を持たない）
#[derive(Debug, Clone)]
pub struct GeometricEvaluator {
    depth_margin: f32,
    lockout_margin: f32,
    torso_vertical_deg_threshold: f32,
}

impl GeometricEvaluator {
    pub fn new(depth_margin: f32, lockout_margin: f32, torso_vertical_deg_threshold: f32) -> Self {
        Self {
            depth_margin,
            lockout_margin,
            torso_vertical_deg_threshold,
        }
    }

    pub fn from_config(config: &GeometryConfig) -> Self {
        Self::new(
            config.depth_margin,
            config.lockout_margin,
            config.torso_vertical_deg_threshold,
        )
    }

    /// 選択側のランドマークから depth_ok / lockout_ok を求める
    ///
    /// - depth: `hip_y - knee_y > depth_margin`（y は下向きなので腰が膝より下）
    /// - lockout: 腰が `knee_y + lockout_margin` より上、かつ胴体がほぼ鉛直
    pub fn evaluate(&self, selection: &SideSelection) -> GeometricEvaluation {
        let landmarks = match (selection.side, selection.landmarks) {
            (Side::None, _) | (_, None) => return GeometricEvaluation::no_side(),
            (_, Some(landmarks)) => landmarks,
        };

        let hip = landmarks.hip;
        let knee = landmarks.knee;
        let shoulder = landmarks.shoulder;

        let depth_delta = hip.y - knee.y;
        let depth_ok = depth_delta > self.depth_margin;

        let hip_above_knee = hip.y < knee.y + self.lockout_margin;
        let torso_angle_deg = torso_angle_deg(shoulder.x - hip.x, shoulder.y - hip.y);
        let torso_upright = torso_angle_deg <= self.torso_vertical_deg_threshold;

        GeometricEvaluation {
            side: selection.side,
            depth_ok,
            lockout_ok: hip_above_knee && torso_upright,
            geometry: Some(SideGeometry {
                hip_y: hip.y,
                knee_y: knee.y,
                depth_delta,
                torso_angle_deg,
            }),
        }
    }
}

impl Default for GeometricEvaluator {
    fn default() -> Self {
        Self::from_config(&GeometryConfig::default())
    }
}

/// 胴体ベクトル (dx, dy) の鉛直からの角度（度）
fn torso_angle_deg(dx: f32, dy: f32) -> f32 {
    f32::atan2(dx.abs(), dy.abs() + TORSO_EPSILON).to_degrees()
}
