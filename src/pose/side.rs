use serde::{Deserialize, Serialize};

use super::landmark::{Landmark, LandmarkFrame, LandmarkName};
use crate::config::GeometryConfig;

/// 判定に使う体の側
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Left,
    Right,
    /// 十分な可視性の側がない
    None,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::None => "NONE",
        }
    }

    /// 腰・膝・肩のランドマーク名。`Side::None` には対応する点がない
    fn landmark_names(&self) -> Option<[LandmarkName; 3]> {
        match self {
            Self::Left => Some([
                LandmarkName::LeftHip,
                LandmarkName::LeftKnee,
                LandmarkName::LeftShoulder,
            ]),
            Self::Right => Some([
                LandmarkName::RightHip,
                LandmarkName::RightKnee,
                LandmarkName::RightShoulder,
            ]),
            Self::None => None,
        }
    }
}

/// 片側の腰・膝・肩
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideLandmarks {
    pub hip: Landmark,
    pub knee: Landmark,
    pub shoulder: Landmark,
}

impl SideLandmarks {
    /// 指定側の3点を取り出す。1点でも欠けていれば `None`
    pub fn resolve(frame: &LandmarkFrame, side: Side) -> Option<Self> {
        let [hip, knee, shoulder] = side.landmark_names()?;
        Some(Self {
            hip: *frame.get(hip)?,
            knee: *frame.get(knee)?,
            shoulder: *frame.get(shoulder)?,
        })
    }

    /// 3点の可視性の最小値
    pub fn visibility(&self) -> f32 {
        self.hip
            .visibility
            .min(self.knee.visibility)
            .min(self.shoulder.visibility)
    }

    /// どちらかの側で3点が揃っているか
    ///
    /// 揃っていないフレームは壊れたランドマーク集合として検出なし扱いにする。
    pub fn any_resolvable(frame: &LandmarkFrame) -> bool {
        Self::resolve(frame, Side::Left).is_some() || Self::resolve(frame, Side::Right).is_some()
    }
}

/// フレームごとの側選択結果。前フレームの選択には依存しない
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideSelection {
    pub side: Side,
    pub left_visibility: f32,
    pub right_visibility: f32,
    /// 選ばれた側の3点（`Side::None` なら `None`）
    pub landmarks: Option<SideLandmarks>,
}

impl SideSelection {
    pub fn none(left_visibility: f32, right_visibility: f32) -> Self {
        Self {
            side: Side::None,
            left_visibility,
            right_visibility,
            landmarks: None,
        }
    }
}

/// 可視性の高い側を選ぶ
pub struct SideSelector {
    min_visibility: f32,
}

impl SideSelector {
    pub fn new(min_visibility: f32) -> Self {
        Self { min_visibility }
    }

    pub fn from_config(config: &GeometryConfig) -> Self {
        Self::new(config.min_side_visibility)
    }

    /// 左右の可視性（3点の最小値）を比べて側を決める
    ///
    /// 同値なら LEFT。高い方が閾値未満なら NONE。
    pub fn select(&self, frame: &LandmarkFrame) -> SideSelection {
        let left = SideLandmarks::resolve(frame, Side::Left);
        let right = SideLandmarks::resolve(frame, Side::Right);
        let left_visibility = left.map_or(0.0, |s| s.visibility());
        let right_visibility = right.map_or(0.0, |s| s.visibility());

        // 欠けた側は比較でも必ず負ける
        let rank = |s: Option<SideLandmarks>| s.map_or(f32::NEG_INFINITY, |s| s.visibility());
        let (side, landmarks) = if rank(left) >= rank(right) {
            (Side::Left, left)
        } else {
            (Side::Right, right)
        };

        match landmarks {
            Some(landmarks) if landmarks.visibility() >= self.min_visibility => SideSelection {
                side,
                left_visibility,
                right_visibility,
                landmarks: Some(landmarks),
            },
            _ => SideSelection::none(left_visibility, right_visibility),
        }
    }
}

impl Default for SideSelector {
    fn default() -> Self {
        Self::from_config(&GeometryConfig::default())
    }
}
