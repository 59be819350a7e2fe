use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 17点の身体ランドマーク名（MoveNet の出力順）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(usize)]
pub enum LandmarkName {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl LandmarkName {
    pub const COUNT: usize = 17;

    pub const ALL: [LandmarkName; Self::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// 単一ランドマーク
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    /// 正規化X座標 (0.0〜1.0)
    pub x: f32,
    /// 正規化Y座標 (0.0〜1.0、下向きが正)
    pub y: f32,
    /// 奥行き（検出器依存、2D検出器では0）
    #[serde(default)]
    pub z: f32,
    /// 可視性スコア (0.0〜1.0)
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }
}

/// 1フレーム分のランドマーク集合
///
/// 検出器が返さなかった点は `None`。JSONでは存在する点だけを
/// `{"LEFT_HIP": {...}, ...}` の形で持つ。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<LandmarkName, Landmark>",
    into = "BTreeMap<LandmarkName, Landmark>"
)]
pub struct LandmarkFrame {
    points: [Option<Landmark>; LandmarkName::COUNT],
}

impl LandmarkFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: LandmarkName) -> Option<&Landmark> {
        self.points[name as usize].as_ref()
    }

    pub fn set(&mut self, name: LandmarkName, landmark: Landmark) {
        self.points[name as usize] = Some(landmark);
    }

    pub fn remove(&mut self, name: LandmarkName) -> Option<Landmark> {
        self.points[name as usize].take()
    }

    /// ビルダー形式で点を追加
    pub fn with(mut self, name: LandmarkName, landmark: Landmark) -> Self {
        self.set(name, landmark);
        self
    }

    /// 存在する点の数
    pub fn len(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.points.iter().all(|p| p.is_none())
    }

    pub fn iter(&self) -> impl Iterator<Item = (LandmarkName, &Landmark)> {
        LandmarkName::ALL
            .iter()
            .zip(self.points.iter())
            .filter_map(|(name, p)| p.as_ref().map(|lm| (*name, lm)))
    }
}

impl From<BTreeMap<LandmarkName, Landmark>> for LandmarkFrame {
    fn from(map: BTreeMap<LandmarkName, Landmark>) -> Self {
        let mut frame = Self::new();
        for (name, landmark) in map {
            frame.set(name, landmark);
        }
        frame
    }
}

impl From<LandmarkFrame> for BTreeMap<LandmarkName, Landmark> {
    fn from(frame: LandmarkFrame) -> Self {
        frame.iter().map(|(name, lm)| (name, *lm)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_name_count() {
        assert_eq!(LandmarkName::ALL.len(), LandmarkName::COUNT);
        for (i, name) in LandmarkName::ALL.iter().enumerate() {
            assert_eq!(*name as usize, i);
        }
    }

    #[test]
    fn test_landmark_name_from_index() {
        assert_eq!(LandmarkName::from_index(0), Some(LandmarkName::Nose));
        assert_eq!(LandmarkName::from_index(11), Some(LandmarkName::LeftHip));
        assert_eq!(LandmarkName::from_index(16), Some(LandmarkName::RightAnkle));
        assert_eq!(LandmarkName::from_index(17), None);
    }

    #[test]
    fn test_frame_get_set_remove() {
        let mut frame = LandmarkFrame::new();
        assert!(frame.is_empty());
        assert!(frame.get(LandmarkName::LeftHip).is_none());

        frame.set(LandmarkName::LeftHip, Landmark::new(0.4, 0.6, 0.0, 0.9));
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.get(LandmarkName::LeftHip).unwrap().y, 0.6);

        assert!(frame.remove(LandmarkName::LeftHip).is_some());
        assert!(frame.is_empty());
    }

    #[test]
    fn test_frame_json_uses_point_names() {
        let frame = LandmarkFrame::new()
            .with(LandmarkName::LeftKnee, Landmark::new(0.5, 0.55, 0.0, 0.8));
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"LEFT_KNEE\""));
        assert!(!json.contains("RIGHT_KNEE"));

        let parsed: LandmarkFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_frame_json_z_is_optional() {
        let parsed: LandmarkFrame =
            serde_json::from_str(r#"{"RIGHT_HIP": {"x": 0.5, "y": 0.5, "visibility": 0.9}}"#)
                .unwrap();
        let hip = parsed.get(LandmarkName::RightHip).unwrap();
        assert_eq!(hip.z, 0.0);
        assert_eq!(hip.visibility, 0.9);
    }

    #[test]
    fn test_frame_json_rejects_unknown_name() {
        let parsed: Result<LandmarkFrame, _> =
            serde_json::from_str(r#"{"LEFT_TAIL": {"x": 0.5, "y": 0.5, "visibility": 0.9}}"#);
        assert!(parsed.is_err());
    }
}
