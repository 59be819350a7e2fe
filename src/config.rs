use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::error::{JudgeError, Result};

/// セッション全体の設定（セッション中は変更しない）
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
}

/// 1フレーム内の幾何判定パラメータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeometryConfig {
    /// 深さ判定マージン: hip_y - knee_y がこれを超えたら深さOK（正規化座標）
    #[serde(default = "default_depth_margin")]
    pub depth_margin: f32,
    /// ロックアウト判定マージン: hip_y < knee_y + これ で腰が膝より上
    #[serde(default = "default_lockout_margin")]
    pub lockout_margin: f32,
    /// 胴体の鉛直からの許容角度（度）
    #[serde(default = "default_torso_vertical_deg_threshold")]
    pub torso_vertical_deg_threshold: f32,
    /// 左右どちらかを採用するための最低visibility
    #[serde(default = "default_min_side_visibility")]
    pub min_side_visibility: f32,
}

/// 多数決ウィンドウと動き方向の設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SmoothingConfig {
    /// depth_ok / lockout_ok の履歴長
    #[serde(default = "default_boolean_window")]
    pub boolean_window: usize,
    #[serde(default = "default_direction_window")]
    pub direction_window: usize,
    /// hip_y 移動平均の履歴長
    #[serde(default = "default_hip_window")]
    pub hip_window: usize,
    /// 検出有無の履歴長
    #[serde(default = "default_detection_window")]
    pub detection_window: usize,
    /// 「安定」とみなす最低票数（真偽値・方向で共通）
    #[serde(default = "default_stable_min_count")]
    pub stable_min_count: usize,
    /// 検出が継続しているとみなす最低検出フレーム数
    #[serde(default = "default_detection_min_count")]
    pub detection_min_count: usize,
    /// 平滑化hip_yの変化量がこれ以下なら静止
    #[serde(default = "default_direction_tolerance")]
    pub direction_tolerance: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// 持続的な検出ロスで rep フェーズも LOCKOUT_OK に戻す
    #[serde(default = "default_reset_phase_on_dropout")]
    pub reset_phase_on_dropout: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// OSC送信先 (e.g. "127.0.0.1:9000")。未指定なら送信しない
    #[serde(default)]
    pub osc_addr: Option<String>,
    #[serde(default = "default_osc_prefix")]
    pub osc_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub index: i32,
    #[serde(default = "default_camera_width")]
    pub width: u32,
    #[serde(default = "default_camera_height")]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetectorConfig {
    #[serde(default = "default_model_path")]
    pub model_path: String,
    /// 腰・膝・肩の平均スコアがこれ未満なら「検出なし」
    #[serde(default = "default_min_detection_confidence")]
    pub min_detection_confidence: f32,
}

fn default_depth_margin() -> f32 { 0.02 }
fn default_lockout_margin() -> f32 { 0.02 }
fn default_torso_vertical_deg_threshold() -> f32 { 12.0 }
fn default_min_side_visibility() -> f32 { 0.6 }
fn default_boolean_window() -> usize { 5 }
fn default_direction_window() -> usize { 5 }
fn default_hip_window() -> usize { 7 }
fn default_detection_window() -> usize { 7 }
fn default_stable_min_count() -> usize { 3 }
fn default_detection_min_count() -> usize { 3 }
fn default_direction_tolerance() -> f32 { 0.002 }
fn default_reset_phase_on_dropout() -> bool { true }
fn default_osc_prefix() -> String { "/squat".to_string() }
fn default_camera_width() -> u32 { 960 }
fn default_camera_height() -> u32 { 540 }
fn default_model_path() -> String { "models/movenet_lightning.onnx".to_string() }
fn default_min_detection_confidence() -> f32 { 0.5 }

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            depth_margin: default_depth_margin(),
            lockout_margin: default_lockout_margin(),
            torso_vertical_deg_threshold: default_torso_vertical_deg_threshold(),
            min_side_visibility: default_min_side_visibility(),
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            boolean_window: default_boolean_window(),
            direction_window: default_direction_window(),
            hip_window: default_hip_window(),
            detection_window: default_detection_window(),
            stable_min_count: default_stable_min_count(),
            detection_min_count: default_detection_min_count(),
            direction_tolerance: default_direction_tolerance(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reset_phase_on_dropout: default_reset_phase_on_dropout(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            osc_addr: None,
            osc_prefix: default_osc_prefix(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: default_camera_width(),
            height: default_camera_height(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            min_detection_confidence: default_min_detection_confidence(),
        }
    }
}

impl Config {
    /// 設定ファイルを読み込んで検証する
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content).map_err(|e| match e {
            JudgeError::ConfigParse { source, .. } => JudgeError::ConfigParse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        Ok(config)
    }

    /// 読み込めなければ警告を出してデフォルト値を使う
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("config {} ignored: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|source| JudgeError::ConfigParse {
            path: Default::default(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let g = &self.geometry;
        let s = &self.smoothing;

        for (name, value) in [
            ("geometry.depth_margin", g.depth_margin),
            ("geometry.lockout_margin", g.lockout_margin),
            ("smoothing.direction_tolerance", s.direction_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{} must be a finite non-negative number, got {}", name, value)));
            }
        }
        if !(0.0..=1.0).contains(&g.min_side_visibility) {
            return Err(invalid(format!(
                "geometry.min_side_visibility must be within [0, 1], got {}",
                g.min_side_visibility
            )));
        }
        if !(g.torso_vertical_deg_threshold > 0.0 && g.torso_vertical_deg_threshold <= 90.0) {
            return Err(invalid(format!(
                "geometry.torso_vertical_deg_threshold must be within (0, 90], got {}",
                g.torso_vertical_deg_threshold
            )));
        }

        for (name, size) in [
            ("smoothing.boolean_window", s.boolean_window),
            ("smoothing.direction_window", s.direction_window),
            ("smoothing.hip_window", s.hip_window),
            ("smoothing.detection_window", s.detection_window),
        ] {
            if size == 0 {
                return Err(invalid(format!("{} must be at least 1", name)));
            }
        }

        let smallest_vote_window = s.boolean_window.min(s.direction_window);
        if s.stable_min_count == 0 || s.stable_min_count > smallest_vote_window {
            return Err(invalid(format!(
                "smoothing.stable_min_count must be within 1..={}, got {}",
                smallest_vote_window, s.stable_min_count
            )));
        }
        if s.detection_min_count == 0 || s.detection_min_count > s.detection_window {
            return Err(invalid(format!(
                "smoothing.detection_min_count must be within 1..={}, got {}",
                s.detection_window, s.detection_min_count
            )));
        }

        if !(0.0..=1.0).contains(&self.detector.min_detection_confidence) {
            return Err(invalid(format!(
                "detector.min_detection_confidence must be within [0, 1], got {}",
                self.detector.min_detection_confidence
            )));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> JudgeError {
    JudgeError::InvalidConfig(msg)
}
