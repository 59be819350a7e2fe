use anyhow::{Context, Result};
use ndarray::Array4;
use opencv::{
    core::{AlgorithmHint, Mat, Size, CV_32FC3},
    imgproc,
    prelude::*,
};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

use super::landmark::{Landmark, LandmarkFrame, LandmarkName};
use crate::config::DetectorConfig;

/// MoveNet用の入力サイズ
pub const MOVENET_INPUT_SIZE: i32 = 192;

/// 人物の有無を判断する点（左右の腰・膝・肩）
const PRESENCE_POINTS: [LandmarkName; 6] = [
    LandmarkName::LeftHip,
    LandmarkName::RightHip,
    LandmarkName::LeftKnee,
    LandmarkName::RightKnee,
    LandmarkName::LeftShoulder,
    LandmarkName::RightShoulder,
];

/// MoveNet (single pose) を使用したランドマーク検出器
pub struct PoseDetector {
    session: Session,
    min_detection_confidence: f32,
}

impl PoseDetector {
    /// ONNXモデルを読み込んで初期化
    pub fn new<P: AsRef<Path>>(model_path: P, min_detection_confidence: f32) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path.as_ref())
            .context("Failed to load ONNX model")?;

        Ok(Self {
            session,
            min_detection_confidence,
        })
    }

    pub fn from_config(config: &DetectorConfig) -> Result<Self> {
        Self::new(&config.model_path, config.min_detection_confidence)
    }

    /// BGRフレームからランドマークを検出
    ///
    /// 腰・膝・肩の平均スコアが閾値未満なら人物なしとして `None`。
    pub fn detect(&mut self, frame: &Mat) -> Result<Option<LandmarkFrame>> {
        let input = preprocess_for_movenet(frame)?;
        let landmarks = self.infer(input)?;

        let score: f32 = PRESENCE_POINTS
            .iter()
            .filter_map(|name| landmarks.get(*name))
            .map(|lm| lm.visibility)
            .sum::<f32>()
            / PRESENCE_POINTS.len() as f32;

        if score < self.min_detection_confidence {
            return Ok(None);
        }
        Ok(Some(landmarks))
    }

    /// 入力: [1, 192, 192, 3] の f32 テンソル
    fn infer(&mut self, input: Array4<f32>) -> Result<LandmarkFrame> {
        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs!["serving_default_input_0" => input_tensor])
            .context("Inference failed")?;

        // MoveNet の出力は [1, 1, 17, 3] (y, x, score)
        let output: ndarray::ArrayViewD<f32> = outputs["StatefulPartitionedCall_0"]
            .try_extract_array()
            .context("Failed to extract output tensor")?;

        let mut frame = LandmarkFrame::new();
        for (i, name) in LandmarkName::ALL.iter().enumerate() {
            let y = output[[0, 0, i, 0]];
            let x = output[[0, 0, i, 1]];
            let score = output[[0, 0, i, 2]];
            frame.set(*name, Landmark::new(x, y, 0.0, score));
        }

        Ok(frame)
    }
}

/// BGR -> RGB、192x192 にリサイズして [1, 192, 192, 3] (0.0-255.0) に変換
fn preprocess_for_movenet(frame: &Mat) -> Result<Array4<f32>> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0, AlgorithmHint::ALGO_HINT_DEFAULT)?;

    let mut resized = Mat::default();
    imgproc::resize(
        &rgb,
        &mut resized,
        Size::new(MOVENET_INPUT_SIZE, MOVENET_INPUT_SIZE),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let mut float_mat = Mat::default();
    resized.convert_to(&mut float_mat, CV_32FC3, 1.0, 0.0)?;

    let size = MOVENET_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, size, size, 3));
    for y in 0..MOVENET_INPUT_SIZE {
        for x in 0..MOVENET_INPUT_SIZE {
            let pixel = float_mat.at_2d::<opencv::core::Vec3f>(y, x)?;
            for c in 0..3 {
                tensor[[0, y as usize, x as usize, c]] = pixel[c];
            }
        }
    }

    Ok(tensor)
}
