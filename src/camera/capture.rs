use anyhow::{Context, Result};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs},
};
use std::path::Path;
use tracing::info;

/// フレームの取得元
enum Source {
    Device(i32),
    File(String),
}

/// OpenCVのカメラ / 動画ファイル入力
///
/// フレームは呼び出し側のループで1枚ずつ同期的に読む。
pub struct OpenCvCamera {
    capture: VideoCapture,
    source: Source,
    width: u32,
    height: u32,
}

impl OpenCvCamera {
    /// 解像度を指定してカメラを開く
    pub fn open(index: i32, width: Option<u32>, height: Option<u32>) -> Result<Self> {
        let mut capture = VideoCapture::new(index, VideoCaptureAPIs::CAP_ANY as i32)
            .context("Failed to open camera")?;

        if !capture.is_opened()? {
            anyhow::bail!("Camera {} is not available", index);
        }

        if let Some(w) = width {
            capture.set(videoio::CAP_PROP_FRAME_WIDTH, w as f64)?;
        }
        if let Some(h) = height {
            capture.set(videoio::CAP_PROP_FRAME_HEIGHT, h as f64)?;
        }
        // 古いフレームを溜めない
        capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0)?;

        Self::from_capture(capture, Source::Device(index))
    }

    /// 動画ファイルを開く
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path.to_string_lossy().to_string();
        let capture = VideoCapture::from_file(&name, VideoCaptureAPIs::CAP_ANY as i32)
            .with_context(|| format!("Failed to open video {}", path.display()))?;

        if !capture.is_opened()? {
            anyhow::bail!("Video {} could not be opened", path.display());
        }

        Self::from_capture(capture, Source::File(name))
    }

    fn from_capture(capture: VideoCapture, source: Source) -> Result<Self> {
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        match &source {
            Source::Device(index) => info!("camera {}: {}x{} @ {:.1}fps", index, width, height, fps),
            Source::File(name) => info!("video {}: {}x{} @ {:.1}fps", name, width, height, fps),
        }

        Ok(Self {
            capture,
            source,
            width,
            height,
        })
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// 次のフレームを読む（BGR）
    ///
    /// 動画ファイルの終端では `Ok(None)`。カメラで空フレームが来たらエラー。
    pub fn read_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        let ok = self
            .capture
            .read(&mut frame)
            .context("Failed to read frame")?;

        if !ok || frame.empty() {
            return match self.source {
                Source::File(_) => Ok(None),
                Source::Device(index) => anyhow::bail!("Empty frame received from camera {}", index),
            };
        }

        Ok(Some(frame))
    }
}
