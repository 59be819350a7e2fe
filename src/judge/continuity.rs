use super::window::SlidingWindow;
use crate::config::SmoothingConfig;

/// 1フレームの検出状況
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuity {
    Detected,
    /// 直近は検出できている中での短い欠落。状態は保持する
    TransientDropout,
    /// 持続的な欠落。`first` は連続する欠落の最初のフレームだけ true
    SustainedDropout { first: bool },
}

/// 直近フレームの検出有無を追跡し、短い欠落と持続的な欠落を区別する
#[derive(Debug, Clone)]
pub struct DetectionContinuityTracker {
    presence: SlidingWindow<bool>,
    min_present: usize,
    error_reported: bool,
}

impl DetectionContinuityTracker {
    pub fn new(window: usize, min_present: usize) -> Self {
        Self {
            presence: SlidingWindow::new(window),
            min_present,
            error_reported: false,
        }
    }

    pub fn from_config(config: &SmoothingConfig) -> Self {
        Self::new(config.detection_window, config.detection_min_count)
    }

    /// 今フレームの検出有無を記録して分類する
    pub fn observe(&mut self, detected: bool) -> Continuity {
        self.presence.push(detected);

        if detected {
            return Continuity::Detected;
        }

        // 通知は検出継続中の欠落（状態保持）を経てから再び有効にする
        if self.is_confident() {
            self.error_reported = false;
            Continuity::TransientDropout
        } else {
            let first = !self.error_reported;
            self.error_reported = true;
            Continuity::SustainedDropout { first }
        }
    }

    /// 直近ウィンドウ内の検出数が閾値以上か
    pub fn is_confident(&self) -> bool {
        self.presence.stable_true(self.min_present)
    }

    pub fn detected_count(&self) -> usize {
        self.presence.count_true()
    }

    /// 持続的欠落の通知を出し済みか
    pub fn error_reported(&self) -> bool {
        self.error_reported
    }
}

impl Default for DetectionContinuityTracker {
    fn default() -> Self {
        Self::from_config(&SmoothingConfig::default())
    }
}
