use serde::Serialize;

use super::smooth::{Direction, SmoothedSignals};

/// 画面に出す判定状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopStatus {
    Idle,
    Descent,
    Ascent,
    DepthOk,
    LockoutOk,
    NoDetection,
}

impl TopStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Descent => "DESCENT",
            Self::Ascent => "ASCENT",
            Self::DepthOk => "DEPTH_OK",
            Self::LockoutOk => "LOCKOUT_OK",
            Self::NoDetection => "NO_DETECTION",
        }
    }

    /// 安定化済み信号から優先順位 lockout > depth > 方向 > IDLE で決める
    pub fn derive(signals: &SmoothedSignals) -> Self {
        if signals.lockout_stable {
            Self::LockoutOk
        } else if signals.depth_stable {
            Self::DepthOk
        } else {
            match signals.direction {
                Direction::Ascent => Self::Ascent,
                Direction::Descent => Self::Descent,
                Direction::None => Self::Idle,
            }
        }
    }
}

/// rep カウント用に最後に確定したフェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    LockoutOk,
    DepthOk,
}

/// 1フレームの状態更新で起きたこと
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepEvent {
    /// ロックアウト後に深さが確定した
    DepthConfirmed,
    /// 深さの後にロックアウトが確定し rep が加算された（加算後の値）
    RepCounted(u32),
}

/// 判定状態と rep カウンタ
///
/// セッション開始時はロックアウト（直立）とみなす。
/// rep はロックアウト確定 → 深さ確定 → ロックアウト確定 で1回だけ加算する。
#[derive(Debug, Clone)]
pub struct RepStateMachine {
    status: TopStatus,
    last_confirmed: Phase,
    rep_count: u32,
}

impl RepStateMachine {
    pub fn new() -> Self {
        Self {
            status: TopStatus::Idle,
            last_confirmed: Phase::LockoutOk,
            rep_count: 0,
        }
    }

    pub fn status(&self) -> TopStatus {
        self.status
    }

    pub fn last_confirmed(&self) -> Phase {
        self.last_confirmed
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    /// 安定化済み信号で表示状態とカウンタを更新
    pub fn update(&mut self, signals: &SmoothedSignals) -> Option<RepEvent> {
        self.status = TopStatus::derive(signals);

        match self.last_confirmed {
            Phase::LockoutOk if signals.depth_stable => {
                self.last_confirmed = Phase::DepthOk;
                Some(RepEvent::DepthConfirmed)
            }
            Phase::DepthOk if signals.lockout_stable => {
                self.rep_count += 1;
                self.last_confirmed = Phase::LockoutOk;
                Some(RepEvent::RepCounted(self.rep_count))
            }
            _ => None,
        }
    }

    /// 持続的な検出ロス。カウンタは保持する
    ///
    /// `reset_phase` が true なら確定フェーズを直立に戻し、途中まで進んだ rep を捨てる。
    pub fn enter_no_detection(&mut self, reset_phase: bool) {
        self.status = TopStatus::NoDetection;
        if reset_phase {
            self.last_confirmed = Phase::LockoutOk;
        }
    }
}

impl Default for RepStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
