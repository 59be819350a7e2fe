use rosc::{encoder, OscBundle, OscMessage, OscPacket, OscTime, OscType};
use std::net::UdpSocket;

use crate::error::Result;
use crate::telemetry::{FrameReport, TelemetrySink};

/// OSCアドレスのデフォルト接頭辞
pub const DEFAULT_PREFIX: &str = "/squat";

/// 判定状態メッセージ
/// 引数: status, rep_count, side
pub fn build_state_message(prefix: &str, report: &FrameReport) -> OscMessage {
    OscMessage {
        addr: format!("{}/state", prefix),
        args: vec![
            OscType::String(report.top_status.as_str().to_string()),
            OscType::Int(report.rep_count as i32),
            OscType::String(report.visible_side.as_str().to_string()),
        ],
    }
}

/// デバッグ値メッセージ
/// 引数: hip_y, knee_y, depth_delta, torso_angle_deg, left_visibility, right_visibility
/// 値がないものは NaN
pub fn build_debug_message(prefix: &str, report: &FrameReport) -> OscMessage {
    let d = &report.debug;
    let float = |v: Option<f32>| OscType::Float(v.unwrap_or(f32::NAN));
    OscMessage {
        addr: format!("{}/debug", prefix),
        args: vec![
            float(d.hip_y),
            float(d.knee_y),
            float(d.depth_delta),
            float(d.torso_angle_deg),
            float(d.left_visibility),
            float(d.right_visibility),
        ],
    }
}

/// 1フレーム分のメッセージ。通知がある時だけ notice を付ける
pub fn build_frame_packet(prefix: &str, report: &FrameReport) -> OscPacket {
    let mut content = vec![
        OscPacket::Message(build_state_message(prefix, report)),
        OscPacket::Message(build_debug_message(prefix, report)),
    ];
    if let Some(notice) = report.notice {
        content.push(OscPacket::Message(OscMessage {
            addr: format!("{}/notice", prefix),
            args: vec![OscType::String(notice.as_str().to_string())],
        }));
    }
    OscPacket::Bundle(OscBundle {
        // 即時実行
        timetag: OscTime::from((0, 1)),
        content,
    })
}

/// OSCパケットをバイト列にエンコード
pub fn encode_packet(packet: &OscPacket) -> Result<Vec<u8>> {
    let encoded = encoder::encode(packet)?;
    Ok(encoded)
}

/// UDPでオーバーレイ側へ判定結果を送る
pub struct OscSink {
    socket: UdpSocket,
    target_addr: String,
    prefix: String,
}

impl OscSink {
    pub fn new(target_addr: &str, prefix: &str) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(Self {
            socket,
            target_addr: target_addr.to_string(),
            prefix: prefix.trim_end_matches('/').to_string(),
        })
    }
}

impl TelemetrySink for OscSink {
    fn publish(&mut self, report: &FrameReport) -> Result<()> {
        let data = encode_packet(&build_frame_packet(&self.prefix, report))?;
        self.socket.send_to(&data, &self.target_addr)?;
        Ok(())
    }
}
