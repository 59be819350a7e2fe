//! フレーム列を流したときのセッション全体の振る舞い

use approx::assert_relative_eq;
use std::io::Cursor;

use squat_judge::config::Config;
use squat_judge::judge::{JudgeSession, TopStatus};
use squat_judge::pose::{Landmark, LandmarkFrame, LandmarkName, Side};
use squat_judge::replay::{LandmarkRecorder, ReplayReader};
use squat_judge::telemetry::{FrameReport, JsonLinesSink, Notice, TelemetrySink};

const KNEE_Y: f32 = 0.55;

/// 左側だけが見えている直立胴体のフレーム
fn left_side(hip_y: f32, vis: f32) -> LandmarkFrame {
    LandmarkFrame::new()
        .with(LandmarkName::LeftHip, Landmark::new(0.5, hip_y, 0.0, vis))
        .with(LandmarkName::LeftKnee, Landmark::new(0.55, KNEE_Y, 0.0, vis))
        .with(LandmarkName::LeftShoulder, Landmark::new(0.5, hip_y - 0.3, 0.0, vis))
}

fn both_sides(hip_y: f32, left_vis: f32, right_vis: f32) -> LandmarkFrame {
    left_side(hip_y, left_vis)
        .with(LandmarkName::RightHip, Landmark::new(0.5, hip_y, 0.0, right_vis))
        .with(LandmarkName::RightKnee, Landmark::new(0.55, KNEE_Y, 0.0, right_vis))
        .with(LandmarkName::RightShoulder, Landmark::new(0.5, hip_y - 0.3, 0.0, right_vis))
}

fn run(session: &mut JudgeSession, hips: &[f32]) -> Vec<FrameReport> {
    hips.iter()
        .map(|&hip| session.process(Some(&left_side(hip, 0.9))))
        .collect()
}

fn one_rep() -> Vec<f32> {
    let mut hips = vec![0.5; 5];
    hips.extend([0.6; 5]);
    hips.extend([0.5; 5]);
    hips
}

#[test]
fn test_single_rep_counts_once() {
    let mut session = JudgeSession::default();
    let reports = run(&mut session, &one_rep());

    let last = reports.last().unwrap();
    assert_eq!(last.rep_count, 1);
    assert_eq!(last.top_status, TopStatus::LockoutOk);
    assert!(reports.iter().any(|r| r.top_status == TopStatus::DepthOk));
    assert_eq!(last.visible_side, Side::Left);
}

#[test]
fn test_counter_never_decreases() {
    let mut session = JudgeSession::default();
    let mut hips = one_rep();
    hips.extend(one_rep());
    let reports = run(&mut session, &hips);

    for pair in reports.windows(2) {
        assert!(pair[1].rep_count >= pair[0].rep_count);
        assert!(pair[1].rep_count - pair[0].rep_count <= 1);
    }
    assert_eq!(session.rep_count(), 2);
}

#[test]
fn test_repeated_depth_without_lockout_counts_once() {
    let mut session = JudgeSession::default();
    let mut hips = vec![0.5; 5];
    hips.extend([0.6; 5]);
    run(&mut session, &hips);

    // 前傾したまま腰だけ上げてまた沈む（ロックアウトに届かない）
    for _ in 0..5 {
        let half = left_side(0.52, 0.9)
            .with(LandmarkName::LeftShoulder, Landmark::new(0.62, 0.22, 0.0, 0.9));
        let report = session.process(Some(&half));
        assert!(!report.debug.raw_lockout_ok);
    }
    run(&mut session, &[0.6; 5]);
    assert_eq!(session.rep_count(), 0);

    run(&mut session, &[0.5; 5]);
    assert_eq!(session.rep_count(), 1);
}

#[test]
fn test_depth_only_never_counts() {
    let mut session = JudgeSession::default();
    let mut hips = vec![0.5; 5];
    hips.extend([0.6; 20]);
    run(&mut session, &hips);

    assert_eq!(session.rep_count(), 0);
    assert_eq!(session.status(), TopStatus::DepthOk);
}

#[test]
fn test_transient_dropout_holds_state() {
    let mut session = JudgeSession::default();
    let before = run(&mut session, &[0.5; 10]).pop().unwrap();

    let held = session.process(None);
    assert_eq!(held.top_status, before.top_status);
    assert_eq!(held.rep_count, before.rep_count);
    assert_eq!(held.visible_side, Side::None);
    assert_eq!(held.notice, Some(Notice::HoldingState));

    // 復帰後もそのまま続く
    let after = session.process(Some(&left_side(0.5, 0.9)));
    assert_eq!(after.top_status, TopStatus::LockoutOk);
    assert_eq!(after.notice, None);
}

#[test]
fn test_transient_dropout_mid_rep_still_counts() {
    let mut session = JudgeSession::default();
    let mut hips = vec![0.5; 5];
    hips.extend([0.6; 5]);
    run(&mut session, &hips);

    for _ in 0..2 {
        session.process(None);
    }
    run(&mut session, &[0.5; 5]);

    assert_eq!(session.rep_count(), 1);
}

#[test]
fn test_sustained_dropout_reports_once() {
    let mut session = JudgeSession::default();
    run(&mut session, &[0.5; 10]);

    let reports: Vec<FrameReport> = (0..10).map(|_| session.process(None)).collect();

    let lost: Vec<_> = reports
        .iter()
        .filter(|r| r.notice == Some(Notice::DetectionLost))
        .collect();
    assert_eq!(lost.len(), 1);
    assert_eq!(reports.last().unwrap().top_status, TopStatus::NoDetection);
    assert_eq!(session.stats().sustained_dropouts, 1);

    // 検出中の区間は保持通知
    assert_eq!(reports[0].notice, Some(Notice::HoldingState));
}

#[test]
fn test_notice_rearms_after_recovery() {
    let mut session = JudgeSession::default();
    for _ in 0..2 {
        run(&mut session, &[0.5; 10]);
        for _ in 0..10 {
            session.process(None);
        }
    }
    assert_eq!(session.stats().sustained_dropouts, 2);
}

#[test]
fn test_flickering_detection_reports_loss_once() {
    let mut session = JudgeSession::default();
    let mut frames: Vec<Option<LandmarkFrame>> = vec![None; 10];
    for _ in 0..6 {
        frames.push(Some(left_side(0.5, 0.9)));
        frames.push(None);
        frames.push(None);
    }

    let lost = frames
        .iter()
        .map(|f| session.process(f.as_ref()))
        .filter(|r| r.notice == Some(Notice::DetectionLost))
        .count();
    assert_eq!(lost, 1);
    assert_eq!(session.stats().sustained_dropouts, 1);
}

#[test]
fn test_sustained_dropout_keeps_count() {
    let mut session = JudgeSession::default();
    run(&mut session, &one_rep());
    for _ in 0..20 {
        session.process(None);
    }
    assert_eq!(session.rep_count(), 1);

    run(&mut session, &one_rep());
    assert_eq!(session.rep_count(), 2);
}

#[test]
fn test_never_detected_is_no_detection() {
    let mut session = JudgeSession::default();
    let first = session.process(None);

    assert_eq!(first.top_status, TopStatus::NoDetection);
    assert_eq!(first.notice, Some(Notice::DetectionLost));
    assert_eq!(first.rep_count, 0);
}

#[test]
fn test_equal_visibility_picks_left() {
    let mut session = JudgeSession::default();
    let report = session.process(Some(&both_sides(0.5, 0.8, 0.8)));

    assert_eq!(report.visible_side, Side::Left);
}

#[test]
fn test_more_visible_side_wins() {
    let mut session = JudgeSession::default();
    let report = session.process(Some(&both_sides(0.5, 0.7, 0.9)));

    assert_eq!(report.visible_side, Side::Right);
    assert_relative_eq!(report.debug.right_visibility.unwrap(), 0.9);
}

#[test]
fn test_low_visibility_is_all_false() {
    let mut session = JudgeSession::default();
    let reports: Vec<FrameReport> = (0..10)
        .map(|_| session.process(Some(&both_sides(0.6, 0.3, 0.4))))
        .collect();

    for r in &reports {
        assert_eq!(r.visible_side, Side::None);
        assert!(!r.debug.raw_depth_ok);
        assert!(!r.debug.raw_lockout_ok);
        assert_eq!(r.debug.hip_y, None);
        assert_eq!(r.raw_status, TopStatus::Idle);
    }
    assert_eq!(session.status(), TopStatus::Idle);
    assert_eq!(session.rep_count(), 0);
}

#[test]
fn test_missing_keypoint_counts_as_no_detection() {
    let mut session = JudgeSession::default();
    let partial = LandmarkFrame::new()
        .with(LandmarkName::LeftHip, Landmark::new(0.5, 0.5, 0.0, 0.9))
        .with(LandmarkName::LeftKnee, Landmark::new(0.55, KNEE_Y, 0.0, 0.9));

    let report = session.process(Some(&partial));
    assert_eq!(report.top_status, TopStatus::NoDetection);
    assert_eq!(session.stats().detected_frames, 0);
}

#[test]
fn test_phase_kept_when_reset_disabled() {
    let mut config = Config::default();
    config.session.reset_phase_on_dropout = false;
    let mut session = JudgeSession::new(&config);

    let mut hips = vec![0.5; 5];
    hips.extend([0.6; 5]);
    run(&mut session, &hips);
    for _ in 0..10 {
        session.process(None);
    }
    run(&mut session, &[0.5; 5]);

    assert_eq!(session.rep_count(), 1);
}

#[test]
fn test_phase_reset_discards_partial_rep() {
    let mut session = JudgeSession::default();

    let mut hips = vec![0.5; 5];
    hips.extend([0.6; 5]);
    run(&mut session, &hips);
    for _ in 0..10 {
        session.process(None);
    }
    run(&mut session, &[0.5; 5]);

    assert_eq!(session.rep_count(), 0);
}

#[test]
fn test_replay_roundtrip_matches_direct() {
    let mut frames: Vec<Option<LandmarkFrame>> = one_rep()
        .into_iter()
        .map(|hip| Some(left_side(hip, 0.9)))
        .collect();
    frames.insert(8, None);

    let mut recorder = LandmarkRecorder::new(Vec::new());
    for (i, frame) in frames.iter().enumerate() {
        recorder.record(frame.as_ref(), Some(i as u64 * 33)).unwrap();
    }
    let bytes = recorder.finish().unwrap();

    let mut direct = JudgeSession::default();
    let expected: Vec<FrameReport> = frames.iter().map(|f| direct.process(f.as_ref())).collect();

    let mut replayed = JudgeSession::default();
    let mut sink: Vec<FrameReport> = Vec::new();
    for item in ReplayReader::new(Cursor::new(bytes)) {
        let frame = item.unwrap();
        sink.publish(&replayed.process(frame.as_ref())).unwrap();
    }

    assert_eq!(sink, expected);
    assert_eq!(replayed.rep_count(), 1);
}

#[test]
fn test_json_lines_sink_writes_one_line_per_frame() {
    let mut session = JudgeSession::default();
    let mut sink = JsonLinesSink::new(Vec::new());
    for report in run(&mut session, &one_rep()) {
        sink.publish(&report).unwrap();
    }
    sink.flush().unwrap();

    let out = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 15);

    let last: serde_json::Value = serde_json::from_str(lines[14]).unwrap();
    assert_eq!(last["rep_count"], 1);
    assert_eq!(last["top_status"], "LOCKOUT_OK");
    assert_eq!(last["visible_side"], "LEFT");
}
