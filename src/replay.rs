//! ランドマーク記録（JSON Lines）の読み書き
//!
//! 1行1フレーム: `{"landmarks": {...} | null, "timestamp_ms": 1234}`。
//! `landmarks` が null のフレームは検出器が人物を返さなかったことを表す。

use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

use crate::error::{JudgeError, Result};
use crate::pose::LandmarkFrame;

/// 記録ファイルの1行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub landmarks: Option<LandmarkFrame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
}

/// 記録を1フレームずつ読む
pub struct ReplayReader<R: BufRead> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> ReplayReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }

    /// タイムスタンプ付きで次のフレームを読む。空行は飛ばす
    pub fn next_record(&mut self) -> Option<Result<RecordedFrame>> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let line_no = self.line_no;
            return Some(
                serde_json::from_str(&line).map_err(|source| JudgeError::Replay { line: line_no, source }),
            );
        }
    }
}

impl<R: BufRead> Iterator for ReplayReader<R> {
    type Item = Result<Option<LandmarkFrame>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().map(|r| r.map(|rec| rec.landmarks))
    }
}

/// ランドマークを記録する
pub struct LandmarkRecorder<W: Write> {
    writer: W,
    frames: u64,
}

impl<W: Write> LandmarkRecorder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, frames: 0 }
    }

    pub fn record(&mut self, landmarks: Option<&LandmarkFrame>, timestamp_ms: Option<u64>) -> Result<()> {
        let rec = RecordedFrame {
            landmarks: landmarks.cloned(),
            timestamp_ms,
        };
        serde_json::to_writer(&mut self.writer, &rec)?;
        self.writer.write_all(b"\n")?;
        self.frames += 1;
        Ok(())
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Landmark, LandmarkName};
    use std::io::Cursor;

    #[test]
    fn test_read_frames_and_gaps() {
        let input = r#"{"landmarks": {"LEFT_HIP": {"x": 0.5, "y": 0.5, "z": 0.0, "visibility": 0.9}}}

{"landmarks": null, "timestamp_ms": 33}
"#;
        let frames: Vec<_> = ReplayReader::new(Cursor::new(input))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(frames.len(), 2);
        let first = frames[0].as_ref().unwrap();
        assert_eq!(first.get(LandmarkName::LeftHip).unwrap().visibility, 0.9);
        assert!(frames[1].is_none());
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let input = "{\"landmarks\": null}\n\n{not json}\n";
        let mut reader = ReplayReader::new(Cursor::new(input));
        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(JudgeError::Replay { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_recorder_output_is_readable() {
        let frame = LandmarkFrame::new()
            .with(LandmarkName::RightKnee, Landmark::new(0.4, 0.6, 0.1, 0.75));
        let mut recorder = LandmarkRecorder::new(Vec::new());
        recorder.record(Some(&frame), Some(0)).unwrap();
        recorder.record(None, Some(33)).unwrap();
        assert_eq!(recorder.frames(), 2);
        let bytes = recorder.finish().unwrap();

        let mut reader = ReplayReader::new(Cursor::new(bytes));
        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.landmarks.as_ref(), Some(&frame));
        assert_eq!(first.timestamp_ms, Some(0));
        let second = reader.next_record().unwrap().unwrap();
        assert!(second.landmarks.is_none());
        assert!(reader.next().is_none());
    }
}
