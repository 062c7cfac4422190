//! Replays recorded pose-model output as a frame source.
//!
//! The input is newline-delimited JSON with one frame per line. A line is
//! either `null`, meaning the model detected nobody, or an array indexed like
//! [`LandmarkKind`](crate::landmark::LandmarkKind) whose entries are `null` or
//! `{"x": .., "y": .., "z": .., "visibility": ..}`. Blank lines are ignored.
//! Entries of any other shape become empty slots, like undetected points.

use crate::{
    capture::FrameSource,
    error::Error,
    landmark::{LandmarkSet, RawLandmark},
};
use serde_json::Value;
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Lines},
    path::Path,
};
use tracing::trace;

pub(crate) struct Replay<R> {
    lines: Option<Lines<R>>,
    line: usize,
}

impl Replay<Box<dyn BufRead + Send>> {
    /// Open a replay file, or standard input when `path` is `-`.
    pub(crate) fn open(path: &Path) -> Result<Self, Error> {
        let reader: Box<dyn BufRead + Send> = if path == Path::new("-") {
            Box::new(BufReader::new(io::stdin()))
        } else {
            Box::new(BufReader::new(
                File::open(path).map_err(|e| Error::OpenReplay(e, path.to_owned()))?,
            ))
        };
        Ok(Self::new(reader))
    }
}

impl<R> Replay<R>
where
    R: BufRead,
{
    pub(crate) fn new(reader: R) -> Self {
        Self {
            lines: Some(reader.lines()),
            line: 0,
        }
    }
}

fn raw_landmark(line: usize, index: usize, entry: Value) -> Option<RawLandmark> {
    if entry.is_null() {
        return None;
    }
    match serde_json::from_value(entry) {
        Ok(raw) => Some(raw),
        Err(error) => {
            trace!(message = "dropping malformed landmark entry", line, index, %error);
            None
        }
    }
}

impl<R> FrameSource for Replay<R>
where
    R: BufRead,
{
    type Frame = Option<LandmarkSet>;

    fn is_ready(&self) -> bool {
        true
    }

    fn grab(&mut self) -> Result<Option<Self::Frame>, Error> {
        let lines = match self.lines.as_mut() {
            Some(lines) => lines,
            None => return Ok(None),
        };

        for line in lines {
            self.line += 1;
            let number = self.line;
            let line = line.map_err(|e| Error::ReadReplay(e, number))?;
            if line.trim().is_empty() {
                continue;
            }
            let entries: Option<Vec<Value>> =
                serde_json::from_str(&line).map_err(|e| Error::ParseReplayLine(e, number))?;
            return Ok(Some(entries.map(|entries| {
                LandmarkSet::from_raw(
                    entries
                        .into_iter()
                        .enumerate()
                        .map(|(index, entry)| raw_landmark(number, index, entry)),
                )
            })));
        }

        Ok(None)
    }

    fn release(&mut self) {
        self.lines = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classify::Classifier,
        landmark::{LandmarkKind, NUM_LANDMARKS},
    };
    use assert_approx_eq::assert_approx_eq;
    use std::io::Cursor;

    fn frame(points: &[(usize, f32, f32)]) -> String {
        let mut slots = vec!["null".to_owned(); NUM_LANDMARKS];
        for &(index, x, y) in points {
            slots[index] = format!(r#"{{"x": {}, "y": {}, "z": -0.5, "visibility": 0.99}}"#, x, y);
        }
        format!("[{}]", slots.join(","))
    }

    #[test]
    fn reads_frames_and_detection_failures() {
        let input = format!(
            "{}\n\nnull\n{}\n",
            frame(&[(0, 0.5, 0.25), (11, 0.35, 0.3), (12, 0.65, 0.3), (23, 0.4, 0.8), (24, 0.6, 0.8)]),
            frame(&[(0, 0.5, 0.25)]),
        );
        let mut replay = Replay::new(Cursor::new(input));
        assert!(replay.is_ready());

        let first = replay.grab().unwrap().unwrap().unwrap();
        assert_eq!(first.len(), NUM_LANDMARKS);
        let shoulder = first.get(LandmarkKind::RightShoulder).unwrap();
        assert_approx_eq!(shoulder.x, 0.65);
        assert_approx_eq!(shoulder.y, 0.3);
        assert_approx_eq!(shoulder.z.unwrap(), -0.5);
        assert!(first.get(LandmarkKind::LeftEar).is_none());

        assert_eq!(replay.grab().unwrap(), Some(None));

        let partial = replay.grab().unwrap().unwrap().unwrap();
        assert!(partial.get(LandmarkKind::Nose).is_some());
        assert!(partial.get(LandmarkKind::LeftHip).is_none());

        assert_eq!(replay.grab().unwrap(), None);
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let mut replay = Replay::new(Cursor::new("null\n\n{\"x\": 1}\n"));
        assert_eq!(replay.grab().unwrap(), Some(None));
        assert!(matches!(replay.grab(), Err(Error::ParseReplayLine(_, 3))));
    }

    #[test]
    fn broken_points_become_empty_slots() {
        let healthy = frame(&[
            (0, 0.5, 0.25),
            (11, 0.35, 0.3),
            (12, 0.65, 0.3),
            (23, 0.4, 0.8),
            (24, 0.6, 0.8),
        ]);
        let broken = [
            r#"{"x": 0.35}"#,
            r#"{"x": "left", "y": 0.3}"#,
            r#"{"x": null, "y": 0.3}"#,
            "7",
        ];

        let mut input = format!("{}\n", healthy);
        for entry in broken.iter() {
            let mut entries: Vec<Value> = serde_json::from_str(&healthy).unwrap();
            entries[11] = serde_json::from_str(entry).unwrap();
            input.push_str(&serde_json::to_string(&entries).unwrap());
            input.push('\n');
        }
        let mut replay = Replay::new(Cursor::new(input));

        let classifier = Classifier::default();
        let complete = replay.grab().unwrap().unwrap().unwrap();
        assert!(classifier.classify(&complete).is_some());

        for _ in 0..broken.len() {
            let set = replay.grab().unwrap().unwrap().unwrap();
            assert!(set.get(LandmarkKind::LeftShoulder).is_none());
            assert!(set.get(LandmarkKind::RightShoulder).is_some());
            assert_eq!(classifier.classify(&set), None);
        }
        assert_eq!(replay.grab().unwrap(), None);
    }

    #[test]
    fn extra_entries_and_huge_coordinates() {
        let mut entries: Vec<Value> =
            serde_json::from_str(&frame(&[(0, 0.5, 0.25), (12, 0.65, 0.3)])).unwrap();
        entries[11] = serde_json::json!({"x": 1e40, "y": 0.3});
        entries.push(serde_json::json!({"x": 0.1, "y": 0.2}));
        entries.push(serde_json::json!({"x": 0.3, "y": 0.4}));
        let line = serde_json::to_string(&entries).unwrap();

        let mut replay = Replay::new(Cursor::new(line));
        let set = replay.grab().unwrap().unwrap().unwrap();
        assert_eq!(set.len(), NUM_LANDMARKS + 2);
        assert!(set.get(LandmarkKind::LeftShoulder).is_none());
        assert!(set.get(LandmarkKind::Nose).is_some());
        // indices past the model's points carry no kind
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn released_replay_is_exhausted() {
        let mut replay = Replay::new(Cursor::new("null\nnull\n"));
        replay.release();
        assert_eq!(replay.grab().unwrap(), None);
    }

    #[test]
    fn missing_file_fails_to_open() {
        let path = Path::new("/nonexistent/posture.ndjson");
        assert!(matches!(Replay::open(path), Err(Error::OpenReplay(_, _))));
    }
}
