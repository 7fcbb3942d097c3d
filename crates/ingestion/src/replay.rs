//! JSON-lines replay of recorded detector output.
//!
//! One [`DetectionFrame`] per line. Unreadable lines are skipped with a
//! warning; emission blocks on the callback, so a full channel with the
//! `block` policy throttles the reader.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{DetectionCallback, DetectionFrame, DetectionSource};
use tracing::{debug, warn};

use crate::error::{IngestionError, Result};

/// Replays a recording file as a live source
pub struct ReplaySource {
    source_id: String,
    path: PathBuf,
    /// Playback speed multiplier; `None` emits as fast as possible
    speed: Option<f64>,
    listening: Arc<AtomicBool>,
    exhausted: Arc<AtomicBool>,
    skipped: Arc<AtomicU64>,
}

impl ReplaySource {
    /// Frames keep the recorded `source_id` unless overridden with `source_id`
    pub fn new(source_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            source_id: source_id.into(),
            path: path.into(),
            speed: None,
            listening: Arc::new(AtomicBool::new(false)),
            exhausted: Arc::new(AtomicBool::new(false)),
            skipped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Pace emission by recorded timestamps divided by `speed`
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = (speed > 0.0 && speed.is_finite()).then_some(speed);
        self
    }

    /// Source id derived from the recording's file stem
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let source_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "replay".to_string());
        Self::new(source_id, path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines skipped as unreadable so far
    pub fn skipped_lines(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}

impl DetectionSource for ReplaySource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn listen(&self, callback: DetectionCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let source_id = self.source_id.clone();
        let path = self.path.clone();
        let speed = self.speed;
        let listening = self.listening.clone();
        let exhausted = self.exhausted.clone();
        let skipped = self.skipped.clone();

        std::thread::spawn(move || {
            let file = match File::open(&path) {
                Ok(file) => file,
                Err(e) => {
                    warn!(source_id = %source_id, path = %path.display(), error = %e, "cannot open recording");
                    listening.store(false, Ordering::SeqCst);
                    exhausted.store(true, Ordering::SeqCst);
                    return;
                }
            };
            debug!(source_id = %source_id, path = %path.display(), "replay started");

            let mut previous: Option<f64> = None;
            let mut emitted = 0u64;
            let mut finished = true;
            for (idx, line) in BufReader::new(file).lines().enumerate() {
                if !listening.load(Ordering::Relaxed) {
                    finished = false;
                    break;
                }
                let mut frame = match line
                    .map_err(IngestionError::from)
                    .and_then(|l| parse_line(&source_id, idx + 1, &l))
                {
                    Ok(Some(frame)) => frame,
                    Ok(None) => continue,
                    Err(e) => {
                        skipped.fetch_add(1, Ordering::Relaxed);
                        warn!(source_id = %source_id, error = %e, "skipping recording line");
                        continue;
                    }
                };
                frame.source_id.clone_from(&source_id);

                if let (Some(speed), Some(prev)) = (speed, previous) {
                    let gap = (frame.timestamp - prev) / speed;
                    match Duration::try_from_secs_f64(gap) {
                        Ok(pause) => std::thread::sleep(pause),
                        Err(_) if gap > 0.0 => {
                            warn!(
                                source_id = %source_id,
                                gap,
                                "timestamp gap too large to pace, not waiting"
                            );
                        }
                        Err(_) => {}
                    }
                }
                previous = Some(frame.timestamp);

                callback(frame);
                emitted += 1;
            }

            listening.store(false, Ordering::SeqCst);
            if finished {
                exhausted.store(true, Ordering::SeqCst);
            }
            debug!(source_id = %source_id, emitted, "replay finished");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Relaxed)
    }

    fn skipped_records(&self) -> u64 {
        self.skipped_lines()
    }
}

/// Parse one recording line; blank lines yield `None`
fn parse_line(source_id: &str, line_no: usize, line: &str) -> Result<Option<DetectionFrame>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line)
        .map(Some)
        .map_err(|e| IngestionError::ParseFailed {
            source_id: source_id.to_string(),
            line: line_no,
            message: e.to_string(),
        })
}

/// Read a whole recording eagerly; the first unreadable line is an error
pub fn load_recording(path: impl AsRef<Path>) -> Result<Vec<DetectionFrame>> {
    let path = path.as_ref();
    let label = path.display().to_string();
    let reader = BufReader::new(File::open(path)?);

    let mut frames = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        if let Some(frame) = parse_line(&label, idx + 1, &line?)? {
            frames.push(frame);
        }
    }
    Ok(frames)
}

/// Write frames as a recording, one JSON object per line
pub fn write_recording<W: Write>(frames: &[DetectionFrame], mut writer: W) -> Result<()> {
    for frame in frames {
        let line = serde_json::to_string(frame).map_err(|e| IngestionError::ParseFailed {
            source_id: frame.source_id.clone(),
            line: 0,
            message: e.to_string(),
        })?;
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    Ok(())
}
