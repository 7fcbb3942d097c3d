//! AngleFileSink - per-person angle time series and ROM summaries on disk
//!
//! Layout under `base_path`:
//! - `<source_id>_angles_person<NN>.mot`
//! - `<source_id>_person<NN>_rom.json` (unless `write_summary = "false"`)

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::Utc;
use contracts::{
    AngleResult, ContractError, DataSink, FrameRecord, RomAnalysis, RomOptions, RunningRomPoint,
    TimeSeries,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

/// Configuration for AngleFileSink
#[derive(Debug, Clone)]
pub struct AngleFileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
    /// Also write the ROM summary JSON
    pub write_summary: bool,
    /// Running-ROM settings for the summary
    pub rom: RomOptions,
}

impl Default for AngleFileSinkConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./output"),
            write_summary: true,
            rom: RomOptions::default(),
        }
    }
}

impl AngleFileSinkConfig {
    /// Create config from params map
    ///
    /// Keys: `base_path`, `write_summary`, `time_window`, `reference_angle`,
    /// `test_name`. The ROM keys override `rom`; other missing keys keep
    /// their defaults.
    pub fn from_params(
        params: &HashMap<String, String>,
        rom: &RomOptions,
    ) -> Result<Self, ContractError> {
        let mut config = Self {
            rom: rom.clone(),
            ..Self::default()
        };

        if let Some(path) = params.get("base_path") {
            config.base_path = PathBuf::from(path);
        }
        if let Some(flag) = params.get("write_summary") {
            config.write_summary = flag.trim().parse().map_err(|_| {
                ContractError::config_validation(
                    "params.write_summary",
                    format!("expected true or false, got '{flag}'"),
                )
            })?;
        }
        if let Some(window) = params.get("time_window") {
            let seconds: f64 = window.trim().parse().map_err(|_| {
                ContractError::config_validation("params.time_window", format!("not a number: '{window}'"))
            })?;
            if !(seconds > 0.0 && seconds.is_finite()) {
                return Err(ContractError::config_validation(
                    "params.time_window",
                    "must be a positive number of seconds",
                ));
            }
            config.rom.time_window = seconds;
        }
        if let Some(reference) = params.get("reference_angle") {
            config.rom.reference_angle = reference.clone();
        }
        if let Some(test) = params.get("test_name") {
            config.rom.test_name = test.clone();
        }

        Ok(config)
    }
}

/// Contents of `<source_id>_person<NN>_rom.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RomSummaryFile {
    pub source_id: String,
    pub person: usize,
    pub test: String,
    pub reference_angle: String,
    /// RFC 3339 creation time
    pub generated_at: String,
    #[serde(flatten)]
    pub analysis: RomAnalysis,
    pub running_rom: Vec<RunningRomPoint>,
}

/// Frames collected for one (source, person) pair
#[derive(Debug, Default)]
struct Track {
    frames: Vec<(f64, AngleResult)>,
    dirty: bool,
}

/// Sink that accumulates angle time series and writes them on flush/close
pub struct AngleFileSink {
    name: String,
    config: AngleFileSinkConfig,
    tracks: BTreeMap<(String, usize), Track>,
}

impl AngleFileSink {
    /// Create a new AngleFileSink, creating `base_path` if needed
    pub fn new(name: impl Into<String>, config: AngleFileSinkConfig) -> Result<Self, ContractError> {
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
            tracks: BTreeMap::new(),
        })
    }

    /// Create from params map (for factory), on top of the session ROM settings
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
        rom: &RomOptions,
    ) -> Result<Self, ContractError> {
        Self::new(name, AngleFileSinkConfig::from_params(params, rom)?)
    }

    pub fn config(&self) -> &AngleFileSinkConfig {
        &self.config
    }

    /// Path of the angle file for one person
    pub fn angles_path(&self, source_id: &str, person: usize) -> PathBuf {
        self.config
            .base_path
            .join(format!("{}_angles_person{person:02}.mot", file_stem(source_id)))
    }

    /// Path of the ROM summary for one person
    pub fn summary_path(&self, source_id: &str, person: usize) -> PathBuf {
        self.config
            .base_path
            .join(format!("{}_person{person:02}_rom.json", file_stem(source_id)))
    }

    fn accumulate(&mut self, record: &FrameRecord) {
        for person in &record.people {
            let track = self
                .tracks
                .entry((record.source_id.clone(), person.slot))
                .or_default();
            track.frames.push((record.timestamp, person.angles.clone()));
            track.dirty = true;
        }
    }

    fn write_track(&self, source_id: &str, person: usize, track: &Track) -> Result<(), ContractError> {
        let series = TimeSeries::from_results(track.frames.iter().map(|(t, a)| (*t, a)))?;

        let angles_path = self.angles_path(source_id, person);
        rom_analysis::write_mot_file(&series, &angles_path)?;

        if self.config.write_summary {
            let rom = &self.config.rom;
            let summary = RomSummaryFile {
                source_id: source_id.to_string(),
                person,
                test: rom.test_name.clone(),
                reference_angle: rom.reference_angle.clone(),
                generated_at: Utc::now().to_rfc3339(),
                analysis: rom_analysis::summarize(&series),
                running_rom: rom_analysis::running_rom(&series, rom.time_window, &rom.reference_angle),
            };
            write_json(&self.summary_path(source_id, person), &summary)?;
        }

        debug!(
            sink = %self.name,
            source_id,
            person,
            rows = series.len(),
            path = %angles_path.display(),
            "angle files written"
        );
        Ok(())
    }

    /// Write every track that changed since the last flush
    fn persist_tracks(&mut self) -> Result<(), ContractError> {
        let mut first_error = None;
        for ((source_id, person), track) in &self.tracks {
            if !track.dirty {
                continue;
            }
            if let Err(e) = self.write_track(source_id, *person, track) {
                error!(sink = %self.name, source_id = %source_id, person, error = %e, "Write failed");
                first_error.get_or_insert(ContractError::sink_write(&self.name, e.to_string()));
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }
        for track in self.tracks.values_mut() {
            track.dirty = false;
        }
        Ok(())
    }
}

/// Source ids become file name prefixes; path separators are replaced
fn file_stem(source_id: &str) -> String {
    source_id
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect()
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ContractError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .map_err(|e| ContractError::Io(std::io::Error::other(e)))
}

impl DataSink for AngleFileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, record),
        fields(sink = %self.name, frame_id = record.frame_id)
    )]
    async fn write(&mut self, record: &FrameRecord) -> Result<(), ContractError> {
        self.accumulate(record);
        Ok(())
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.persist_tracks()
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.persist_tracks()?;
        debug!(sink = %self.name, tracks = self.tracks.len(), "AngleFileSink closed");
        Ok(())
    }
}
