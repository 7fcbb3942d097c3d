//! Frame processing context.
//!
//! Each frame is an explicit transition `(context, frame) -> context'`; the
//! context is moved through [`FrameContext::advance`] rather than mutated
//! in place, so the ordering requirement is visible in the types.

use std::collections::BTreeMap;

use angle_engine::AngleCalculator;
use contracts::{
    AngleRange, AngleResult, BodyModel, ContractError, DetectionFrame, FrameRecord, Keypoint,
    PersonFrame, PersonKeypoints, PersonSelection, SessionConfig, TimeSeries,
};

use crate::associator::{associate, Association};

/// Per-session processing settings resolved from [`SessionConfig`]
#[derive(Debug, Clone)]
pub struct FrameProcessor {
    pub model: &'static BodyModel,
    pub calculator: AngleCalculator,
    pub selection: PersonSelection,
}

impl FrameProcessor {
    /// # Errors
    /// `UnknownModel` when `model_type` is not registered
    pub fn from_config(config: &SessionConfig) -> Result<Self, ContractError> {
        let model = BodyModel::from_name(&config.model_type)?;
        let calculator = AngleCalculator::new(&config.angle_names(), config.confidence_threshold);
        Ok(Self {
            model,
            calculator,
            selection: config.person_selection,
        })
    }
}

/// One processed frame of one tracked person
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedFrame {
    pub timestamp: f64,
    pub angles: AngleResult,
    pub keypoints: BTreeMap<String, Keypoint>,
}

/// History of one identity slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonTrack {
    pub frames: Vec<TrackedFrame>,
    /// Running min/max per angle name
    pub ranges: BTreeMap<String, AngleRange>,
}

impl PersonTrack {
    fn record(&mut self, frame: TrackedFrame) {
        for (name, value) in frame.angles.iter() {
            self.ranges
                .entry(name.to_string())
                .and_modify(|r| r.update(value))
                .or_insert_with(|| AngleRange::new(value));
        }
        self.frames.push(frame);
    }

    /// Angle history as a table, one column per angle ever produced
    ///
    /// # Errors
    /// `InvalidTimeSeries` if frame times are not strictly increasing
    pub fn time_series(&self) -> Result<TimeSeries, ContractError> {
        TimeSeries::from_results(self.frames.iter().map(|f| (f.timestamp, &f.angles)))
    }
}

/// Association statistics of one transition
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationStats {
    pub slots: usize,
    pub unmatched: usize,
    pub distances: Vec<f64>,
}

impl From<&Association> for AssociationStats {
    fn from(assoc: &Association) -> Self {
        Self {
            slots: assoc.slot_count(),
            unmatched: assoc.unmatched_slots(),
            distances: assoc.distances.iter().flatten().copied().collect(),
        }
    }
}

/// Result of [`FrameContext::advance`]
#[derive(Debug)]
pub struct Transition {
    pub context: FrameContext,
    pub record: FrameRecord,
    /// `None` when association was skipped (first frame or empty side)
    pub association: Option<AssociationStats>,
}

/// Long-lived state of one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameContext {
    frame_count: u64,
    last_timestamp: Option<f64>,
    previous: Vec<PersonKeypoints>,
    tracks: BTreeMap<usize, PersonTrack>,
}

impl FrameContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames accepted so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }

    /// Most recent associated detections
    pub fn previous(&self) -> &[PersonKeypoints] {
        &self.previous
    }

    pub fn track(&self, slot: usize) -> Option<&PersonTrack> {
        self.tracks.get(&slot)
    }

    pub fn tracks(&self) -> impl Iterator<Item = (usize, &PersonTrack)> {
        self.tracks.iter().map(|(slot, track)| (*slot, track))
    }

    /// Whether `frame` may follow the frames seen so far
    ///
    /// # Errors
    /// `OutOfOrderFrame` when its time does not strictly advance
    pub fn check_order(&self, frame: &DetectionFrame) -> Result<(), ContractError> {
        let advances = match self.last_timestamp {
            Some(last) => frame.timestamp > last,
            None => true,
        };
        if advances && frame.timestamp.is_finite() {
            return Ok(());
        }
        Err(ContractError::OutOfOrderFrame {
            source_id: frame.source_id.clone(),
            frame_id: frame.frame_id,
            timestamp: frame.timestamp,
            last: self.last_timestamp.unwrap_or(f64::NEG_INFINITY),
        })
    }

    /// Consume the context and one frame, producing the next context.
    ///
    /// Callers check ordering first with [`check_order`](Self::check_order).
    pub fn advance(mut self, frame: &DetectionFrame, processor: &FrameProcessor) -> Transition {
        let current = &frame.detections.people;
        let (people, association) = if self.previous.is_empty() || current.is_empty() {
            (current.clone(), None)
        } else {
            let assoc = associate(&self.previous, current);
            let stats = AssociationStats::from(&assoc);
            (assoc.people, Some(stats))
        };

        let selected: Vec<usize> = match processor.selection {
            PersonSelection::First => (0..people.len().min(1)).collect(),
            PersonSelection::All => (0..people.len()).collect(),
        };

        let mut processed = Vec::with_capacity(selected.len());
        for slot in selected {
            let set = processor.model.keypoint_set(&people[slot]);
            let calc = processor.calculator.calculate(&set);
            let keypoints: BTreeMap<String, Keypoint> = calc
                .keypoints
                .defined()
                .map(|(name, kp)| (name.to_string(), *kp))
                .collect();

            let track = self.tracks.entry(slot).or_default();
            track.record(TrackedFrame {
                timestamp: frame.timestamp,
                angles: calc.angles.clone(),
                keypoints: keypoints.clone(),
            });
            let live_rom = calc
                .angles
                .names()
                .filter_map(|name| track.ranges.get(name).map(|r| (name.to_string(), *r)))
                .collect();

            processed.push(PersonFrame {
                slot,
                angles: calc.angles,
                keypoints,
                live_rom,
            });
        }

        self.previous = people;
        self.frame_count += 1;
        self.last_timestamp = Some(frame.timestamp);

        let record = FrameRecord {
            source_id: frame.source_id.clone(),
            frame_id: frame.frame_id,
            timestamp: frame.timestamp,
            people: processed,
        };

        Transition {
            context: self,
            record,
            association,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::PoseDetections;

    fn processor(selection: PersonSelection) -> FrameProcessor {
        let config = SessionConfig {
            model_type: "COCO_17".into(),
            joint_angles: vec!["left knee".into()],
            segment_angles: vec!["trunk".into()],
            person_selection: selection,
            ..Default::default()
        };
        FrameProcessor::from_config(&config).unwrap()
    }

    /// COCO_17 person standing at horizontal offset `dx` with trunk lean `lean`
    fn coco_person(dx: f64, lean: f64) -> PersonKeypoints {
        let mut raw = vec![None; 17];
        let mut put = |idx: usize, x: f64, y: f64| raw[idx] = Some(Keypoint::new(x + dx, y, 0.9));
        put(5, 60.0 + lean, 100.0); // LShoulder
        put(6, 40.0 + lean, 100.0); // RShoulder
        put(11, 55.0, 200.0); // LHip
        put(12, 45.0, 200.0); // RHip
        put(13, 55.0, 300.0); // LKnee
        put(15, 55.0, 400.0); // LAnkle
        PersonKeypoints::new(raw)
    }

    fn frame(id: u64, t: f64, people: Vec<PersonKeypoints>) -> DetectionFrame {
        DetectionFrame::new("cam", id, t, PoseDetections::new(people))
    }

    #[test]
    fn first_frame_skips_association() {
        let p = processor(PersonSelection::First);
        let t = FrameContext::new().advance(&frame(0, 0.0, vec![coco_person(0.0, 0.0)]), &p);
        assert!(t.association.is_none());
        assert_eq!(t.context.frame_count(), 1);
        assert_eq!(t.record.people.len(), 1);
        assert!((t.record.people[0].angles.get("trunk").unwrap() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn first_selection_processes_slot_zero_only() {
        let p = processor(PersonSelection::First);
        let people = vec![coco_person(0.0, 0.0), coco_person(300.0, 0.0)];
        let t = FrameContext::new().advance(&frame(0, 0.0, people), &p);
        assert_eq!(t.record.people.len(), 1);
        assert_eq!(t.record.people[0].slot, 0);
    }

    #[test]
    fn all_selection_tracks_every_slot_through_swaps() {
        let p = processor(PersonSelection::All);
        let ctx = FrameContext::new();
        let t = ctx.advance(
            &frame(0, 0.0, vec![coco_person(0.0, 0.0), coco_person(300.0, 30.0)]),
            &p,
        );
        // detector swaps the order on the next frame
        let t = t.context.advance(
            &frame(1, 0.1, vec![coco_person(302.0, 30.0), coco_person(2.0, 0.0)]),
            &p,
        );
        let stats = t.association.unwrap();
        assert_eq!(stats.slots, 2);
        assert_eq!(stats.unmatched, 0);

        let slot0 = t.record.person(0).unwrap();
        let slot1 = t.record.person(1).unwrap();
        assert!((slot0.angles.get("trunk").unwrap() - 90.0).abs() < 1e-9);
        assert!(slot1.angles.get("trunk").unwrap() < 90.0);
        assert_eq!(t.context.track(1).unwrap().frames.len(), 2);
    }

    #[test]
    fn live_rom_widens_across_frames() {
        let p = processor(PersonSelection::First);
        let mut ctx = FrameContext::new();
        for (i, lean) in [0.0, 20.0, -10.0].into_iter().enumerate() {
            let t = ctx.advance(&frame(i as u64, i as f64 * 0.1, vec![coco_person(0.0, lean)]), &p);
            ctx = t.context;
        }
        let track = ctx.track(0).unwrap();
        let trunk = track.ranges.get("trunk").unwrap();
        assert!(trunk.rom() > 0.0);
        assert!(trunk.min < 90.0 && trunk.max > 90.0);
    }

    #[test]
    fn empty_frame_resets_previous_but_keeps_tracks() {
        let p = processor(PersonSelection::First);
        let t = FrameContext::new().advance(&frame(0, 0.0, vec![coco_person(0.0, 0.0)]), &p);
        let t = t.context.advance(&frame(1, 0.1, vec![]), &p);
        assert!(t.record.people.is_empty());
        assert!(t.context.previous().is_empty());
        assert_eq!(t.context.track(0).unwrap().frames.len(), 1);
        assert_eq!(t.context.frame_count(), 2);
    }

    #[test]
    fn check_order_rejects_stale_frames() {
        let p = processor(PersonSelection::First);
        let t = FrameContext::new().advance(&frame(0, 1.0, vec![]), &p);
        assert!(t.context.check_order(&frame(1, 1.0, vec![])).is_err());
        assert!(t.context.check_order(&frame(1, 0.5, vec![])).is_err());
        assert!(t.context.check_order(&frame(1, f64::NAN, vec![])).is_err());
        assert!(t.context.check_order(&frame(1, 1.5, vec![])).is_ok());
    }

    #[test]
    fn track_time_series_has_a_row_per_processed_frame() {
        let p = processor(PersonSelection::First);
        let mut ctx = FrameContext::new();
        for i in 0..4u64 {
            ctx = ctx
                .advance(&frame(i, i as f64 / 30.0, vec![coco_person(0.0, 0.0)]), &p)
                .context;
        }
        let series = ctx.track(0).unwrap().time_series().unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(series.angle_names(), ["left knee", "trunk"]);
    }

    #[test]
    fn unknown_model_is_fatal() {
        let config = SessionConfig {
            model_type: "not_a_model".into(),
            ..Default::default()
        };
        assert!(matches!(
            FrameProcessor::from_config(&config),
            Err(ContractError::UnknownModel { .. })
        ));
    }
}
