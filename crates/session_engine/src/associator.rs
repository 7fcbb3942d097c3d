//! Cross-frame person association.
//!
//! Greedy nearest-distance matching of current-frame people onto the
//! identity slots of the previous frame. Not globally optimal: pairs are
//! confirmed smallest-distance first, ties in previous-index-major order.

use contracts::PersonKeypoints;

/// Outcome of associating one frame against the previous one
#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    /// People in identity-slot order, with carry-forward applied
    pub people: Vec<PersonKeypoints>,
    /// Current-frame index placed in each slot (`None`: nobody this frame)
    pub assignment: Vec<Option<usize>>,
    /// Distance of each greedy match, per slot (`None` for leftover pairing)
    pub distances: Vec<Option<f64>>,
}

impl Association {
    /// Current people kept in detector order
    fn passthrough(current: &[PersonKeypoints]) -> Self {
        Self {
            people: current.to_vec(),
            assignment: (0..current.len()).map(Some).collect(),
            distances: vec![None; current.len()],
        }
    }

    pub fn slot_count(&self) -> usize {
        self.people.len()
    }

    /// Slots that received no current-frame person
    pub fn unmatched_slots(&self) -> usize {
        self.assignment.iter().filter(|a| a.is_none()).count()
    }
}

/// Mean Euclidean distance over landmarks defined in both people.
///
/// Infinite when no landmark is defined in both.
pub fn person_distance(a: &PersonKeypoints, b: &PersonKeypoints) -> f64 {
    let (sum, count) = a
        .keypoints
        .iter()
        .zip(&b.keypoints)
        .filter_map(|(ka, kb)| Some(ka.as_ref()?.position.distance(&kb.as_ref()?.position)))
        .fold((0.0, 0usize), |(sum, count), d| (sum + d, count + 1));

    if count == 0 {
        f64::INFINITY
    } else {
        sum / count as f64
    }
}

/// Associate `current` people onto the slots of `previous`.
///
/// Either side empty returns `current` unchanged. Otherwise the slot count
/// is `max(previous, current)`; unmatched slots are filled with unmatched
/// current people by ascending index, and every landmark undefined in the
/// current frame keeps the previous frame's value.
pub fn associate(previous: &[PersonKeypoints], current: &[PersonKeypoints]) -> Association {
    if previous.is_empty() || current.is_empty() {
        return Association::passthrough(current);
    }

    let slots = previous.len().max(current.len());

    let mut pairs: Vec<(usize, usize, f64)> = previous
        .iter()
        .enumerate()
        .flat_map(|(p, prev)| {
            current
                .iter()
                .enumerate()
                .map(move |(c, curr)| (p, c, person_distance(prev, curr)))
        })
        .collect();
    // stable: equal distances stay in previous-major enumeration order
    pairs.sort_by(|a, b| a.2.total_cmp(&b.2));

    let mut assignment: Vec<Option<usize>> = vec![None; slots];
    let mut distances: Vec<Option<f64>> = vec![None; slots];
    let mut current_used = vec![false; current.len()];

    for (p, c, distance) in pairs {
        if assignment[p].is_none() && !current_used[c] {
            assignment[p] = Some(c);
            distances[p] = Some(distance);
            current_used[c] = true;
        }
    }

    let free_slots: Vec<usize> = (0..slots).filter(|s| assignment[*s].is_none()).collect();
    let free_current = (0..current.len()).filter(|c| !current_used[*c]);
    for (slot, c) in free_slots.into_iter().zip(free_current) {
        assignment[slot] = Some(c);
    }

    let people = (0..slots)
        .map(|slot| {
            let curr = assignment[slot].map(|c| &current[c]);
            carry_forward(previous.get(slot), curr)
        })
        .collect();

    Association {
        people,
        assignment,
        distances,
    }
}

/// Current values where defined, previous values elsewhere
fn carry_forward(
    previous: Option<&PersonKeypoints>,
    current: Option<&PersonKeypoints>,
) -> PersonKeypoints {
    match (previous, current) {
        (None, None) => PersonKeypoints::default(),
        (Some(prev), None) => prev.clone(),
        (None, Some(curr)) => curr.clone(),
        (Some(prev), Some(curr)) => {
            let width = prev.len().max(curr.len());
            PersonKeypoints::new(
                (0..width)
                    .map(|i| curr.get(i).or_else(|| prev.get(i)).copied())
                    .collect(),
            )
        }
    }
}
