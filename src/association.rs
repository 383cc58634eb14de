use crate::track::Track;
use crate::Detection;
use log::{trace, warn};
use munkres::{solve_assignment, WeightMatrix};
use ndarray::Array2;
use serde_derive::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Largest square cost matrix handed to the Hungarian solver.
pub const MAX_ASSIGNMENT_SIZE: usize = 1024;

// cost of a padding cell or of a pair under the overlap threshold
const UNMATCHED_COST: f32 = 1.0;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum AssociationMethod {
    /// Optimal assignment maximizing the summed IoU (Kuhn-Munkres)
    #[default]
    Hungarian,
    /// Repeatedly takes the best remaining pair
    Greedy,
}

#[derive(Debug)]
enum IndexedSliceKind {
    All,
    Indexes(Vec<usize>),
}

/// A view over a subset of a slice which remembers the positions of its
/// items in the backing slice.
pub struct IndexedSlice<'a, T> {
    pub slice: &'a [T],
    kind: IndexedSliceKind,
}

impl<'a, T> IndexedSlice<'a, T> {
    pub fn new(slice: &'a [T]) -> Self {
        Self {
            slice,
            kind: IndexedSliceKind::All,
        }
    }

    pub fn new_with_indexes(slice: &'a [T], idx: Vec<usize>) -> Self {
        Self {
            slice,
            kind: IndexedSliceKind::Indexes(idx),
        }
    }

    /// Position of the `idx`-th item of the view in the backing slice.
    #[inline]
    pub fn get_index(&self, idx: usize) -> usize {
        match &self.kind {
            IndexedSliceKind::All => idx,
            IndexedSliceKind::Indexes(idxs) => idxs[idx],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match &self.kind {
            IndexedSliceKind::All => self.slice.len(),
            IndexedSliceKind::Indexes(idxs) => idxs.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a, T> std::ops::Index<usize> for IndexedSlice<'a, T> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.slice[self.get_index(index)]
    }
}

/// Result of one association pass. All indexes point into the backing
/// slices, not into the views the pass was run on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Association {
    /// `(track index, detection index, iou)`, ordered by track index
    pub matches: Vec<(usize, usize, f32)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// IoU between the predicted box of every track (rows) and every
/// detection (columns).
pub fn iou_matrix(
    tracks: &IndexedSlice<'_, Track>,
    detections: &IndexedSlice<'_, Detection>,
) -> Array2<f32> {
    Array2::from_shape_fn((tracks.len(), detections.len()), |(r, c)| {
        tracks[r].predicted_bbox().iou(&detections[c].bbox())
    })
}

pub fn associate(
    tracks: &IndexedSlice<'_, Track>,
    detections: &IndexedSlice<'_, Detection>,
    threshold: f32,
    method: AssociationMethod,
) -> Association {
    if tracks.is_empty() || detections.is_empty() {
        return Association {
            matches: Vec::new(),
            unmatched_tracks: (0..tracks.len()).map(|i| tracks.get_index(i)).collect(),
            unmatched_detections: (0..detections.len())
                .map(|i| detections.get_index(i))
                .collect(),
        };
    }

    let ious = iou_matrix(tracks, detections);
    let n = tracks.len().max(detections.len());

    let mut pairs = match method {
        AssociationMethod::Hungarian if n <= MAX_ASSIGNMENT_SIZE => {
            solve_hungarian(&ious, threshold, tracks).unwrap_or_else(|| {
                warn!(
                    "assignment of {}x{} could not be solved, falling back to greedy",
                    ious.nrows(),
                    ious.ncols()
                );
                solve_greedy(&ious, threshold, tracks)
            })
        }
        _ => solve_greedy(&ious, threshold, tracks),
    };

    pairs.sort_by_key(|&(r, _, _)| r);

    let mut track_used = vec![false; tracks.len()];
    let mut det_used = vec![false; detections.len()];
    let mut matches = Vec::with_capacity(pairs.len());

    for (r, c, iou) in pairs {
        track_used[r] = true;
        det_used[c] = true;

        trace!(
            "track {} <-> detection {} (iou {:.3})",
            tracks[r].id,
            detections.get_index(c),
            iou
        );

        matches.push((tracks.get_index(r), detections.get_index(c), iou));
    }

    Association {
        matches,
        unmatched_tracks: (0..tracks.len())
            .filter(|&r| !track_used[r])
            .map(|r| tracks.get_index(r))
            .collect(),
        unmatched_detections: (0..detections.len())
            .filter(|&c| !det_used[c])
            .map(|c| detections.get_index(c))
            .collect(),
    }
}

#[inline]
fn acceptable(iou: f32, threshold: f32) -> bool {
    iou > 0.0 && iou >= threshold
}

/// Minimizes `sum(1 - iou)` over a square matrix where padding and
/// sub-threshold pairs cost as much as leaving both sides unmatched, which
/// is the same as maximizing the summed IoU of the accepted pairs.
///
/// Among optimal assignments the one handing tied detections to the lower
/// track id is returned.
fn solve_hungarian(
    ious: &Array2<f32>,
    threshold: f32,
    tracks: &IndexedSlice<'_, Track>,
) -> Option<Vec<(usize, usize, f32)>> {
    let (rows, cols) = ious.dim();
    let n = rows.max(cols);

    let mut mat = WeightMatrix::from_fn(n, |(r, c)| {
        if r < rows && c < cols && acceptable(ious[[r, c]], threshold) {
            UNMATCHED_COST - ious[[r, c]]
        } else {
            UNMATCHED_COST
        }
    });

    let solution = solve_assignment(&mut mat).ok()?;

    let mut pairs: Vec<(usize, usize, f32)> = solution
        .into_iter()
        .filter(|p| p.row < rows && p.column < cols)
        .map(|p| (p.row, p.column, ious[[p.row, p.column]]))
        .filter(|&(_, _, iou)| acceptable(iou, threshold))
        .collect();

    prefer_lower_ids(&mut pairs, ious, tracks);

    Some(pairs)
}

/// Hands a matched detection over to an unmatched track with a lower id and
/// the same IoU. The summed IoU does not change, so the result stays optimal.
fn prefer_lower_ids(
    pairs: &mut [(usize, usize, f32)],
    ious: &Array2<f32>,
    tracks: &IndexedSlice<'_, Track>,
) {
    let mut track_used = vec![false; ious.nrows()];
    for &(r, _, _) in pairs.iter() {
        track_used[r] = true;
    }

    for pair in pairs.iter_mut() {
        let (r, c, iou) = *pair;

        let lowest = (0..ious.nrows())
            .filter(|&o| !track_used[o] && ious[[o, c]] == iou)
            .min_by_key(|&o| tracks[o].id);

        if let Some(o) = lowest {
            if tracks[o].id < tracks[r].id {
                track_used[r] = false;
                track_used[o] = true;
                *pair = (o, c, iou);
            }
        }
    }
}

/// Takes pairs in order of decreasing IoU; ties go to the lower track id,
/// then to the lower detection index.
fn solve_greedy(
    ious: &Array2<f32>,
    threshold: f32,
    tracks: &IndexedSlice<'_, Track>,
) -> Vec<(usize, usize, f32)> {
    let (rows, cols) = ious.dim();

    let mut candidates: Vec<(usize, usize, f32)> = ious
        .indexed_iter()
        .filter(|&(_, &iou)| acceptable(iou, threshold))
        .map(|((r, c), &iou)| (r, c, iou))
        .collect();

    candidates.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(Ordering::Equal)
            .then_with(|| tracks[a.0].id.cmp(&tracks[b.0].id))
            .then_with(|| a.1.cmp(&b.1))
    });

    let mut track_used = vec![false; rows];
    let mut det_used = vec![false; cols];
    let mut pairs = Vec::new();

    for (r, c, iou) in candidates {
        if track_used[r] || det_used[c] {
            continue;
        }

        track_used[r] = true;
        det_used[c] = true;
        pairs.push((r, c, iou));
    }

    pairs
}
