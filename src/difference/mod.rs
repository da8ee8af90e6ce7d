//! Overlap-based comparison of a candidate label set against a baseline.
//!
//! A baseline annotation `a` and a candidate `b` match when their
//! intersection over union lies in `[t, 2 - t]`. Every matching pair
//! contributes its overlap to the score sum; the aggregate divides that sum
//! by the number of classified annotations (`TP + FP + FN`).

mod report;

pub use report::{CandidateScore, ImageScore, ScoreReport};

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::model::io_lst::ListFile;
use crate::model::{Annotation, AnnotationId, AnnotationTree};

/// Overlap needed for a match unless configured otherwise.
pub const DEFAULT_MIN_OVERLAP: f64 = 0.8;

/// Options for scoring.
#[derive(Clone, Debug)]
pub struct ScoreOptions {
    /// Lower bound of the match window; the upper bound is `2 - min_overlap`.
    pub min_overlap: f64,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            min_overlap: DEFAULT_MIN_OVERLAP,
        }
    }
}

/// Intersection over union of two annotations' bounding rectangles.
pub fn overlap(a: &Annotation, b: &Annotation) -> f64 {
    a.rect().iou(b.rect())
}

/// Matching result for one baseline/candidate pair of annotation trees.
///
/// Only root annotations take part. True and false positives are candidate
/// ids; false negatives are baseline ids.
#[derive(Clone, Debug, Serialize)]
pub struct AnnotationDifference {
    pub min_overlap: f64,
    pub max_overlap: f64,
    pub true_positives: BTreeSet<AnnotationId>,
    pub false_positives: BTreeSet<AnnotationId>,
    pub false_negatives: BTreeSet<AnnotationId>,
    /// Overlap of every matching pair, in baseline-major order.
    pub scores: Vec<f64>,
    /// Score sum over the number of classified annotations, or 0 when
    /// there are none.
    pub score: f64,
}

impl AnnotationDifference {
    pub fn compute(baseline: &AnnotationTree, candidate: &AnnotationTree, min_overlap: f64) -> Self {
        let max_overlap = 2.0 - min_overlap;
        let mut true_positives = BTreeSet::new();
        let mut false_positives: BTreeSet<AnnotationId> = candidate.roots().iter().copied().collect();
        let mut false_negatives = BTreeSet::new();
        let mut scores = Vec::new();

        for &a_id in baseline.roots() {
            let Some(a) = baseline.get(a_id) else {
                continue;
            };
            let mut matched = false;
            for &b_id in candidate.roots() {
                let Some(b) = candidate.get(b_id) else {
                    continue;
                };
                let score = overlap(a, b);
                if score >= min_overlap && score <= max_overlap {
                    false_positives.remove(&b_id);
                    true_positives.insert(b_id);
                    scores.push(score);
                    matched = true;
                }
            }
            if !matched {
                false_negatives.insert(a_id);
            }
        }

        let classified = true_positives.len() + false_positives.len() + false_negatives.len();
        let score = ratio(scores.iter().sum(), classified);
        Self {
            min_overlap,
            max_overlap,
            true_positives,
            false_positives,
            false_negatives,
            scores,
            score,
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// True if `overlap` falls inside this comparison's match window.
    pub fn is_match(&self, overlap: f64) -> bool {
        overlap >= self.min_overlap && overlap <= self.max_overlap
    }
}

impl fmt::Display for AnnotationDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "True Positives: {}", self.true_positives.len())?;
        writeln!(f, "False Positives: {}", self.false_positives.len())?;
        writeln!(f, "False Negatives: {}", self.false_negatives.len())?;
        writeln!(f, "Average Score: {:.2}", self.score)
    }
}

fn ratio(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Totals pooled over many image pairs for one candidate list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ScoreStats {
    pub score_sum: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl ScoreStats {
    pub fn add(&mut self, diff: &AnnotationDifference) {
        self.score_sum += diff.scores.iter().sum::<f64>();
        self.true_positives += diff.true_positives.len();
        self.false_positives += diff.false_positives.len();
        self.false_negatives += diff.false_negatives.len();
    }

    /// Pooled score: the summed overlaps over all classified annotations.
    pub fn score(&self) -> f64 {
        ratio(
            self.score_sum,
            self.true_positives + self.false_positives + self.false_negatives,
        )
    }
}

/// Scores each candidate list against the baseline, pairing images by
/// name. An image missing from one side counts as having no annotations
/// there.
pub fn score_lists(
    baseline: &ListFile,
    candidates: &[(String, &ListFile)],
    opts: &ScoreOptions,
) -> ScoreReport {
    let empty = AnnotationTree::new();
    let mut report = ScoreReport {
        min_overlap: opts.min_overlap,
        candidates: Vec::with_capacity(candidates.len()),
    };

    for (name, candidate) in candidates {
        let images: BTreeSet<&str> = baseline
            .entries
            .iter()
            .chain(candidate.entries.iter())
            .map(|e| e.image.as_str())
            .collect();

        let mut stats = ScoreStats::default();
        let mut per_image = Vec::with_capacity(images.len());
        for image in images {
            let x = baseline.get(image).map_or(&empty, |e| &e.annotations);
            let y = candidate.get(image).map_or(&empty, |e| &e.annotations);
            let diff = AnnotationDifference::compute(x, y, opts.min_overlap);
            stats.add(&diff);
            per_image.push(ImageScore {
                image: image.to_string(),
                true_positives: diff.true_positives.len(),
                false_positives: diff.false_positives.len(),
                false_negatives: diff.false_negatives.len(),
                score: diff.score,
            });
        }
        log::info!(
            "{name}: {} image(s), pooled score {:.4}",
            per_image.len(),
            stats.score()
        );
        report.candidates.push(CandidateScore {
            name: name.clone(),
            score: stats.score(),
            stats,
            per_image,
        });
    }
    report
}
