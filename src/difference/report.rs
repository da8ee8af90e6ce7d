//! Score report types, text formatting and CSV export.

use serde::Serialize;
use std::fmt;
use std::io::Write;

use super::ScoreStats;
use crate::error::FacelabelError;

/// Scores of every candidate list against one baseline.
#[derive(Clone, Debug, Serialize)]
pub struct ScoreReport {
    pub min_overlap: f64,
    pub candidates: Vec<CandidateScore>,
}

/// Pooled and per-image results for one candidate list.
#[derive(Clone, Debug, Serialize)]
pub struct CandidateScore {
    pub name: String,
    /// Pooled score over all images.
    pub score: f64,
    pub stats: ScoreStats,
    pub per_image: Vec<ImageScore>,
}

/// Result for one image pair.
#[derive(Clone, Debug, Serialize)]
pub struct ImageScore {
    pub image: String,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub score: f64,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    candidate: &'a str,
    image: &'a str,
    true_positives: usize,
    false_positives: usize,
    false_negatives: usize,
    score: f64,
}

impl ScoreReport {
    /// Writes one CSV row per candidate and image.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), FacelabelError> {
        let mut wtr = csv::Writer::from_writer(writer);
        for candidate in &self.candidates {
            for image in &candidate.per_image {
                wtr.serialize(CsvRow {
                    candidate: &candidate.name,
                    image: &image.image,
                    true_positives: image.true_positives,
                    false_positives: image.false_positives,
                    false_negatives: image.false_negatives,
                    score: image.score,
                })?;
            }
        }
        wtr.flush()?;
        Ok(())
    }
}

impl fmt::Display for ScoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Match window: {:.2} to {:.2}",
            self.min_overlap,
            2.0 - self.min_overlap
        )?;
        for candidate in &self.candidates {
            writeln!(f)?;
            writeln!(f, "{}", candidate.name)?;
            writeln!(f, "  Images:          {}", candidate.per_image.len())?;
            writeln!(f, "  True Positives:  {}", candidate.stats.true_positives)?;
            writeln!(f, "  False Positives: {}", candidate.stats.false_positives)?;
            writeln!(f, "  False Negatives: {}", candidate.stats.false_negatives)?;
            writeln!(f, "  Average Score:   {:.2}", candidate.score)?;
        }
        Ok(())
    }
}
