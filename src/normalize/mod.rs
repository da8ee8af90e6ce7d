//! Normalization of list files against their images.
//!
//! Every root annotation is extended around its children and clipped to
//! the image frame, then the size filter runs again since clipping can
//! shrink a region below the limits.

use serde::Serialize;
use std::fmt;

use crate::error::FacelabelError;
use crate::model::io_lst::{ImageSizes, ListFile};

/// Options for list normalization.
#[derive(Clone, Debug)]
pub struct NormalizeOptions {
    /// Image sizes; entries whose image is not found are only size-filtered.
    pub image_sizes: ImageSizes,
    /// Drop annotations that break the size rules after clipping.
    pub drop_too_small: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            image_sizes: ImageSizes::default(),
            drop_too_small: true,
        }
    }
}

/// What normalization changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub images: usize,
    /// Images whose frame was known and used for clipping.
    pub clipped_images: usize,
    /// Images with no known size, in list order.
    pub missing_frames: Vec<String>,
    pub annotations_before: usize,
    pub annotations_after: usize,
    /// Sub-annotations detached because they fell outside their parent.
    pub dropped_outside: usize,
    /// Annotations dropped by the size filter.
    pub dropped_too_small: usize,
}

/// Normalizes `list` in place.
pub fn normalize_list(
    list: &mut ListFile,
    opts: &NormalizeOptions,
) -> Result<NormalizeReport, FacelabelError> {
    let mut report = NormalizeReport::default();

    for entry in &mut list.entries {
        report.images += 1;
        let before = entry.annotations.total_annotations();
        report.annotations_before += before;

        match opts.image_sizes.frame(&entry.image) {
            Some(frame) => {
                report.clipped_images += 1;
                for root in entry.annotations.roots().to_vec() {
                    let dropped = entry.annotations.extend_and_clip(root, &frame)?;
                    report.dropped_outside += dropped.len();
                }
            }
            None => {
                log::debug!("no image size for {}, skipping clip", entry.image);
                report.missing_frames.push(entry.image.clone());
            }
        }

        if opts.drop_too_small {
            let clipped = entry.annotations.total_annotations();
            entry.annotations.remove_too_small();
            let removed = clipped - entry.annotations.total_annotations();
            if removed > 0 {
                log::warn!("{}: dropped {} undersized annotation(s)", entry.image, removed);
            }
            report.dropped_too_small += removed;
        }
        report.annotations_after += entry.annotations.total_annotations();
    }

    log::info!(
        "normalized {} image(s), {} of {} annotation(s) kept",
        report.images,
        report.annotations_after,
        report.annotations_before
    );
    Ok(report)
}

impl fmt::Display for NormalizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  {} images, {} annotations",
            self.images, self.annotations_before
        )?;
        if self.annotations_after != self.annotations_before {
            writeln!(f, "  output: {} annotations", self.annotations_after)?;
        }
        if self.dropped_outside > 0 {
            writeln!(f, "  dropped outside parent: {}", self.dropped_outside)?;
        }
        if self.dropped_too_small > 0 {
            writeln!(f, "  dropped too small: {}", self.dropped_too_small)?;
        }
        if !self.missing_frames.is_empty() {
            writeln!(f)?;
            writeln!(f, "No image size ({}):", self.missing_frames.len())?;
            for image in &self.missing_frames {
                writeln!(f, "  - {}", image)?;
            }
        }
        Ok(())
    }
}
