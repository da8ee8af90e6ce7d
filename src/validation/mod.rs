//! List-file validation.
//!
//! Checks a list file line by line without stopping at the first problem:
//! - every line parses under the annotation grammar
//! - image names are present and unique
//! - annotations meet the size rules the reader enforces
//! - sub-annotations sit inside their parent
//! - annotations stay inside the image, when its size is known

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::io_lst::{split_lines, ImageSizes, RawLine};
use crate::model::{AnnotationTree, Schemas};

/// Options for validation behavior.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,
    /// Known image sizes; images not listed skip the frame check.
    pub image_sizes: ImageSizes,
}

/// Validates list-file text and returns a report of all issues found.
pub fn validate_list(
    text: &str,
    schemas: &Arc<Schemas>,
    opts: &ValidateOptions,
) -> ValidationReport {
    let mut report = ValidationReport::new();
    let mut seen_images: HashMap<&str, usize> = HashMap::new();

    for raw in split_lines(text) {
        validate_image_name(&raw, &mut seen_images, &mut report);

        match AnnotationTree::parse_line_with(raw.annotations, Arc::clone(schemas)) {
            Ok(tree) => validate_tree(&raw, &tree, opts, &mut report),
            Err(e) => report.add(ValidationIssue::error(
                IssueCode::ParseError,
                e.to_string(),
                IssueContext::Line { line: raw.line },
            )),
        }
    }

    log::debug!(
        "validation found {} error(s) and {} warning(s)",
        report.error_count(),
        report.warning_count()
    );
    report
}

fn validate_image_name<'a>(
    raw: &RawLine<'a>,
    seen: &mut HashMap<&'a str, usize>,
    report: &mut ValidationReport,
) {
    let context = IssueContext::Line { line: raw.line };
    if raw.image.is_empty() {
        report.add(ValidationIssue::warning(
            IssueCode::EmptyImageName,
            "Empty image name",
            context,
        ));
        return;
    }
    if let Some(first) = seen.get(raw.image) {
        report.add(ValidationIssue::warning(
            IssueCode::DuplicateImage,
            format!("Image '{}' already listed on line {}", raw.image, first),
            context,
        ));
    } else {
        seen.insert(raw.image, raw.line);
    }
}

fn validate_tree(
    raw: &RawLine<'_>,
    tree: &AnnotationTree,
    opts: &ValidateOptions,
    report: &mut ValidationReport,
) {
    let frame = opts.image_sizes.frame(raw.image);

    for (index, (id, node)) in tree.iter().enumerate() {
        let context = IssueContext::Annotation {
            line: raw.line,
            index,
        };
        let parent = node.parent().and_then(|p| tree.get(p));

        // The reader filters roots and their direct children only.
        let filtered = parent.map_or(true, |p| p.parent().is_none());
        if filtered && node.is_too_small() {
            report.add(ValidationIssue::warning(
                IssueCode::TooSmall,
                format!(
                    "{} {}x{} is below the size limits and will be dropped",
                    node.feature(),
                    node.width(),
                    node.height()
                ),
                context.clone(),
            ));
        }

        if let Some(parent) = parent {
            if !node.fits_in(parent.rect()) {
                report.add(ValidationIssue::error(
                    IssueCode::ChildOutsideParent,
                    format!(
                        "{} {} is not inside its {} parent",
                        node.feature(),
                        id,
                        parent.feature()
                    ),
                    context.clone(),
                ));
            }
        }

        if let Some(frame) = &frame {
            if node.parent().is_none() && !node.fits_in(frame) {
                report.add(ValidationIssue::error(
                    IssueCode::OutOfFrame,
                    format!(
                        "{} at ({}, {}) {}x{} extends past the {}x{} image",
                        node.feature(),
                        node.x(),
                        node.y(),
                        node.width(),
                        node.height(),
                        frame.width,
                        frame.height
                    ),
                    context,
                ));
            }
        }
    }
}
