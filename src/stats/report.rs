//! Stats report types and terminal formatting.

use serde::Serialize;
use std::fmt;

use crate::model::{AttributeKind, Feature};

/// Tallies over one or more list files.
#[derive(Clone, Debug, Serialize)]
pub struct StatsReport {
    pub summary: SummarySection,
    /// One entry per feature, in declaration order.
    pub features: Vec<FeatureCount>,
    /// One section per attribute slot, in serialization order.
    pub attributes: Vec<AttributeSection>,
    pub categories: LabelsSection,
    pub breeds: LabelsSection,
    #[serde(skip)]
    pub(crate) bar_width: usize,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SummarySection {
    pub images: usize,
    /// Images with at least one annotation.
    pub annotated_images: usize,
    /// Annotations at every depth.
    pub annotations: usize,
    pub faces_and_profiles: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct FeatureCount {
    pub feature: Feature,
    pub count: usize,
}

/// How often each tag of one attribute was selected.
#[derive(Clone, Debug, Serialize)]
pub struct AttributeSection {
    pub kind: AttributeKind,
    /// Vocabulary order; tags outside the vocabulary follow.
    pub values: Vec<LabelCount>,
}

/// Most frequent labels of one kind.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LabelsSection {
    pub top_n: usize,
    pub total_distinct: usize,
    /// Annotations carrying a label of this kind.
    pub total_labelled: usize,
    /// Sorted by count descending, then label.
    pub entries: Vec<LabelCount>,
    /// Sum of counts for labels not in the top N.
    pub other_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        section(f, "Summary")?;
        writeln!(f, "  Images:            {:>8}", format_number(s.images))?;
        writeln!(f, "  Annotated images:  {:>8}", format_number(s.annotated_images))?;
        writeln!(f, "  Annotations:       {:>8}", format_number(s.annotations))?;
        writeln!(f, "  Faces + Profiles:  {:>8}", format_number(s.faces_and_profiles))?;
        writeln!(f)?;

        section(f, "Features")?;
        let max = self.features.iter().map(|e| e.count).max().unwrap_or(0);
        for entry in self.features.iter().filter(|e| e.count > 0) {
            writeln!(
                f,
                "  {:<16} {:>8}  {}",
                entry.feature.name(),
                format_number(entry.count),
                render_bar(entry.count, max, self.bar_width)
            )?;
        }
        if max == 0 {
            writeln!(f, "  No annotations found.")?;
        }

        for attribute in &self.attributes {
            writeln!(f)?;
            section(f, &capitalize(attribute.kind.label()))?;
            for value in &attribute.values {
                writeln!(
                    f,
                    "  {:<16} {:>8}",
                    truncate_label(&value.label, 16),
                    format_number(value.count)
                )?;
            }
        }

        writeln!(f)?;
        self.fmt_labels(f, "Categories", &self.categories)?;
        writeln!(f)?;
        self.fmt_labels(f, "Breeds", &self.breeds)
    }
}

impl StatsReport {
    fn fmt_labels(&self, f: &mut fmt::Formatter<'_>, title: &str, l: &LabelsSection) -> fmt::Result {
        let header = if l.total_distinct > l.top_n {
            format!("{title} (top {} of {})", l.top_n, l.total_distinct)
        } else {
            format!("{title} ({})", l.total_distinct)
        };
        section(f, &header)?;
        if l.entries.is_empty() {
            return writeln!(f, "  None.");
        }
        let max = l.entries.iter().map(|e| e.count).max().unwrap_or(0);
        for entry in &l.entries {
            writeln!(
                f,
                "  {:<16} {:>8} {:>6}  {}",
                truncate_label(&entry.label, 16),
                format_number(entry.count),
                fmt_percent(entry.count, l.total_labelled),
                render_bar(entry.count, max, self.bar_width)
            )?;
        }
        if l.other_count > 0 {
            writeln!(
                f,
                "  {:<16} {:>8} {:>6}",
                "(other)",
                format_number(l.other_count),
                fmt_percent(l.other_count, l.total_labelled)
            )?;
        }
        Ok(())
    }
}

fn section(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(
        f,
        "┌─ {} {}",
        title,
        "─".repeat(40usize.saturating_sub(title.chars().count()))
    )
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Format a number with thousands separators.
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Format a percentage, handling zero denominators.
fn fmt_percent(numerator: usize, denominator: usize) -> String {
    if denominator == 0 {
        "n/a".to_string()
    } else {
        format!("{:.1}%", (numerator as f64 / denominator as f64) * 100.0)
    }
}

/// Render a horizontal bar using Unicode block characters.
fn render_bar(count: usize, max_count: usize, width: usize) -> String {
    if max_count == 0 || width == 0 {
        return String::new();
    }
    let filled = ((count * width) / max_count).min(width);
    "█".repeat(filled) + &"░".repeat(width - filled)
}

/// Truncate a label to fit in the display column.
fn truncate_label(label: &str, max_len: usize) -> String {
    if label.chars().count() <= max_len {
        label.to_string()
    } else {
        let kept: String = label.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_fmt_percent() {
        assert_eq!(fmt_percent(0, 0), "n/a");
        assert_eq!(fmt_percent(1, 3), "33.3%");
    }

    #[test]
    fn test_render_bar() {
        assert_eq!(render_bar(5, 10, 10), "█████░░░░░");
        assert_eq!(render_bar(0, 0, 10), "");
    }

    #[test]
    fn test_truncate_label_counts_characters() {
        assert_eq!(truncate_label("short", 10), "short");
        assert_eq!(truncate_label("verylonglabel", 10), "verylongl…");
        assert_eq!(truncate_label("ééééé", 3), "éé…");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("occlusions"), "Occlusions");
        assert_eq!(capitalize(""), "");
    }
}
