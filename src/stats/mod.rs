//! Label statistics.
//!
//! Tallies features, attribute tags, categories and breeds over list files.

mod report;

pub use report::{
    AttributeSection, FeatureCount, LabelCount, LabelsSection, StatsReport, SummarySection,
};

use std::collections::{BTreeMap, HashMap};

use crate::model::io_lst::ListFile;
use crate::model::{Annotation, AttributeKind, Feature, Schemas};

/// Options for list statistics.
#[derive(Clone, Debug)]
pub struct StatsOptions {
    /// Number of categories and breeds to list.
    pub top_categories: usize,
    /// Width of histogram bars, in characters.
    pub bar_width: usize,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            top_categories: 10,
            bar_width: 20,
        }
    }
}

/// Tallies every annotation, nested ones included, of the given lists.
pub fn stats_lists(lists: &[&ListFile], schemas: &Schemas, opts: &StatsOptions) -> StatsReport {
    let mut summary = SummarySection::default();
    let mut features: BTreeMap<Feature, usize> = BTreeMap::new();
    let mut tags: HashMap<(AttributeKind, String), usize> = HashMap::new();
    let mut categories: HashMap<String, usize> = HashMap::new();
    let mut breeds: HashMap<String, usize> = HashMap::new();

    for entry in lists.iter().flat_map(|l| l.entries.iter()) {
        summary.images += 1;
        if !entry.annotations.is_empty() {
            summary.annotated_images += 1;
        }
        for (_, node) in entry.annotations.iter() {
            summary.annotations += 1;
            *features.entry(node.feature()).or_insert(0) += 1;
            tally_attributes(node, &mut tags);
            if !node.category().is_untagged() {
                *categories.entry(node.category().to_string()).or_insert(0) += 1;
            }
            if !node.breed().is_breed_unknown() {
                *breeds.entry(node.breed().to_string()).or_insert(0) += 1;
            }
        }
    }
    summary.faces_and_profiles = features.get(&Feature::Face).copied().unwrap_or(0)
        + features.get(&Feature::Profile).copied().unwrap_or(0);

    StatsReport {
        summary,
        features: Feature::ALL
            .into_iter()
            .map(|feature| FeatureCount {
                feature,
                count: features.get(&feature).copied().unwrap_or(0),
            })
            .collect(),
        attributes: attribute_sections(schemas, &tags),
        categories: top_labels(categories, opts.top_categories),
        breeds: top_labels(breeds, opts.top_categories),
        bar_width: opts.bar_width,
    }
}

fn tally_attributes(node: &Annotation, tags: &mut HashMap<(AttributeKind, String), usize>) {
    for (kind, attribute) in node.attributes() {
        for value in attribute.values() {
            *tags.entry((kind, value.clone())).or_insert(0) += 1;
        }
    }
}

fn attribute_sections(
    schemas: &Schemas,
    tags: &HashMap<(AttributeKind, String), usize>,
) -> Vec<AttributeSection> {
    AttributeKind::ALL
        .into_iter()
        .map(|kind| {
            let vocabulary = schemas.get(kind).values();
            let mut values: Vec<LabelCount> = vocabulary
                .iter()
                .map(|v| LabelCount {
                    label: v.clone(),
                    count: tags.get(&(kind, v.clone())).copied().unwrap_or(0),
                })
                .collect();
            let mut extra: Vec<LabelCount> = tags
                .iter()
                .filter(|((k, v), _)| *k == kind && !vocabulary.contains(v))
                .map(|((_, v), count)| LabelCount {
                    label: v.clone(),
                    count: *count,
                })
                .collect();
            extra.sort_by(|a, b| a.label.cmp(&b.label));
            values.extend(extra);
            AttributeSection { kind, values }
        })
        .collect()
}

fn top_labels(counts: HashMap<String, usize>, top_n: usize) -> LabelsSection {
    let total_labelled = counts.values().sum();
    let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let total_distinct = sorted.len();
    let rest = sorted.split_off(top_n.min(sorted.len()));
    LabelsSection {
        top_n,
        total_distinct,
        total_labelled,
        entries: sorted
            .into_iter()
            .map(|(label, count)| LabelCount { label, count })
            .collect(),
        other_count: rest.iter().map(|(_, count)| count).sum(),
    }
}
