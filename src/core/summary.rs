//! Per-model capacity summaries.

use std::collections::BTreeMap;

use serde::Serialize;

use super::models::{CapacityRecord, QueryReport};

/// Capacity of one region for one model, summed over tiers and versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionCapacity {
    pub region: String,
    pub capacity: u64,
}

/// Totals for one configured model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub model: String,
    pub total_capacity: u64,
    pub total_finetune_capacity: u64,
    /// Number of distinct regions reporting capacity records.
    pub regions: usize,
    /// Highest-capacity regions, best first.
    pub top_regions: Vec<RegionCapacity>,
    /// Whether the model's query failed (as opposed to returning nothing).
    pub failed: bool,
}

fn summarize_model(model: &str, records: &[CapacityRecord], top: usize) -> ModelSummary {
    let mut by_region: BTreeMap<&str, u64> = BTreeMap::new();
    for r in records {
        let entry = by_region.entry(r.location.as_str()).or_insert(0);
        *entry = entry.saturating_add(r.available_capacity);
    }

    let mut ranked: Vec<RegionCapacity> = by_region
        .iter()
        .map(|(region, capacity)| RegionCapacity {
            region: (*region).to_string(),
            capacity: *capacity,
        })
        .collect();
    ranked.sort_by(|a, b| b.capacity.cmp(&a.capacity).then_with(|| a.region.cmp(&b.region)));
    ranked.truncate(top);

    ModelSummary {
        model: model.to_string(),
        total_capacity: records.iter().map(|r| r.available_capacity).sum(),
        total_finetune_capacity: records.iter().map(|r| r.available_finetune_capacity).sum(),
        regions: by_region.len(),
        top_regions: ranked,
        failed: false,
    }
}

/// Summarize every model in the report, keeping the `top` best regions each.
#[must_use]
pub fn summarize(report: &QueryReport, top: usize) -> Vec<ModelSummary> {
    report
        .results
        .iter()
        .map(|(model, records)| ModelSummary {
            failed: report.failed(model),
            ..summarize_model(model, records, top)
        })
        .collect()
}
