//! Capacity aggregation.
//!
//! Turns per-model record lists into dense region × model-version tables, one
//! per pricing tier. All operations are pure and return new values; a table
//! handed to a renderer is never touched by a later query cycle.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::models::CapacityRecord;

/// Version marker used for models that returned no records at all.
pub const MISSING_VERSION: &str = "N/A";

/// Tiers shown first, in this order, when presenting every tier.
pub const TIER_PRIORITY: [&str; 5] = [
    "GlobalStandard",
    "GlobalProvisionedManaged",
    "Standard",
    "ProvisionedManaged",
    "GlobalBatch",
];

/// Column key combining model name and version.
#[must_use]
pub fn column_key(model_name: &str, model_version: &str) -> String {
    format!("{model_name} ({model_version})")
}

// =============================================================================
// Capacity Table
// =============================================================================

/// One region's capacity across every column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacityRow {
    pub region: String,
    /// Column key → summed available capacity. Holds every table column.
    pub cells: BTreeMap<String, u64>,
}

impl CapacityRow {
    /// Capacity in `column`, zero if the column is unknown.
    #[must_use]
    pub fn get(&self, column: &str) -> u64 {
        self.cells.get(column).copied().unwrap_or(0)
    }

    /// Sum of all cells.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.cells.values().sum()
    }
}

/// Dense region × model-version capacity table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacityTable {
    /// Tier the table was filtered to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    /// Rows sorted by region code.
    pub rows: Vec<CapacityRow>,
    /// Column keys, sorted.
    pub columns: Vec<String>,
    /// Every tier seen in the unfiltered input, sorted.
    pub all_tiers: Vec<String>,
}

impl CapacityTable {
    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Region codes in row order.
    #[must_use]
    pub fn regions(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.region.as_str()).collect()
    }

    /// Keep only rows whose region belongs to `group`.
    #[must_use]
    pub fn filter_regions(&self, group: &RegionGroup) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|row| group.contains(&row.region))
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    /// Keep only the named columns (unknown names are ignored).
    #[must_use]
    pub fn select_columns(&self, wanted: &[String]) -> Self {
        let columns: Vec<String> = self
            .columns
            .iter()
            .filter(|c| wanted.contains(c))
            .cloned()
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| CapacityRow {
                region: row.region.clone(),
                cells: columns.iter().map(|c| (c.clone(), row.get(c))).collect(),
            })
            .collect();

        Self {
            tier: self.tier.clone(),
            rows,
            columns,
            all_tiers: self.all_tiers.clone(),
        }
    }

    /// Drop rows with zero capacity in every column.
    #[must_use]
    pub fn without_empty_rows(&self) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|row| row.total() > 0)
                .cloned()
                .collect(),
            ..self.clone()
        }
    }
}

// =============================================================================
// Aggregation
// =============================================================================

/// Build a dense capacity table from per-model results.
///
/// `results` maps the configured model key to the records returned for it.
/// When `tier_filter` is set only records with that `sku_name` are counted;
/// `all_tiers` always reflects the unfiltered input. A model with no records
/// contributes an all-zero `"{model} (N/A)"` column so it stays visible.
#[must_use]
pub fn aggregate(
    results: &BTreeMap<String, Vec<CapacityRecord>>,
    tier_filter: Option<&str>,
) -> CapacityTable {
    let mut all_tiers = BTreeSet::new();
    let mut columns = BTreeSet::new();
    let mut capacity: BTreeMap<&str, BTreeMap<String, u64>> = BTreeMap::new();

    for (model_name, records) in results {
        if records.is_empty() {
            columns.insert(column_key(model_name, MISSING_VERSION));
            continue;
        }

        all_tiers.extend(records.iter().map(|r| r.sku_name.clone()));

        for record in records
            .iter()
            .filter(|r| tier_filter.is_none_or(|tier| r.sku_name == tier))
        {
            let column = column_key(model_name, &record.model_version);
            let cell = capacity
                .entry(record.location.as_str())
                .or_default()
                .entry(column.clone())
                .or_insert(0);
            *cell = cell.saturating_add(record.available_capacity);
            columns.insert(column);
        }
    }

    let columns: Vec<String> = columns.into_iter().collect();
    let rows = capacity
        .into_iter()
        .map(|(region, cells)| CapacityRow {
            region: region.to_string(),
            cells: columns
                .iter()
                .map(|c| (c.clone(), cells.get(c).copied().unwrap_or(0)))
                .collect(),
        })
        .collect();

    CapacityTable {
        tier: tier_filter.map(str::to_string),
        rows,
        columns,
        all_tiers: all_tiers.into_iter().collect(),
    }
}

/// One filtered table per tier present in `results`.
#[must_use]
pub fn aggregate_by_tier(
    results: &BTreeMap<String, Vec<CapacityRecord>>,
) -> BTreeMap<String, CapacityTable> {
    aggregate(results, None)
        .all_tiers
        .into_iter()
        .map(|tier| {
            let table = aggregate(results, Some(&tier));
            (tier, table)
        })
        .collect()
}

/// Order tiers for presentation: well-known tiers first, the rest by name.
#[must_use]
pub fn order_tiers(tiers: &[String]) -> Vec<String> {
    let mut ordered: Vec<String> = TIER_PRIORITY
        .iter()
        .filter(|p| tiers.iter().any(|t| t == *p))
        .map(|p| (*p).to_string())
        .collect();

    let mut rest: Vec<String> = tiers
        .iter()
        .filter(|t| !TIER_PRIORITY.contains(&t.as_str()))
        .cloned()
        .collect();
    rest.sort();
    rest.dedup();

    ordered.extend(rest);
    ordered
}

// =============================================================================
// Region Groups
// =============================================================================

/// Coarse geographic grouping used to narrow a table's rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RegionGroup {
    #[default]
    All,
    Us,
    Europe,
    Asia,
    /// A single region code.
    Exact(String),
}

impl RegionGroup {
    const US: &'static [&'static str] = &["east", "west", "central", "south", "north"];
    const EUROPE: &'static [&'static str] = &[
        "europe",
        "uk",
        "france",
        "germany",
        "norway",
        "sweden",
        "switzerland",
    ];
    const ASIA: &'static [&'static str] = &["asia", "japan", "korea", "india", "australia"];

    /// Parse from CLI argument; anything unrecognized is an exact region code.
    #[must_use]
    pub fn from_arg(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "all" => Self::All,
            "us" => Self::Us,
            "europe" | "eu" => Self::Europe,
            "asia" => Self::Asia,
            _ => Self::Exact(s.to_string()),
        }
    }

    /// Whether `region` belongs to this group.
    ///
    /// Group matching is by substring, so e.g. `southindia` belongs to both
    /// the US group (`south`) and Asia (`india`).
    #[must_use]
    pub fn contains(&self, region: &str) -> bool {
        let lower = region.to_lowercase();
        let any = |keys: &[&str]| keys.iter().any(|k| lower.contains(k));
        match self {
            Self::All => true,
            Self::Us => any(Self::US),
            Self::Europe => any(Self::EUROPE),
            Self::Asia => any(Self::ASIA),
            Self::Exact(code) => region.eq_ignore_ascii_case(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(location: &str, sku: &str, version: &str, capacity: u64) -> CapacityRecord {
        CapacityRecord {
            model_name: "gpt-4o".to_string(),
            location: location.to_string(),
            sku_name: sku.to_string(),
            available_capacity: capacity,
            available_finetune_capacity: 7,
            model_format: "OpenAI".to_string(),
            model_version: version.to_string(),
            incomplete: false,
        }
    }

    fn sample() -> BTreeMap<String, Vec<CapacityRecord>> {
        let mut results = BTreeMap::new();
        results.insert(
            "gpt-4o".to_string(),
            vec![
                rec("westus", "GlobalStandard", "2024-05-13", 100),
                rec("eastus", "GlobalStandard", "2024-05-13", 300),
                rec("eastus", "GlobalStandard", "2024-05-13", 200),
                rec("eastus", "Standard", "2024-08-06", 50),
                rec("swedencentral", "Standard", "2024-05-13", 20),
            ],
        );
        results.insert("o3".to_string(), vec![]);
        results
    }

    fn assert_rectangular(table: &CapacityTable) {
        for row in &table.rows {
            let keys: Vec<&String> = row.cells.keys().collect();
            let cols: Vec<&String> = table.columns.iter().collect();
            assert_eq!(keys, cols, "row {} is not dense", row.region);
        }
    }

    #[test]
    fn duplicate_tuples_are_summed() {
        let table = aggregate(&sample(), Some("GlobalStandard"));
        let eastus = table.rows.iter().find(|r| r.region == "eastus").unwrap();
        assert_eq!(eastus.get("gpt-4o (2024-05-13)"), 500);
    }

    #[test]
    fn unfiltered_table_is_dense_and_sorted() {
        let table = aggregate(&sample(), None);

        assert_eq!(table.regions(), ["eastus", "swedencentral", "westus"]);
        assert_eq!(
            table.columns,
            ["gpt-4o (2024-05-13)", "gpt-4o (2024-08-06)", "o3 (N/A)"]
        );
        assert_rectangular(&table);

        let sweden = &table.rows[1];
        assert_eq!(sweden.get("gpt-4o (2024-08-06)"), 0);
        assert_eq!(sweden.get("gpt-4o (2024-05-13)"), 20);
    }

    #[test]
    fn empty_model_gets_zero_column() {
        let table = aggregate(&sample(), None);
        assert!(table.columns.contains(&"o3 (N/A)".to_string()));
        assert!(table.rows.iter().all(|r| r.get("o3 (N/A)") == 0));
    }

    #[test]
    fn tier_filter_restricts_rows_but_not_tiers() {
        let table = aggregate(&sample(), Some("Standard"));

        assert_eq!(table.regions(), ["eastus", "swedencentral"]);
        assert_eq!(table.all_tiers, ["GlobalStandard", "Standard"]);
        assert_eq!(table.tier.as_deref(), Some("Standard"));
        assert_rectangular(&table);
    }

    #[test]
    fn absent_tier_yields_no_rows() {
        let table = aggregate(&sample(), Some("ProvisionedManaged"));

        assert!(table.is_empty());
        assert_eq!(table.all_tiers, ["GlobalStandard", "Standard"]);
        // Only the empty model's placeholder survives.
        assert_eq!(table.columns, ["o3 (N/A)"]);
    }

    #[test]
    fn aggregate_is_idempotent() {
        let results = sample();
        assert_eq!(aggregate(&results, None), aggregate(&results, None));
        assert_eq!(
            aggregate(&results, Some("Standard")),
            aggregate(&results, Some("Standard"))
        );
    }

    #[test]
    fn empty_input() {
        let table = aggregate(&BTreeMap::new(), None);
        assert!(table.is_empty());
        assert!(table.columns.is_empty());
        assert!(table.all_tiers.is_empty());
    }

    #[test]
    fn by_tier_covers_every_tier() {
        let tables = aggregate_by_tier(&sample());
        assert_eq!(tables.keys().collect::<Vec<_>>(), ["GlobalStandard", "Standard"]);
        assert_eq!(tables["GlobalStandard"].regions(), ["eastus", "westus"]);
    }

    #[test]
    fn tiers_follow_priority_then_name() {
        let tiers = vec![
            "Zeta".to_string(),
            "Standard".to_string(),
            "Alpha".to_string(),
            "GlobalStandard".to_string(),
        ];
        assert_eq!(
            order_tiers(&tiers),
            ["GlobalStandard", "Standard", "Alpha", "Zeta"]
        );
    }

    #[test]
    fn region_groups() {
        assert!(RegionGroup::Us.contains("eastus2"));
        assert!(RegionGroup::Europe.contains("swedencentral"));
        assert!(RegionGroup::Asia.contains("japaneast"));
        assert!(!RegionGroup::Asia.contains("westus"));
        assert!(RegionGroup::from_arg("EU") == RegionGroup::Europe);
        assert!(RegionGroup::from_arg("eastus").contains("eastus"));
        assert!(!RegionGroup::from_arg("eastus").contains("eastus2"));
        assert!(RegionGroup::from_arg("EastUS").contains("eastus"));
    }

    #[test]
    fn table_views_do_not_mutate_source() {
        let table = aggregate(&sample(), None);
        let europe = table.filter_regions(&RegionGroup::Europe);
        assert_eq!(europe.regions(), ["swedencentral"]);
        assert_eq!(table.rows.len(), 3);

        let selected = table.select_columns(&["o3 (N/A)".to_string()]);
        assert_eq!(selected.columns, ["o3 (N/A)"]);
        assert_rectangular(&selected);

        let non_empty = selected.without_empty_rows();
        assert!(non_empty.is_empty());
        assert_eq!(table.columns.len(), 3);
    }
}
