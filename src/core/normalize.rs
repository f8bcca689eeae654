//! Response normalization.
//!
//! Maps the capacity endpoint's JSON payload into flat [`CapacityRecord`]s.
//! The payload is not guaranteed to be field-complete, so nothing here fails:
//! absent or mistyped fields take their zero value, negative or fractional
//! counts are clamped, and in either case the record is flagged `incomplete`.

use serde_json::Value;

use super::models::CapacityRecord;

/// Field readers that remember whether a default had to be substituted.
struct FieldReader {
    defaulted: bool,
}

impl FieldReader {
    const fn new() -> Self {
        Self { defaulted: false }
    }

    fn string(&mut self, value: Option<&Value>) -> String {
        if let Some(s) = value.and_then(Value::as_str) {
            s.to_string()
        } else {
            self.defaulted = true;
            String::new()
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn count(&mut self, value: Option<&Value>) -> u64 {
        match value {
            Some(v) if v.is_u64() => v.as_u64().unwrap_or_default(),
            // Negative or fractional counts clamp into range and flag the record.
            Some(v) if v.is_i64() => {
                self.defaulted = true;
                0
            }
            Some(v) if v.is_f64() => {
                let f = v.as_f64().unwrap_or_default();
                if f.is_finite() && f >= 0.0 {
                    if f.fract() != 0.0 {
                        self.defaulted = true;
                    }
                    f as u64
                } else {
                    self.defaulted = true;
                    0
                }
            }
            _ => {
                self.defaulted = true;
                0
            }
        }
    }
}

/// Normalize one element of the payload's `value` array.
fn normalize_item(item: &Value) -> CapacityRecord {
    let mut reader = FieldReader::new();
    let properties = item.get("properties");
    let model = properties.and_then(|p| p.get("model"));

    let record = CapacityRecord {
        model_name: reader.string(model.and_then(|m| m.get("name"))),
        location: reader.string(item.get("location")),
        sku_name: reader.string(properties.and_then(|p| p.get("skuName"))),
        available_capacity: reader.count(properties.and_then(|p| p.get("availableCapacity"))),
        available_finetune_capacity: reader
            .count(properties.and_then(|p| p.get("availableFinetuneCapacity"))),
        model_format: reader.string(model.and_then(|m| m.get("format"))),
        model_version: reader.string(model.and_then(|m| m.get("version"))),
        incomplete: false,
    };

    CapacityRecord {
        incomplete: reader.defaulted,
        ..record
    }
}

/// Convert a raw capacity document into records.
///
/// Reads the top-level `value` array; output order matches input order. A
/// document without a `value` array yields no records.
#[must_use]
pub fn normalize(document: &Value) -> Vec<CapacityRecord> {
    let Some(items) = document.get("value").and_then(Value::as_array) else {
        tracing::debug!("Response has no 'value' array, treating as empty");
        return Vec::new();
    };

    let records: Vec<CapacityRecord> = items.iter().map(normalize_item).collect();

    let incomplete = records.iter().filter(|r| r.incomplete).count();
    if incomplete > 0 {
        tracing::debug!(
            incomplete,
            total = records.len(),
            "Some capacity records were missing fields and were zero-filled"
        );
    }

    records
}
