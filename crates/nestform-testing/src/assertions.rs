//! Assertions over `--format json` output.

use anyhow::{Context, Result};
use serde_json::Value;

/// The id of the instance in a `submit` result.
pub fn saved_id(json: &Value) -> Result<i64> {
    if json["status"] != "saved" {
        anyhow::bail!("Expected status 'saved', got {}", json["status"]);
    }
    json["instance"]["id"]
        .as_i64()
        .context("Expected 'instance.id' in submit output")
}

/// Assert that an `invalid` submit result reports exactly these field names.
pub fn assert_error_names(json: &Value, expected: &[&str]) -> Result<()> {
    let errors = json["errors"]
        .as_array()
        .context("Expected 'errors' array in JSON")?;

    let mut names: Vec<&str> = errors.iter().filter_map(|e| e["name"].as_str()).collect();
    names.sort_unstable();
    let mut expected = expected.to_vec();
    expected.sort_unstable();

    if names != expected {
        anyhow::bail!("Expected errors on {:?}, got {:?}", expected, names);
    }
    Ok(())
}

/// Assert that a `list` result holds `expected` records.
pub fn assert_record_count(json: &Value, expected: usize) -> Result<()> {
    let records = json.as_array().context("Expected a JSON array of records")?;
    if records.len() != expected {
        anyhow::bail!("Expected {} records, got {}", expected, records.len());
    }
    Ok(())
}
