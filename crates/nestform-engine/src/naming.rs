//! Client/server naming convention.
//!
//! Every rendered field is named `prefix-index-fieldname` and identified as
//! `id_prefix-index-fieldname`. Row templates carry [`PREFIX_TOKEN`] and
//! [`INDEX_TOKEN`] instead of concrete values; the client substitutes them
//! when cloning a row and bumps `TOTAL_FORMS` in the same step.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

use crate::PostedData;

pub const SEPARATOR: &str = "-";

pub const TOTAL_FORMS: &str = "TOTAL_FORMS";
pub const INITIAL_FORMS: &str = "INITIAL_FORMS";
pub const MIN_NUM_FORMS: &str = "MIN_NUM_FORMS";
pub const MAX_NUM_FORMS: &str = "MAX_NUM_FORMS";

pub const ID_FIELD: &str = "id";
pub const DELETION_FIELD: &str = "DELETE";

pub const PREFIX_TOKEN: &str = "{prefix}";
pub const INDEX_TOKEN: &str = "{index}";

/// Joins a parent prefix and a local segment; no separator under an empty parent.
pub fn join_prefix(parent: &str, local: &str) -> String {
    if parent.is_empty() {
        local.to_string()
    } else {
        format!("{}{}{}", parent, SEPARATOR, local)
    }
}

pub fn row_prefix(prefix: &str, index: usize) -> String {
    join_prefix(prefix, &index.to_string())
}

pub fn field_name(prefix: &str, field: &str) -> String {
    join_prefix(prefix, field)
}

pub fn field_id(prefix: &str, field: &str) -> String {
    format!("id_{}", field_name(prefix, field))
}

pub fn management_key(prefix: &str, counter: &str) -> String {
    join_prefix(prefix, counter)
}

/// `{prefix}-{index}`, the row prefix used inside row templates
pub fn template_row_prefix() -> String {
    join_prefix(PREFIX_TOKEN, INDEX_TOKEN)
}

/// Element id of the reusable row template for a form type
pub fn template_id(form_name: &str) -> String {
    format!("{}-template", form_name)
}

/// Class of the container that receives rendered and cloned child rows
pub fn children_container(prefix: &str) -> String {
    format!("{}_children_div", prefix)
}

/// What the client does when cloning a row template.
pub fn substitute(template: &str, prefix: &str, index: usize) -> String {
    template
        .replace(PREFIX_TOKEN, prefix)
        .replace(INDEX_TOKEN, &index.to_string())
}

fn row_key_pattern(prefix: &str) -> Option<Regex> {
    Regex::new(&format!(
        r"^{}{}(\d+){}(.+)$",
        regex::escape(prefix),
        regex::escape(SEPARATOR),
        regex::escape(SEPARATOR)
    ))
    .ok()
}

/// Row indices that appear in posted keys of the form `prefix-<index>-<rest>`.
pub fn posted_row_indices(prefix: &str, data: &PostedData) -> BTreeSet<usize> {
    let Some(pattern) = row_key_pattern(prefix) else {
        return BTreeSet::new();
    };

    data.keys()
        .filter_map(|key| pattern.captures(key))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<usize>().ok())
        .collect()
}

/// Groups flat `prefix-<index>-<field>` entries into per-row field maps.
///
/// Only direct fields are kept: keys that belong to a nested formset
/// (`prefix-0-tenants-0-first_name`) are skipped.
pub fn flat_rows(prefix: &str, data: &PostedData) -> BTreeMap<usize, BTreeMap<String, String>> {
    let mut rows: BTreeMap<usize, BTreeMap<String, String>> = BTreeMap::new();
    let Some(pattern) = row_key_pattern(prefix) else {
        return rows;
    };

    for (key, value) in data.iter() {
        let Some(caps) = pattern.captures(key) else {
            continue;
        };
        let (Some(index), Some(field)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if field.as_str().contains(SEPARATOR) {
            continue;
        }
        let Ok(index) = index.as_str().parse::<usize>() else {
            continue;
        };
        rows.entry(index)
            .or_default()
            .insert(field.as_str().to_string(), value.to_string());
    }

    rows
}
