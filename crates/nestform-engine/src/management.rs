//! Management counters and their reconciliation against posted rows.
//!
//! The client keeps `TOTAL_FORMS` in step with the rows it clones, but a
//! stale page can post counters that disagree with the rows it actually
//! sent. The server-observed layout always wins: slots extend to the highest
//! posted row index and the initial count is the number of rows carrying an
//! identifier. Every correction is reported as a [`ReconciliationMismatch`].

use serde::Serialize;

use crate::naming::{self, DELETION_FIELD, ID_FIELD};
use crate::posted::is_truthy;
use crate::{FormsetOptions, PostedData, PreconditionError};

/// TOTAL/INITIAL/MIN/MAX bookkeeping of one formset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ManagementCounters {
    pub total_forms: usize,
    pub initial_forms: usize,
    pub min_num_forms: usize,
    pub max_num_forms: usize,
}

impl ManagementCounters {
    /// Reads the counters posted for `prefix`.
    ///
    /// Returns `Ok(None)` when `TOTAL_FORMS` is absent: the client never
    /// rendered this formset. A present but non-numeric counter is a
    /// tampered submission.
    pub fn from_posted(
        prefix: &str,
        data: &PostedData,
        default_max: usize,
    ) -> Result<Option<Self>, PreconditionError> {
        let total_key = naming::management_key(prefix, naming::TOTAL_FORMS);
        let Some(total) = data.get(&total_key) else {
            return Ok(None);
        };

        let total_forms = parse_counter(&total_key, total)?;
        let initial_forms = read_optional(prefix, naming::INITIAL_FORMS, data)?.unwrap_or(0);
        let min_num_forms = read_optional(prefix, naming::MIN_NUM_FORMS, data)?.unwrap_or(0);
        let max_num_forms =
            read_optional(prefix, naming::MAX_NUM_FORMS, data)?.unwrap_or(default_max);

        Ok(Some(Self {
            total_forms,
            initial_forms,
            min_num_forms,
            max_num_forms,
        }))
    }

    pub fn write_to(&self, prefix: &str, data: &mut PostedData) {
        let pairs = [
            (naming::TOTAL_FORMS, self.total_forms),
            (naming::INITIAL_FORMS, self.initial_forms),
            (naming::MIN_NUM_FORMS, self.min_num_forms),
            (naming::MAX_NUM_FORMS, self.max_num_forms),
        ];
        for (counter, value) in pairs {
            data.insert(naming::management_key(prefix, counter), value.to_string());
        }
    }
}

fn parse_counter(key: &str, raw: &str) -> Result<usize, PreconditionError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| PreconditionError::MalformedCounter {
            key: key.to_string(),
            value: raw.to_string(),
        })
}

fn read_optional(
    prefix: &str,
    counter: &str,
    data: &PostedData,
) -> Result<Option<usize>, PreconditionError> {
    let key = naming::management_key(prefix, counter);
    data.get(&key).map(|raw| parse_counter(&key, raw)).transpose()
}

/// What the server saw in one posted row slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowObservation {
    pub index: usize,
    /// Posted identifier, trimmed; `None` when empty or absent
    pub raw_id: Option<String>,
    pub deleted: bool,
}

impl RowObservation {
    pub fn is_identified(&self) -> bool {
        self.raw_id.is_some()
    }
}

/// Posted counters that disagreed with the posted rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationMismatch {
    pub prefix: String,
    pub posted_total: usize,
    pub posted_initial: usize,
    pub corrected_total: usize,
    pub corrected_initial: usize,
}

/// Server-authoritative row layout of one bound formset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledPlan {
    pub total_count: usize,
    /// Rows that carry an identifier, deleted or not
    pub initial_count: usize,
    /// Identified rows that are not flagged for deletion
    pub live_count: usize,
    pub rows: Vec<RowObservation>,
    pub mismatch: Option<ReconciliationMismatch>,
}

impl ReconciledPlan {
    /// Plan for a formset the client never rendered
    pub fn empty() -> Self {
        Self {
            total_count: 0,
            initial_count: 0,
            live_count: 0,
            rows: Vec::new(),
            mismatch: None,
        }
    }
}

/// Computes the corrected row layout for `prefix`.
///
/// Pure in its inputs: reconciling the same counters and data twice yields
/// the same plan.
pub fn reconcile(
    prefix: &str,
    counters: &ManagementCounters,
    data: &PostedData,
    options: &FormsetOptions,
) -> Result<ReconciledPlan, PreconditionError> {
    let highest_posted = naming::posted_row_indices(prefix, data)
        .into_iter()
        .next_back()
        .map(|index| index.saturating_add(1))
        .unwrap_or(0);
    let total_count = counters.total_forms.max(highest_posted);

    let limit = options.absolute_max();
    if total_count > limit {
        return Err(PreconditionError::TooManyForms {
            prefix: prefix.to_string(),
            total: total_count,
            limit,
        });
    }

    let rows: Vec<RowObservation> = (0..total_count)
        .map(|index| {
            let row = naming::row_prefix(prefix, index);
            let raw_id = data
                .get(&naming::field_name(&row, ID_FIELD))
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string);
            let deleted = options.can_delete
                && data
                    .get(&naming::field_name(&row, DELETION_FIELD))
                    .is_some_and(is_truthy);
            RowObservation {
                index,
                raw_id,
                deleted,
            }
        })
        .collect();

    let initial_count = rows.iter().filter(|r| r.is_identified()).count();
    let live_count = rows
        .iter()
        .filter(|r| r.is_identified() && !r.deleted)
        .count();

    let mismatch = (counters.total_forms != total_count || counters.initial_forms != initial_count)
        .then(|| ReconciliationMismatch {
            prefix: prefix.to_string(),
            posted_total: counters.total_forms,
            posted_initial: counters.initial_forms,
            corrected_total: total_count,
            corrected_initial: initial_count,
        });

    if let Some(m) = &mismatch {
        tracing::warn!(
            prefix = %m.prefix,
            posted_total = m.posted_total,
            posted_initial = m.posted_initial,
            corrected_total = m.corrected_total,
            corrected_initial = m.corrected_initial,
            "management counters disagree with posted rows; using server-observed counts"
        );
    }

    Ok(ReconciledPlan {
        total_count,
        initial_count,
        live_count,
        rows,
        mismatch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(total: usize, initial: usize) -> ManagementCounters {
        ManagementCounters {
            total_forms: total,
            initial_forms: initial,
            min_num_forms: 0,
            max_num_forms: 1000,
        }
    }

    #[test]
    fn test_absent_total_means_not_rendered() {
        let data = PostedData::from_pairs([("name", "A")]);
        assert_eq!(
            ManagementCounters::from_posted("buildings", &data, 1000).unwrap(),
            None
        );
    }

    #[test]
    fn test_missing_optional_counters_take_defaults() {
        let data = PostedData::from_pairs([("buildings-TOTAL_FORMS", "2")]);
        let counters = ManagementCounters::from_posted("buildings", &data, 50)
            .unwrap()
            .unwrap();
        assert_eq!(counters.total_forms, 2);
        assert_eq!(counters.initial_forms, 0);
        assert_eq!(counters.max_num_forms, 50);
    }

    #[test]
    fn test_malformed_counter_is_precondition_error() {
        let data = PostedData::from_pairs([
            ("buildings-TOTAL_FORMS", "2"),
            ("buildings-INITIAL_FORMS", "-1"),
        ]);
        let err = ManagementCounters::from_posted("buildings", &data, 1000).unwrap_err();
        assert_eq!(
            err,
            PreconditionError::MalformedCounter {
                key: "buildings-INITIAL_FORMS".to_string(),
                value: "-1".to_string(),
            }
        );
    }

    #[test]
    fn test_consistent_counters_pass_through() {
        let data = PostedData::from_pairs([
            ("buildings-0-id", "4"),
            ("buildings-0-name", "B1"),
            ("buildings-1-name", "B2"),
        ]);
        let plan = reconcile("buildings", &counters(2, 1), &data, &FormsetOptions::default())
            .unwrap();

        assert_eq!(plan.total_count, 2);
        assert_eq!(plan.initial_count, 1);
        assert_eq!(plan.live_count, 1);
        assert_eq!(plan.rows[0].raw_id.as_deref(), Some("4"));
        assert_eq!(plan.rows[1].raw_id, None);
        assert!(plan.mismatch.is_none());
    }

    #[test]
    fn test_stale_total_is_extended_to_posted_rows() {
        // Client cloned a row at index 2 without bumping TOTAL_FORMS
        let data = PostedData::from_pairs([
            ("buildings-0-name", "B1"),
            ("buildings-1-name", "B2"),
            ("buildings-2-name", "B3"),
        ]);
        let plan = reconcile("buildings", &counters(2, 0), &data, &FormsetOptions::default())
            .unwrap();

        assert_eq!(plan.total_count, 3);
        let mismatch = plan.mismatch.unwrap();
        assert_eq!(mismatch.posted_total, 2);
        assert_eq!(mismatch.corrected_total, 3);
    }

    #[test]
    fn test_server_initial_count_wins() {
        let data = PostedData::from_pairs([
            ("buildings-0-id", "4"),
            ("buildings-0-DELETE", "on"),
            ("buildings-1-id", "5"),
            ("buildings-2-name", "new"),
        ]);
        let plan = reconcile("buildings", &counters(3, 0), &data, &FormsetOptions::default())
            .unwrap();

        assert_eq!(plan.initial_count, 2);
        assert_eq!(plan.live_count, 1);
        assert!(plan.rows[0].deleted);
        assert_eq!(plan.mismatch.unwrap().corrected_initial, 2);
    }

    #[test]
    fn test_deletion_ignored_when_disabled() {
        let data = PostedData::from_pairs([("buildings-0-id", "4"), ("buildings-0-DELETE", "on")]);
        let options = FormsetOptions {
            can_delete: false,
            ..FormsetOptions::default()
        };
        let plan = reconcile("buildings", &counters(1, 1), &data, &options).unwrap();
        assert!(!plan.rows[0].deleted);
        assert_eq!(plan.live_count, 1);
    }

    #[test]
    fn test_row_limit_is_enforced() {
        let data = PostedData::from_pairs([("buildings-5000-name", "x")]);
        let err = reconcile("buildings", &counters(1, 0), &data, &FormsetOptions::default())
            .unwrap_err();
        assert!(matches!(err, PreconditionError::TooManyForms { total: 5001, .. }));
    }

    #[test]
    fn test_largest_row_index_is_rejected_not_wrapped() {
        let key = format!("buildings-{}-name", usize::MAX);
        let data = PostedData::from_pairs([(key.as_str(), "x")]);
        let err = reconcile("buildings", &counters(1, 0), &data, &FormsetOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            PreconditionError::TooManyForms { total: usize::MAX, limit: 2000, .. }
        ));
    }

    #[test]
    fn test_reconcile_properties_hold_across_inputs() {
        let options = FormsetOptions::default();
        let layouts: Vec<Vec<(usize, Option<&str>, bool)>> = vec![
            vec![],
            vec![(0, Some("1"), false)],
            vec![(0, Some("1"), true), (1, None, false)],
            vec![(0, None, false), (3, Some("9"), false)],
            vec![(1, Some(" "), false), (2, Some("7"), true), (4, Some("8"), false)],
        ];

        for layout in layouts {
            let mut data = PostedData::new();
            for (index, id, deleted) in &layout {
                data.insert(format!("p-{}-name", index), "x");
                if let Some(id) = id {
                    data.insert(format!("p-{}-id", index), *id);
                }
                if *deleted {
                    data.insert(format!("p-{}-DELETE", index), "on");
                }
            }

            for (total, initial) in [(0, 0), (1, 0), (2, 5), (6, 1)] {
                let c = counters(total, initial);
                let plan = reconcile("p", &c, &data, &options).unwrap();
                let again = reconcile("p", &c, &data, &options).unwrap();
                assert_eq!(plan, again, "reconcile must be idempotent");

                let identified_live = layout
                    .iter()
                    .filter(|(_, id, deleted)| id.is_some_and(|s| !s.trim().is_empty()) && !deleted)
                    .count();
                assert!(plan.total_count >= identified_live);
                assert!(plan.total_count >= plan.initial_count);
                assert!(plan.total_count >= c.total_forms);
                assert_eq!(plan.live_count, identified_live);
                if initial == plan.initial_count {
                    assert!(plan.total_count >= initial);
                }
            }
        }
    }
}
