use nestform_types::{EntityModel, FieldValue, Fields, Instance, RecordId, Store};
use std::sync::Arc;

use crate::form::{FieldError, FieldForm, INVALID_CHOICE, Saved};
use crate::management::{ManagementCounters, ReconciledPlan, ReconciliationMismatch, reconcile};
use crate::naming::{self, DELETION_FIELD, ID_FIELD};
use crate::node::{NestedFormNode, SaveLedger};
use crate::{ChildSpec, PostedData, PreconditionError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormsetState {
    Unbound,
    Bound,
    Validated { valid: bool },
    Saved,
}

/// Ordered rows of one child type under one parent instance.
///
/// Row positions are index-addressed and stay stable for the whole
/// request; a row flagged for deletion keeps its slot.
#[derive(Debug, Clone)]
pub struct FormsetController {
    spec: ChildSpec,
    prefix: String,
    parent_id: Option<RecordId>,
    rows: Vec<NestedFormNode>,
    total_count: usize,
    initial_count: usize,
    bound: bool,
    plan: Option<ReconciledPlan>,
    non_form_errors: Vec<String>,
    state: FormsetState,
}

impl FormsetController {
    /// Rows for display: the parent's persisted children plus `extra` blank rows.
    pub fn unbound(
        spec: &ChildSpec,
        parent: &Instance,
        prefix: &str,
        store: &dyn Store,
    ) -> Result<Self> {
        let model = &spec.form.model;
        let existing = match parent.id {
            Some(id) => store.list_children(model, id)?,
            None => Vec::new(),
        };
        let initial_count = existing.len();

        let mut rows = Vec::with_capacity(initial_count + spec.options.extra);
        for (index, instance) in existing.into_iter().enumerate() {
            let row_prefix = naming::row_prefix(prefix, index);
            rows.push(NestedFormNode::new(&spec.form, instance, &row_prefix, store)?);
        }

        let extra = spec
            .options
            .extra
            .min(spec.options.max_num.saturating_sub(initial_count));
        for offset in 0..extra {
            let row_prefix = naming::row_prefix(prefix, initial_count + offset);
            let instance = Instance::new(model).with_parent(parent.id);
            rows.push(NestedFormNode::new(&spec.form, instance, &row_prefix, store)?);
        }

        Ok(Self {
            spec: spec.clone(),
            prefix: prefix.to_string(),
            parent_id: parent.id,
            total_count: rows.len(),
            initial_count,
            rows,
            bound: false,
            plan: None,
            non_form_errors: Vec::new(),
            state: FormsetState::Unbound,
        })
    }

    /// Binds posted rows, after reconciling the posted management counters.
    pub fn bind(
        spec: &ChildSpec,
        parent: &Instance,
        prefix: &str,
        data: &PostedData,
        store: &dyn Store,
    ) -> Result<Self> {
        let plan = Self::reconciled_plan(spec, prefix, data)?;
        let model = &spec.form.model;

        let mut rows = Vec::with_capacity(plan.total_count);
        for observation in &plan.rows {
            let row_prefix = naming::row_prefix(prefix, observation.index);
            let (instance, bind_error) =
                Self::resolve_row(model, parent, observation.raw_id.as_deref(), store)?;

            let raw = FieldForm::posted_values(model, &row_prefix, data);
            let mut form = FieldForm::new(model.clone(), instance, row_prefix)
                .bind(raw, observation.deleted);
            if let Some(error) = bind_error {
                form.add_bind_error(error);
            }

            let mut node = NestedFormNode::assemble(&spec.form, form, Some(data), store)?;
            if !observation.is_identified() && !node.has_changed() {
                node.form_mut().set_empty_permitted(true);
            }
            rows.push(node);
        }

        tracing::debug!(
            prefix,
            total = plan.total_count,
            initial = plan.initial_count,
            "bound formset"
        );

        Ok(Self {
            spec: spec.clone(),
            prefix: prefix.to_string(),
            parent_id: parent.id,
            total_count: plan.total_count,
            initial_count: plan.initial_count,
            rows,
            bound: true,
            plan: Some(plan),
            non_form_errors: Vec::new(),
            state: FormsetState::Bound,
        })
    }

    fn reconciled_plan(spec: &ChildSpec, prefix: &str, data: &PostedData) -> Result<ReconciledPlan> {
        let counters = match ManagementCounters::from_posted(prefix, data, spec.options.max_num)? {
            Some(counters) => counters,
            None if naming::posted_row_indices(prefix, data).is_empty() => {
                tracing::debug!(prefix, "no management counters posted; formset was not rendered");
                return Ok(ReconciledPlan::empty());
            }
            // Rows without counters: reconcile from zero so the rows are kept
            None => ManagementCounters {
                total_forms: 0,
                initial_forms: 0,
                min_num_forms: 0,
                max_num_forms: spec.options.max_num,
            },
        };

        Ok(reconcile(prefix, &counters, data, &spec.options)?)
    }

    /// Looks up the persisted row behind a posted identifier.
    ///
    /// An identifier that does not parse, does not exist, or belongs to
    /// another parent binds a fresh instance and reports an `id` field error.
    fn resolve_row(
        model: &Arc<EntityModel>,
        parent: &Instance,
        raw_id: Option<&str>,
        store: &dyn Store,
    ) -> Result<(Instance, Option<FieldError>)> {
        let fresh = || Instance::new(model).with_parent(parent.id);
        let invalid = || FieldError::new(ID_FIELD, INVALID_CHOICE);

        let Some(raw_id) = raw_id else {
            return Ok((fresh(), None));
        };
        let Ok(id) = raw_id.parse::<RecordId>() else {
            return Ok((fresh(), Some(invalid())));
        };

        match store.get(model, id)? {
            Some(instance) if parent.id.is_some() && instance.parent_id == parent.id => {
                Ok((instance, None))
            }
            _ => {
                tracing::debug!(model = %model.name, id = %id, "posted row id does not belong to parent");
                Ok((fresh(), Some(invalid())))
            }
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn spec(&self) -> &ChildSpec {
        &self.spec
    }

    pub fn relation(&self) -> &str {
        &self.spec.relation
    }

    pub fn parent_id(&self) -> Option<RecordId> {
        self.parent_id
    }

    pub fn rows(&self) -> &[NestedFormNode] {
        &self.rows
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut NestedFormNode> {
        self.invalidate();
        self.rows.get_mut(index)
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn initial_count(&self) -> usize {
        self.initial_count
    }

    pub fn max_num(&self) -> usize {
        self.spec.options.max_num
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn plan(&self) -> Option<&ReconciledPlan> {
        self.plan.as_ref()
    }

    pub fn mismatch(&self) -> Option<&ReconciliationMismatch> {
        self.plan.as_ref().and_then(|p| p.mismatch.as_ref())
    }

    pub fn non_form_errors(&self) -> &[String] {
        &self.non_form_errors
    }

    pub fn management(&self) -> ManagementCounters {
        ManagementCounters {
            total_forms: self.total_count,
            initial_forms: self.initial_count,
            min_num_forms: 0,
            max_num_forms: self.spec.options.max_num,
        }
    }

    pub fn set_parent(&mut self, parent_id: Option<RecordId>) {
        self.parent_id = parent_id;
    }

    /// Appends a row at the next index and extends `total_count`.
    ///
    /// On a bound formset the initial values are also the row's submitted
    /// values, so the row validates and saves like a posted one.
    pub fn add_row(&mut self, initial: Fields, store: &dyn Store) -> Result<&mut NestedFormNode> {
        if self.state == FormsetState::Saved {
            return Err(PreconditionError::AlreadySaved {
                prefix: self.prefix.clone(),
            }
            .into());
        }

        let index = self.rows.len();
        let limit = self.spec.options.absolute_max();
        if index + 1 > limit {
            return Err(PreconditionError::TooManyForms {
                prefix: self.prefix.clone(),
                total: index + 1,
                limit,
            }
            .into());
        }

        let model = self.spec.form.model.clone();
        let row_prefix = naming::row_prefix(&self.prefix, index);
        let instance = Instance::new(&model).with_parent(self.parent_id);
        let form = FieldForm::new(model, instance, row_prefix).with_initial(&initial);

        let node = if self.bound {
            let raw = initial
                .iter()
                .filter_map(|(name, value)| value.as_raw().map(|raw| (name.clone(), raw)))
                .collect();
            let form = form.bind(raw, false);
            NestedFormNode::assemble(&self.spec.form, form, Some(&PostedData::new()), store)?
        } else {
            NestedFormNode::assemble(&self.spec.form, form, None, store)?
        };

        self.rows.push(node);
        self.total_count = self.rows.len();
        self.invalidate();
        tracing::debug!(prefix = %self.prefix, index, "added row");

        Ok(&mut self.rows[index])
    }

    /// Adds one row per index found in flat `prefix-<index>-<field>` data.
    ///
    /// Used to pre-populate rows from values supplied out of band; the
    /// rows have no backing identifier. Returns the number of rows added.
    pub fn add_rows_from_flat(&mut self, flat: &PostedData, store: &dyn Store) -> Result<usize> {
        let model = self.spec.form.model.clone();
        let rows = naming::flat_rows(&self.prefix, flat);
        let mut added = 0;

        for values in rows.into_values() {
            let fields: Fields = values
                .into_iter()
                .filter(|(name, _)| model.field_spec(name).is_some())
                .map(|(name, value)| (name, FieldValue::Text(value)))
                .collect();
            self.add_row(fields, store)?;
            added += 1;
        }

        Ok(added)
    }

    /// Flags a row for deletion; its index slot is kept.
    pub fn remove_row(&mut self, index: usize) -> Result<()> {
        if !self.spec.options.can_delete {
            return Err(PreconditionError::DeletionDisabled {
                prefix: self.prefix.clone(),
            }
            .into());
        }

        let prefix = self.prefix.clone();
        let row = self
            .rows
            .get_mut(index)
            .ok_or(PreconditionError::RowOutOfRange { prefix, index })?;
        row.form_mut().mark_deleted();
        self.invalidate();
        Ok(())
    }

    /// Validates every row, without stopping at the first invalid one, so
    /// that all errors are available for display.
    pub fn is_valid(&mut self) -> bool {
        match self.state {
            FormsetState::Unbound => return false,
            FormsetState::Validated { valid } => return valid,
            FormsetState::Saved => return true,
            FormsetState::Bound => {}
        }

        let mut valid = true;
        for row in &mut self.rows {
            let row_valid = row.is_valid();
            valid = valid && row_valid;
        }

        self.non_form_errors.clear();
        let options = self.spec.options;
        if options.validate_max {
            let surviving = self
                .rows
                .iter()
                .filter(|row| !row.is_deleted() && !row.form().is_empty_extra())
                .count();
            if surviving > options.max_num {
                self.non_form_errors
                    .push(format!("Please submit {} or fewer forms.", options.max_num));
                valid = false;
            }
        }

        self.state = FormsetState::Validated { valid };
        valid
    }

    /// True when any row was edited, added or flagged for deletion.
    pub fn has_changed(&self) -> bool {
        self.rows
            .iter()
            .any(|row| row.is_deleted() || row.has_changed())
    }

    /// Saves rows in index order, threading the parent identifier into each
    /// row's parent link first. Rows flagged for deletion are deleted along
    /// with their own descendants.
    pub fn save(&mut self, store: &dyn Store, commit: bool, save_children: bool) -> Result<Vec<Saved>> {
        self.check_saveable()?;
        let mut ledger = SaveLedger::default();
        self.save_with(store, commit, save_children, &mut ledger)
            .map_err(|err| ledger.wrap(err))
    }

    pub(crate) fn save_with(
        &mut self,
        store: &dyn Store,
        commit: bool,
        save_children: bool,
        ledger: &mut SaveLedger,
    ) -> Result<Vec<Saved>> {
        self.check_saveable()?;

        if commit && self.parent_id.is_none() && self.rows.iter().any(|r| r.writes_on_save()) {
            return Err(PreconditionError::ParentNotSaved {
                prefix: self.prefix.clone(),
            }
            .into());
        }

        let mut results = Vec::with_capacity(self.rows.len());
        for row in &mut self.rows {
            if !row.is_deleted() {
                row.set_parent(self.parent_id);
            }
            results.push(row.save_with(store, commit, save_children, ledger)?);
        }

        if commit {
            let kept = results
                .iter()
                .filter(|saved| matches!(saved, Saved::Instance(_)))
                .count();
            self.total_count = kept;
            self.initial_count = kept;
            self.state = FormsetState::Saved;
        }

        Ok(results)
    }

    pub(crate) fn write_posted(&self, data: &mut PostedData) {
        self.management().write_to(&self.prefix, data);

        for row in &self.rows {
            if let Some(id) = row.instance().id {
                data.insert(naming::field_name(row.prefix(), ID_FIELD), id.to_string());
            }
            if row.is_deleted() {
                data.insert(naming::field_name(row.prefix(), DELETION_FIELD), "on");
            }
            row.write_posted(data);
        }
    }

    fn check_saveable(&self) -> Result<()> {
        let prefix = self.prefix.clone();
        match self.state {
            FormsetState::Validated { valid: true } => Ok(()),
            FormsetState::Validated { valid: false } => {
                Err(PreconditionError::SaveInvalid { prefix }.into())
            }
            FormsetState::Saved => Err(PreconditionError::AlreadySaved { prefix }.into()),
            FormsetState::Unbound | FormsetState::Bound => {
                Err(PreconditionError::SaveBeforeValidate { prefix }.into())
            }
        }
    }

    fn invalidate(&mut self) {
        if let FormsetState::Validated { .. } = self.state {
            self.state = FormsetState::Bound;
        }
    }
}
