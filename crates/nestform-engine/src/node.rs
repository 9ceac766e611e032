use nestform_types::{Instance, RecordId, Store};

use crate::diagnostics::{Diagnostics, ReportedError};
use crate::form::{FieldForm, Saved};
use crate::formset::FormsetController;
use crate::naming;
use crate::{Error, FormSpec, PostedData, PreconditionError, Result};

/// A form, plus the formset of its children when its level has one.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Leaf(FieldForm),
    Branch(FieldForm, FormsetController),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Unbound,
    Bound,
    Validated { valid: bool },
    Saved,
}

/// One node of the form tree: a root form, or one row of a parent's formset.
#[derive(Debug, Clone)]
pub struct NestedFormNode {
    spec: FormSpec,
    prefix: String,
    form_name: String,
    kind: NodeKind,
    state: NodeState,
}

impl NestedFormNode {
    /// Unbound tree for display, populated from `instance` and its
    /// persisted descendants.
    pub fn new(spec: &FormSpec, instance: Instance, prefix: &str, store: &dyn Store) -> Result<Self> {
        let form = FieldForm::new(spec.model.clone(), instance, prefix);
        Self::assemble(spec, form, None, store)
    }

    /// Binds the whole tree below `prefix` to posted data.
    pub fn bind(
        spec: &FormSpec,
        instance: Instance,
        data: &PostedData,
        prefix: &str,
        store: &dyn Store,
    ) -> Result<Self> {
        let raw = FieldForm::posted_values(&spec.model, prefix, data);
        let form = FieldForm::new(spec.model.clone(), instance, prefix).bind(raw, false);
        Self::assemble(spec, form, Some(data), store)
    }

    pub(crate) fn assemble(
        spec: &FormSpec,
        form: FieldForm,
        data: Option<&PostedData>,
        store: &dyn Store,
    ) -> Result<Self> {
        let prefix = form.prefix().to_string();

        let kind = match spec.child.as_deref() {
            None => NodeKind::Leaf(form),
            Some(child) => {
                let child_prefix = naming::join_prefix(&prefix, &child.relation);
                let formset = match data {
                    Some(data) => {
                        FormsetController::bind(child, form.instance(), &child_prefix, data, store)?
                    }
                    None => FormsetController::unbound(child, form.instance(), &child_prefix, store)?,
                };
                NodeKind::Branch(form, formset)
            }
        };

        let state = if data.is_some() {
            NodeState::Bound
        } else {
            NodeState::Unbound
        };

        Ok(Self {
            spec: spec.clone(),
            prefix,
            form_name: spec.form_name(),
            kind,
            state,
        })
    }

    pub fn spec(&self) -> &FormSpec {
        &self.spec
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn form_name(&self) -> &str {
        &self.form_name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn form(&self) -> &FieldForm {
        match &self.kind {
            NodeKind::Leaf(form) | NodeKind::Branch(form, _) => form,
        }
    }

    pub fn form_mut(&mut self) -> &mut FieldForm {
        self.invalidate();
        match &mut self.kind {
            NodeKind::Leaf(form) | NodeKind::Branch(form, _) => form,
        }
    }

    pub fn children(&self) -> Option<&FormsetController> {
        match &self.kind {
            NodeKind::Branch(_, formset) => Some(formset),
            NodeKind::Leaf(_) => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut FormsetController> {
        self.invalidate();
        match &mut self.kind {
            NodeKind::Branch(_, formset) => Some(formset),
            NodeKind::Leaf(_) => None,
        }
    }

    pub fn instance(&self) -> &Instance {
        self.form().instance()
    }

    pub fn is_deleted(&self) -> bool {
        self.form().deletion_requested()
    }

    /// Deep change detection: this form or anything below it.
    pub fn has_changed(&self) -> bool {
        match &self.kind {
            NodeKind::Leaf(form) => form.has_changed(),
            NodeKind::Branch(form, formset) => form.has_changed() || formset.has_changed(),
        }
    }

    /// Valid iff the own form and, unless the row is deleted or an untouched
    /// extra, the child formset are valid. Every child is evaluated so all
    /// errors are collected.
    pub fn is_valid(&mut self) -> bool {
        match self.state {
            NodeState::Unbound => return false,
            NodeState::Validated { valid } => return valid,
            NodeState::Saved => return true,
            NodeState::Bound => {}
        }

        let valid = match &mut self.kind {
            NodeKind::Leaf(form) => form.is_valid(),
            NodeKind::Branch(form, formset) => {
                let own = form.is_valid();
                if form.deletion_requested() || form.is_empty_extra() {
                    own
                } else {
                    let children = formset.is_valid();
                    own && children
                }
            }
        };

        self.state = NodeState::Validated { valid };
        valid
    }

    /// Saves this node's form, then each child row with the new parent
    /// identifier threaded in. A row flagged for deletion removes its
    /// persisted descendants first.
    ///
    /// A failure after earlier writes were committed is reported as
    /// [`Error::PartialSave`]; those writes stay in the store.
    pub fn save(&mut self, store: &dyn Store, commit: bool, save_children: bool) -> Result<Saved> {
        self.check_saveable()?;
        let mut ledger = SaveLedger::default();
        self.save_with(store, commit, save_children, &mut ledger)
            .map_err(|err| ledger.wrap(err))
    }

    /// Saves the whole tree inside one store transaction.
    ///
    /// On failure the transaction is rolled back and the tree must be
    /// discarded: its in-memory identifiers may refer to rolled-back rows.
    pub fn save_atomic(&mut self, store: &dyn Store) -> Result<Saved> {
        self.check_saveable()?;
        store.begin()?;

        let mut ledger = SaveLedger::default();
        match self.save_with(store, true, true, &mut ledger) {
            Ok(saved) => {
                store.commit()?;
                tracing::debug!(form = %self.form_name, writes = ledger.committed, "tree saved");
                Ok(saved)
            }
            Err(err) => {
                if let Err(rollback) = store.rollback() {
                    tracing::error!(error = %rollback, "rollback failed");
                }
                tracing::warn!(
                    form = %self.form_name,
                    writes = ledger.committed,
                    error = %err,
                    "tree save rolled back"
                );
                Err(err)
            }
        }
    }

    pub(crate) fn save_with(
        &mut self,
        store: &dyn Store,
        commit: bool,
        save_children: bool,
        ledger: &mut SaveLedger,
    ) -> Result<Saved> {
        self.check_saveable()?;

        let saved = match &mut self.kind {
            NodeKind::Leaf(form) => {
                let saved = form.save(store, commit)?;
                ledger.record(commit, &saved);
                saved
            }
            NodeKind::Branch(form, formset) => {
                if form.deletion_requested() {
                    if commit && let Some(id) = form.instance().id {
                        delete_descendants(&self.spec, id, store, ledger)?;
                    }
                    let saved = form.save(store, commit)?;
                    ledger.record(commit, &saved);
                    saved
                } else {
                    let saved = form.save(store, commit)?;
                    ledger.record(commit, &saved);
                    if save_children && let Saved::Instance(instance) = &saved {
                        formset.set_parent(instance.id);
                        formset.save_with(store, commit, save_children, ledger)?;
                    }
                    saved
                }
            }
        };

        if commit {
            self.state = NodeState::Saved;
        }
        Ok(saved)
    }

    /// True when saving with commit would write to the store.
    pub(crate) fn writes_on_save(&self) -> bool {
        let form = self.form();
        if form.deletion_requested() {
            form.instance().is_persisted()
        } else {
            !form.is_empty_extra()
        }
    }

    pub(crate) fn set_parent(&mut self, parent_id: Option<RecordId>) {
        match &mut self.kind {
            NodeKind::Leaf(form) | NodeKind::Branch(form, _) => form.set_parent(parent_id),
        }
    }

    /// Counter corrections made anywhere in the tree.
    pub fn diagnostics(&self) -> Diagnostics {
        let mut diagnostics = Diagnostics::default();
        self.collect_diagnostics(&mut diagnostics);
        diagnostics
    }

    fn collect_diagnostics(&self, diagnostics: &mut Diagnostics) {
        if let NodeKind::Branch(_, formset) = &self.kind {
            if let Some(mismatch) = formset.mismatch() {
                diagnostics.push(mismatch.clone());
            }
            for row in formset.rows() {
                row.collect_diagnostics(diagnostics);
            }
        }
    }

    /// Every validation error in the tree, keyed by rendered field name.
    pub fn reported_errors(&self) -> Vec<ReportedError> {
        let mut out = Vec::new();
        self.collect_errors(&mut out);
        out
    }

    fn collect_errors(&self, out: &mut Vec<ReportedError>) {
        for error in self.form().errors().iter() {
            out.push(ReportedError {
                name: naming::field_name(&self.prefix, &error.field),
                message: error.message.clone(),
            });
        }

        if let NodeKind::Branch(_, formset) = &self.kind {
            for message in formset.non_form_errors() {
                out.push(ReportedError {
                    name: formset.prefix().to_string(),
                    message: message.clone(),
                });
            }
            for row in formset.rows() {
                row.collect_errors(out);
            }
        }
    }

    /// The flat data a browser would submit for the tree as it stands,
    /// management counters and row identifiers included.
    pub fn posted_snapshot(&self) -> PostedData {
        let mut data = PostedData::new();
        self.write_posted(&mut data);
        data
    }

    pub(crate) fn write_posted(&self, data: &mut PostedData) {
        for (name, value) in self.form().current_values() {
            data.insert(naming::field_name(&self.prefix, &name), value);
        }
        if let NodeKind::Branch(_, formset) = &self.kind {
            formset.write_posted(data);
        }
    }

    fn check_saveable(&self) -> Result<()> {
        let prefix = self.prefix.clone();
        match self.state {
            NodeState::Validated { valid: true } => Ok(()),
            NodeState::Validated { valid: false } => {
                Err(PreconditionError::SaveInvalid { prefix }.into())
            }
            NodeState::Saved => Err(PreconditionError::AlreadySaved { prefix }.into()),
            NodeState::Unbound | NodeState::Bound => {
                Err(PreconditionError::SaveBeforeValidate { prefix }.into())
            }
        }
    }

    fn invalidate(&mut self) {
        if let NodeState::Validated { .. } = self.state {
            self.state = NodeState::Bound;
        }
    }
}

/// Store writes made by one save call
#[derive(Debug, Default)]
pub(crate) struct SaveLedger {
    pub(crate) committed: usize,
}

impl SaveLedger {
    pub(crate) fn record(&mut self, commit: bool, saved: &Saved) {
        if commit && !matches!(saved, Saved::Skipped) {
            self.committed += 1;
        }
    }

    pub(crate) fn wrap(&self, err: Error) -> Error {
        if self.committed == 0 {
            return err;
        }
        tracing::error!(committed = self.committed, error = %err, "save failed after partial commit");
        Error::PartialSave {
            committed: self.committed,
            source: Box::new(err),
        }
    }
}

/// Deletes a persisted instance and all of its descendants, children first.
///
/// Returns the number of records removed.
pub fn delete_tree(spec: &FormSpec, id: RecordId, store: &dyn Store) -> Result<usize> {
    let mut ledger = SaveLedger::default();
    let result = delete_descendants(spec, id, store, &mut ledger).and_then(|()| {
        store.delete(&spec.model, id)?;
        ledger.committed += 1;
        Ok(())
    });

    match result {
        Ok(()) => {
            tracing::info!(model = %spec.model.name, id = %id, removed = ledger.committed, "deleted tree");
            Ok(ledger.committed)
        }
        Err(err) => Err(ledger.wrap(err)),
    }
}

fn delete_descendants(
    spec: &FormSpec,
    id: RecordId,
    store: &dyn Store,
    ledger: &mut SaveLedger,
) -> Result<()> {
    let Some(child) = spec.child.as_deref() else {
        return Ok(());
    };

    for instance in store.list_children(&child.form.model, id)? {
        let Some(child_id) = instance.id else {
            continue;
        };
        delete_descendants(&child.form, child_id, store, ledger)?;
        store.delete(&child.form.model, child_id)?;
        ledger.committed += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FormsetOptions;
    use nestform_index::Database;
    use nestform_types::{FieldValue, Fields, Schema};

    fn block_spec() -> FormSpec {
        FormSpec::from_schema(&Schema::demo(), "Block", FormsetOptions::default()).unwrap()
    }

    fn posted(pairs: &[(&str, &str)]) -> PostedData {
        PostedData::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_unbound_tree_has_extra_rows_at_every_level() {
        let db = Database::open_in_memory().unwrap();
        let spec = block_spec();
        let root = NestedFormNode::new(&spec, Instance::new(&spec.model), "", &db).unwrap();

        let buildings = root.children().unwrap();
        assert_eq!(buildings.prefix(), "buildings");
        assert_eq!(buildings.rows().len(), 1);

        let tenants = buildings.rows()[0].children().unwrap();
        assert_eq!(tenants.prefix(), "buildings-0-tenants");
        let furniture = tenants.rows()[0].children().unwrap();
        assert_eq!(furniture.prefix(), "buildings-0-tenants-0-furniture");
        assert!(furniture.rows()[0].children().is_none());
    }

    #[test]
    fn test_unbound_tree_is_not_valid() {
        let db = Database::open_in_memory().unwrap();
        let spec = block_spec();
        let mut root = NestedFormNode::new(&spec, Instance::new(&spec.model), "", &db).unwrap();
        assert!(!root.is_valid());
        assert!(root.save(&db, true, true).unwrap_err().is_precondition());
    }

    #[test]
    fn test_save_without_children_leaves_rows_unsaved() {
        let db = Database::open_in_memory().unwrap();
        let spec = block_spec();
        let data = posted(&[
            ("name", "Block A"),
            ("buildings-TOTAL_FORMS", "1"),
            ("buildings-0-name", "B1"),
        ]);
        let mut root = NestedFormNode::bind(&spec, Instance::new(&spec.model), &data, "", &db).unwrap();
        assert!(root.is_valid());

        root.save(&db, true, false).unwrap();
        assert_eq!(db.count("Block").unwrap(), 1);
        assert_eq!(db.count("Building").unwrap(), 0);
    }

    #[test]
    fn test_mutation_after_validation_requires_revalidation() {
        let db = Database::open_in_memory().unwrap();
        let spec = block_spec();
        let data = posted(&[("name", "Block A"), ("buildings-TOTAL_FORMS", "0")]);
        let mut root = NestedFormNode::bind(&spec, Instance::new(&spec.model), &data, "", &db).unwrap();
        assert!(root.is_valid());

        let mut fields = Fields::new();
        fields.insert("name".to_string(), FieldValue::from("B1"));
        root.children_mut().unwrap().add_row(fields, &db).unwrap();

        assert_eq!(root.state(), NodeState::Bound);
        let err = root.save(&db, true, true).unwrap_err();
        assert!(matches!(
            err,
            Error::Precondition(PreconditionError::SaveBeforeValidate { .. })
        ));

        assert!(root.is_valid());
        root.save(&db, true, true).unwrap();
        assert_eq!(db.count("Building").unwrap(), 1);
    }

    #[test]
    fn test_delete_tree_removes_descendants() {
        let db = Database::open_in_memory().unwrap();
        let spec = block_spec();
        let data = posted(&[
            ("name", "Block A"),
            ("buildings-TOTAL_FORMS", "1"),
            ("buildings-0-name", "B1"),
            ("buildings-0-tenants-TOTAL_FORMS", "1"),
            ("buildings-0-tenants-0-first_name", "Ada"),
            ("buildings-0-tenants-0-last_name", "L"),
        ]);
        let mut root = NestedFormNode::bind(&spec, Instance::new(&spec.model), &data, "", &db).unwrap();
        assert!(root.is_valid());
        let saved = root.save(&db, true, true).unwrap();
        let id = saved.instance().unwrap().id.unwrap();

        let removed = delete_tree(&spec, id, &db).unwrap();
        assert_eq!(removed, 3);
        assert_eq!(db.count("Block").unwrap(), 0);
        assert_eq!(db.count("Building").unwrap(), 0);
        assert_eq!(db.count("Tenant").unwrap(), 0);
    }
}
