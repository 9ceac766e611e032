use nestform_types::{
    EntityModel, FieldKind, FieldSpec, FieldValue, Fields, Instance, RecordId, Store,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::naming;
use crate::posted::is_truthy;
use crate::{PostedData, PreconditionError, Result};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_INTEGER: &str = "Enter a whole number.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// A single field that failed coercion or a declared constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// All field errors of one row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RowError {
    errors: Vec<FieldError>,
}

impl RowError {
    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn for_field(&self, field: &str) -> Vec<String> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.clone())
            .collect()
    }
}

/// Outcome of [`FieldForm::validate`]. Invalid input is a normal outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub valid: bool,
    pub cleaned: Fields,
    pub errors: RowError,
}

/// What a save did to the store
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Saved {
    /// Created or updated (or, without commit, ready to be written)
    Instance(Instance),
    /// A persisted row was deleted
    Deleted(Tombstone),
    /// Nothing to write: an untouched extra row, or a deleted row that never existed
    Skipped,
}

impl Saved {
    pub fn instance(&self) -> Option<&Instance> {
        match self {
            Saved::Instance(instance) => Some(instance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tombstone {
    pub model: String,
    pub id: RecordId,
}

/// A field as handed to a markup renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundField {
    pub name: String,
    pub html_id: String,
    pub label: String,
    pub input_type: &'static str,
    pub value: Option<String>,
    pub required: bool,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormState {
    Unbound,
    Bound,
    Validated { valid: bool },
    Saved,
}

/// Validates and saves the flat fields of one instance.
#[derive(Debug, Clone)]
pub struct FieldForm {
    model: Arc<EntityModel>,
    prefix: String,
    instance: Instance,
    initial: BTreeMap<String, String>,
    data: Option<BTreeMap<String, String>>,
    deletion_requested: bool,
    empty_permitted: bool,
    bind_errors: Vec<FieldError>,
    cleaned: Fields,
    errors: RowError,
    state: FormState,
}

impl FieldForm {
    pub fn new(model: Arc<EntityModel>, instance: Instance, prefix: impl Into<String>) -> Self {
        let initial = model
            .fields
            .iter()
            .filter_map(|f| instance.field(&f.name).as_raw().map(|v| (f.name.clone(), v)))
            .collect();

        Self {
            model,
            prefix: prefix.into(),
            instance,
            initial,
            data: None,
            deletion_requested: false,
            empty_permitted: false,
            bind_errors: Vec::new(),
            cleaned: Fields::new(),
            errors: RowError::default(),
            state: FormState::Unbound,
        }
    }

    /// Overlays initial values (shown when unbound, compared against when bound).
    pub fn with_initial(mut self, values: &Fields) -> Self {
        for (name, value) in values {
            if self.model.field_spec(name).is_none() {
                continue;
            }
            match value.as_raw() {
                Some(raw) => self.initial.insert(name.clone(), raw),
                None => self.initial.remove(name),
            };
        }
        self
    }

    /// Attaches submitted raw values and the deletion flag.
    pub fn bind(mut self, raw_values: BTreeMap<String, String>, deletion_requested: bool) -> Self {
        self.data = Some(raw_values);
        self.deletion_requested = deletion_requested;
        self.reset();
        self.state = FormState::Bound;
        self
    }

    /// Raw values of the model's fields under `prefix`.
    pub fn posted_values(
        model: &EntityModel,
        prefix: &str,
        data: &PostedData,
    ) -> BTreeMap<String, String> {
        model
            .fields
            .iter()
            .filter_map(|f| {
                data.get(&naming::field_name(prefix, &f.name))
                    .map(|v| (f.name.clone(), v.to_string()))
            })
            .collect()
    }

    pub fn model(&self) -> &Arc<EntityModel> {
        &self.model
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn is_bound(&self) -> bool {
        self.data.is_some()
    }

    pub fn deletion_requested(&self) -> bool {
        self.deletion_requested
    }

    pub fn errors(&self) -> &RowError {
        &self.errors
    }

    pub fn cleaned(&self) -> &Fields {
        &self.cleaned
    }

    /// Errors not attached to a declared field (e.g. an unknown row id).
    pub fn row_errors(&self) -> Vec<String> {
        self.errors
            .iter()
            .filter(|e| self.model.field_spec(&e.field).is_none())
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn set_parent(&mut self, parent_id: Option<RecordId>) {
        self.instance.parent_id = parent_id;
    }

    pub fn set_empty_permitted(&mut self, permitted: bool) {
        self.empty_permitted = permitted;
        self.invalidate();
    }

    pub fn add_bind_error(&mut self, error: FieldError) {
        self.bind_errors.push(error);
        self.invalidate();
    }

    pub fn mark_deleted(&mut self) {
        self.deletion_requested = true;
        self.invalidate();
    }

    /// True when any submitted value differs from the initial one.
    pub fn has_changed(&self) -> bool {
        let Some(data) = &self.data else {
            return false;
        };

        self.model.fields.iter().any(|f| {
            let posted = data.get(&f.name).map(|s| s.trim()).unwrap_or("");
            let initial = self.initial.get(&f.name).map(|s| s.trim()).unwrap_or("");
            match f.kind {
                FieldKind::Boolean => is_truthy(posted) != is_truthy(initial),
                _ => posted != initial,
            }
        })
    }

    /// An extra row the user never touched: valid, and skipped on save.
    pub fn is_empty_extra(&self) -> bool {
        self.empty_permitted && !self.has_changed()
    }

    pub fn validate(&mut self) -> ValidationResult {
        match self.state {
            FormState::Unbound => {
                return ValidationResult {
                    valid: false,
                    cleaned: Fields::new(),
                    errors: RowError::default(),
                };
            }
            FormState::Validated { .. } | FormState::Saved => return self.result(),
            FormState::Bound => {}
        }

        self.cleaned.clear();
        self.errors = RowError::default();
        // A row flagged for deletion is not validated at all.
        if !self.deletion_requested {
            for error in &self.bind_errors {
                self.errors.push(error.clone());
            }
        }

        if !self.deletion_requested && !self.is_empty_extra() {
            let empty = BTreeMap::new();
            let data = self.data.as_ref().unwrap_or(&empty);
            for spec in &self.model.fields {
                match clean_field(spec, data.get(&spec.name).map(String::as_str)) {
                    Ok(value) => {
                        self.cleaned.insert(spec.name.clone(), value);
                    }
                    Err(message) => self.errors.push(FieldError::new(&spec.name, message)),
                }
            }
        }

        let valid = self.errors.is_empty();
        self.state = FormState::Validated { valid };
        if !valid {
            tracing::debug!(prefix = %self.prefix, errors = self.errors.len(), "form invalid");
        }
        self.result()
    }

    pub fn is_valid(&mut self) -> bool {
        self.validate().valid
    }

    /// Writes the cleaned values.
    ///
    /// With `commit == false` nothing touches the store: the returned
    /// instance carries the cleaned values and the current parent link, so the
    /// caller can assign a parent identifier and save again with commit.
    pub fn save(&mut self, store: &dyn Store, commit: bool) -> Result<Saved> {
        self.check_saveable()?;

        if self.deletion_requested {
            let Some(id) = self.instance.id else {
                return Ok(Saved::Skipped);
            };
            if commit {
                store.delete(&self.model, id)?;
                self.state = FormState::Saved;
            }
            return Ok(Saved::Deleted(Tombstone {
                model: self.model.name.clone(),
                id,
            }));
        }

        if self.is_empty_extra() {
            return Ok(Saved::Skipped);
        }

        for (name, value) in &self.cleaned {
            self.instance.fields.insert(name.clone(), value.clone());
        }

        if !commit {
            return Ok(Saved::Instance(self.instance.clone()));
        }

        if let Some(link) = &self.model.parent
            && !link.nullable
            && self.instance.parent_id.is_none()
        {
            return Err(PreconditionError::MissingParent {
                model: self.model.name.clone(),
            }
            .into());
        }

        match self.instance.id {
            Some(id) => store.update(
                &self.model,
                id,
                self.instance.parent_id,
                &self.instance.fields,
            )?,
            None => {
                let id = store.create(&self.model, self.instance.parent_id, &self.instance.fields)?;
                self.instance.id = Some(id);
            }
        }

        self.state = FormState::Saved;
        Ok(Saved::Instance(self.instance.clone()))
    }

    pub fn bound_fields(&self) -> Vec<BoundField> {
        self.model
            .fields
            .iter()
            .map(|spec| {
                let value = match &self.data {
                    Some(data) => data.get(&spec.name).cloned(),
                    None => self.initial.get(&spec.name).cloned(),
                };
                BoundField {
                    name: naming::field_name(&self.prefix, &spec.name),
                    html_id: naming::field_id(&self.prefix, &spec.name),
                    label: spec.label.clone(),
                    input_type: spec.kind.input_type(),
                    value,
                    required: spec.required,
                    errors: self.errors.for_field(&spec.name),
                }
            })
            .collect()
    }

    /// Fields of a row template, named with substitution tokens.
    pub fn template_fields(model: &EntityModel) -> Vec<BoundField> {
        let prefix = naming::template_row_prefix();
        model
            .fields
            .iter()
            .map(|spec| BoundField {
                name: naming::field_name(&prefix, &spec.name),
                html_id: naming::field_id(&prefix, &spec.name),
                label: spec.label.clone(),
                input_type: spec.kind.input_type(),
                value: None,
                required: spec.required,
                errors: Vec::new(),
            })
            .collect()
    }

    /// Values as the browser would resubmit them.
    pub fn current_values(&self) -> BTreeMap<String, String> {
        match &self.data {
            Some(data) => data.clone(),
            None => self.initial.clone(),
        }
    }

    fn check_saveable(&self) -> Result<()> {
        let prefix = self.prefix.clone();
        match self.state {
            FormState::Validated { valid: true } => Ok(()),
            FormState::Validated { valid: false } => {
                Err(PreconditionError::SaveInvalid { prefix }.into())
            }
            FormState::Saved => Err(PreconditionError::AlreadySaved { prefix }.into()),
            FormState::Unbound | FormState::Bound => {
                Err(PreconditionError::SaveBeforeValidate { prefix }.into())
            }
        }
    }

    fn result(&self) -> ValidationResult {
        ValidationResult {
            valid: matches!(
                self.state,
                FormState::Validated { valid: true } | FormState::Saved
            ),
            cleaned: self.cleaned.clone(),
            errors: self.errors.clone(),
        }
    }

    fn reset(&mut self) {
        self.cleaned.clear();
        self.errors = RowError::default();
    }

    fn invalidate(&mut self) {
        if let FormState::Validated { .. } = self.state {
            self.state = FormState::Bound;
        }
    }
}

/// Per-kind coercion of one raw value.
pub fn clean_field(spec: &FieldSpec, raw: Option<&str>) -> std::result::Result<FieldValue, String> {
    let empty = || {
        if spec.required {
            Err(REQUIRED.to_string())
        } else {
            Ok(FieldValue::Null)
        }
    };

    match &spec.kind {
        FieldKind::Boolean => {
            let checked = raw.is_some_and(is_truthy);
            if spec.required && !checked {
                Err(REQUIRED.to_string())
            } else {
                Ok(FieldValue::Boolean(checked))
            }
        }
        FieldKind::Text { max_length } => {
            let value = raw.unwrap_or("").trim();
            if value.is_empty() {
                return empty();
            }
            let length = value.chars().count();
            if length > *max_length {
                return Err(format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    max_length, length
                ));
            }
            Ok(FieldValue::Text(value.to_string()))
        }
        FieldKind::Integer => {
            let value = raw.unwrap_or("").trim();
            if value.is_empty() {
                return empty();
            }
            value
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| INVALID_INTEGER.to_string())
        }
    }
}
