// Client sync descriptor
// Data-only lookup table the client script reads when cloning a row:
// parent form -> child form -> {template element id, form type, relation}

use nestform_engine::FormSpec;
use nestform_engine::naming;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildDescriptor {
    pub child_template: String,
    pub child_form: String,
    pub relation_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClientDescriptor {
    forms: BTreeMap<String, BTreeMap<String, ChildDescriptor>>,
}

impl ClientDescriptor {
    /// Entries for every parent level of `spec`.
    pub fn from_spec(spec: &FormSpec) -> Self {
        let mut descriptor = Self::default();
        descriptor.add_spec(spec);
        descriptor
    }

    pub fn add_spec(&mut self, spec: &FormSpec) {
        let mut parent = spec;
        while let Some(child) = parent.child.as_deref() {
            let child_form = child.form.form_name();
            self.forms.entry(parent.form_name()).or_default().insert(
                child_form.clone(),
                ChildDescriptor {
                    child_template: naming::template_id(&child_form),
                    child_form,
                    relation_name: child.relation.clone(),
                },
            );
            parent = &child.form;
        }
    }

    pub fn get(&self, parent_form: &str, child_form: &str) -> Option<&ChildDescriptor> {
        self.forms.get(parent_form)?.get(child_form)
    }

    pub fn parent_forms(&self) -> impl Iterator<Item = &str> {
        self.forms.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// JSON safe to place inside a `<script>` element.
    pub fn to_script_json(&self) -> Result<String> {
        Ok(self.to_json()?.replace("</", "<\\/"))
    }
}
