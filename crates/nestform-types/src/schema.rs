use std::sync::Arc;

use crate::{Error, Result};

/// Supported field kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text { max_length: usize },
    Integer,
    Boolean,
}

impl FieldKind {
    /// HTML input type used when rendering this kind
    pub fn input_type(&self) -> &'static str {
        match self {
            FieldKind::Text { .. } => "text",
            FieldKind::Integer => "number",
            FieldKind::Boolean => "checkbox",
        }
    }
}

/// One declared field of an entity model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub fn text(name: &str, max_length: usize) -> Self {
        Self {
            name: name.to_string(),
            label: default_label(name),
            kind: FieldKind::Text { max_length },
            required: true,
        }
    }

    pub fn integer(name: &str) -> Self {
        Self {
            name: name.to_string(),
            label: default_label(name),
            kind: FieldKind::Integer,
            required: true,
        }
    }

    pub fn boolean(name: &str) -> Self {
        Self {
            name: name.to_string(),
            label: default_label(name),
            kind: FieldKind::Boolean,
            required: false,
        }
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// `street_name` -> `Street name`
fn default_label(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Foreign key from a child model to its parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentLink {
    /// Name of the link field on the child (`block`)
    pub field: String,
    /// Parent model name (`Block`)
    pub model: String,
    /// Name of the reverse relation on the parent (`buildings`)
    pub related_name: String,
    /// Whether a saved child may have a null parent
    pub nullable: bool,
}

/// Schema description of one level of the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityModel {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    pub parent: Option<ParentLink>,
}

impl EntityModel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
            parent: None,
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn child_of(mut self, parent: &str, related_name: &str) -> Self {
        self.parent = Some(ParentLink {
            field: parent.to_lowercase(),
            model: parent.to_string(),
            related_name: related_name.to_string(),
            nullable: true,
        });
        self
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Name of the form type generated for this model (`BuildingForm`)
    pub fn form_name(&self) -> String {
        format!("{}Form", self.name)
    }
}

/// The set of models known to the application
#[derive(Debug, Clone, Default)]
pub struct Schema {
    models: Vec<Arc<EntityModel>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: EntityModel) -> Self {
        self.models.push(Arc::new(model));
        self
    }

    /// Block -> Building -> Tenant -> Furniture
    pub fn demo() -> Self {
        Self::new()
            .with_model(
                EntityModel::new("Block").field(FieldSpec::text("name", 255).label("Block Name")),
            )
            .with_model(
                EntityModel::new("Building")
                    .field(FieldSpec::text("name", 255).label("Bldg Name"))
                    .field(FieldSpec::text("street_name", 255).optional())
                    .child_of("Block", "buildings"),
            )
            .with_model(
                EntityModel::new("Tenant")
                    .field(FieldSpec::text("first_name", 255))
                    .field(FieldSpec::text("last_name", 255))
                    .child_of("Building", "tenants"),
            )
            .with_model(
                EntityModel::new("Furniture")
                    .field(FieldSpec::text("name", 255))
                    .field(FieldSpec::integer("quantity").optional())
                    .child_of("Tenant", "furniture"),
            )
    }

    pub fn models(&self) -> impl Iterator<Item = &Arc<EntityModel>> {
        self.models.iter()
    }

    /// Case-insensitive lookup, so routes can use `building` for `Building`.
    pub fn get(&self, name: &str) -> Option<Arc<EntityModel>> {
        self.models
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn require(&self, name: &str) -> Result<Arc<EntityModel>> {
        self.get(name)
            .ok_or_else(|| Error::UnknownModel(name.to_string()))
    }

    /// Models whose parent link points at `parent`, in declaration order.
    pub fn children_of(&self, parent: &str) -> Vec<Arc<EntityModel>> {
        self.models
            .iter()
            .filter(|m| m.parent.as_ref().is_some_and(|p| p.model == parent))
            .cloned()
            .collect()
    }
}
