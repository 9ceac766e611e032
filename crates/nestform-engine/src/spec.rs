use nestform_types::{EntityModel, Schema};
use std::collections::HashSet;
use std::sync::Arc;

/// Upper bound added to `max_num` before posted row counts are rejected.
pub const DEFAULT_MAX_NUM: usize = 1000;

/// Per-relation formset options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormsetOptions {
    /// Blank rows appended when rendering an unbound formset
    pub extra: usize,
    /// Maximum number of rows a client may declare
    pub max_num: usize,
    /// Report a formset error when more than `max_num` rows survive
    pub validate_max: bool,
    pub can_delete: bool,
}

impl Default for FormsetOptions {
    fn default() -> Self {
        Self {
            extra: 1,
            max_num: DEFAULT_MAX_NUM,
            validate_max: false,
            can_delete: true,
        }
    }
}

impl FormsetOptions {
    /// Hard cap on row slots, posted or added programmatically
    pub fn absolute_max(&self) -> usize {
        self.max_num.saturating_add(DEFAULT_MAX_NUM)
    }
}

/// How one level of the tree is built: a model plus, optionally, the
/// formset of its children.
#[derive(Debug, Clone)]
pub struct FormSpec {
    pub model: Arc<EntityModel>,
    pub child: Option<Box<ChildSpec>>,
}

#[derive(Debug, Clone)]
pub struct ChildSpec {
    /// Local prefix segment of the child formset (`buildings`)
    pub relation: String,
    pub form: FormSpec,
    pub options: FormsetOptions,
}

impl FormSpec {
    pub fn leaf(model: Arc<EntityModel>) -> Self {
        Self { model, child: None }
    }

    /// Attaches a child formset, named after the child's reverse relation.
    pub fn with_child(mut self, child: FormSpec, options: FormsetOptions) -> Self {
        let relation = child
            .model
            .parent
            .as_ref()
            .map(|link| link.related_name.clone())
            .unwrap_or_else(|| format!("{}_set", child.model.name.to_lowercase()));

        self.child = Some(Box::new(ChildSpec {
            relation,
            form: child,
            options,
        }));
        self
    }

    /// Follows the first declared child relation of each model, starting
    /// at `root`, until a model without children is reached.
    pub fn from_schema(
        schema: &Schema,
        root: &str,
        options: FormsetOptions,
    ) -> nestform_types::Result<Self> {
        let model = schema.require(root)?;
        let mut visited = HashSet::new();
        Ok(Self::build(schema, model, options, &mut visited))
    }

    fn build(
        schema: &Schema,
        model: Arc<EntityModel>,
        options: FormsetOptions,
        visited: &mut HashSet<String>,
    ) -> Self {
        visited.insert(model.name.clone());

        let child = schema
            .children_of(&model.name)
            .into_iter()
            .find(|c| !visited.contains(&c.name));

        let spec = Self::leaf(model);
        match child {
            Some(child) => {
                let child_spec = Self::build(schema, child, options, visited);
                spec.with_child(child_spec, options)
            }
            None => spec,
        }
    }

    pub fn form_name(&self) -> String {
        self.model.form_name()
    }

    /// Child relations below this level, nearest first.
    pub fn descendants(&self) -> Vec<&ChildSpec> {
        let mut out = Vec::new();
        let mut current = self.child.as_deref();
        while let Some(child) = current {
            out.push(child);
            current = child.form.child.as_deref();
        }
        out
    }

    /// Number of levels including this one.
    pub fn depth(&self) -> usize {
        1 + self.descendants().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nestform_types::FieldSpec;

    #[test]
    fn test_from_schema_follows_chain() {
        let spec = FormSpec::from_schema(&Schema::demo(), "block", FormsetOptions::default())
            .unwrap();

        assert_eq!(spec.form_name(), "BlockForm");
        assert_eq!(spec.depth(), 4);

        let relations: Vec<_> = spec
            .descendants()
            .iter()
            .map(|c| (c.relation.as_str(), c.form.form_name()))
            .collect();
        assert_eq!(
            relations,
            vec![
                ("buildings", "BuildingForm".to_string()),
                ("tenants", "TenantForm".to_string()),
                ("furniture", "FurnitureForm".to_string()),
            ]
        );
    }

    #[test]
    fn test_from_schema_starts_mid_chain() {
        let spec = FormSpec::from_schema(&Schema::demo(), "Tenant", FormsetOptions::default())
            .unwrap();
        assert_eq!(spec.depth(), 2);
    }

    #[test]
    fn test_cyclic_schema_terminates() {
        let schema = Schema::new()
            .with_model(
                EntityModel::new("A")
                    .field(FieldSpec::text("name", 10))
                    .child_of("B", "as"),
            )
            .with_model(
                EntityModel::new("B")
                    .field(FieldSpec::text("name", 10))
                    .child_of("A", "bs"),
            );

        let spec = FormSpec::from_schema(&schema, "A", FormsetOptions::default()).unwrap();
        assert_eq!(spec.depth(), 2);
    }

    #[test]
    fn test_absolute_max() {
        let options = FormsetOptions {
            max_num: 5,
            ..FormsetOptions::default()
        };
        assert_eq!(options.absolute_max(), 1005);
    }
}
