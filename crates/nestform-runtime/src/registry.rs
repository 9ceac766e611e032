use nestform_engine::{FormSpec, FormsetOptions};
use nestform_types::Schema;
use std::collections::BTreeMap;

use crate::Result;

/// One form tree per model, rooted at that model.
#[derive(Debug, Clone)]
pub struct FormRegistry {
    schema: Schema,
    specs: BTreeMap<String, FormSpec>,
}

impl FormRegistry {
    pub fn new(schema: Schema, options: FormsetOptions) -> Result<Self> {
        let mut specs = BTreeMap::new();
        for model in schema.models() {
            let spec = FormSpec::from_schema(&schema, &model.name, options)?;
            specs.insert(model.name.to_lowercase(), spec);
        }
        Ok(Self { schema, specs })
    }

    pub fn demo(options: FormsetOptions) -> Result<Self> {
        Self::new(Schema::demo(), options)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Case-insensitive lookup by model name.
    pub fn get(&self, model: &str) -> Result<&FormSpec> {
        self.specs
            .get(&model.to_lowercase())
            .ok_or_else(|| nestform_types::Error::UnknownModel(model.to_string()).into())
    }

    /// Model names in schema declaration order.
    pub fn model_names(&self) -> Vec<&str> {
        self.schema.models().map(|m| m.name.as_str()).collect()
    }

    pub fn specs(&self) -> impl Iterator<Item = &FormSpec> {
        self.specs.values()
    }
}
