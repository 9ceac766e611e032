use nestform_types::{Fields, Instance, RecordId};

use crate::Result;

/// Raw row of the `records` table.
#[derive(Debug, Clone)]
pub struct RecordRow {
    /// Store-assigned identifier.
    pub id: i64,
    /// Model name (`Block`, `Building`, ...).
    pub model: String,
    /// Identifier of the parent record, if linked.
    pub parent_id: Option<i64>,
    /// JSON document of field values.
    pub fields: String,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Last update timestamp (RFC 3339).
    pub updated_at: String,
}

impl RecordRow {
    pub fn into_instance(self) -> Result<Instance> {
        let fields: Fields = serde_json::from_str(&self.fields)?;
        Ok(Instance {
            model: self.model,
            id: Some(RecordId::new(self.id)),
            parent_id: self.parent_id.map(RecordId::new),
            fields,
        })
    }
}
