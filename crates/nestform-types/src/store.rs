use crate::{EntityModel, Fields, Instance, RecordId, Result};

/// CRUD contract of the persisted store.
///
/// The form engine never queries across unrelated trees: everything it
/// needs is a lookup by identifier or the children of one parent.
/// Transactions are optional; the default hooks are no-ops, which leaves
/// a tree save non-atomic.
pub trait Store {
    fn create(&self, model: &EntityModel, parent_id: Option<RecordId>, fields: &Fields)
    -> Result<RecordId>;

    fn update(
        &self,
        model: &EntityModel,
        id: RecordId,
        parent_id: Option<RecordId>,
        fields: &Fields,
    ) -> Result<()>;

    fn delete(&self, model: &EntityModel, id: RecordId) -> Result<()>;

    fn get(&self, model: &EntityModel, id: RecordId) -> Result<Option<Instance>>;

    /// Rows of `model` whose parent link equals `parent_id`, oldest first.
    fn list_children(&self, model: &EntityModel, parent_id: RecordId) -> Result<Vec<Instance>>;

    fn list(&self, model: &EntityModel) -> Result<Vec<Instance>>;

    fn begin(&self) -> Result<()> {
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        Ok(())
    }
}
