use chrono::{SecondsFormat, Utc};
use nestform_types::{EntityModel, Fields, Instance, RecordId, Store};
use rusqlite::Connection;
use std::path::Path;

use crate::{Result, queries, records::RecordRow, schema};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        tracing::debug!(path = %db_path.display(), "opened record store");

        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn init_schema(&self) -> Result<()> {
        schema::init_schema(&self.conn)
    }

    pub fn count(&self, model: &str) -> Result<usize> {
        queries::record::count(&self.conn, model)
    }

    fn now() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn not_found(model: &EntityModel, id: RecordId) -> nestform_types::Error {
        nestform_types::Error::NotFound {
            model: model.name.clone(),
            id,
        }
    }
}

impl Store for Database {
    fn create(
        &self,
        model: &EntityModel,
        parent_id: Option<RecordId>,
        fields: &Fields,
    ) -> nestform_types::Result<RecordId> {
        let document = serde_json::to_string(fields).map_err(crate::Error::from)?;
        let id = queries::record::insert(
            &self.conn,
            &model.name,
            parent_id.map(RecordId::get),
            &document,
            &Self::now(),
        )?;

        tracing::debug!(model = %model.name, id, "created record");
        Ok(RecordId::new(id))
    }

    fn update(
        &self,
        model: &EntityModel,
        id: RecordId,
        parent_id: Option<RecordId>,
        fields: &Fields,
    ) -> nestform_types::Result<()> {
        let document = serde_json::to_string(fields).map_err(crate::Error::from)?;
        let changed = queries::record::update(
            &self.conn,
            &model.name,
            id.get(),
            parent_id.map(RecordId::get),
            &document,
            &Self::now(),
        )?;

        if changed == 0 {
            return Err(Self::not_found(model, id));
        }
        Ok(())
    }

    fn delete(&self, model: &EntityModel, id: RecordId) -> nestform_types::Result<()> {
        let changed = queries::record::delete(&self.conn, &model.name, id.get())?;
        if changed == 0 {
            return Err(Self::not_found(model, id));
        }

        tracing::debug!(model = %model.name, id = id.get(), "deleted record");
        Ok(())
    }

    fn get(&self, model: &EntityModel, id: RecordId) -> nestform_types::Result<Option<Instance>> {
        let row = queries::record::get_by_id(&self.conn, &model.name, id.get())?;
        Ok(row.map(RecordRow::into_instance).transpose()?)
    }

    fn list_children(
        &self,
        model: &EntityModel,
        parent_id: RecordId,
    ) -> nestform_types::Result<Vec<Instance>> {
        let rows = queries::record::list_children(&self.conn, &model.name, parent_id.get())?;
        Ok(rows
            .into_iter()
            .map(RecordRow::into_instance)
            .collect::<Result<Vec<_>>>()?)
    }

    fn list(&self, model: &EntityModel) -> nestform_types::Result<Vec<Instance>> {
        let rows = queries::record::list(&self.conn, &model.name)?;
        Ok(rows
            .into_iter()
            .map(RecordRow::into_instance)
            .collect::<Result<Vec<_>>>()?)
    }

    fn begin(&self) -> nestform_types::Result<()> {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(crate::Error::from)?;
        Ok(())
    }

    fn commit(&self) -> nestform_types::Result<()> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(crate::Error::from)?;
        Ok(())
    }

    fn rollback(&self) -> nestform_types::Result<()> {
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(crate::Error::from)?;
        Ok(())
    }
}
