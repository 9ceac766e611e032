use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{Error, Result, records::RecordRow};

const COLUMNS: &str = "id, model, parent_id, fields, created_at, updated_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        model: row.get(1)?,
        parent_id: row.get(2)?,
        fields: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub fn insert(
    conn: &Connection,
    model: &str,
    parent_id: Option<i64>,
    fields: &str,
    now: &str,
) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO records (model, parent_id, fields, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        "#,
        params![model, parent_id, fields, now],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Returns the number of rows touched (0 when the record does not exist).
pub fn update(
    conn: &Connection,
    model: &str,
    id: i64,
    parent_id: Option<i64>,
    fields: &str,
    now: &str,
) -> Result<usize> {
    let changed = conn.execute(
        r#"
        UPDATE records
        SET parent_id = ?3, fields = ?4, updated_at = ?5
        WHERE id = ?1 AND model = ?2
        "#,
        params![id, model, parent_id, fields, now],
    )?;

    Ok(changed)
}

pub fn delete(conn: &Connection, model: &str, id: i64) -> Result<usize> {
    let changed = conn.execute(
        "DELETE FROM records WHERE id = ?1 AND model = ?2",
        params![id, model],
    )?;

    Ok(changed)
}

pub fn get_by_id(conn: &Connection, model: &str, id: i64) -> Result<Option<RecordRow>> {
    let query = format!(
        "SELECT {} FROM records WHERE id = ?1 AND model = ?2",
        COLUMNS
    );

    conn.query_row(&query, params![id, model], map_row)
        .optional()
        .map_err(Error::from)
}

pub fn list_children(conn: &Connection, model: &str, parent_id: i64) -> Result<Vec<RecordRow>> {
    let query = format!(
        "SELECT {} FROM records WHERE model = ?1 AND parent_id = ?2 ORDER BY id ASC",
        COLUMNS
    );

    let mut stmt = conn.prepare(&query)?;
    let rows = stmt
        .query_map(params![model, parent_id], map_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    Ok(rows)
}

pub fn list(conn: &Connection, model: &str) -> Result<Vec<RecordRow>> {
    let query = format!(
        "SELECT {} FROM records WHERE model = ?1 ORDER BY id ASC",
        COLUMNS
    );

    let mut stmt = conn.prepare(&query)?;
    let rows = stmt
        .query_map([model], map_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    Ok(rows)
}

pub fn count(conn: &Connection, model: &str) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM records WHERE model = ?1",
        [model],
        |row| row.get(0),
    )?;

    Ok(count as usize)
}
