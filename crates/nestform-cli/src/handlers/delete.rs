use super::print_json;
use crate::types::OutputFormat;
use anyhow::Result;
use nestform_runtime::Workspace;
use nestform_types::RecordId;
use serde_json::json;

pub fn handle(workspace: &Workspace, model: &str, id: RecordId, format: OutputFormat) -> Result<()> {
    let removed = workspace.delete(model, id)?;

    match format {
        OutputFormat::Json => print_json(&json!({ "model": model, "id": id, "removed": removed })),
        OutputFormat::Plain => {
            println!("Deleted {} #{} ({} records)", model, id, removed);
            Ok(())
        }
    }
}
