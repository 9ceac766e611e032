use super::print_json;
use crate::types::OutputFormat;
use anyhow::Result;
use nestform_runtime::{Workspace, action_path};
use nestform_types::RecordId;
use serde_json::json;
use std::collections::BTreeMap;

pub fn handle(
    workspace: &Workspace,
    model: &str,
    id: Option<RecordId>,
    posted: bool,
    format: OutputFormat,
) -> Result<()> {
    let node = workspace.display(model, id)?;

    if posted {
        let snapshot = node.posted_snapshot();
        return match format {
            OutputFormat::Json => {
                let map: BTreeMap<&str, &str> = snapshot.iter().collect();
                print_json(&map)
            }
            OutputFormat::Plain => {
                for (name, value) in snapshot.iter() {
                    println!("{}={}", name, value);
                }
                Ok(())
            }
        };
    }

    let page = workspace.render_page(&node, &action_path(model, id))?;
    match format {
        OutputFormat::Json => print_json(&json!({
            "instance": node.instance(),
            "html": page,
        })),
        OutputFormat::Plain => {
            println!("{}", page);
            Ok(())
        }
    }
}
