use super::{print_json, stdout_is_terminal};
use crate::types::OutputFormat;
use anyhow::Result;
use nestform_runtime::Workspace;
use owo_colors::OwoColorize;

pub fn handle(workspace: &Workspace, model: &str, csv: bool, format: OutputFormat) -> Result<()> {
    let spec = workspace.spec(model)?;
    let records = workspace.list(model)?;
    let columns: Vec<&str> = spec.model.fields.iter().map(|f| f.name.as_str()).collect();

    if csv {
        let mut writer = csv::Writer::from_writer(std::io::stdout());
        let mut header = vec!["id", "parent_id"];
        header.extend(&columns);
        writer.write_record(&header)?;

        for record in &records {
            let mut row = vec![
                record.id.map(|id| id.to_string()).unwrap_or_default(),
                record.parent_id.map(|id| id.to_string()).unwrap_or_default(),
            ];
            row.extend(columns.iter().map(|c| record.field(c).to_string()));
            writer.write_record(&row)?;
        }
        writer.flush()?;
        return Ok(());
    }

    if format == OutputFormat::Json {
        return print_json(&records);
    }

    if records.is_empty() {
        println!("No {} records.", spec.model.name);
        return Ok(());
    }

    let color = stdout_is_terminal();
    for record in &records {
        let id = record.id.map(|id| format!("#{}", id)).unwrap_or_default();
        let values = columns
            .iter()
            .map(|c| format!("{}={}", c, record.field(c)))
            .collect::<Vec<_>>()
            .join("  ");
        if color {
            println!("{:>6}  {}", id.cyan(), values);
        } else {
            println!("{:>6}  {}", id, values);
        }
    }
    Ok(())
}
