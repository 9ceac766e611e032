use super::print_json;
use crate::types::OutputFormat;
use anyhow::Result;
use nestform_runtime::Workspace;
use serde_json::json;
use std::path::Path;

pub fn handle(data_dir: &Path, format: OutputFormat) -> Result<()> {
    let report = Workspace::init(data_dir)?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "data_dir": report.data_dir,
            "config_path": report.config_path,
            "database_path": report.database_path,
            "created_config": report.created_config,
        })),
        OutputFormat::Plain => {
            if report.created_config {
                println!("Initialized workspace at {}", report.data_dir.display());
            } else {
                println!("Workspace already initialized at {}", report.data_dir.display());
            }
            println!("  config:   {}", report.config_path.display());
            println!("  database: {}", report.database_path.display());
            Ok(())
        }
    }
}
